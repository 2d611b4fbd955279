//! Content backend for a personal blog.
//!
//! Posts with categories, tags and SEO metadata, one-level threaded comments
//! with moderation, likes, views and shares, plus the aggregate statistics
//! shown on the admin dashboard. Everything is persisted in an embedded
//! `sled` database and exposed through plain functions as well as an `axum`
//! JSON API.

#[macro_use]
extern crate serde_derive;

pub mod api;
pub mod auth;
pub mod comment;
pub mod config;
pub mod contact;
pub mod content;
pub mod db;
pub mod email;
pub mod error;
pub mod init;
pub mod mock;
pub mod post;
pub mod routes;
pub mod seo;
pub mod share;
pub mod stats;
pub mod table;
pub mod taxonomy;
pub mod tracing;
pub mod user;
pub mod util;

#[cfg(feature = "axum")]
pub mod axum;

pub use comment::{Comment, CommentStatus};
pub use config::Config;
pub use db::Database;
pub use error::{Error, ErrorKind, Result};
pub use post::{Post, PostId, PostStatus};
pub use seo::PostSeo;
pub use taxonomy::{Category, Tag};
pub use user::{User, UserId};
