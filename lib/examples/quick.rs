//! Corner-cutting example to show off the shortest path to a usable artifact.
//!
//! Serves the API on a throwaway database filled with mock content. Dev mode
//! autologin makes every request act as the mock admin, so the write routes
//! can be tried with plain `curl`.

use std::str::FromStr;

use axum::{response::IntoResponse, routing::get, Extension, Json};

use quill::config::DevMode;
use quill::post::{PostFilter, PostSort};
use quill::table::PageQuery;
use quill::{mock, Config, Database};

#[tokio::main]
async fn main() -> quill::Result<()> {
    let config = Config {
        address: std::net::SocketAddr::from_str("127.0.0.1:8001")
            .map_err(|e| quill::ErrorKind::Other(e.to_string()))?,
        dev: DevMode {
            enabled: true,
            autologin: Some(mock::TEST_USER_EMAIL.to_string()),
            mock: true,
        },
        ..Default::default()
    };

    // main application router, api routes get attached on start
    let router = quill::axum::Router::new().route("/", get(home));

    quill::axum::start_with(Database::temporary()?, router, config).await
}

/// Titles of the latest published posts.
async fn home(Extension(db): quill::axum::DbExt) -> quill::Result<impl IntoResponse> {
    let filter = PostFilter {
        published_only: true,
        ..Default::default()
    };
    let page = quill::post::list_posts(&db, &filter, PostSort::default(), PageQuery::default())?;
    Ok(Json(
        page.items
            .into_iter()
            .map(|p| p.post.title)
            .collect::<Vec<_>>(),
    ))
}
