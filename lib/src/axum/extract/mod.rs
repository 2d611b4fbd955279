pub mod user;

pub use user::{OptionalUser, User};
