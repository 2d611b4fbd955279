use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Extension, Json};

use crate::api::MessageResponse;
use crate::contact::{self, ContactMessage};
use crate::{routes, Result};

use super::{ConfigExt, Router};

pub fn router() -> Router {
    Router::new().route(routes::CONTACT, post(send))
}

pub async fn send(
    Extension(config): ConfigExt,
    Json(message): Json<ContactMessage>,
) -> Result<impl IntoResponse> {
    contact::send_contact(&config, message).await?;
    Ok(Json(MessageResponse::new("Message sent")))
}
