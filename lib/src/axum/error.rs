use axum::response::{IntoResponse, Response};
use axum::Json;
use http::header::RETRY_AFTER;
use http::StatusCode;
use serde_json::json;

use crate::{Error, ErrorKind};

impl Error {
    /// Status code the error is reported with.
    pub fn status(&self) -> StatusCode {
        match &self.kind {
            ErrorKind::NotFound(_) | ErrorKind::UserNotFound(_) => StatusCode::NOT_FOUND,
            ErrorKind::SlugInUse(_)
            | ErrorKind::HasAssociatedPosts(..)
            | ErrorKind::UserWithEmailAlreadyExists(_) => StatusCode::CONFLICT,
            ErrorKind::BadInput(_)
            | ErrorKind::ParsingError(_)
            | ErrorKind::EmailParseError(_)
            | ErrorKind::UrlParseError(_) => StatusCode::BAD_REQUEST,
            ErrorKind::Forbidden | ErrorKind::AccountDisabled => StatusCode::FORBIDDEN,
            ErrorKind::AuthFailed(_) => StatusCode::UNAUTHORIZED,
            ErrorKind::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Implements conversion into json response for all possible error variants.
///
/// Client errors carry their message in the `error` field. Internal errors
/// are logged and answered with a generic message only.
///
/// Backtrace and additional context information (e.g. user information) are
/// never part of the response and always only available through the
/// application logs.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("{}", self);
            return (status, Json(json!({ "error": "internal server error" }))).into_response();
        }

        tracing::debug!("{}", self);
        let body = Json(json!({ "error": self.kind.to_string() }));
        match self.kind {
            ErrorKind::RateLimited(secs) => {
                (status, [(RETRY_AFTER, secs.to_string())], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}
