//! Request and response payloads of the JSON API that are not domain types
//! themselves.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::comment::CommentStatus;
use crate::post::PostStatus;
use crate::share::Platform;

/// Defines the length-of-life of an access token.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuthDuration {
    /// 1 hour
    Short,
    /// 1 day
    #[default]
    Medium,
    /// 30 days
    Long,
}

// conversion method for making `AuthDuration` into an actual `Duration`
impl From<AuthDuration> for Duration {
    fn from(d: AuthDuration) -> Duration {
        match d {
            AuthDuration::Short => Duration::from_secs(60 * 60),
            AuthDuration::Medium => Duration::from_secs(24 * 60 * 60),
            AuthDuration::Long => Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PostStatusRequest {
    pub status: PostStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommentStatusRequest {
    pub status: CommentStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommentRequest {
    pub content: String,
    pub parent: Option<uuid::Uuid>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommentEditRequest {
    pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShareRequest {
    pub platform: Platform,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViewResponse {
    /// Whether this call registered a new view.
    pub counted: bool,
    pub views: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
