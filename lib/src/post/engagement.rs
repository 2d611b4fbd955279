//! Views and likes.
//!
//! A view is identified by (post, address, user agent) and a like by
//! (post, user); both are stored under a key derived from that identity.
//! Recording the row and bumping the post counter happen in one
//! transaction, so concurrent requests can neither double count nor lose a
//! toggle.
//!
//! Only published posts collect new views and likes. A like given while the
//! post was published can still be taken back afterwards.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::{derived_key, Collectable, Database, Identifiable};
use crate::error::{ErrorKind, Result};
use crate::post::{Post, PostId};
use crate::UserId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostView {
    pub id: Uuid,
    pub post: PostId,
    pub ip: String,
    pub user_agent: String,
    /// Viewer, if they were logged in.
    pub user: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl PostView {
    pub fn key(post: PostId, ip: &str, user_agent: &str) -> Uuid {
        derived_key(&[post.as_bytes(), ip.as_bytes(), user_agent.as_bytes()])
    }
}

impl Collectable for PostView {
    fn get_collection_name() -> &'static str {
        "post_view"
    }
}

impl Identifiable for PostView {
    fn get_id(&self) -> Uuid {
        self.id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostLike {
    pub id: Uuid,
    pub post: PostId,
    pub user: UserId,
    pub created_at: DateTime<Utc>,
}

impl PostLike {
    pub fn key(post: PostId, user: UserId) -> Uuid {
        derived_key(&[post.as_bytes(), user.as_bytes()])
    }
}

impl Collectable for PostLike {
    fn get_collection_name() -> &'static str {
        "post_like"
    }
}

impl Identifiable for PostLike {
    fn get_id(&self) -> Uuid {
        self.id
    }
}

/// Registers a view of the post. Returns the post's view count and whether
/// this call counted as a new view; repeated views from the same address
/// and agent are ignored, and so are views of unpublished posts.
pub fn create_post_view(
    db: &Database,
    post: PostId,
    ip: &str,
    user_agent: &str,
    user: Option<UserId>,
) -> Result<(bool, u64)> {
    let key = PostView::key(post, ip, user_agent);
    let out = db.transaction(
        &[Post::get_collection_name(), PostView::get_collection_name()],
        |tx| {
            let mut p = tx.get::<Post>(post)?;
            if !p.published || tx.contains::<PostView>(key)? {
                return Ok((false, p.view_count));
            }
            tx.set(&PostView {
                id: key,
                post,
                ip: ip.to_string(),
                user_agent: user_agent.to_string(),
                user,
                created_at: Utc::now(),
            })?;
            p.view_count += 1;
            tx.set(&p)?;
            Ok((true, p.view_count))
        },
    )?;
    if out.0 {
        tracing::debug!(post = %post, "counted view from {}", ip);
    }
    Ok(out)
}

/// Likes the post if the user hasn't yet, unlikes it otherwise. Returns the
/// resulting like state and count.
pub fn toggle_post_like(db: &Database, post: PostId, user: UserId) -> Result<(bool, u64)> {
    let key = PostLike::key(post, user);
    let out = db.transaction(
        &[Post::get_collection_name(), PostLike::get_collection_name()],
        |tx| {
            let mut p = tx.get::<Post>(post)?;
            let liked = if tx.remove::<PostLike>(key)? {
                p.like_count = p.like_count.saturating_sub(1);
                false
            } else {
                if !p.published {
                    return Err(
                        ErrorKind::BadInput("only published posts can be liked".to_string()).into(),
                    );
                }
                tx.set(&PostLike {
                    id: key,
                    post,
                    user,
                    created_at: Utc::now(),
                })?;
                p.like_count += 1;
                true
            };
            tx.set(&p)?;
            Ok((liked, p.like_count))
        },
    )?;
    tracing::debug!(post = %post, user = %user, liked = out.0, "toggled post like");
    Ok(out)
}

pub fn check_user_liked_post(db: &Database, post: PostId, user: UserId) -> Result<bool> {
    db.contains::<PostLike>(PostLike::key(post, user))
}
