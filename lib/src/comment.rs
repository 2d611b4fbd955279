//! Post comments.
//!
//! Comments nest one level deep: a comment either sits at the top of a
//! post's thread or replies to such a top-level comment. Moderation is a
//! flat status that an admin can set to any value at any time.

use chrono::{DateTime, Duration, Utc};
use fnv::FnvHashMap;
use uuid::Uuid;

use crate::db::{derived_key, Collectable, Database, Identifiable};
use crate::error::{Error, ErrorKind, Result};
use crate::post::{Post, PostId};
use crate::table::{matches_search, paginate, Page, PageQuery};
use crate::{user, Config, User, UserId};

pub type CommentId = Uuid;

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum CommentStatus {
    #[default]
    Approved,
    Pending,
    Rejected,
    Spam,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post: PostId,

    /// Owner of the comment is the user who published it.
    pub author: UserId,

    /// Top-level comment this one replies to.
    pub parent: Option<CommentId>,

    /// Content is just plain text.
    pub content: String,

    pub status: CommentStatus,
    pub like_count: u64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Comment {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            post: Uuid::nil(),
            author: Uuid::nil(),
            parent: None,
            content: "".to_string(),
            status: CommentStatus::Approved,
            like_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Collectable for Comment {
    fn get_collection_name() -> &'static str {
        "comment"
    }
}

impl Identifiable for Comment {
    fn get_id(&self) -> Uuid {
        self.id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommentLike {
    pub id: Uuid,
    pub comment: CommentId,
    pub user: UserId,
    pub created_at: DateTime<Utc>,
}

impl CommentLike {
    pub fn key(comment: CommentId, user: UserId) -> Uuid {
        derived_key(&[comment.as_bytes(), user.as_bytes()])
    }
}

impl Collectable for CommentLike {
    fn get_collection_name() -> &'static str {
        "comment_like"
    }
}

impl Identifiable for CommentLike {
    fn get_id(&self) -> Uuid {
        self.id
    }
}

/// Comment together with what clients display about its author.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author_name: String,
    pub author_image: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: CommentView,
    /// Oldest first.
    pub replies: Vec<CommentView>,
}

fn validate_content(content: &str, config: &Config) -> Result<String> {
    let content = content.trim();
    let len = content.chars().count();
    if len == 0 {
        return Err(ErrorKind::BadInput("comment is empty".to_string()).into());
    }
    if len > config.comments.max_length {
        return Err(ErrorKind::BadInput(format!(
            "comment too long, at most {} characters allowed",
            config.comments.max_length
        ))
        .into());
    }
    Ok(content.to_string())
}

/// Fails if the author commented less than the configured interval ago.
fn check_rate_limit(db: &Database, config: &Config, author: &User, now: DateTime<Utc>) -> Result<()> {
    let Some(rate_limit_secs) = config.comments.rate_limit else {
        return Ok(());
    };
    if author.is_admin {
        return Ok(());
    }
    let last = db
        .get_collection::<Comment>()?
        .into_iter()
        .filter(|c| c.author == author.id)
        .map(|c| c.created_at)
        .max();
    if let Some(last) = last {
        let next_allowed = last + Duration::seconds(rate_limit_secs as i64);
        if next_allowed > now {
            return Err(ErrorKind::RateLimited((next_allowed - now).num_seconds().max(1)).into());
        }
    }
    Ok(())
}

/// Adds a comment (or a reply, when `parent` is given) to a post.
pub fn create_comment(
    db: &Database,
    config: &Config,
    author: &User,
    post: PostId,
    content: &str,
    parent: Option<CommentId>,
) -> Result<Comment> {
    let content = validate_content(content, config)?;
    let now = Utc::now();
    check_rate_limit(db, config, author, now)?;

    let status = if !author.is_admin && config.comments.moderation {
        CommentStatus::Pending
    } else {
        CommentStatus::Approved
    };
    let comment = Comment {
        post,
        author: author.id,
        parent,
        content,
        status,
        created_at: now,
        updated_at: now,
        ..Default::default()
    };

    db.transaction(
        &[Post::get_collection_name(), Comment::get_collection_name()],
        |tx| {
            let target = tx.get::<Post>(post)?;
            if !target.published && !author.is_admin && target.author != author.id {
                return Err(ErrorKind::not_found("post", post).into());
            }
            if let Some(parent) = parent {
                let parent = tx.get::<Comment>(parent)?;
                if parent.post != post {
                    return Err(ErrorKind::BadInput(
                        "parent comment belongs to another post".to_string(),
                    )
                    .into());
                }
                if parent.parent.is_some() {
                    return Err(ErrorKind::BadInput(
                        "replies can only be made to top-level comments".to_string(),
                    )
                    .into());
                }
            }
            tx.set(&comment)
        },
    )?;

    tracing::info!(comment = %comment.id, post = %post, status = %comment.status, "new comment");
    Ok(comment)
}

/// Checks whether `user` may edit or delete `comment`.
pub fn ensure_can_edit(user: &User, comment: &Comment) -> Result<()> {
    if user.is_admin || user.id == comment.author {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::Forbidden).with_user(user.id))
    }
}

/// Replaces the comment text. Only its author or an admin may do so.
pub fn update_comment(
    db: &Database,
    config: &Config,
    id: CommentId,
    editor: &User,
    content: &str,
) -> Result<Comment> {
    let content = validate_content(content, config)?;
    db.transaction(&[Comment::get_collection_name()], |tx| {
        let mut comment = tx.get::<Comment>(id)?;
        ensure_can_edit(editor, &comment)?;
        comment.content = content.clone();
        comment.updated_at = Utc::now();
        tx.set(&comment)?;
        Ok(comment)
    })
}

/// Deletes the comment along with its replies and all their likes.
///
/// The comment itself goes first. Replying to it and liking it both read it
/// inside their transaction, so after that the replies and likes to sweep
/// can only shrink.
pub fn delete_comment(db: &Database, id: CommentId) -> Result<()> {
    db.transaction(&[Comment::get_collection_name()], |tx| {
        tx.get::<Comment>(id)?;
        tx.remove::<Comment>(id)
    })?;

    let mut doomed = vec![id];
    let replies = db
        .get_collection::<Comment>()?
        .into_iter()
        .filter(|c| c.parent == Some(id))
        .map(|c| c.id)
        .collect::<Vec<_>>();
    remove_comments(db, &replies)?;
    doomed.extend(replies);
    let likes = db.remove_where::<CommentLike>(|l| doomed.contains(&l.comment))?;

    tracing::info!(comment = %id, replies = doomed.len() - 1, likes, "deleted comment");
    Ok(())
}

fn remove_comments(db: &Database, ids: &[CommentId]) -> Result<()> {
    db.transaction(&[Comment::get_collection_name()], |tx| {
        for id in ids {
            tx.remove::<Comment>(*id)?;
        }
        Ok(())
    })
}

/// Removes the comments of a deleted post and their likes. Returns the
/// number of comments removed.
pub(crate) fn purge_post_comments(db: &Database, post: PostId) -> Result<usize> {
    let comments = db
        .get_collection::<Comment>()?
        .into_iter()
        .filter(|c| c.post == post)
        .map(|c| c.id)
        .collect::<Vec<_>>();
    remove_comments(db, &comments)?;
    db.remove_where::<CommentLike>(|l| comments.contains(&l.comment))?;
    Ok(comments.len())
}

/// Sets the moderation status. Any status may be set from any other.
pub fn update_comment_status(db: &Database, id: CommentId, status: CommentStatus) -> Result<Comment> {
    let comment = db.transaction(&[Comment::get_collection_name()], |tx| {
        let mut comment = tx.get::<Comment>(id)?;
        comment.status = status;
        comment.updated_at = Utc::now();
        tx.set(&comment)?;
        Ok(comment)
    })?;
    tracing::info!(comment = %id, "comment status set to {}", status);
    Ok(comment)
}

fn view(users: &FnvHashMap<Uuid, User>, comment: Comment) -> CommentView {
    let author = users.get(&comment.author);
    CommentView {
        author_name: author.map(user::display_name).unwrap_or_default(),
        author_image: author.and_then(|a| a.image.clone()),
        comment,
    }
}

fn users_by_id(db: &Database) -> Result<FnvHashMap<Uuid, User>> {
    Ok(db
        .get_collection::<User>()?
        .into_iter()
        .map(|u| (u.id, u))
        .collect())
}

/// Threads of a post: top-level comments with their replies, both oldest
/// first.
///
/// Only approved comments are included unless `include_all` is set. Replies
/// to a hidden comment are hidden with it.
pub fn post_comments(db: &Database, post: PostId, include_all: bool) -> Result<Vec<CommentThread>> {
    let users = users_by_id(db)?;
    let mut comments = db
        .get_collection::<Comment>()?
        .into_iter()
        .filter(|c| c.post == post)
        .filter(|c| include_all || c.status == CommentStatus::Approved)
        .collect::<Vec<_>>();
    comments.sort_by_key(|c| c.created_at);

    let (top, replies): (Vec<_>, Vec<_>) = comments.into_iter().partition(|c| c.parent.is_none());
    let mut by_parent: FnvHashMap<CommentId, Vec<CommentView>> = FnvHashMap::default();
    for reply in replies {
        if let Some(parent) = reply.parent {
            by_parent.entry(parent).or_default().push(view(&users, reply));
        }
    }

    Ok(top
        .into_iter()
        .map(|c| CommentThread {
            replies: by_parent.remove(&c.id).unwrap_or_default(),
            comment: view(&users, c),
        })
        .collect())
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentFilter {
    pub status: Option<CommentStatus>,
    pub post: Option<PostId>,
    pub author: Option<UserId>,
    /// Matched against the comment text and author name.
    pub search: Option<String>,
}

/// Moderation listing, newest first.
pub fn list_comments(db: &Database, filter: &CommentFilter, page: PageQuery) -> Result<Page<CommentView>> {
    let users = users_by_id(db)?;
    let mut comments = db
        .get_collection::<Comment>()?
        .into_iter()
        .filter(|c| filter.status.map(|s| c.status == s).unwrap_or(true))
        .filter(|c| filter.post.map(|p| c.post == p).unwrap_or(true))
        .filter(|c| filter.author.map(|a| c.author == a).unwrap_or(true))
        .map(|c| view(&users, c))
        .filter(|v| match &filter.search {
            Some(search) => matches_search(search, &[v.comment.content.as_str(), v.author_name.as_str()]),
            None => true,
        })
        .collect::<Vec<_>>();
    comments.sort_by(|a, b| b.comment.created_at.cmp(&a.comment.created_at));
    Ok(paginate(comments, page))
}

/// Likes the comment if the user hasn't yet, unlikes it otherwise. Returns
/// the resulting like state and count.
///
/// New likes need an approved comment on a published post. Taking back a
/// like is always possible.
pub fn toggle_comment_like(db: &Database, comment: CommentId, user: UserId) -> Result<(bool, u64)> {
    let key = CommentLike::key(comment, user);
    db.transaction(
        &[
            Post::get_collection_name(),
            Comment::get_collection_name(),
            CommentLike::get_collection_name(),
        ],
        |tx| {
            let mut c = tx.get::<Comment>(comment)?;
            let liked = if tx.remove::<CommentLike>(key)? {
                c.like_count = c.like_count.saturating_sub(1);
                false
            } else {
                let published = tx.find::<Post>(c.post)?.map(|p| p.published).unwrap_or(false);
                if !published || c.status != CommentStatus::Approved {
                    return Err(ErrorKind::BadInput(
                        "only approved comments on published posts can be liked".to_string(),
                    )
                    .into());
                }
                tx.set(&CommentLike {
                    id: key,
                    comment,
                    user,
                    created_at: Utc::now(),
                })?;
                c.like_count += 1;
                true
            };
            tx.set(&c)?;
            Ok((liked, c.like_count))
        },
    )
}

pub fn check_user_liked_comment(db: &Database, comment: CommentId, user: UserId) -> Result<bool> {
    db.contains::<CommentLike>(CommentLike::key(comment, user))
}
