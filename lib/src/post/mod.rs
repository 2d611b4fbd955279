//! Blog posts.
//!
//! # Publication state
//!
//! `published` mirrors `status == Published` at all times. The first time a
//! post becomes published `published_at` is stamped, and from then on it is
//! kept as is: republishing an archived post, editing it or toggling its
//! status again never moves the original publication date.
//!
//! # Slugs
//!
//! Slugs are unique across posts. Uniqueness is enforced through the
//! `post_slug` index tree which is updated in the same transaction as the
//! post itself.

pub mod engagement;
pub mod listing;

pub use engagement::{check_user_liked_post, create_post_view, toggle_post_like, PostLike, PostView};
pub use listing::{list_posts, post_details, related_posts, PostDetails, PostFilter, PostSort, PostSortField};

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;
use validator::ValidateLength;

use crate::comment;
use crate::db::{Collectable, Database, Identifiable, Tx, TxResult};
use crate::error::{ErrorKind, Result};
use crate::seo::PostSeo;
use crate::taxonomy::{self, Category, CategoryId, PostTag, Tag, TagId, Term};
use crate::util::resolve_slug;
use crate::{content, Config, User, UserId};

pub type PostId = Uuid;

/// Name of the index tree mapping slugs to post ids.
pub const SLUG_INDEX: &str = "post_slug";

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
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    /// Waiting for `scheduled_at` to pass, see [`publish_scheduled`].
    Scheduled,
    Archived,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Post {
    pub id: PostId,
    pub author: UserId,

    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    /// Rich text document as produced by the editor.
    pub content: Value,
    pub cover_image: Option<String>,

    pub status: PostStatus,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub featured: bool,

    /// Estimated reading time in minutes.
    pub reading_time: u32,

    pub share_count: u64,
    pub view_count: u64,
    pub like_count: u64,

    pub category: Option<CategoryId>,
    /// Tags linked through `PostTag`, sorted.
    pub tag_ids: Vec<TagId>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Post {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author: Uuid::nil(),
            title: "".to_string(),
            slug: "".to_string(),
            excerpt: None,
            content: Value::Null,
            cover_image: None,
            status: PostStatus::Draft,
            published: false,
            published_at: None,
            scheduled_at: None,
            featured: false,
            reading_time: 1,
            share_count: 0,
            view_count: 0,
            like_count: 0,
            category: None,
            tag_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Collectable for Post {
    fn get_collection_name() -> &'static str {
        "post"
    }
}

impl Identifiable for Post {
    fn get_id(&self) -> Uuid {
        self.id
    }
}

impl Post {
    /// Moves the post into `status`, keeping the publication fields
    /// consistent.
    ///
    /// Scheduling requires a time, either passed in or already present on
    /// the post. Leaving the scheduled state drops the schedule.
    pub fn set_status(
        &mut self,
        status: PostStatus,
        scheduled_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if status == PostStatus::Scheduled {
            let at = scheduled_at.or(self.scheduled_at).ok_or_else(|| {
                ErrorKind::BadInput("scheduling a post requires scheduled_at".to_string())
            })?;
            self.scheduled_at = Some(at);
        } else {
            self.scheduled_at = None;
        }

        self.status = status;
        self.published = status == PostStatus::Published;
        if self.published && self.published_at.is_none() {
            self.published_at = Some(now);
        }
        Ok(())
    }

    pub fn is_visible(&self) -> bool {
        self.published
    }
}

/// Payload for creating and updating posts.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostInput {
    pub title: String,
    /// Derived from the title when absent.
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Value,
    pub cover_image: Option<String>,
    /// Defaults to draft on creation, keeps the current status on update.
    pub status: Option<PostStatus>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub category: Option<CategoryId>,
    pub tags: Vec<TagId>,
    /// Unset keeps the current flag on update and means not featured on
    /// creation.
    pub featured: Option<bool>,
}

impl PostInput {
    pub fn new(title: impl Into<String>, content: Value) -> Self {
        Self {
            title: title.into(),
            content,
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(String, String)> {
        let title = self.title.trim().to_string();
        if !title.validate_length(Some(1), Some(200), None) {
            return Err(ErrorKind::BadInput("title must be 1 to 200 characters".to_string()).into());
        }
        if let Some(excerpt) = &self.excerpt {
            if !excerpt.validate_length(None, Some(500), None) {
                return Err(
                    ErrorKind::BadInput("excerpt must be at most 500 characters".to_string()).into(),
                );
            }
        }
        let slug = resolve_slug(self.slug.as_deref(), &title)?;
        Ok((title, slug))
    }

    fn tags(&self) -> Vec<TagId> {
        let mut tags = self.tags.clone();
        tags.sort();
        tags.dedup();
        tags
    }
}

/// Collections written when creating or editing a post.
fn write_collections() -> [&'static str; 7] {
    [
        Post::get_collection_name(),
        SLUG_INDEX,
        PostTag::get_collection_name(),
        Tag::get_collection_name(),
        Tag::REFS,
        Category::get_collection_name(),
        Category::REFS,
    ]
}

/// Claims `slug` for `post` in the slug index, failing if another post holds
/// it.
fn claim_slug(tx: &Tx, slug: &str, post: PostId) -> TxResult<()> {
    if tx.claim(SLUG_INDEX, slug.as_bytes(), post)? {
        Ok(())
    } else {
        Err(ErrorKind::SlugInUse(slug.to_string()).into())
    }
}

/// Creates a new post authored by `author`.
pub fn create_post(db: &Database, config: &Config, author: &User, input: PostInput) -> Result<Post> {
    let (title, slug) = input.validate()?;
    let now = Utc::now();

    let mut post = Post {
        author: author.id,
        title,
        slug,
        excerpt: input.excerpt.clone().filter(|e| !e.trim().is_empty()),
        reading_time: content::reading_time(&input.content, config.posts.words_per_minute),
        content: input.content.clone(),
        cover_image: input.cover_image.clone(),
        featured: input.featured.unwrap_or(false),
        category: input.category,
        tag_ids: input.tags(),
        created_at: now,
        updated_at: now,
        ..Default::default()
    };
    post.set_status(
        input.status.unwrap_or_default(),
        input.scheduled_at,
        now,
    )?;

    db.transaction(&write_collections(), |tx| {
        taxonomy::refile_category(tx, None, post.category)?;
        claim_slug(tx, &post.slug, post.id)?;
        taxonomy::relink_tags(tx, post.id, &[], &post.tag_ids)?;
        tx.set(&post)
    })?;

    tracing::info!(post = %post.id, author = %author.id, "created post {}", post.slug);
    Ok(post)
}

/// Replaces the editable fields of a post.
///
/// Keeping the post's own slug is fine, taking another post's slug fails.
/// Status and the featured flag are only changed when the input carries
/// them.
pub fn update_post(db: &Database, config: &Config, id: PostId, input: PostInput) -> Result<Post> {
    let (title, slug) = input.validate()?;
    let tags = input.tags();
    let reading_time = content::reading_time(&input.content, config.posts.words_per_minute);

    let post = db.transaction(&write_collections(), |tx| {
        let mut post = tx.get::<Post>(id)?;
        let now = Utc::now();

        taxonomy::refile_category(tx, post.category, input.category)?;
        taxonomy::relink_tags(tx, post.id, &post.tag_ids, &tags)?;
        if post.slug != slug {
            claim_slug(tx, &slug, post.id)?;
            tx.remove_raw(SLUG_INDEX, post.slug.as_bytes())?;
        }

        post.title = title.clone();
        post.slug = slug.clone();
        post.excerpt = input.excerpt.clone().filter(|e| !e.trim().is_empty());
        post.content = input.content.clone();
        post.cover_image = input.cover_image.clone();
        post.category = input.category;
        post.tag_ids = tags.clone();
        if let Some(featured) = input.featured {
            post.featured = featured;
        }
        post.reading_time = reading_time;
        if let Some(status) = input.status {
            post.set_status(status, input.scheduled_at, now)?;
        }
        post.updated_at = now;
        tx.set(&post)?;
        Ok(post)
    })?;

    tracing::info!(post = %post.id, "updated post {}", post.slug);
    Ok(post)
}

/// Moves a post to another status.
pub fn update_post_status(
    db: &Database,
    id: PostId,
    status: PostStatus,
    scheduled_at: Option<DateTime<Utc>>,
) -> Result<Post> {
    let post = db.transaction(&[Post::get_collection_name()], |tx| {
        let mut post = tx.get::<Post>(id)?;
        let now = Utc::now();
        post.set_status(status, scheduled_at, now)?;
        post.updated_at = now;
        tx.set(&post)?;
        Ok(post)
    })?;
    tracing::info!(post = %post.id, "post status set to {}", post.status);
    Ok(post)
}

pub fn toggle_featured(db: &Database, id: PostId) -> Result<Post> {
    db.transaction(&[Post::get_collection_name()], |tx| {
        let mut post = tx.get::<Post>(id)?;
        post.featured = !post.featured;
        post.updated_at = Utc::now();
        tx.set(&post)?;
        Ok(post)
    })
}

pub fn get_post(db: &Database, id: PostId) -> Result<Post> {
    db.get::<Post>(id)
}

pub fn get_post_by_slug(db: &Database, slug: &str) -> Result<Post> {
    let id = db
        .get_raw_at(SLUG_INDEX, slug.as_bytes())?
        .ok_or_else(|| ErrorKind::not_found("post", slug))?;
    db.get::<Post>(Uuid::from_slice(&id)?)
}

/// Checks whether `user` may edit or delete `post`.
pub fn ensure_can_edit(user: &User, post: &Post) -> Result<()> {
    if user.is_admin || user.id == post.author {
        Ok(())
    } else {
        Err(crate::Error::new(ErrorKind::Forbidden).with_user(user.id))
    }
}

/// Deletes a post together with everything hanging off it.
///
/// The post row, its slug, SEO record, tag links and term references go
/// first, in one transaction. Every write that attaches something to a post
/// reads the post inside its own transaction, so once it is gone nothing new
/// can point at it. Views, likes and comments already there are swept
/// afterwards.
pub fn delete_post(db: &Database, id: PostId) -> Result<()> {
    let post = db.transaction(
        &[
            Post::get_collection_name(),
            SLUG_INDEX,
            PostSeo::get_collection_name(),
            PostTag::get_collection_name(),
            Tag::REFS,
            Category::REFS,
        ],
        |tx| {
            let post = tx.get::<Post>(id)?;
            tx.remove::<Post>(id)?;
            tx.remove_raw(SLUG_INDEX, post.slug.as_bytes())?;
            tx.remove::<PostSeo>(id)?;
            if let Some(category) = post.category {
                taxonomy::drop_ref::<Category>(tx, category)?;
            }
            for tag in &post.tag_ids {
                tx.remove::<PostTag>(PostTag::key(id, *tag))?;
                taxonomy::drop_ref::<Tag>(tx, *tag)?;
            }
            Ok(post)
        },
    )?;

    let views = db.remove_where::<PostView>(|v| v.post == id)?;
    let likes = db.remove_where::<PostLike>(|l| l.post == id)?;
    let comments = comment::purge_post_comments(db, id)?;

    tracing::info!(
        post = %id,
        views,
        likes,
        comments,
        "deleted post {}",
        post.slug
    );
    Ok(())
}

/// Publishes every scheduled post whose time has come. Returns the ids of
/// the posts that got published.
///
/// The publication date of such posts is their scheduled time rather than
/// the time this ran.
pub fn publish_scheduled(db: &Database, now: DateTime<Utc>) -> Result<Vec<PostId>> {
    let due = db
        .get_collection::<Post>()?
        .into_iter()
        .filter(|p| p.status == PostStatus::Scheduled)
        .filter(|p| p.scheduled_at.map(|at| at <= now).unwrap_or(false))
        .map(|p| p.id)
        .collect::<Vec<_>>();

    let mut published = Vec::new();
    for id in due {
        let promoted = db.transaction(&[Post::get_collection_name()], |tx| {
            let mut post = match tx.find::<Post>(id)? {
                Some(post) => post,
                None => return Ok(false),
            };
            // re-check, it might have been rescheduled in the meantime
            let at = match post.scheduled_at {
                Some(at) if post.status == PostStatus::Scheduled && at <= now => at,
                _ => return Ok(false),
            };
            post.set_status(PostStatus::Published, None, at)?;
            post.updated_at = now;
            tx.set(&post)?;
            Ok(true)
        })?;
        if promoted {
            tracing::info!(post = %id, "published scheduled post");
            published.push(id);
        }
    }
    Ok(published)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn publishing_stamps_date_once() -> Result<()> {
        let mut post = Post::default();
        let first = Utc::now() - Duration::days(3);
        post.set_status(PostStatus::Published, None, first)?;
        assert!(post.published);
        assert_eq!(post.published_at, Some(first));

        post.set_status(PostStatus::Archived, None, Utc::now())?;
        assert!(!post.published);
        assert_eq!(post.published_at, Some(first));

        post.set_status(PostStatus::Published, None, Utc::now())?;
        assert_eq!(post.published_at, Some(first));
        Ok(())
    }

    #[test]
    fn scheduling_requires_time() {
        let mut post = Post::default();
        let err = post
            .set_status(PostStatus::Scheduled, None, Utc::now())
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::BadInput(_)));
        assert_eq!(post.status, PostStatus::Draft);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("published".parse::<PostStatus>().ok(), Some(PostStatus::Published));
        assert_eq!(PostStatus::Archived.to_string(), "ARCHIVED");
    }
}
