use std::cmp::Ordering;

use fnv::FnvHashMap;
use uuid::Uuid;

use crate::comment::{Comment, CommentStatus};
use crate::db::Database;
use crate::error::Result;
use crate::post::{Post, PostId, PostStatus};
use crate::table::{matches_search, paginate, Page, PageQuery, SortOrder};
use crate::taxonomy::{Category, PostTag, Tag};
use crate::{content, user, User, UserId};

/// Post filters as used by the dashboard table and the public listing.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    /// Category slug.
    pub category: Option<String>,
    /// Tag slug.
    pub tag: Option<String>,
    pub author: Option<UserId>,
    pub featured: Option<bool>,
    /// Matched against title, excerpt and body text.
    pub search: Option<String>,
    /// Restrict to published posts regardless of `status`.
    pub published_only: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostSortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    PublishedAt,
    Title,
    Views,
    Likes,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostSort {
    pub sort: PostSortField,
    pub order: SortOrder,
}

impl PostSort {
    fn compare(&self, a: &Post, b: &Post) -> Ordering {
        let ordering = match self.sort {
            PostSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            PostSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            PostSortField::PublishedAt => a.published_at.cmp(&b.published_at),
            PostSortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            PostSortField::Views => a.view_count.cmp(&b.view_count),
            PostSortField::Likes => a.like_count.cmp(&b.like_count),
        };
        // newest first among equals keeps pages stable
        self.order
            .apply(ordering)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Post with its relations resolved, as rendered by clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PostDetails {
    #[serde(flatten)]
    pub post: Post,
    pub author_name: String,
    pub category_info: Option<Category>,
    pub tags: Vec<Tag>,
    /// Approved comments, replies included.
    pub comment_count: usize,
}

/// Everything needed to resolve post relations, loaded once per listing.
struct Relations {
    users: FnvHashMap<Uuid, User>,
    categories: FnvHashMap<Uuid, Category>,
    tags: FnvHashMap<Uuid, Tag>,
    links: Vec<PostTag>,
    comment_counts: FnvHashMap<PostId, usize>,
}

impl Relations {
    fn load(db: &Database) -> Result<Self> {
        let mut comment_counts = FnvHashMap::default();
        for comment in db.get_collection::<Comment>()? {
            if comment.status == CommentStatus::Approved {
                *comment_counts.entry(comment.post).or_insert(0) += 1;
            }
        }
        Ok(Self {
            users: db
                .get_collection::<User>()?
                .into_iter()
                .map(|u| (u.id, u))
                .collect(),
            categories: db
                .get_collection::<Category>()?
                .into_iter()
                .map(|c| (c.id, c))
                .collect(),
            tags: db
                .get_collection::<Tag>()?
                .into_iter()
                .map(|t| (t.id, t))
                .collect(),
            links: db.get_collection::<PostTag>()?,
            comment_counts,
        })
    }

    fn tag_ids(&self, post: PostId) -> Vec<Uuid> {
        self.links
            .iter()
            .filter(|l| l.post == post)
            .map(|l| l.tag)
            .collect()
    }

    fn details(&self, post: Post) -> PostDetails {
        let mut tags = self
            .tag_ids(post.id)
            .iter()
            .filter_map(|id| self.tags.get(id).cloned())
            .collect::<Vec<_>>();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        PostDetails {
            author_name: self
                .users
                .get(&post.author)
                .map(user::display_name)
                .unwrap_or_default(),
            category_info: post.category.and_then(|c| self.categories.get(&c).cloned()),
            tags,
            comment_count: self.comment_counts.get(&post.id).copied().unwrap_or(0),
            post,
        }
    }

    fn matches(&self, filter: &PostFilter, post: &Post) -> bool {
        if filter.published_only && !post.published {
            return false;
        }
        if let Some(status) = filter.status {
            if post.status != status {
                return false;
            }
        }
        if let Some(author) = filter.author {
            if post.author != author {
                return false;
            }
        }
        if let Some(featured) = filter.featured {
            if post.featured != featured {
                return false;
            }
        }
        if let Some(slug) = filter.category.as_deref().filter(|s| !s.is_empty()) {
            let category = post.category.and_then(|c| self.categories.get(&c));
            if category.map(|c| c.slug.as_str()) != Some(slug) {
                return false;
            }
        }
        if let Some(slug) = filter.tag.as_deref().filter(|s| !s.is_empty()) {
            let tagged = self
                .tag_ids(post.id)
                .iter()
                .filter_map(|id| self.tags.get(id))
                .any(|t| t.slug == slug);
            if !tagged {
                return false;
            }
        }
        if let Some(search) = &filter.search {
            let text = content::plain_text(&post.content);
            if !matches_search(
                search,
                &[
                    post.title.as_str(),
                    post.excerpt.as_deref().unwrap_or_default(),
                    text.as_str(),
                ],
            ) {
                return false;
            }
        }
        true
    }
}

/// Resolves the relations of a single post.
pub fn post_details(db: &Database, post: Post) -> Result<PostDetails> {
    Ok(Relations::load(db)?.details(post))
}

/// Filters, sorts and paginates posts.
pub fn list_posts(
    db: &Database,
    filter: &PostFilter,
    sort: PostSort,
    page: PageQuery,
) -> Result<Page<PostDetails>> {
    let relations = Relations::load(db)?;
    let mut posts = db
        .get_collection::<Post>()?
        .into_iter()
        .filter(|p| relations.matches(filter, p))
        .collect::<Vec<_>>();
    posts.sort_by(|a, b| sort.compare(a, b));
    Ok(paginate(posts, page).map(|p| relations.details(p)))
}

/// Published posts related to the given one: two points per shared tag and
/// one for a shared category. Unrelated posts are left out.
pub fn related_posts(db: &Database, id: PostId, limit: usize) -> Result<Vec<PostDetails>> {
    let post = db.get::<Post>(id)?;
    let relations = Relations::load(db)?;
    let own_tags = relations.tag_ids(id);

    let mut scored = db
        .get_collection::<Post>()?
        .into_iter()
        .filter(|p| p.id != id && p.published)
        .filter_map(|p| {
            let shared = relations
                .tag_ids(p.id)
                .iter()
                .filter(|t| own_tags.contains(t))
                .count();
            let same_category = post.category.is_some() && p.category == post.category;
            let score = shared * 2 + usize::from(same_category);
            (score > 0).then_some((score, p))
        })
        .collect::<Vec<_>>();
    scored.sort_by(|(sa, a), (sb, b)| {
        sb.cmp(sa)
            .then_with(|| b.published_at.cmp(&a.published_at))
    });
    Ok(scored
        .into_iter()
        .take(limit)
        .map(|(_, p)| relations.details(p))
        .collect())
}
