//! Paths of the JSON API.

pub const API: &str = "/api";

pub const POSTS: &str = "/api/posts";
pub const POST: &str = "/api/posts/:id";
pub const POST_BY_SLUG: &str = "/api/posts/slug/:slug";
pub const POST_STATUS: &str = "/api/posts/:id/status";
pub const POST_FEATURED: &str = "/api/posts/:id/featured";
pub const POST_RELATED: &str = "/api/posts/:id/related";
pub const POST_VIEW: &str = "/api/posts/:id/view";
pub const POST_LIKE: &str = "/api/posts/:id/like";
pub const POST_SHARE: &str = "/api/posts/:id/share";
pub const POST_SEO: &str = "/api/posts/:id/seo";
pub const POST_COMMENTS: &str = "/api/posts/:id/comments";

pub const COMMENTS: &str = "/api/comments";
pub const COMMENT: &str = "/api/comments/:id";
pub const COMMENT_STATUS: &str = "/api/comments/:id/status";
pub const COMMENT_LIKE: &str = "/api/comments/:id/like";

pub const CATEGORIES: &str = "/api/categories";
pub const CATEGORY: &str = "/api/categories/:id";
pub const TAGS: &str = "/api/tags";
pub const TAG: &str = "/api/tags/:id";

pub const STATS: &str = "/api/stats";
pub const CONTACT: &str = "/api/contact";
