use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Extension, Json};
use http::header::USER_AGENT;
use uuid::Uuid;

use crate::api::{CommentRequest, LikeResponse, PostStatusRequest, ShareRequest, ViewResponse};
use crate::comment;
use crate::post::{self as posts, Post, PostFilter, PostInput, PostSort, PostSortField, PostStatus};
use crate::seo::{self, PostSeo, ResolvedSeo};
use crate::share;
use crate::table::{PageQuery, SortOrder};
use crate::util::client_ip;
use crate::{routes, ErrorKind, Result, User as RawUser};

use super::{ConfigExt, DbExt, OptionalUser, Router, User};

pub fn router() -> Router {
    Router::new()
        .route(routes::POSTS, get(list_posts).post(create_post))
        .route(routes::POST_BY_SLUG, get(get_post_by_slug))
        .route(
            routes::POST,
            get(get_post).put(update_post).delete(delete_post),
        )
        .route(routes::POST_STATUS, patch(update_status))
        .route(routes::POST_FEATURED, patch(toggle_featured))
        .route(routes::POST_RELATED, get(related_posts))
        .route(routes::POST_VIEW, post(record_view))
        .route(routes::POST_LIKE, get(check_like).post(toggle_like))
        .route(routes::POST_SHARE, post(share_post))
        .route(
            routes::POST_SEO,
            get(get_seo).put(upsert_seo).delete(delete_seo),
        )
        .route(routes::POST_COMMENTS, get(list_comments).post(add_comment))
}

/// Post listing parameters, as found in the query string.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub status: Option<PostStatus>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub author: Option<Uuid>,
    pub featured: Option<bool>,
    pub search: Option<String>,
    pub sort: Option<PostSortField>,
    pub order: Option<SortOrder>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// Lists posts. Only admins see unpublished posts of others, authors see
/// their own when filtering by themselves.
pub async fn list_posts(
    user: OptionalUser,
    Extension(db): DbExt,
    Extension(config): ConfigExt,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    let own = query.author.is_some() && query.author == user.id();
    let filter = PostFilter {
        status: query.status,
        category: query.category,
        tag: query.tag,
        author: query.author,
        featured: query.featured,
        search: query.search,
        published_only: !(user.is_admin() || own),
    };
    let sort = PostSort {
        sort: query.sort.unwrap_or_default(),
        order: query.order.unwrap_or_default(),
    };
    let page = PageQuery::new(
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(config.posts.per_page),
    );
    Ok(Json(posts::list_posts(&db, &filter, sort, page)?))
}

/// Featuring a post is up to admins, whatever the payload says.
fn strip_privileged(user: &User, input: &mut PostInput) {
    if !user.is_admin {
        input.featured = None;
    }
}

pub async fn create_post(
    user: User,
    Extension(db): DbExt,
    Extension(config): ConfigExt,
    Json(mut input): Json<PostInput>,
) -> Result<impl IntoResponse> {
    strip_privileged(&user, &mut input);
    let post = posts::create_post(&db, &config, &user, input)?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// Unpublished posts are only visible to their author and admins. Everyone
/// else gets a not found.
pub(super) fn ensure_visible(viewer: Option<&RawUser>, post: &Post) -> Result<()> {
    let privileged = viewer
        .map(|u| u.is_admin || u.id == post.author)
        .unwrap_or(false);
    if post.is_visible() || privileged {
        Ok(())
    } else {
        Err(ErrorKind::not_found("post", post.id).into())
    }
}

pub async fn get_post(
    Path(id): Path<Uuid>,
    user: OptionalUser,
    Extension(db): DbExt,
) -> Result<impl IntoResponse> {
    let post = posts::get_post(&db, id)?;
    ensure_visible(user.0.as_deref(), &post)?;
    Ok(Json(posts::post_details(&db, post)?))
}

pub async fn get_post_by_slug(
    Path(slug): Path<String>,
    user: OptionalUser,
    Extension(db): DbExt,
) -> Result<impl IntoResponse> {
    let post = posts::get_post_by_slug(&db, &slug)?;
    ensure_visible(user.0.as_deref(), &post)?;
    Ok(Json(posts::post_details(&db, post)?))
}

pub async fn update_post(
    Path(id): Path<Uuid>,
    user: User,
    Extension(db): DbExt,
    Extension(config): ConfigExt,
    Json(mut input): Json<PostInput>,
) -> Result<impl IntoResponse> {
    posts::ensure_can_edit(&user, &posts::get_post(&db, id)?)?;
    strip_privileged(&user, &mut input);
    Ok(Json(posts::update_post(&db, &config, id, input)?))
}

pub async fn delete_post(
    Path(id): Path<Uuid>,
    user: User,
    Extension(db): DbExt,
) -> Result<impl IntoResponse> {
    posts::ensure_can_edit(&user, &posts::get_post(&db, id)?)?;
    posts::delete_post(&db, id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_status(
    Path(id): Path<Uuid>,
    user: User,
    Extension(db): DbExt,
    Json(request): Json<PostStatusRequest>,
) -> Result<impl IntoResponse> {
    posts::ensure_can_edit(&user, &posts::get_post(&db, id)?)?;
    Ok(Json(posts::update_post_status(
        &db,
        id,
        request.status,
        request.scheduled_at,
    )?))
}

pub async fn toggle_featured(
    Path(id): Path<Uuid>,
    user: User,
    Extension(db): DbExt,
) -> Result<impl IntoResponse> {
    user.ensure_admin()?;
    Ok(Json(posts::toggle_featured(&db, id)?))
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelatedQuery {
    pub limit: Option<usize>,
}

pub async fn related_posts(
    Path(id): Path<Uuid>,
    user: OptionalUser,
    Extension(db): DbExt,
    Query(query): Query<RelatedQuery>,
) -> Result<impl IntoResponse> {
    ensure_visible(user.0.as_deref(), &posts::get_post(&db, id)?)?;
    let limit = query.limit.unwrap_or(3).clamp(1, 10);
    Ok(Json(posts::related_posts(&db, id, limit)?))
}

pub async fn record_view(
    Path(id): Path<Uuid>,
    user: OptionalUser,
    Extension(db): DbExt,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> Result<impl IntoResponse> {
    ensure_visible(user.0.as_deref(), &posts::get_post(&db, id)?)?;
    let ip = client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    let (counted, views) = posts::create_post_view(&db, id, &ip, user_agent, user.id())?;
    Ok(Json(ViewResponse { counted, views }))
}

pub async fn check_like(
    Path(id): Path<Uuid>,
    user: User,
    Extension(db): DbExt,
) -> Result<impl IntoResponse> {
    let post = posts::get_post(&db, id)?;
    ensure_visible(Some(&user.0), &post)?;
    Ok(Json(LikeResponse {
        liked: posts::check_user_liked_post(&db, id, user.id)?,
        likes: post.like_count,
    }))
}

pub async fn toggle_like(
    Path(id): Path<Uuid>,
    user: User,
    Extension(db): DbExt,
) -> Result<impl IntoResponse> {
    ensure_visible(Some(&user.0), &posts::get_post(&db, id)?)?;
    let (liked, likes) = posts::toggle_post_like(&db, id, user.id)?;
    Ok(Json(LikeResponse { liked, likes }))
}

pub async fn share_post(
    Path(id): Path<Uuid>,
    Extension(db): DbExt,
    Extension(config): ConfigExt,
    Json(request): Json<ShareRequest>,
) -> Result<impl IntoResponse> {
    Ok(Json(share::share_post(&db, &config, id, request.platform)?))
}

/// Stored SEO record next to the metadata actually rendered.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeoResponse {
    pub seo: Option<PostSeo>,
    pub resolved: ResolvedSeo,
}

pub async fn get_seo(
    Path(id): Path<Uuid>,
    user: OptionalUser,
    Extension(db): DbExt,
    Extension(config): ConfigExt,
) -> Result<impl IntoResponse> {
    let post = posts::get_post(&db, id)?;
    ensure_visible(user.0.as_deref(), &post)?;
    Ok(Json(SeoResponse {
        seo: seo::get_post_seo(&db, id)?,
        resolved: seo::resolve_post_seo(&db, &config, &post)?,
    }))
}

pub async fn upsert_seo(
    Path(id): Path<Uuid>,
    user: User,
    Extension(db): DbExt,
    Json(input): Json<PostSeo>,
) -> Result<impl IntoResponse> {
    posts::ensure_can_edit(&user, &posts::get_post(&db, id)?)?;
    Ok(Json(seo::upsert_post_seo(&db, id, input)?))
}

pub async fn delete_seo(
    Path(id): Path<Uuid>,
    user: User,
    Extension(db): DbExt,
) -> Result<impl IntoResponse> {
    posts::ensure_can_edit(&user, &posts::get_post(&db, id)?)?;
    if !seo::delete_post_seo(&db, id)? {
        return Err(ErrorKind::not_found("seo for post", id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadQuery {
    /// Include comments of every status. Honored for admins only.
    pub all: bool,
}

pub async fn list_comments(
    Path(id): Path<Uuid>,
    user: OptionalUser,
    Extension(db): DbExt,
    Query(query): Query<ThreadQuery>,
) -> Result<impl IntoResponse> {
    let post = posts::get_post(&db, id)?;
    ensure_visible(user.0.as_deref(), &post)?;
    let include_all = query.all && user.is_admin();
    Ok(Json(comment::post_comments(&db, id, include_all)?))
}

pub async fn add_comment(
    Path(id): Path<Uuid>,
    user: User,
    Extension(db): DbExt,
    Extension(config): ConfigExt,
    Json(request): Json<CommentRequest>,
) -> Result<impl IntoResponse> {
    let comment = comment::create_comment(&db, &config, &user, id, &request.content, request.parent)?;
    Ok((StatusCode::CREATED, Json(comment)))
}
