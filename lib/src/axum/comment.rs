use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, put};
use axum::{Extension, Json};
use uuid::Uuid;

use crate::api::{CommentEditRequest, CommentStatusRequest, LikeResponse};
use crate::comment::{self, Comment, CommentFilter, CommentStatus};
use crate::db::Database;
use crate::post as posts;
use crate::table::PageQuery;
use crate::{routes, ErrorKind, Result};

use super::{ConfigExt, DbExt, Router, User};

pub fn router() -> Router {
    Router::new()
        .route(routes::COMMENTS, get(list_comments))
        .route(routes::COMMENT, put(update_comment).delete(delete_comment))
        .route(routes::COMMENT_STATUS, patch(update_status))
        .route(routes::COMMENT_LIKE, get(check_like).post(toggle_like))
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub status: Option<CommentStatus>,
    pub post: Option<Uuid>,
    pub author: Option<Uuid>,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// Moderation queue for admins.
pub async fn list_comments(
    user: User,
    Extension(db): DbExt,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    user.ensure_admin()?;
    let filter = CommentFilter {
        status: query.status,
        post: query.post,
        author: query.author,
        search: query.search,
    };
    let page = PageQuery::new(query.page.unwrap_or(1), query.per_page.unwrap_or(20));
    Ok(Json(comment::list_comments(&db, &filter, page)?))
}

pub async fn update_comment(
    Path(id): Path<Uuid>,
    user: User,
    Extension(db): DbExt,
    Extension(config): ConfigExt,
    Json(request): Json<CommentEditRequest>,
) -> Result<impl IntoResponse> {
    Ok(Json(comment::update_comment(
        &db,
        &config,
        id,
        &user,
        &request.content,
    )?))
}

pub async fn delete_comment(
    Path(id): Path<Uuid>,
    user: User,
    Extension(db): DbExt,
) -> Result<impl IntoResponse> {
    comment::ensure_can_edit(&user, &db.get::<Comment>(id)?)?;
    comment::delete_comment(&db, id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_status(
    Path(id): Path<Uuid>,
    user: User,
    Extension(db): DbExt,
    Json(request): Json<CommentStatusRequest>,
) -> Result<impl IntoResponse> {
    user.ensure_admin()?;
    Ok(Json(comment::update_comment_status(&db, id, request.status)?))
}

/// Comments are visible along with their post. Unapproved ones only to
/// admins and their author.
fn ensure_visible(db: &Database, user: &User, comment: &Comment) -> Result<()> {
    super::post::ensure_visible(Some(&user.0), &posts::get_post(db, comment.post)?)?;
    if comment.status == CommentStatus::Approved || user.is_admin || user.id == comment.author {
        Ok(())
    } else {
        Err(ErrorKind::not_found("comment", comment.id).into())
    }
}

pub async fn check_like(
    Path(id): Path<Uuid>,
    user: User,
    Extension(db): DbExt,
) -> Result<impl IntoResponse> {
    let comment = db.get::<Comment>(id)?;
    ensure_visible(&db, &user, &comment)?;
    Ok(Json(LikeResponse {
        liked: comment::check_user_liked_comment(&db, id, user.id)?,
        likes: comment.like_count,
    }))
}

pub async fn toggle_like(
    Path(id): Path<Uuid>,
    user: User,
    Extension(db): DbExt,
) -> Result<impl IntoResponse> {
    ensure_visible(&db, &user, &db.get::<Comment>(id)?)?;
    let (liked, likes) = comment::toggle_comment_like(&db, id, user.id)?;
    Ok(Json(LikeResponse { liked, likes }))
}
