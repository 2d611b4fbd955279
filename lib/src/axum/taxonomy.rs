use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Extension, Json};
use uuid::Uuid;

use crate::taxonomy::{self, TermInput};
use crate::{routes, Result};

use super::{DbExt, Router, User};

pub fn router() -> Router {
    Router::new()
        .route(routes::CATEGORIES, get(list_categories).post(create_category))
        .route(routes::CATEGORY, put(update_category).delete(delete_category))
        .route(routes::TAGS, get(list_tags).post(create_tag))
        .route(routes::TAG, put(update_tag).delete(delete_tag))
}

pub async fn list_categories(Extension(db): DbExt) -> Result<impl IntoResponse> {
    Ok(Json(taxonomy::list_categories(&db)?))
}

pub async fn create_category(
    user: User,
    Extension(db): DbExt,
    Json(input): Json<TermInput>,
) -> Result<impl IntoResponse> {
    user.ensure_admin()?;
    Ok((StatusCode::CREATED, Json(taxonomy::create_category(&db, input)?)))
}

pub async fn update_category(
    Path(id): Path<Uuid>,
    user: User,
    Extension(db): DbExt,
    Json(input): Json<TermInput>,
) -> Result<impl IntoResponse> {
    user.ensure_admin()?;
    Ok(Json(taxonomy::update_category(&db, id, input)?))
}

pub async fn delete_category(
    Path(id): Path<Uuid>,
    user: User,
    Extension(db): DbExt,
) -> Result<impl IntoResponse> {
    user.ensure_admin()?;
    taxonomy::delete_category(&db, id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_tags(Extension(db): DbExt) -> Result<impl IntoResponse> {
    Ok(Json(taxonomy::list_tags(&db)?))
}

pub async fn create_tag(
    user: User,
    Extension(db): DbExt,
    Json(input): Json<TermInput>,
) -> Result<impl IntoResponse> {
    user.ensure_admin()?;
    Ok((StatusCode::CREATED, Json(taxonomy::create_tag(&db, input)?)))
}

pub async fn update_tag(
    Path(id): Path<Uuid>,
    user: User,
    Extension(db): DbExt,
    Json(input): Json<TermInput>,
) -> Result<impl IntoResponse> {
    user.ensure_admin()?;
    Ok(Json(taxonomy::update_tag(&db, id, input)?))
}

pub async fn delete_tag(
    Path(id): Path<Uuid>,
    user: User,
    Extension(db): DbExt,
) -> Result<impl IntoResponse> {
    user.ensure_admin()?;
    taxonomy::delete_tag(&db, id)?;
    Ok(StatusCode::NO_CONTENT)
}
