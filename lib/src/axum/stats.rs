use axum::extract::Query;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json};
use chrono::Utc;

use crate::stats::{self, StatsPeriod};
use crate::{routes, Result};

use super::{DbExt, Router, User};

pub fn router() -> Router {
    Router::new().route(routes::STATS, get(statistics))
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsQuery {
    pub period: StatsPeriod,
}

pub async fn statistics(
    user: User,
    Extension(db): DbExt,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse> {
    user.ensure_admin()?;
    Ok(Json(stats::blog_statistics(&db, query.period, Utc::now())?))
}
