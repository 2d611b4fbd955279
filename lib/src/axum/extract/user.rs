use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_auth::AuthBearer;
use log::debug;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{Error, ErrorKind, Result};
use crate::user::{self, User as RawUser};
use crate::Config;

/// Authenticated user making the request.
///
/// Requests carry an access token as `Authorization: Bearer <token>`. In dev
/// mode a configured autologin email bypasses the token entirely.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct User(pub RawUser);

impl Deref for User {
    type Target = RawUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<RawUser> for User {
    fn from(u: RawUser) -> Self {
        Self(u)
    }
}

impl User {
    pub fn ensure_admin(&self) -> Result<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::Forbidden).with_user(self.id))
        }
    }
}

fn extensions(parts: &Parts) -> Result<(Arc<Database>, Arc<Config>)> {
    let db = parts
        .extensions
        .get::<Arc<Database>>()
        .ok_or_else(|| ErrorKind::Other("database extension unavailable".to_string()))?
        .clone();
    let config = parts
        .extensions
        .get::<Arc<Config>>()
        .ok_or_else(|| ErrorKind::Other("config extension unavailable".to_string()))?
        .clone();
    Ok((db, config))
}

fn autologin(config: &Config) -> Option<&str> {
    config
        .dev
        .autologin
        .as_deref()
        .filter(|_| config.dev.enabled)
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for User {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let (db, config) = extensions(parts)?;

        // autologin functionality for faster development, can be set in config
        if let Some(email) = autologin(&config) {
            debug!("attempting autologin, uri: {}", parts.uri);
            return match user::find_user_by_email(&db, email)? {
                Some(user) => Ok(User(user)),
                None => Err(ErrorKind::AuthFailed(format!(
                    "autologin: provided user email that doesn't exist: {}",
                    email
                ))
                .into()),
            };
        }

        let AuthBearer(token) = AuthBearer::from_request_parts(parts, state)
            .await
            .map_err(|_| ErrorKind::AuthFailed("bearer token not present".to_string()))?;
        let token = Uuid::from_str(token.trim())
            .map_err(|_| ErrorKind::AuthFailed("malformed token".to_string()))?;

        crate::auth::authenticate(&db, token).map(User)
    }
}

/// User making the request, if any.
///
/// Anonymous requests pass through, but a presented token that doesn't
/// authenticate is still rejected.
#[derive(Clone, Debug)]
pub struct OptionalUser(pub Option<User>);

impl OptionalUser {
    pub fn is_admin(&self) -> bool {
        self.0.as_ref().map(|u| u.is_admin).unwrap_or(false)
    }

    pub fn id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|u| u.id)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for OptionalUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let (_, config) = extensions(parts)?;
        if autologin(&config).is_none() && !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(OptionalUser(None));
        }
        User::from_request_parts(parts, state)
            .await
            .map(|u| OptionalUser(Some(u)))
    }
}
