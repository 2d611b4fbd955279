//! Bearer access tokens.
//!
//! Tokens are opaque uuids stored together with their metadata. They are
//! issued by the operator through the cli and presented by API clients in
//! the `Authorization` header.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::AuthDuration;
use crate::db::{Collectable, Database, Identifiable};
use crate::error::{ErrorKind, Result};
use crate::{User, UserId};

pub type TokenId = Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenMeta {
    pub id: TokenId,
    pub user_id: UserId,
    pub issued_at: DateTime<Utc>,
    pub duration: AuthDuration,
    /// Free-form note on what the token was issued for.
    pub context: String,
}

impl Collectable for TokenMeta {
    fn get_collection_name() -> &'static str {
        "access_token"
    }
}

impl Identifiable for TokenMeta {
    fn get_id(&self) -> Uuid {
        self.id
    }
}

impl TokenMeta {
    pub fn new(user_id: UserId, duration: AuthDuration) -> Self {
        Self {
            id: TokenId::new_v4(),
            user_id,
            issued_at: Utc::now(),
            duration,
            context: "".to_string(),
        }
    }

    /// Returns true if the token is expired.
    pub fn is_expired(&self) -> bool {
        let delta_time = Utc::now() - self.issued_at;
        let duration: Duration = self.duration.into();
        delta_time.num_seconds() > duration.as_secs() as i64
    }
}

/// Issues a new token for an existing user.
pub fn issue_token(
    db: &Database,
    user_id: UserId,
    duration: AuthDuration,
    context: impl Into<String>,
) -> Result<TokenMeta> {
    // make sure the user exists
    db.get::<User>(user_id)?;
    let mut token = TokenMeta::new(user_id, duration);
    token.context = context.into();
    db.set(&token)?;
    Ok(token)
}

/// Resolves a presented token into the user it was issued for.
///
/// Expired tokens are deleted on the spot.
pub fn authenticate(db: &Database, token: TokenId) -> Result<User> {
    let token = db
        .find::<TokenMeta>(token)?
        .ok_or_else(|| ErrorKind::AuthFailed("unknown token".to_string()))?;

    if token.is_expired() {
        db.remove(&token)?;
        return Err(ErrorKind::AuthFailed("token expired".to_string()).into());
    }

    let user = db
        .find::<User>(token.user_id)?
        .ok_or_else(|| ErrorKind::AuthFailed("token owner no longer exists".to_string()))?;
    if user.is_disabled {
        return Err(ErrorKind::AccountDisabled.into());
    }
    Ok(user)
}

/// Removes all the tokens issued for the user.
pub fn revoke_tokens(db: &Database, user_id: UserId) -> Result<usize> {
    let mut count = 0;
    for token in db.get_collection::<TokenMeta>()? {
        if token.user_id == user_id {
            db.remove(&token)?;
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::create_user;

    #[test]
    fn issued_token_authenticates_its_user() -> Result<()> {
        let db = Database::temporary()?;
        let user = create_user(&db, User::new("Ada", "ada@example.com"))?;
        let token = issue_token(&db, user.id, AuthDuration::Short, "test")?;
        assert_eq!(authenticate(&db, token.id)?.id, user.id);
        Ok(())
    }

    #[test]
    fn expired_token_is_removed() -> Result<()> {
        let db = Database::temporary()?;
        let user = create_user(&db, User::new("Ada", "ada@example.com"))?;
        let mut token = TokenMeta::new(user.id, AuthDuration::Short);
        token.issued_at = Utc::now() - chrono::Duration::hours(2);
        db.set(&token)?;

        let err = authenticate(&db, token.id).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::AuthFailed(_)));
        assert!(db.find::<TokenMeta>(token.id)?.is_none());
        Ok(())
    }

    #[test]
    fn disabled_user_cannot_authenticate() -> Result<()> {
        let db = Database::temporary()?;
        let mut user = User::new("Ada", "ada@example.com");
        user.is_disabled = true;
        let user = create_user(&db, user)?;
        let token = issue_token(&db, user.id, AuthDuration::Long, "")?;
        assert!(matches!(
            authenticate(&db, token.id).unwrap_err().kind,
            ErrorKind::AccountDisabled
        ));
        Ok(())
    }
}
