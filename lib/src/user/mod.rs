use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::db::{Collectable, Database, Identifiable};
use crate::error::{ErrorKind, Result};

pub type UserId = Uuid;

/// User data structure.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct User {
    pub id: UserId,

    /// Name displayed next to posts and comments.
    pub name: String,
    pub email: String,
    /// Avatar url.
    pub image: Option<String>,

    pub registration_date: DateTime<Utc>,

    pub is_admin: bool,
    pub is_disabled: bool,
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "".to_string(),
            email: "".to_string(),
            image: None,
            registration_date: Utc::now(),
            is_admin: false,
            is_disabled: false,
        }
    }
}

impl Collectable for User {
    fn get_collection_name() -> &'static str {
        "user"
    }
}

impl Identifiable for User {
    fn get_id(&self) -> Uuid {
        self.id
    }
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Default::default()
        }
    }
}

/// Adds a new user to the database.
///
/// # Unique email requirement
///
/// Two users sharing the same email address is not allowed.
pub fn create_user(db: &Database, user: User) -> Result<User> {
    if !user.email.validate_email() {
        return Err(ErrorKind::BadInput(format!("invalid email: {}", user.email)).into());
    }
    if find_user_by_email(db, &user.email)?.is_some() {
        return Err(ErrorKind::UserWithEmailAlreadyExists(user.email).into());
    }
    db.set(&user)?;
    tracing::info!(user = %user.id, "created user {}", user.email);
    Ok(user)
}

pub fn find_user_by_email(db: &Database, email: &str) -> Result<Option<User>> {
    Ok(db
        .get_collection::<User>()?
        .into_iter()
        .find(|u| u.email.eq_ignore_ascii_case(email)))
}

pub fn get_user_by_email(db: &Database, email: &str) -> Result<User> {
    find_user_by_email(db, email)?.ok_or_else(|| ErrorKind::UserNotFound(email.to_string()).into())
}

pub fn set_admin(db: &Database, id: UserId, is_admin: bool) -> Result<User> {
    let mut user = db.get::<User>(id)?;
    user.is_admin = is_admin;
    db.set(&user)?;
    Ok(user)
}

pub fn set_disabled(db: &Database, id: UserId, is_disabled: bool) -> Result<User> {
    let mut user = db.get::<User>(id)?;
    user.is_disabled = is_disabled;
    db.set(&user)?;
    Ok(user)
}

/// Name shown for the user, falling back to the local part of the email.
pub fn display_name(user: &User) -> String {
    if !user.name.is_empty() {
        return user.name.clone();
    }
    user.email.split('@').next().unwrap_or_default().to_string()
}
