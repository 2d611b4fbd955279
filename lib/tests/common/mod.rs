#![allow(dead_code)]

use quill::api::AuthDuration;
use quill::post::{PostInput, PostStatus};
use quill::taxonomy::{self, TermInput};
use quill::{auth, content, user, Config, Database, Post, Result, User};

pub struct Fixture {
    pub db: Database,
    pub config: Config,
    pub admin: User,
    pub reader: User,
}

impl Fixture {
    pub fn new() -> Result<Self> {
        let db = Database::temporary()?;
        let mut config = Config::default();
        config.tracing.enabled = false;
        config.comments.rate_limit = None;

        let mut admin = User::new("Admin", "admin@example.com");
        admin.is_admin = true;
        let admin = user::create_user(&db, admin)?;
        let reader = user::create_user(&db, User::new("Reader", "reader@example.com"))?;
        Ok(Self {
            db,
            config,
            admin,
            reader,
        })
    }

    pub fn post(&self, title: &str, status: PostStatus) -> Result<Post> {
        let input = PostInput {
            status: Some(status),
            ..PostInput::new(title, content::from_paragraphs("Some words about things."))
        };
        quill::post::create_post(&self.db, &self.config, &self.admin, input)
    }

    pub fn category(&self, name: &str) -> Result<quill::Category> {
        taxonomy::create_category(&self.db, TermInput::named(name))
    }

    pub fn tag(&self, name: &str) -> Result<quill::Tag> {
        taxonomy::create_tag(&self.db, TermInput::named(name))
    }

    pub fn token(&self, user: &User) -> Result<String> {
        Ok(auth::issue_token(&self.db, user.id, AuthDuration::Short, "test")?
            .id
            .to_string())
    }
}
