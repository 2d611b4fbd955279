//! Module tasked with generating mock data to populate the application.

use chrono::{Duration, Utc};

use crate::post::{self, PostInput, PostStatus};
use crate::taxonomy::{self, TermInput};
use crate::{comment, content, Config, Database, Result, User};

pub const TEST_USER_EMAIL: &str = "test@mail.com";

/// Generates and saves various mocking data in the database.
///
/// Does nothing if the test user already exists, so restarting in dev mode
/// doesn't pile up duplicates.
pub fn generate(config: &Config, db: &Database) -> Result<()> {
    if crate::user::find_user_by_email(db, TEST_USER_EMAIL)?.is_some() {
        tracing::debug!("mock data already present");
        return Ok(());
    }
    let admin = user(db)?;
    let reader = crate::user::create_user(db, User::new("Mock Reader", "reader@mail.com"))?;
    posts(config, db, &admin, &reader)?;
    tracing::info!("generated mock data");
    Ok(())
}

pub fn user(db: &Database) -> Result<User> {
    let mut user = User::new("Test User", TEST_USER_EMAIL);
    user.is_admin = true;
    crate::user::create_user(db, user)
}

const PARAGRAPHS: &[&str] = &[
    "Every system eventually grows a cache, and every cache eventually grows a bug.",
    "Small tools composed well beat large tools configured badly.",
    "Measure first. The slow part is rarely where you expect it to be.",
];

fn posts(config: &Config, db: &Database, admin: &User, reader: &User) -> Result<()> {
    let engineering = taxonomy::create_category(
        db,
        TermInput {
            description: Some("Notes from building things".to_string()),
            ..TermInput::named("Engineering")
        },
    )?;
    let life = taxonomy::create_category(db, TermInput::named("Life"))?;
    let rust = taxonomy::create_tag(db, TermInput::named("rust"))?;
    let web = taxonomy::create_tag(db, TermInput::named("web"))?;
    let storage = taxonomy::create_tag(db, TermInput::named("storage"))?;

    let specs = [
        ("Building a blog backend", PostStatus::Published, Some(engineering.id), vec![rust.id, web.id], true),
        ("Embedded storage engines", PostStatus::Published, Some(engineering.id), vec![rust.id, storage.id], false),
        ("A quiet week", PostStatus::Published, Some(life.id), vec![], false),
        ("Unfinished thoughts", PostStatus::Draft, None, vec![web.id], false),
        ("Coming soon", PostStatus::Scheduled, Some(engineering.id), vec![storage.id], false),
        ("Old announcement", PostStatus::Archived, None, vec![], false),
    ];

    let mut published = Vec::new();
    for (title, status, category, tags, featured) in specs {
        let input = PostInput {
            excerpt: Some(PARAGRAPHS[0].to_string()),
            status: Some(status),
            scheduled_at: (status == PostStatus::Scheduled).then(|| Utc::now() + Duration::days(3)),
            category,
            tags,
            featured: Some(featured),
            ..PostInput::new(title, content::from_paragraphs(&PARAGRAPHS.join("\n\n")))
        };
        let post = post::create_post(db, config, admin, input)?;
        if post.published {
            published.push(post);
        }
    }

    // mock comments skip rate limiting
    let mut config = config.clone();
    config.comments.rate_limit = None;
    for (i, post) in published.iter().enumerate() {
        let top = comment::create_comment(db, &config, reader, post.id, "Great read, thanks!", None)?;
        comment::create_comment(db, &config, admin, post.id, "Glad you liked it.", Some(top.id))?;
        post::toggle_post_like(db, post.id, reader.id)?;
        post::create_post_view(db, post.id, &format!("10.0.0.{}", i + 1), "mock", None)?;
    }
    Ok(())
}
