//! Data initialization procedures.
//!
//! Both the app config and the content directory can contain entries
//! describing items expected to exist after the application is started. This
//! module addresses the need for a streamlined way of converting relevant
//! data into initial application state.
//!
//! Initialization is idempotent: existing items are matched by email or slug
//! and updated in place.

use std::path::Path;

use crate::config::InitTerm;
use crate::post::{self, PostInput, PostStatus};
use crate::taxonomy::{self, TermInput};
use crate::util::slugify;
use crate::{content, Config, Database, ErrorKind, Result, User};

/// Initializes database state based on entries found at configured
/// locations.
pub fn initialize(config: &Config, db: &Database) -> Result<()> {
    users(config, db)?;
    categories(config, db)?;
    tags(config, db)?;
    posts(config, db, &config.init.content)?;
    Ok(())
}

/// Initializes users from entries found in the configuration.
pub fn users(config: &Config, db: &Database) -> Result<()> {
    for entry in &config.init.users {
        // If the user already exists, update them with the information
        // in the config.
        if let Some(mut existing) = crate::user::find_user_by_email(db, &entry.email)? {
            existing.is_admin = entry.is_admin;
            if !entry.name.is_empty() {
                existing.name = entry.name.clone();
            }
            if entry.image.is_some() {
                existing.image = entry.image.clone();
            }
            db.set(&existing)?;
        } else {
            let mut user = User::new(entry.name.clone(), entry.email.clone());
            user.image = entry.image.clone();
            user.is_admin = entry.is_admin;
            crate::user::create_user(db, user)?;
        }
    }
    Ok(())
}

fn term_input(term: &InitTerm) -> TermInput {
    TermInput {
        name: term.name.clone(),
        slug: term.slug.clone(),
        description: term.description.clone(),
    }
}

fn term_slug(term: &InitTerm) -> String {
    term.slug.clone().unwrap_or_else(|| slugify(&term.name))
}

pub fn categories(config: &Config, db: &Database) -> Result<()> {
    for term in &config.init.categories {
        match taxonomy::get_category_by_slug(db, &term_slug(term)) {
            Ok(existing) => {
                taxonomy::update_category(db, existing.id, term_input(term))?;
            }
            Err(e) if matches!(e.kind, ErrorKind::NotFound(_)) => {
                taxonomy::create_category(db, term_input(term))?;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

pub fn tags(config: &Config, db: &Database) -> Result<()> {
    for term in &config.init.tags {
        match taxonomy::get_tag_by_slug(db, &term_slug(term)) {
            Ok(existing) => {
                taxonomy::update_tag(db, existing.id, term_input(term))?;
            }
            Err(e) if matches!(e.kind, ErrorKind::NotFound(_)) => {
                taxonomy::create_tag(db, term_input(term))?;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Frontmatter of a markdown post file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Frontmatter {
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    /// Email of the author, who must already exist.
    pub author: String,
    /// Category slug.
    pub category: Option<String>,
    /// Tag slugs. Missing tags are created.
    pub tags: Vec<String>,
    pub status: Option<PostStatus>,
    pub featured: bool,
    pub cover_image: Option<String>,
}

/// Splits a post file into its frontmatter and the body.
///
/// Frontmatter is either yaml fenced with `---` or toml fenced with `+++`.
pub fn split_frontmatter(file: &str) -> Option<(&str, &str)> {
    let file = file.trim_start();
    let fence = ["---", "+++"].into_iter().find(|f| file.starts_with(f))?;
    let rest = &file[fence.len()..];
    let (frontmatter, body) = rest.split_once(&format!("\n{fence}"))?;
    Some((frontmatter, body.trim_start_matches(fence.chars().next()?)))
}

/// Parses the frontmatter of a post file, returning it together with the
/// body.
pub fn parse_frontmatter(file: &str) -> Result<Option<(Frontmatter, &str)>> {
    let Some((meta, body)) = split_frontmatter(file) else {
        return Ok(None);
    };
    let meta = if file.trim_start().starts_with("+++") {
        toml::from_str(meta)?
    } else {
        serde_yaml::from_str(meta)?
    };
    Ok(Some((meta, body)))
}

/// Loads markdown posts from `dir`.
///
/// A post whose slug already exists gets updated from the file. Files
/// without frontmatter or with an unknown author are skipped.
pub fn posts(config: &Config, db: &Database, dir: impl AsRef<Path>) -> Result<usize> {
    let entries = match std::fs::read_dir(dir.as_ref()) {
        Ok(e) => e,
        // If the directory doesn't exist we expect this function to just
        // return normally.
        Err(_) => return Ok(0),
    };

    let mut loaded = 0;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() || path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let file = std::fs::read_to_string(&path)?;
        let Some((meta, body)) = parse_frontmatter(&file)? else {
            tracing::warn!("skipping {}: missing frontmatter", path.display());
            continue;
        };
        let Some(author) = crate::user::find_user_by_email(db, &meta.author)? else {
            tracing::warn!("skipping {}: unknown author '{}'", path.display(), meta.author);
            continue;
        };

        let category = match meta.category.as_deref() {
            Some(slug) => Some(taxonomy::get_category_by_slug(db, slug)?.id),
            None => None,
        };
        let mut tags = Vec::new();
        for slug in &meta.tags {
            let tag = match taxonomy::get_tag_by_slug(db, slug) {
                Ok(tag) => tag,
                Err(e) if matches!(e.kind, ErrorKind::NotFound(_)) => taxonomy::create_tag(
                    db,
                    TermInput {
                        slug: Some(slug.clone()),
                        ..TermInput::named(slug.clone())
                    },
                )?,
                Err(e) => return Err(e),
            };
            tags.push(tag.id);
        }

        let input = PostInput {
            title: meta.title.clone(),
            slug: meta.slug.clone(),
            excerpt: meta.excerpt.clone(),
            content: content::from_paragraphs(body),
            cover_image: meta.cover_image.clone(),
            status: Some(meta.status.unwrap_or(PostStatus::Published)),
            scheduled_at: None,
            category,
            tags,
            featured: Some(meta.featured),
        };
        let slug = crate::util::resolve_slug(meta.slug.as_deref(), meta.title.trim())?;
        match post::get_post_by_slug(db, &slug) {
            Ok(existing) => {
                post::update_post(db, config, existing.id, input)?;
            }
            Err(e) if matches!(e.kind, ErrorKind::NotFound(_)) => {
                post::create_post(db, config, &author, input)?;
            }
            Err(e) => return Err(e),
        }
        loaded += 1;
    }
    tracing::info!("loaded {} posts from content directory", loaded);
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InitUser;

    const POST: &str = "---
title: Hello Sled
author: ada@example.com
category: notes
tags: [rust, storage]
excerpt: First post.
---

Embedded databases are neat.

Second paragraph here.
";

    fn config() -> Config {
        let mut config = Config::default();
        config.init.users = vec![InitUser {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            image: None,
            is_admin: true,
        }];
        config.init.categories = vec![InitTerm {
            name: "Notes".to_string(),
            ..Default::default()
        }];
        config
    }

    #[test]
    fn frontmatter_split() {
        let (meta, body) = split_frontmatter(POST).unwrap();
        assert!(meta.contains("title: Hello Sled"));
        assert!(body.trim().starts_with("Embedded"));
        assert!(split_frontmatter("no frontmatter here").is_none());
    }

    #[test]
    fn toml_frontmatter() -> Result<()> {
        let file = "+++\ntitle = \"Plus fenced\"\nauthor = \"ada@example.com\"\ntags = [\"rust\"]\nfeatured = true\n+++\nBody.\n";
        let (meta, body) = parse_frontmatter(file)?.unwrap();
        assert_eq!(meta.title, "Plus fenced");
        assert_eq!(meta.tags, vec!["rust".to_string()]);
        assert!(meta.featured);
        assert_eq!(body.trim(), "Body.");
        Ok(())
    }

    #[test]
    fn loads_posts_idempotently() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("hello.md"), POST)?;
        std::fs::write(dir.path().join("ignored.txt"), "not a post")?;

        let db = Database::temporary()?;
        let config = config();
        users(&config, &db)?;
        categories(&config, &db)?;
        assert_eq!(posts(&config, &db, dir.path())?, 1);
        assert_eq!(posts(&config, &db, dir.path())?, 1);

        assert_eq!(db.len::<crate::Post>()?, 1);
        let post = post::get_post_by_slug(&db, "hello-sled")?;
        assert!(post.published);
        assert_eq!(taxonomy::post_tags(&db, &post)?.len(), 2);
        assert_eq!(content::plain_text(&post.content), "Embedded databases are neat. Second paragraph here.");
        Ok(())
    }

    #[test]
    fn config_users_are_upserted() -> Result<()> {
        let db = Database::temporary()?;
        let mut config = config();
        users(&config, &db)?;
        config.init.users[0].is_admin = false;
        users(&config, &db)?;
        assert_eq!(db.len::<User>()?, 1);
        let ada = crate::user::find_user_by_email(&db, "ada@example.com")?.unwrap();
        assert!(!ada.is_admin);
        Ok(())
    }
}
