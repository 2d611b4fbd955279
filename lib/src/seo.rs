//! Search engine and social card metadata for posts.
//!
//! A post has at most one SEO record, stored under the post's own id. Any
//! field left empty falls back to what the post itself provides when the
//! effective metadata is resolved.

use uuid::Uuid;
use validator::ValidateLength;

use crate::db::{Collectable, Database, Identifiable};
use crate::error::{ErrorKind, Result};
use crate::post::{Post, PostId};
use crate::{content, Config};

const META_TITLE_MAX: u64 = 70;
const META_DESCRIPTION_MAX: u64 = 160;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostSeo {
    /// Same as the id of the post it describes.
    pub post: PostId,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
    pub canonical_url: Option<String>,
    pub keywords: Vec<String>,
    pub no_index: bool,
}

impl Collectable for PostSeo {
    fn get_collection_name() -> &'static str {
        "post_seo"
    }
}

impl Identifiable for PostSeo {
    fn get_id(&self) -> Uuid {
        self.post
    }
}

impl PostSeo {
    fn normalize(&mut self) {
        for field in [
            &mut self.meta_title,
            &mut self.meta_description,
            &mut self.og_title,
            &mut self.og_description,
            &mut self.og_image,
            &mut self.canonical_url,
        ] {
            if field.as_deref().map(|f| f.trim().is_empty()).unwrap_or(false) {
                *field = None;
            }
        }
        self.keywords = self
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        self.keywords.dedup();
    }

    fn validate(&self) -> Result<()> {
        if let Some(title) = &self.meta_title {
            if !title.validate_length(None, Some(META_TITLE_MAX), None) {
                return Err(ErrorKind::BadInput(format!(
                    "meta title must be at most {} characters",
                    META_TITLE_MAX
                ))
                .into());
            }
        }
        if let Some(description) = &self.meta_description {
            if !description.validate_length(None, Some(META_DESCRIPTION_MAX), None) {
                return Err(ErrorKind::BadInput(format!(
                    "meta description must be at most {} characters",
                    META_DESCRIPTION_MAX
                ))
                .into());
            }
        }
        if let Some(url) = &self.canonical_url {
            url::Url::parse(url)?;
        }
        Ok(())
    }
}

/// Metadata as it should be rendered, with every fallback applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSeo {
    pub title: String,
    pub description: String,
    pub og_title: String,
    pub og_description: String,
    pub og_image: Option<String>,
    pub canonical_url: String,
    pub keywords: Vec<String>,
    pub no_index: bool,
}

pub fn get_post_seo(db: &Database, post: PostId) -> Result<Option<PostSeo>> {
    db.find::<PostSeo>(post)
}

/// Creates or replaces the SEO record of an existing post.
pub fn upsert_post_seo(db: &Database, post: PostId, mut seo: PostSeo) -> Result<PostSeo> {
    seo.post = post;
    seo.normalize();
    seo.validate()?;
    db.transaction(
        &[Post::get_collection_name(), PostSeo::get_collection_name()],
        |tx| {
            if !tx.contains::<Post>(post)? {
                return Err(ErrorKind::not_found("post", post).into());
            }
            tx.set(&seo)
        },
    )?;
    tracing::debug!(post = %post, "saved seo metadata");
    Ok(seo)
}

/// Removes the SEO record. Returns whether there was one.
pub fn delete_post_seo(db: &Database, post: PostId) -> Result<bool> {
    db.transaction(&[PostSeo::get_collection_name()], |tx| {
        tx.remove::<PostSeo>(post)
    })
}

/// Public url of a post.
pub fn canonical_url(config: &Config, post: &Post) -> String {
    format!("https://{}/blog/{}", config.domain, post.slug)
}

fn description_of(post: &Post) -> String {
    if let Some(excerpt) = post.excerpt.as_deref().filter(|e| !e.trim().is_empty()) {
        return excerpt.to_string();
    }
    let text = content::plain_text(&post.content);
    if text.chars().count() <= META_DESCRIPTION_MAX as usize {
        return text;
    }
    let mut out = text
        .chars()
        .take(META_DESCRIPTION_MAX as usize - 3)
        .collect::<String>()
        .trim_end()
        .to_string();
    out.push_str("...");
    out
}

/// Computes the effective metadata of a post.
///
/// Titles fall back to the post title, descriptions to the excerpt (or the
/// beginning of the text), the image to the cover image and the canonical
/// url to the post's public url.
pub fn resolve_post_seo(db: &Database, config: &Config, post: &Post) -> Result<ResolvedSeo> {
    let seo = get_post_seo(db, post.id)?.unwrap_or_default();

    let title = seo.meta_title.clone().unwrap_or_else(|| post.title.clone());
    let description = seo
        .meta_description
        .clone()
        .unwrap_or_else(|| description_of(post));

    Ok(ResolvedSeo {
        og_title: seo.og_title.clone().unwrap_or_else(|| title.clone()),
        og_description: seo
            .og_description
            .clone()
            .unwrap_or_else(|| description.clone()),
        og_image: seo.og_image.clone().or_else(|| post.cover_image.clone()),
        canonical_url: seo
            .canonical_url
            .clone()
            .unwrap_or_else(|| canonical_url(config, post)),
        keywords: seo.keywords,
        no_index: seo.no_index,
        title,
        description,
    })
}
