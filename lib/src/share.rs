//! Share links for published posts.

use url::Url;

use crate::db::{Collectable, Database};
use crate::error::{ErrorKind, Result};
use crate::post::{Post, PostId};
use crate::seo::canonical_url;
use crate::Config;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Platform {
    Twitter,
    Facebook,
    Linkedin,
    Reddit,
    Email,
    /// Plain link for the clipboard.
    Copy,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLink {
    pub platform: Platform,
    pub url: String,
    pub share_count: u64,
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Builds the url that shares `target` (titled `title`) on `platform`.
pub fn share_url(platform: Platform, target: &str, title: &str) -> Result<String> {
    let url = match platform {
        Platform::Twitter => Url::parse_with_params(
            "https://twitter.com/intent/tweet",
            &[("url", target), ("text", title)],
        )?,
        Platform::Facebook => Url::parse_with_params(
            "https://www.facebook.com/sharer/sharer.php",
            &[("u", target)],
        )?,
        Platform::Linkedin => Url::parse_with_params(
            "https://www.linkedin.com/sharing/share-offsite/",
            &[("url", target)],
        )?,
        Platform::Reddit => Url::parse_with_params(
            "https://www.reddit.com/submit",
            &[("url", target), ("title", title)],
        )?,
        // mail clients don't decode `+` as a space
        Platform::Email => {
            return Ok(format!(
                "mailto:?subject={}&body={}",
                encode(title),
                encode(target)
            ))
        }
        Platform::Copy => Url::parse(target)?,
    };
    Ok(url.to_string())
}

/// Records a share of a published post and returns the link to follow.
pub fn share_post(db: &Database, config: &Config, post: PostId, platform: Platform) -> Result<ShareLink> {
    let post = db.transaction(&[Post::get_collection_name()], |tx| {
        let mut p = tx.get::<Post>(post)?;
        if !p.published {
            return Err(ErrorKind::BadInput("only published posts can be shared".to_string()).into());
        }
        p.share_count += 1;
        tx.set(&p)?;
        Ok(p)
    })?;

    let url = share_url(platform, &canonical_url(config, &post), &post.title)?;
    tracing::debug!(post = %post.id, "shared on {}", platform);
    Ok(ShareLink {
        platform,
        url,
        share_count: post.share_count,
    })
}
