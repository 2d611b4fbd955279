use std::net::SocketAddr;

use http::HeaderMap;

use crate::error::{ErrorKind, Result};

/// Turns arbitrary text into a url-friendly slug.
///
/// Lowercases ascii alphanumerics and collapses every run of other
/// characters into a single dash, trimming dashes at both ends.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Checks that a user-supplied slug is already in normal form.
pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > 200 || slugify(slug) != slug {
        return Err(ErrorKind::BadInput(format!(
            "invalid slug '{}': use lowercase letters, digits and single dashes",
            slug
        ))
        .into());
    }
    Ok(())
}

/// Resolves the slug to store: the supplied one if present, otherwise one
/// derived from `source`.
pub fn resolve_slug(supplied: Option<&str>, source: &str) -> Result<String> {
    let slug = match supplied {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => slugify(source),
    };
    validate_slug(&slug)?;
    Ok(slug)
}

/// Best-effort client address of a request: first hop of `X-Forwarded-For`,
/// then `X-Real-IP`, then the peer address if known.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }
    if let Some(real) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return real.to_string();
    }
    peer.map(|p| p.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
