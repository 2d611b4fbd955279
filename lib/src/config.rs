use std::net::SocketAddr;

use serde::de::DeserializeOwned;

use crate::Result;

pub static CONFIG_FILE: &str = "quill.toml";

/// Application configuration.
///
/// # Sensible defaults
///
/// Configuration provided through `Config::default()` allows running the
/// backend locally without any config file. It serves on `127.0.0.1:8080`,
/// keeps the database in `./db` and uses formatted logging.
///
/// Using the *struct update syntax* one can initialize a new `Config`, making
/// a few changes right in the definition.
///
/// ```ignore
/// let cfg = Config {
///     comments: Comments {
///         moderation: true,
///         ..Default::default()
///     },
///     ..Default::default()
/// }
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub name: String,
    pub version: String,

    /// Domain name under which the blog is published. Used for building
    /// canonical and share urls.
    pub domain: String,
    /// Address on which to serve the application. Defaults to
    /// `127.0.0.1:8080`.
    pub address: SocketAddr,

    pub db: Db,
    pub tracing: Tracing,

    pub posts: Posts,
    pub comments: Comments,
    pub scheduler: Scheduler,

    pub email: Email,

    /// Development mode configuration.
    pub dev: DevMode,

    pub init: Init,
    /// Selectively enable/disable pre-made routes
    pub routes: Routes,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            domain: "localhost".to_string(),
            address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            db: Db::default(),
            tracing: Tracing::default(),
            posts: Posts::default(),
            comments: Comments::default(),
            scheduler: Scheduler::default(),
            email: Email::default(),
            dev: DevMode::default(),
            init: Init::default(),
            routes: Routes::default(),
        }
    }
}

/// Loads application config from toml file at default location.
pub fn load<T: DeserializeOwned>() -> Result<T> {
    load_from(CONFIG_FILE)
}

/// Loads application config from toml file at standard path using provided
/// name.
///
/// For example for `name` == `quill.toml` we will load both `quill.toml`
/// and `secret.quill.toml` from the main project directory. Environment
/// variables override both, using `__` as the section separator, e.g.
/// `COMMENTS__RATE_LIMIT=10`.
pub fn load_from<T: DeserializeOwned>(name: impl AsRef<str>) -> Result<T> {
    let config = config::Config::builder()
        .add_source(config::File::with_name(name.as_ref()))
        .add_source(config::File::with_name(&format!("secret.{}", name.as_ref())).required(false))
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix_separator("__"),
        )
        .build()?;

    let config: T = config.try_deserialize()?;

    Ok(config)
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Db {
    /// Path to the database directory, relative to the current working
    /// directory.
    pub path: String,
}

impl Default for Db {
    fn default() -> Self {
        Self {
            path: "db".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Tracing {
    pub enabled: bool,

    pub mode: crate::tracing::Mode,
    pub level: crate::tracing::Level,

    pub loki_address: String,
}

impl Default for Tracing {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: crate::tracing::Mode::default(),
            level: crate::tracing::Level::default(),
            loki_address: "".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Posts {
    /// Reading speed used for estimating post reading time.
    pub words_per_minute: usize,
    /// Default page size for post listings.
    pub per_page: usize,
}

impl Default for Posts {
    fn default() -> Self {
        Self {
            words_per_minute: 200,
            per_page: 10,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Comments {
    /// Global rate limit per user. Expressed as a number of seconds between
    /// individual comments. Admins are exempt.
    pub rate_limit: Option<usize>,
    /// Maximum comment length in characters.
    pub max_length: usize,
    /// New comments from non-admin users start out pending approval.
    pub moderation: bool,
}

impl Default for Comments {
    fn default() -> Self {
        Self {
            rate_limit: Some(30),
            max_length: 2000,
            moderation: false,
        }
    }
}

/// Periodic promotion of scheduled posts whose time has come.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Scheduler {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Email {
    /// Address that the application will send emails from.
    pub address: String,
    /// Address receiving messages from the contact form.
    pub owner: String,

    // Smtp server and credentials.
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_password: String,
}

/// NOTE: make sure to disable on production.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DevMode {
    /// Global switch for all dev mode items.
    pub enabled: bool,
    /// Automatic login flag. Includes the email of the user to be logged in.
    pub autologin: Option<String>,
    /// Populate the database with mock content on startup.
    pub mock: bool,
}

/// Initial state applied on startup.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Init {
    pub enabled: bool,
    /// Directory holding markdown posts with yaml frontmatter.
    pub content: String,
    pub users: Vec<InitUser>,
    pub categories: Vec<InitTerm>,
    pub tags: Vec<InitTerm>,
}

impl Default for Init {
    fn default() -> Self {
        Self {
            enabled: true,
            content: "content/posts".to_string(),
            users: vec![],
            categories: vec![],
            tags: vec![],
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct InitUser {
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub is_admin: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct InitTerm {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Routes {
    pub enable: Vec<String>,
    pub disable: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_partial_toml_over_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("quill.toml");
        std::fs::write(
            &path,
            "domain = \"blog.example.com\"\n\
             [comments]\n\
             moderation = true\n",
        )?;
        let config: Config = load_from(path.to_string_lossy())?;
        assert_eq!(config.domain, "blog.example.com");
        assert!(config.comments.moderation);
        assert_eq!(config.comments.max_length, 2000);
        assert_eq!(config.posts.words_per_minute, 200);
        Ok(())
    }
}
