pub mod comment;
pub mod contact;
pub mod error;
pub mod extract;
pub mod post;
pub mod stats;
pub mod taxonomy;

pub use extract::{OptionalUser, User};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Extension;
use chrono::Utc;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::{Config, Database};

pub type Router = axum::Router;

pub type ConfigExt<C = Config> = Extension<Arc<C>>;
pub type DbExt = Extension<Arc<Database>>;

/// Registers the API routes on the provided router.
///
/// Meant to be used if there is a need to register custom middleware that will
/// run on the API routes.
///
/// # Configurable routes
///
/// Each module router can be switched off through `routes.disable` in the
/// config, using the module name (`post`, `comment`, `taxonomy`, `stats`,
/// `contact`). Entries in `routes.enable` take precedence.
pub fn router(mut router: Router, config: &Config) -> Router {
    router = conditional_merge("post", router, post::router(), config);
    router = conditional_merge("comment", router, comment::router(), config);
    router = conditional_merge("taxonomy", router, taxonomy::router(), config);
    router = conditional_merge("stats", router, stats::router(), config);
    conditional_merge("contact", router, contact::router(), config)
}

fn conditional_merge(route: &str, routera: Router, routerb: Router, config: &Config) -> Router {
    if config.routes.enable.contains(&route.to_string())
        || !config.routes.disable.contains(&route.to_string())
    {
        routera.merge(routerb)
    } else {
        routera
    }
}

/// Full application: API routes plus tracing and shared state.
pub fn app(router: Router, db: Arc<Database>, config: Arc<Config>) -> Router {
    self::router(router, &config)
        .layer(TraceLayer::new_for_http())
        // Register common state extension for all routes
        .layer(Extension(config))
        .layer(Extension(db))
}

/// Periodically publishes scheduled posts whose time has come.
pub fn spawn_scheduler(db: Arc<Database>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match crate::post::publish_scheduled(&db, Utc::now()) {
                Ok(published) if !published.is_empty() => {
                    tracing::info!("scheduler published {} posts", published.len())
                }
                Ok(_) => (),
                Err(e) => tracing::warn!("scheduled publishing failed: {e}"),
            }
        }
    })
}

/// Registers the API routes on the provided router, initializes application
/// state and starts the web server.
pub async fn start(router: Router, config: Config) -> Result<()> {
    let db = Database::open(&config.db.path)?;
    start_with(db, router, config).await
}

pub async fn start_with(db: Database, router: Router, config: Config) -> Result<()> {
    crate::tracing::init(&config).unwrap_or_else(|e| {
        log::warn!("failed to initialize tracing (perhaps it was already initialized?): {e}")
    });

    // Provide initial state as defined in config
    if config.init.enabled {
        crate::init::initialize(&config, &db)?;
    }

    // Generate mock data. Basically we want to be able to create a full
    // "synthetic" state consisting of all the different data items.
    if config.dev.enabled && config.dev.mock {
        crate::mock::generate(&config, &db)?;
    }

    let db = Arc::new(db);
    if config.scheduler.enabled {
        spawn_scheduler(
            db.clone(),
            Duration::from_secs(config.scheduler.interval_secs.max(1)),
        );
    }

    let addr = config.address;
    let router = app(router, db.clone(), Arc::new(config));

    // Serve the application
    tracing::info!("starting server at {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    db.flush().await
}
