mod export;
mod publish;
mod serve;
mod token;
mod user;

use std::time::Duration;

use clap::{Arg, Command};
use quill::{config, Config, Database};
use tokio_util::sync::CancellationToken;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    // If executed in a context where config file is available then it's
    // picked up automatically. Otherwise defaults are used, and the config
    // file path can still be provided through the `--config` argument.
    let mut config: Config = config::load().unwrap_or_default();

    let matches = cmd().get_matches();

    // Load the proper config if proper argument is provided.
    if let Some(config_path) = matches.get_one::<String>("config") {
        config = config::load_from(config_path)?;
    }

    match matches.subcommand() {
        Some(("serve", m)) => serve::run(m, config, cancel.clone()).await?,
        Some(("user", m)) => user::run(m, &open_db(&config)?, cancel.clone()).await?,
        Some(("token", m)) => token::run(m, &open_db(&config)?, cancel.clone()).await?,
        Some(("publish", m)) => publish::run(m, &open_db(&config)?, cancel.clone()).await?,
        Some(("export", m)) => export::run(m, &open_db(&config)?, cancel.clone()).await?,
        _ => unreachable!("subcommand is required"),
    }

    // Wait for either ctrl_c signal or message from within server task(s)
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!("Initiating graceful shutdown...");
            cancel.cancel();
        },
        _ = cancel.cancelled() => {},
    }

    tokio::time::sleep(Duration::from_millis(300)).await;

    Ok(())
}

fn open_db(config: &Config) -> anyhow::Result<Database> {
    Ok(Database::open(&config.db.path)?)
}

pub fn cmd() -> Command {
    Command::new("quill")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .infer_subcommands(true)
        .version(VERSION)
        .about("Blog backend: serve the API and manage its data")
        .subcommand(serve::cmd())
        .subcommand(user::cmd())
        .subcommand(token::cmd())
        .subcommand(publish::cmd())
        .subcommand(export::cmd())
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("PATH")
                .global(true)
                .help("Path to the config file"),
        )
}
