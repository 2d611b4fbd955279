use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use tokio_util::sync::CancellationToken;

use quill::Config;

pub fn cmd() -> Command {
    Command::new("serve")
        .about("Start the API server")
        .display_order(1)
        .arg(
            Arg::new("address")
                .long("address")
                .short('a')
                .value_name("ADDR")
                .help("Override the configured listening address"),
        )
}

pub async fn run(matches: &ArgMatches, mut config: Config, cancel: CancellationToken) -> Result<()> {
    if let Some(address) = matches.get_one::<String>("address") {
        config.address = address.parse()?;
    }

    // The server keeps running in the background until it fails or ctrl_c
    // is received.
    tokio::spawn(async move {
        if let Err(e) = quill::axum::start(quill::axum::Router::new(), config).await {
            eprintln!("server error: {e}");
        }
        cancel.cancel();
    });

    Ok(())
}
