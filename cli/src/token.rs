use std::str::FromStr;

use anyhow::{Error, Result};
use clap::{arg, Arg, ArgMatches, Command};
use tokio_util::sync::CancellationToken;

use quill::api::AuthDuration;
use quill::{auth, Database};

pub fn cmd() -> Command {
    Command::new("token")
        .subcommand_required(true)
        .display_order(20)
        .about("Manage API access tokens")
        .subcommand(
            Command::new("issue")
                .arg_required_else_help(true)
                .about("Issues a bearer token for a user")
                .arg(arg!(<user> "User email or id"))
                .arg(
                    Arg::new("duration")
                        .long("duration")
                        .short('d')
                        .default_value("medium")
                        .value_parser(["short", "medium", "long"])
                        .help("Token lifetime: 1 hour, 1 day or 30 days"),
                )
                .arg(arg!(--context [context] "Note on what the token is for")),
        )
        .subcommand(
            Command::new("revoke")
                .arg_required_else_help(true)
                .about("Revokes all tokens of a user")
                .arg(arg!(<user> "User email or id")),
        )
}

pub async fn run(matches: &ArgMatches, db: &Database, cancel: CancellationToken) -> Result<()> {
    match matches.subcommand() {
        Some(("issue", m)) => {
            let selector = m
                .get_one::<String>("user")
                .ok_or_else(|| Error::msg("missing user"))?;
            let user = crate::user::find(db, selector)?;
            let duration = m
                .get_one::<String>("duration")
                .map(|d| AuthDuration::from_str(d))
                .transpose()?
                .unwrap_or_default();
            let context = m.get_one::<String>("context").cloned().unwrap_or_default();
            let token = auth::issue_token(db, user.id, duration, context)?;
            println!("{}", token.id);
        }
        Some(("revoke", m)) => {
            let selector = m
                .get_one::<String>("user")
                .ok_or_else(|| Error::msg("missing user"))?;
            let user = crate::user::find(db, selector)?;
            let count = auth::revoke_tokens(db, user.id)?;
            println!("Revoked {} token(s) of {}", count, user.email);
        }
        _ => unreachable!("subcommand is required"),
    }

    cancel.cancel();

    Ok(())
}
