use std::str::FromStr;

use anyhow::{Error, Result};
use clap::{arg, Arg, ArgAction, ArgMatches};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use quill::{user, Database, User};

pub fn cmd() -> clap::Command {
    clap::Command::new("user")
        .subcommand_required(true)
        .display_order(10)
        .about("Inspect and manipulate users")
        .subcommand(
            clap::Command::new("add")
                .arg_required_else_help(true)
                .about("Adds new user")
                .arg(arg!(<email> "User email"))
                .arg(arg!(--name [name] "Name displayed next to posts and comments"))
                .arg(
                    Arg::new("is_admin")
                        .short('a')
                        .long("admin")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            clap::Command::new("list")
                .about("Lists users")
                .arg(
                    Arg::new("email")
                        .long("email")
                        .short('e')
                        .help("Only list users whose email contains this text"),
                ),
        )
        .subcommand(
            clap::Command::new("admin")
                .arg_required_else_help(true)
                .about("Grants or revokes admin rights")
                .arg(arg!(<user> "User email or id"))
                .arg(
                    Arg::new("revoke")
                        .long("revoke")
                        .action(ArgAction::SetTrue)
                        .help("Revoke instead of grant"),
                ),
        )
        .subcommand(
            clap::Command::new("disable")
                .arg_required_else_help(true)
                .about("Disables or re-enables a user")
                .arg(arg!(<user> "User email or id"))
                .arg(
                    Arg::new("enable")
                        .long("enable")
                        .action(ArgAction::SetTrue)
                        .help("Re-enable instead of disable"),
                ),
        )
}

/// Finds a user by id or, failing that, by email.
pub fn find(db: &Database, selector: &str) -> Result<User> {
    if let Ok(id) = Uuid::from_str(selector) {
        return Ok(db.get::<User>(id)?);
    }
    Ok(user::get_user_by_email(db, selector)?)
}

pub async fn run(sub_matches: &ArgMatches, db: &Database, cancel: CancellationToken) -> Result<()> {
    match sub_matches.subcommand() {
        Some(("add", m)) => {
            // email is always provided
            let email = m
                .get_one::<String>("email")
                .cloned()
                .ok_or_else(|| Error::msg("missing email"))?;
            let name = m.get_one::<String>("name").cloned().unwrap_or_default();
            let mut new_user = User::new(name, email);
            new_user.is_admin = m.get_flag("is_admin");
            let new_user = user::create_user(db, new_user)?;
            println!("Added new user {} ({})", new_user.email, new_user.id);
        }
        Some(("list", m)) => {
            let filter = m.get_one::<String>("email").map(|e| e.to_lowercase());
            let mut users = db
                .get_collection::<User>()?
                .into_iter()
                .filter(|u| {
                    filter
                        .as_ref()
                        .map(|f| u.email.to_lowercase().contains(f))
                        .unwrap_or(true)
                })
                .collect::<Vec<_>>();
            users.sort_by_key(|u| u.registration_date);
            println!("Found {} user(s):", users.len());
            for u in users {
                println!(
                    "{}  {:<32} {:<24} {}{}",
                    u.id,
                    u.email,
                    user::display_name(&u),
                    if u.is_admin { "admin " } else { "" },
                    if u.is_disabled { "disabled" } else { "" },
                );
            }
        }
        Some(("admin", m)) => {
            let selector = m
                .get_one::<String>("user")
                .ok_or_else(|| Error::msg("missing user"))?;
            let target = find(db, selector)?;
            let updated = user::set_admin(db, target.id, !m.get_flag("revoke"))?;
            println!("User {} admin: {}", updated.email, updated.is_admin);
        }
        Some(("disable", m)) => {
            let selector = m
                .get_one::<String>("user")
                .ok_or_else(|| Error::msg("missing user"))?;
            let target = find(db, selector)?;
            let disabled = !m.get_flag("enable");
            let updated = user::set_disabled(db, target.id, disabled)?;
            if disabled {
                let revoked = quill::auth::revoke_tokens(db, updated.id)?;
                println!("Disabled {}, revoked {} token(s)", updated.email, revoked);
            } else {
                println!("Enabled {}", updated.email);
            }
        }
        _ => unreachable!("subcommand is required"),
    }

    cancel.cancel();

    Ok(())
}
