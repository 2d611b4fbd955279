use anyhow::Result;
use chrono::Utc;
use clap::{ArgMatches, Command};
use tokio_util::sync::CancellationToken;

use quill::Database;

pub fn cmd() -> Command {
    Command::new("publish")
        .about("Publish scheduled posts that are due")
        .display_order(30)
}

pub async fn run(_matches: &ArgMatches, db: &Database, cancel: CancellationToken) -> Result<()> {
    let published = quill::post::publish_scheduled(db, Utc::now())?;
    for id in &published {
        let post = quill::post::get_post(db, *id)?;
        println!("Published {} ({})", post.slug, post.id);
    }
    println!("{} post(s) published", published.len());
    db.flush().await?;

    cancel.cancel();

    Ok(())
}
