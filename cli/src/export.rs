use anyhow::{Error, Result};
use clap::{Arg, ArgMatches, Command};
use tokio_util::sync::CancellationToken;

use quill::comment::{Comment, CommentLike};
use quill::post::{PostLike, PostView};
use quill::taxonomy::PostTag;
use quill::{Category, Database, Post, PostSeo, Tag, User};

const COLLECTIONS: [&str; 10] = [
    "posts",
    "comments",
    "categories",
    "tags",
    "users",
    "seo",
    "post_tags",
    "post_views",
    "post_likes",
    "comment_likes",
];

pub fn cmd() -> Command {
    Command::new("export")
        .about("Export information from the database")
        .display_order(70)
        .arg(
            Arg::new("collection")
                .display_order(11)
                .help("Provide collection name")
                .value_parser(COLLECTIONS)
                .required(true),
        )
}

pub async fn run(matches: &ArgMatches, db: &Database, cancel: CancellationToken) -> Result<()> {
    let collection = matches
        .get_one::<String>("collection")
        .ok_or_else(|| Error::msg("missing collection"))?;

    let value = match collection.as_str() {
        "posts" => serde_json::to_value(db.get_collection::<Post>()?)?,
        "comments" => serde_json::to_value(db.get_collection::<Comment>()?)?,
        "categories" => serde_json::to_value(db.get_collection::<Category>()?)?,
        "tags" => serde_json::to_value(db.get_collection::<Tag>()?)?,
        "users" => serde_json::to_value(db.get_collection::<User>()?)?,
        "seo" => serde_json::to_value(db.get_collection::<PostSeo>()?)?,
        "post_tags" => serde_json::to_value(db.get_collection::<PostTag>()?)?,
        "post_views" => serde_json::to_value(db.get_collection::<PostView>()?)?,
        "post_likes" => serde_json::to_value(db.get_collection::<PostLike>()?)?,
        "comment_likes" => serde_json::to_value(db.get_collection::<CommentLike>()?)?,
        other => return Err(Error::msg(format!("unknown collection: {other}"))),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);

    cancel.cancel();

    Ok(())
}
