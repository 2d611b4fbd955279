mod common;

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;

use common::Fixture;
use quill::comment::{self, Comment, CommentLike};
use quill::post::{
    self, PostFilter, PostInput, PostLike, PostSort, PostSortField, PostStatus, PostView,
};
use quill::seo::{self, PostSeo};
use quill::table::{PageQuery, SortOrder};
use quill::taxonomy::{self, Category, PostTag, Tag};
use quill::{ErrorKind, Post, Result};
use uuid::Uuid;

#[test]
fn slug_uniqueness_on_create_and_update() -> Result<()> {
    let f = Fixture::new()?;
    let first = f.post("Hello World", PostStatus::Draft)?;
    assert_eq!(first.slug, "hello-world");

    let err = f.post("Hello, World!", PostStatus::Draft).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::SlugInUse(_)));
    assert!(err.to_string().contains("Slug is already in use"));

    let second = f.post("Second", PostStatus::Draft)?;
    let mut input = PostInput::new("Second", json!("edited"));
    input.slug = Some("hello-world".to_string());
    let err = post::update_post(&f.db, &f.config, second.id, input).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::SlugInUse(_)));

    // keeping its own slug is fine
    let mut input = PostInput::new("Hello World, revised", json!("edited"));
    input.slug = Some("hello-world".to_string());
    let updated = post::update_post(&f.db, &f.config, first.id, input)?;
    assert_eq!(updated.slug, "hello-world");
    assert_eq!(updated.title, "Hello World, revised");
    Ok(())
}

#[test]
fn renaming_slug_frees_the_old_one() -> Result<()> {
    let f = Fixture::new()?;
    let post = f.post("Original", PostStatus::Draft)?;
    let mut input = PostInput::new("Original", json!(""));
    input.slug = Some("renamed".to_string());
    post::update_post(&f.db, &f.config, post.id, input)?;

    assert!(post::get_post_by_slug(&f.db, "original").is_err());
    assert_eq!(post::get_post_by_slug(&f.db, "renamed")?.id, post.id);
    f.post("Original", PostStatus::Draft)?;
    Ok(())
}

#[test]
fn like_toggled_twice_returns_to_original_state() -> Result<()> {
    let f = Fixture::new()?;
    let post = f.post("Likeable", PostStatus::Published)?;

    let before = post::check_user_liked_post(&f.db, post.id, f.reader.id)?;
    post::toggle_post_like(&f.db, post.id, f.reader.id)?;
    post::toggle_post_like(&f.db, post.id, f.reader.id)?;
    assert_eq!(post::check_user_liked_post(&f.db, post.id, f.reader.id)?, before);
    assert_eq!(post::get_post(&f.db, post.id)?.like_count, 0);
    Ok(())
}

#[test]
fn terms_with_posts_cannot_be_deleted() -> Result<()> {
    let f = Fixture::new()?;
    let category = f.category("Engineering")?;
    let tag = f.tag("rust")?;
    let empty_category = f.category("Empty")?;
    let empty_tag = f.tag("unused")?;

    let mut input = PostInput::new("Tagged", json!("text"));
    input.category = Some(category.id);
    input.tags = vec![tag.id];
    post::create_post(&f.db, &f.config, &f.admin, input)?;

    let err = taxonomy::delete_category(&f.db, category.id).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::HasAssociatedPosts(_, 1)));
    let err = taxonomy::delete_tag(&f.db, tag.id).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::HasAssociatedPosts(_, 1)));

    taxonomy::delete_category(&f.db, empty_category.id)?;
    taxonomy::delete_tag(&f.db, empty_tag.id)?;

    let categories = taxonomy::list_categories(&f.db)?;
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].posts, 1);
    Ok(())
}

#[test]
fn publishing_sets_date_once() -> Result<()> {
    let f = Fixture::new()?;
    let post = f.post("Draft", PostStatus::Draft)?;
    assert!(!post.published);
    assert_eq!(post.published_at, None);

    let published = post::update_post_status(&f.db, post.id, PostStatus::Published, None)?;
    assert!(published.published);
    let stamped = published.published_at;
    assert!(stamped.is_some());

    let again = post::update_post_status(&f.db, post.id, PostStatus::Published, None)?;
    assert_eq!(again.published_at, stamped);

    let archived = post::update_post_status(&f.db, post.id, PostStatus::Archived, None)?;
    assert!(!archived.published);
    let back = post::update_post_status(&f.db, post.id, PostStatus::Published, None)?;
    assert_eq!(back.published_at, stamped);

    // editing the post keeps the date too
    let mut input = PostInput::new("Draft, edited", json!("more"));
    input.status = Some(PostStatus::Published);
    let edited = post::update_post(&f.db, &f.config, post.id, input)?;
    assert_eq!(edited.published_at, stamped);
    Ok(())
}

#[test]
fn deleting_post_leaves_no_orphans() -> Result<()> {
    let f = Fixture::new()?;
    let tag = f.tag("rust")?;
    let mut input = PostInput::new("Doomed", json!("text"));
    input.status = Some(PostStatus::Published);
    input.tags = vec![tag.id];
    let doomed = post::create_post(&f.db, &f.config, &f.admin, input)?;
    let survivor = f.post("Survivor", PostStatus::Published)?;

    for p in [&doomed, &survivor] {
        post::create_post_view(&f.db, p.id, "1.1.1.1", "test", None)?;
        post::toggle_post_like(&f.db, p.id, f.reader.id)?;
        let c = comment::create_comment(&f.db, &f.config, &f.reader, p.id, "nice", None)?;
        comment::create_comment(&f.db, &f.config, &f.admin, p.id, "thanks", Some(c.id))?;
        comment::toggle_comment_like(&f.db, c.id, f.admin.id)?;
        seo::upsert_post_seo(&f.db, p.id, PostSeo::default())?;
    }

    post::delete_post(&f.db, doomed.id)?;

    assert!(f.db.find::<Post>(doomed.id)?.is_none());
    assert!(post::get_post_by_slug(&f.db, "doomed").is_err());
    assert!(seo::get_post_seo(&f.db, doomed.id)?.is_none());
    assert!(f.db.get_collection::<PostView>()?.iter().all(|v| v.post == survivor.id));
    assert!(f.db.get_collection::<PostLike>()?.iter().all(|l| l.post == survivor.id));
    assert!(f.db.get_collection::<PostTag>()?.is_empty());
    let comments = f.db.get_collection::<Comment>()?;
    assert_eq!(comments.len(), 2);
    assert!(comments.iter().all(|c| c.post == survivor.id));
    let comment_likes = f.db.get_collection::<CommentLike>()?;
    assert_eq!(comment_likes.len(), 1);
    assert!(comments.iter().any(|c| c.id == comment_likes[0].comment));

    // the tag is free to go now
    taxonomy::delete_tag(&f.db, tag.id)?;
    Ok(())
}

#[test]
fn engagement_racing_a_delete_leaves_no_orphans() -> Result<()> {
    let f = Fixture::new()?;
    for round in 0..5 {
        let target = f.post(&format!("Contested {round}"), PostStatus::Published)?.id;
        let writer = {
            let (db, config, reader) = (f.db.clone(), f.config.clone(), f.reader.clone());
            std::thread::spawn(move || {
                for i in 0..200 {
                    let fan = Uuid::new_v4();
                    let liked = post::toggle_post_like(&db, target, fan).is_ok();
                    let _ = post::create_post_view(&db, target, &format!("10.0.{round}.{i}"), "racer", None);
                    match comment::create_comment(&db, &config, &reader, target, "first", None) {
                        Ok(c) => {
                            let _ = comment::toggle_comment_like(&db, c.id, fan);
                        }
                        Err(_) if !liked => break,
                        Err(_) => {}
                    }
                }
            })
        };
        post::delete_post(&f.db, target)?;
        writer.join().expect("writer thread panicked");

        assert!(f.db.find::<Post>(target)?.is_none());
        assert!(f.db.get_collection::<PostLike>()?.iter().all(|l| l.post != target));
        assert!(f.db.get_collection::<PostView>()?.iter().all(|v| v.post != target));
        let comments = f.db.get_collection::<Comment>()?;
        assert!(comments.iter().all(|c| c.post != target));
        let comment_likes = f.db.get_collection::<CommentLike>()?;
        assert!(comment_likes
            .iter()
            .all(|l| comments.iter().any(|c| c.id == l.comment)));
    }
    Ok(())
}

#[test]
fn filing_posts_racing_a_term_delete_keeps_references_valid() -> Result<()> {
    let f = Fixture::new()?;
    for round in 0..5 {
        let category = f.category(&format!("Racy {round}"))?.id;
        let tag = f.tag(&format!("racy-{round}"))?.id;
        let writer = {
            let (db, config, admin) = (f.db.clone(), f.config.clone(), f.admin.clone());
            std::thread::spawn(move || {
                for i in 0..50 {
                    let mut input = PostInput::new(format!("Racy {round} {i}"), json!("text"));
                    input.category = Some(category);
                    input.tags = vec![tag];
                    if post::create_post(&db, &config, &admin, input).is_err() {
                        break;
                    }
                }
            })
        };
        for outcome in [
            taxonomy::delete_category(&f.db, category),
            taxonomy::delete_tag(&f.db, tag),
        ] {
            if let Err(e) = outcome {
                assert!(matches!(e.kind, ErrorKind::HasAssociatedPosts(_, _)));
            }
        }
        writer.join().expect("writer thread panicked");

        let filed = f
            .db
            .get_collection::<Post>()?
            .iter()
            .filter(|p| p.category == Some(category))
            .count();
        match f.db.find::<Category>(category)? {
            Some(_) => assert_eq!(taxonomy::category_post_count(&f.db, category)?, filed),
            None => assert_eq!(filed, 0),
        }
        let linked = f
            .db
            .get_collection::<PostTag>()?
            .iter()
            .filter(|l| l.tag == tag)
            .count();
        match f.db.find::<Tag>(tag)? {
            Some(_) => assert_eq!(taxonomy::tag_post_count(&f.db, tag)?, linked),
            None => assert_eq!(linked, 0),
        }
    }
    Ok(())
}

#[test]
fn editing_tags_and_category_moves_counts() -> Result<()> {
    let f = Fixture::new()?;
    let notes = f.category("Notes")?;
    let essays = f.category("Essays")?;
    let rust = f.tag("rust")?;
    let web = f.tag("web")?;

    let mut input = PostInput::new("Moving", json!("text"));
    input.category = Some(notes.id);
    input.tags = vec![web.id, rust.id, rust.id];
    let created = post::create_post(&f.db, &f.config, &f.admin, input.clone())?;
    assert_eq!(created.tag_ids.len(), 2);
    assert_eq!(taxonomy::tag_post_count(&f.db, rust.id)?, 1);

    input.category = Some(essays.id);
    input.tags = vec![rust.id];
    let updated = post::update_post(&f.db, &f.config, created.id, input)?;
    assert_eq!(updated.tag_ids, vec![rust.id]);
    assert_eq!(taxonomy::category_post_count(&f.db, notes.id)?, 0);
    assert_eq!(taxonomy::category_post_count(&f.db, essays.id)?, 1);
    assert_eq!(taxonomy::tag_post_count(&f.db, web.id)?, 0);
    assert_eq!(taxonomy::tag_post_count(&f.db, rust.id)?, 1);
    assert_eq!(f.db.len::<PostTag>()?, 1);

    // a missing tag aborts the whole edit
    let mut input = PostInput::new("Moving", json!("text"));
    input.tags = vec![Uuid::new_v4()];
    let err = post::update_post(&f.db, &f.config, created.id, input).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotFound(_)));
    assert_eq!(post::get_post(&f.db, created.id)?.category, Some(essays.id));
    assert_eq!(taxonomy::category_post_count(&f.db, essays.id)?, 1);

    taxonomy::delete_category(&f.db, notes.id)?;
    taxonomy::delete_tag(&f.db, web.id)?;
    Ok(())
}

#[test]
fn featured_flag_survives_edits_without_it() -> Result<()> {
    let f = Fixture::new()?;
    let mut input = PostInput::new("Starred", json!("text"));
    input.featured = Some(true);
    let starred = post::create_post(&f.db, &f.config, &f.admin, input)?;
    assert!(starred.featured);

    let edited = post::update_post(&f.db, &f.config, starred.id, PostInput::new("Starred", json!("more")))?;
    assert!(edited.featured);

    let mut input = PostInput::new("Starred", json!("more"));
    input.featured = Some(false);
    assert!(!post::update_post(&f.db, &f.config, starred.id, input)?.featured);
    Ok(())
}

#[test]
fn scheduled_posts_get_published_when_due() -> Result<()> {
    let f = Fixture::new()?;
    let now = Utc::now();
    let due_at = now - Duration::minutes(5);

    let mut input = PostInput::new("Due", json!("text"));
    input.status = Some(PostStatus::Scheduled);
    input.scheduled_at = Some(due_at);
    let due = post::create_post(&f.db, &f.config, &f.admin, input)?;

    let mut input = PostInput::new("Later", json!("text"));
    input.status = Some(PostStatus::Scheduled);
    input.scheduled_at = Some(now + Duration::days(1));
    let later = post::create_post(&f.db, &f.config, &f.admin, input)?;

    assert_eq!(post::publish_scheduled(&f.db, now)?, vec![due.id]);
    let due = post::get_post(&f.db, due.id)?;
    assert_eq!(due.status, PostStatus::Published);
    assert_eq!(due.published_at, Some(due_at));
    assert_eq!(due.scheduled_at, None);
    assert_eq!(post::get_post(&f.db, later.id)?.status, PostStatus::Scheduled);

    // nothing left to do
    assert!(post::publish_scheduled(&f.db, now)?.is_empty());
    Ok(())
}

#[test]
fn listing_filters_sorts_and_paginates() -> Result<()> {
    let f = Fixture::new()?;
    let notes = f.category("Notes")?;
    let rust = f.tag("rust")?;
    for i in 0..5 {
        let mut input = PostInput::new(format!("Post {i}"), json!(format!("body {i}")));
        input.status = Some(PostStatus::Published);
        if i % 2 == 0 {
            input.category = Some(notes.id);
            input.tags = vec![rust.id];
        }
        post::create_post(&f.db, &f.config, &f.admin, input)?;
    }
    f.post("Hidden draft", PostStatus::Draft)?;

    let published = PostFilter {
        published_only: true,
        ..Default::default()
    };
    let page = post::list_posts(&f.db, &published, PostSort::default(), PageQuery::new(1, 2))?;
    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.items.len(), 2);
    assert!(page.has_next());

    let past_end = post::list_posts(&f.db, &published, PostSort::default(), PageQuery::new(9, 2))?;
    assert!(past_end.items.is_empty());
    assert_eq!(past_end.total, 5);

    let by_tag = PostFilter {
        tag: Some("rust".to_string()),
        category: Some("notes".to_string()),
        ..published.clone()
    };
    let sort = PostSort {
        sort: PostSortField::Title,
        order: SortOrder::Asc,
    };
    let titles = post::list_posts(&f.db, &by_tag, sort, PageQuery::default())?
        .items
        .into_iter()
        .map(|d| d.post.title)
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["Post 0", "Post 2", "Post 4"]);

    let search = PostFilter {
        search: Some("BODY 3".to_string()),
        ..Default::default()
    };
    let found = post::list_posts(&f.db, &search, PostSort::default(), PageQuery::default())?;
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].post.title, "Post 3");
    assert_eq!(found.items[0].author_name, "Admin");
    Ok(())
}

#[test]
fn related_posts_prefer_shared_tags() -> Result<()> {
    let f = Fixture::new()?;
    let notes = f.category("Notes")?;
    let rust = f.tag("rust")?;
    let web = f.tag("web")?;

    let create = |title: &str, category, tags: Vec<_>| {
        let mut input = PostInput::new(title, json!("text"));
        input.status = Some(PostStatus::Published);
        input.category = category;
        input.tags = tags;
        post::create_post(&f.db, &f.config, &f.admin, input)
    };
    let origin = create("Origin", Some(notes.id), vec![rust.id, web.id])?;
    create("Both tags", None, vec![rust.id, web.id])?;
    create("Same category", Some(notes.id), vec![])?;
    create("Unrelated", None, vec![])?;

    let related = post::related_posts(&f.db, origin.id, 5)?
        .into_iter()
        .map(|d| d.post.title)
        .collect::<Vec<_>>();
    assert_eq!(related, vec!["Both tags", "Same category"]);
    Ok(())
}

#[test]
fn comment_counts_only_approved() -> Result<()> {
    let mut f = Fixture::new()?;
    f.config.comments.moderation = true;
    let post = f.post("Discussed", PostStatus::Published)?;
    let pending = comment::create_comment(&f.db, &f.config, &f.reader, post.id, "first!", None)?;
    comment::create_comment(&f.db, &f.config, &f.admin, post.id, "admin note", None)?;

    let details = post::post_details(&f.db, post::get_post(&f.db, post.id)?)?;
    assert_eq!(details.comment_count, 1);

    comment::update_comment_status(&f.db, pending.id, comment::CommentStatus::Approved)?;
    let details = post::post_details(&f.db, post::get_post(&f.db, post.id)?)?;
    assert_eq!(details.comment_count, 2);
    Ok(())
}
