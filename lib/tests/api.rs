mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::Fixture;
use quill::post::PostStatus;
use quill::Result;

struct Api {
    app: Router,
}

impl Api {
    fn new(f: Fixture) -> Self {
        let app = quill::axum::app(Router::new(), Arc::new(f.db), Arc::new(f.config));
        Self { app }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

#[tokio::test]
async fn anonymous_listing_hides_drafts() -> Result<()> {
    let f = Fixture::new()?;
    f.post("Visible", PostStatus::Published)?;
    let draft = f.post("Hidden", PostStatus::Draft)?;
    let admin = f.token(&f.admin)?;
    let api = Api::new(f);

    let (status, body) = api.call(Method::GET, "/api/posts", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["title"], "Visible");

    let uri = format!("/api/posts/{}", draft.id);
    let (status, body) = api.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, body) = api.call(Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], "hidden");

    let (_, body) = api
        .call(Method::GET, "/api/posts?per_page=1", Some(&admin), None)
        .await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn writes_require_authentication() -> Result<()> {
    let f = Fixture::new()?;
    let api = Api::new(f);

    let (status, body) = api
        .call(
            Method::POST,
            "/api/posts",
            None,
            Some(json!({ "title": "Nope", "content": "text" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().is_some());

    let (status, _) = api
        .call(
            Method::POST,
            "/api/posts",
            Some("not-a-token"),
            Some(json!({ "title": "Nope", "content": "text" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn duplicate_slug_conflicts() -> Result<()> {
    let f = Fixture::new()?;
    let admin = f.token(&f.admin)?;
    let api = Api::new(f);

    let post = json!({ "title": "Same Title", "content": "text" });
    let (status, body) = api
        .call(Method::POST, "/api/posts", Some(&admin), Some(post.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["slug"], "same-title");
    assert_eq!(body["status"], "DRAFT");

    let (status, body) = api
        .call(Method::POST, "/api/posts", Some(&admin), Some(post))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"]
        .as_str()
        .unwrap_or_default()
        .contains("Slug is already in use"));
    Ok(())
}

#[tokio::test]
async fn taxonomy_writes_are_admin_only() -> Result<()> {
    let f = Fixture::new()?;
    let admin = f.token(&f.admin)?;
    let reader = f.token(&f.reader)?;
    let api = Api::new(f);

    let (status, _) = api
        .call(
            Method::POST,
            "/api/categories",
            Some(&reader),
            Some(json!({ "name": "Sneaky" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, category) = api
        .call(
            Method::POST,
            "/api/categories",
            Some(&admin),
            Some(json!({ "name": "Engineering" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(category["slug"], "engineering");

    let (status, _) = api
        .call(
            Method::POST,
            "/api/posts",
            Some(&admin),
            Some(json!({ "title": "Filed", "content": "text", "category": category["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/categories/{}", category["id"].as_str().unwrap_or_default());
    let (status, body) = api.call(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
    Ok(())
}

#[tokio::test]
async fn like_and_comment_flow() -> Result<()> {
    let f = Fixture::new()?;
    let post = f.post("Chatty", PostStatus::Published)?;
    let reader = f.token(&f.reader)?;
    let api = Api::new(f);

    let like = format!("/api/posts/{}/like", post.id);
    let (status, body) = api.call(Method::POST, &like, Some(&reader), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "liked": true, "likes": 1 }));
    let (_, body) = api.call(Method::POST, &like, Some(&reader), None).await;
    assert_eq!(body, json!({ "liked": false, "likes": 0 }));

    let comments = format!("/api/posts/{}/comments", post.id);
    let (status, parent) = api
        .call(
            Method::POST,
            &comments,
            Some(&reader),
            Some(json!({ "content": "Great read" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = api
        .call(
            Method::POST,
            &comments,
            Some(&reader),
            Some(json!({ "content": "Agreed", "parent": parent["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, threads) = api.call(Method::GET, &comments, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(threads.as_array().map(Vec::len), Some(1));
    assert_eq!(threads[0]["content"], "Great read");
    assert_eq!(threads[0]["author_name"], "Reader");
    assert_eq!(threads[0]["replies"][0]["content"], "Agreed");
    Ok(())
}

#[tokio::test]
async fn views_are_counted_once_per_client() -> Result<()> {
    let f = Fixture::new()?;
    let post = f.post("Popular", PostStatus::Published)?;
    let api = Api::new(f);

    let uri = format!("/api/posts/{}/view", post.id);
    let (status, body) = api.call(Method::POST, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["counted"], true);
    assert_eq!(body["views"], 1);

    let (_, body) = api.call(Method::POST, &uri, None, None).await;
    assert_eq!(body["counted"], false);
    assert_eq!(body["views"], 1);
    Ok(())
}

#[tokio::test]
async fn stats_are_for_admins() -> Result<()> {
    let f = Fixture::new()?;
    f.post("Counted", PostStatus::Published)?;
    let admin = f.token(&f.admin)?;
    let reader = f.token(&f.reader)?;
    let api = Api::new(f);

    let (status, _) = api.call(Method::GET, "/api/stats", Some(&reader), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = api
        .call(Method::GET, "/api/stats?period=week", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["period"], "week");
    assert_eq!(body["totals"]["posts"], 1);
    Ok(())
}

#[tokio::test]
async fn drafts_take_no_views_or_likes() -> Result<()> {
    let f = Fixture::new()?;
    let draft = f.post("Unreleased", PostStatus::Draft)?;
    let reader = f.token(&f.reader)?;
    let admin = f.token(&f.admin)?;
    let api = Api::new(f);

    let view = format!("/api/posts/{}/view", draft.id);
    let (status, _) = api.call(Method::POST, &view, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let like = format!("/api/posts/{}/like", draft.id);
    let (status, _) = api.call(Method::POST, &like, Some(&reader), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = api.call(Method::GET, &like, Some(&reader), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let related = format!("/api/posts/{}/related", draft.id);
    let (status, _) = api.call(Method::GET, &related, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // the author sees it, but a preview is not a view and can't be liked
    let (status, body) = api.call(Method::POST, &view, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "counted": false, "views": 0 }));
    let (status, _) = api.call(Method::POST, &like, Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/posts/{}", draft.id);
    let (_, body) = api.call(Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(body["view_count"], 0);
    assert_eq!(body["like_count"], 0);
    Ok(())
}

#[tokio::test]
async fn comment_likes_follow_post_visibility() -> Result<()> {
    let f = Fixture::new()?;
    let post = f.post("Talked about", PostStatus::Published)?;
    let c = quill::comment::create_comment(&f.db, &f.config, &f.admin, post.id, "pinned", None)?;
    quill::post::update_post_status(&f.db, post.id, PostStatus::Draft, None)?;
    let reader = f.token(&f.reader)?;
    let api = Api::new(f);

    let like = format!("/api/comments/{}/like", c.id);
    let (status, _) = api.call(Method::POST, &like, Some(&reader), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = api.call(Method::GET, &like, Some(&reader), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn only_admins_feature_posts() -> Result<()> {
    let f = Fixture::new()?;
    let admin = f.token(&f.admin)?;
    let reader = f.token(&f.reader)?;
    let api = Api::new(f);

    let (status, own) = api
        .call(
            Method::POST,
            "/api/posts",
            Some(&reader),
            Some(json!({ "title": "Mine", "content": "text", "featured": true })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(own["featured"], false);

    let uri = format!("/api/posts/{}", own["id"].as_str().unwrap_or_default());
    let (status, body) = api
        .call(
            Method::PUT,
            &uri,
            Some(&reader),
            Some(json!({ "title": "Mine", "content": "text", "featured": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["featured"], false);

    let featured = format!("{uri}/featured");
    let (status, body) = api.call(Method::PATCH, &featured, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["featured"], true);

    // neither leaving it out nor asking for false unfeatures it
    for edit in [
        json!({ "title": "Mine, edited", "content": "text" }),
        json!({ "title": "Mine, edited", "content": "text", "featured": false }),
    ] {
        let (status, body) = api.call(Method::PUT, &uri, Some(&reader), Some(edit)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["featured"], true);
    }

    let (_, body) = api
        .call(
            Method::PUT,
            &uri,
            Some(&admin),
            Some(json!({ "title": "Mine", "content": "text", "featured": false })),
        )
        .await;
    assert_eq!(body["featured"], false);
    Ok(())
}
