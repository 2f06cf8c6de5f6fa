use actix_web::cookie::Cookie;
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use serde_json::{json, Value};
use std::sync::Arc;

use trellis::config::{Config, DbBackend};
use trellis::core::graph_memory::MemoryGraph;
use trellis::token::TokenCodec;
use trellis::AppState;

fn state_with(config: Config) -> web::Data<AppState> {
    web::Data::new(AppState::new(config, Arc::new(MemoryGraph::new())))
}

fn memory_state() -> web::Data<AppState> {
    state_with(Config {
        db_backend: DbBackend::Memory,
        ..Config::default()
    })
}

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .configure(|cfg| trellis::configure(cfg, "/api")),
        )
        .await
    };
}

macro_rules! register_and_login {
    ($app:expr, $username:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/users")
            .set_json(json!({"username": $username, "password": "p"}))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/login")
            .set_json(json!({"username": $username, "password": "p"}))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        resp.response()
            .cookies()
            .find(|c| c.name() == "X-Token")
            .expect("login sets the auth cookie")
            .into_owned()
    }};
}

#[actix_web::test]
async fn test_full_user_flow() {
    let state = memory_state();
    let app = test_app!(state);

    let cookie = register_and_login!(app, "alice");
    assert!(cookie.http_only().unwrap_or(false));

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .cookie(cookie.clone())
        .set_json(json!({"content": "hi"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let post: Value = test::read_body_json(resp).await;
    let post_id = post["uuid"].as_str().expect("generated id").to_string();
    assert!(uuid::Uuid::parse_str(&post_id).is_ok());

    let req = test::TestRequest::get().uri(&format!("/api/posts/{}", post_id)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Value = test::read_body_json(resp).await;
    assert_eq!(fetched["content"], "hi");
    assert_eq!(fetched["author"], "/api/users/alice");
    assert_eq!(fetched["url"], format!("/api/posts/{}", post_id));

    let req = test::TestRequest::get().uri("/api/users/alice").to_request();
    let user: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(user["posts"], json!([format!("/api/posts/{}", post_id)]));
    assert_eq!(user["comments"], json!([]));
}

#[actix_web::test]
async fn test_duplicate_username() {
    let state = memory_state();
    let app = test_app!(state);
    let body = json!({"username": "alice", "password": "p"});

    let first = test::TestRequest::post().uri("/api/users").set_json(&body).to_request();
    assert_eq!(test::call_service(&app, first).await.status(), StatusCode::CREATED);

    let second = test::TestRequest::post().uri("/api/users").set_json(&body).to_request();
    let resp = test::call_service(&app, second).await;
    assert_eq!(resp.status(), StatusCode::NOT_ACCEPTABLE);
    let err: Value = test::read_body_json(resp).await;
    assert!(err["error"].as_str().unwrap().contains("alice"));

    let req = test::TestRequest::get().uri("/api/users").to_request();
    let users: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(users.as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn test_invalid_registration() {
    let state = memory_state();
    let app = test_app!(state);

    for body in [
        json!({"username": "al", "password": "p"}),
        json!({"username": "alice", "password": ""}),
        json!({"username": "<script>", "password": "p"}),
    ] {
        let req = test::TestRequest::post().uri("/api/users").set_json(&body).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}

#[actix_web::test]
async fn test_login_invalid_credentials() {
    let state = memory_state();
    let app = test_app!(state);
    let _ = register_and_login!(app, "alice");

    for body in [
        json!({"username": "alice", "password": "wrong"}),
        json!({"username": "nonexistent_user", "password": "p"}),
    ] {
        let req = test::TestRequest::post().uri("/api/login").set_json(&body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.response().cookies().next().is_none());
    }
}

#[actix_web::test]
async fn test_create_post_requires_auth() {
    let state = memory_state();
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .set_json(json!({"content": "Test post without auth"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .cookie(Cookie::new("X-Token", "garbage"))
        .set_json(json!({"content": "forged"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get().uri("/api/posts").to_request();
    let posts: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(posts, json!([]));
}

#[actix_web::test]
async fn test_bearer_header_and_expired_token() {
    let state = memory_state();
    let app = test_app!(state);
    let cookie = register_and_login!(app, "alice");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", cookie.value())))
        .set_json(json!({"content": "via header"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    // same secret, already past its expiry
    let expired = TokenCodec::new(&state.config.secret_key, -60).issue("alice").unwrap();
    let req = test::TestRequest::post()
        .uri("/api/posts")
        .cookie(Cookie::new("X-Token", expired.clone()))
        .set_json(json!({"content": "too late"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    // the feed page treats an expired token as a rejection, not as anonymous
    let req = test::TestRequest::get()
        .uri("/")
        .cookie(Cookie::new("X-Token", expired))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_posts_newest_first_and_comments_oldest_first() {
    let state = memory_state();
    let app = test_app!(state);
    let alice = register_and_login!(app, "alice");
    let bob = register_and_login!(app, "bob");

    let mut ids = Vec::new();
    for content in ["first", "second", "third"] {
        let req = test::TestRequest::post()
            .uri("/api/posts")
            .cookie(alice.clone())
            .set_json(json!({"content": content}))
            .to_request();
        let post: Value = test::call_and_read_body_json(&app, req).await;
        ids.push(post["uuid"].as_str().unwrap().to_string());
    }

    let req = test::TestRequest::get().uri("/api/posts").to_request();
    let posts: Value = test::call_and_read_body_json(&app, req).await;
    let contents: Vec<&str> = posts
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["third", "second", "first"]);

    let target = &ids[0];
    for (cookie, content) in [(&bob, "nice"), (&alice, "thanks"), (&bob, "anytime")] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/posts/{}/comments", target))
            .cookie(cookie.clone())
            .set_json(json!({"content": content}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/{}/comments", target))
        .to_request();
    let comments: Value = test::call_and_read_body_json(&app, req).await;
    let comments = comments.as_array().unwrap();
    let contents: Vec<&str> = comments.iter().map(|c| c["content"].as_str().unwrap()).collect();
    assert_eq!(contents, vec!["nice", "thanks", "anytime"]);
    assert_eq!(comments[0]["author"], "/api/users/bob");
    assert_eq!(comments[0]["post"], format!("/api/posts/{}", target));

    let comment_url = comments[1]["url"].as_str().unwrap().to_string();
    let req = test::TestRequest::get().uri(&comment_url).to_request();
    let single: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(single["content"], "thanks");

    let req = test::TestRequest::get().uri("/api/comments").to_request();
    let all: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let req = test::TestRequest::get().uri(&format!("/api/posts/{}", target)).to_request();
    let post: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(post["comments"].as_array().unwrap().len(), 3);
    assert_eq!(post["comments"][1], comment_url.as_str());
}

#[actix_web::test]
async fn test_comment_on_missing_post() {
    let state = memory_state();
    let app = test_app!(state);
    let cookie = register_and_login!(app, "alice");

    let missing = uuid::Uuid::new_v4();
    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/{}/comments", missing))
        .cookie(cookie)
        .set_json(json!({"content": "hello?"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/api/comments").to_request();
    let all: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(all, json!([]));
}

#[actix_web::test]
async fn test_missing_resources_are_404() {
    let state = memory_state();
    let app = test_app!(state);

    for uri in [
        "/api/users/nobody",
        "/api/posts/does-not-exist",
        "/api/posts/does-not-exist/comments",
        "/api/comments/does-not-exist",
        "/static/missing.js",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[actix_web::test]
async fn test_logout_clears_cookie() {
    let state = memory_state();
    let app = test_app!(state);

    let req = test::TestRequest::get().uri("/api/logout").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == "X-Token")
        .expect("removal cookie")
        .into_owned();
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(actix_web::cookie::time::Duration::ZERO));
}

#[actix_web::test]
async fn test_feed_page() {
    let state = memory_state();
    let app = test_app!(state);

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Nothing here yet."));
    assert!(body.contains(r#"data-api="/api""#));

    let cookie = register_and_login!(app, "alice");
    let req = test::TestRequest::post()
        .uri("/api/posts")
        .cookie(cookie.clone())
        .set_json(json!({"content": "read https://example.com <b>now</b>"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get().uri("/").cookie(cookie).to_request();
    let body = String::from_utf8(test::call_and_read_body(&app, req).await.to_vec()).unwrap();
    assert!(body.contains("Logged in as <strong>alice</strong>"));
    assert!(body.contains("(1 posts)"));
    assert!(body.contains(r#"<a href="https://example.com""#));
    assert!(!body.contains("<b>now</b>"));

    // malformed cookies are ignored on public pages
    let req = test::TestRequest::get()
        .uri("/")
        .cookie(Cookie::new("X-Token", "junk"))
        .to_request();
    let body = String::from_utf8(test::call_and_read_body(&app, req).await.to_vec()).unwrap();
    assert!(body.contains("Log in"));
}

#[actix_web::test]
async fn test_static_assets() {
    let state = memory_state();
    let app = test_app!(state);

    for (uri, mime) in [("/static/style.css", "text/css"), ("/static/app.js", "javascript")] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
        assert!(content_type.contains(mime), "{} -> {}", uri, content_type);
    }

    for uri in ["/login", "/register"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let body = String::from_utf8(test::call_and_read_body(&app, req).await.to_vec()).unwrap();
        assert!(body.contains("<form"));
    }
}

#[actix_web::test]
async fn test_markup_only_content_rejected() {
    let state = memory_state();
    let app = test_app!(state);
    let cookie = register_and_login!(app, "alice");

    for content in ["<b></b>", "<script>alert(1)</script>"] {
        let req = test::TestRequest::post()
            .uri("/api/posts")
            .cookie(cookie.clone())
            .set_json(json!({"content": content}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", content);
    }

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .cookie(cookie.clone())
        .set_json(json!({"content": "a & b"}))
        .to_request();
    let post: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(post["content"], "a &amp; b");
    let post_id = post["uuid"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/{}/comments", post_id))
        .cookie(cookie)
        .set_json(json!({"content": "<b></b>"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/api/posts").to_request();
    let posts: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(posts.as_array().unwrap().len(), 1);
    let req = test::TestRequest::get().uri("/api/comments").to_request();
    let comments: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(comments, json!([]));
}

#[actix_web::test]
async fn test_malformed_json_body() {
    let state = memory_state();
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: Value = test::read_body_json(resp).await;
    assert!(err["error"].as_str().unwrap().starts_with("Invalid request body"));

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({"username": 5}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: Value = test::read_body_json(resp).await;
    assert!(err["error"].is_string());
}

#[actix_web::test]
async fn test_cookie_expires_with_token() {
    let state = state_with(Config {
        db_backend: DbBackend::Memory,
        auth_token_duration_seconds: 60,
        cookie_max_age_seconds: 60 * 60 * 24 * 30,
        ..Config::default()
    });
    let app = test_app!(state);

    let cookie = register_and_login!(app, "alice");
    assert_eq!(cookie.max_age(), Some(actix_web::cookie::time::Duration::seconds(60)));
}
