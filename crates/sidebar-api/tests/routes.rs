/// Route tests: requests go through the full router with `oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use sidebar_api::dispatcher::Dispatcher;
use sidebar_api::state::{AppState, AppStateInner, Features};
use sidebar_db::Database;
use sidebar_types::api::Claims;
use sidebar_types::events::SidebarEvent;

const SECRET: &str = "route-test-secret";

fn state(features: Features) -> AppState {
    Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: SECRET.into(),
        features,
        dispatcher: Dispatcher::new(),
    })
}

fn token(username: &str) -> String {
    let claims = Claims {
        sub: Uuid::new_v4(),
        username: username.into(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        req = req.header(header::AUTHORIZATION, format!("Bearer {}", token(user)));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn chat_requires_a_token() {
    let app = sidebar_api::router(state(Features::default()));

    let (status, body) = send(&app, "GET", "/api/plg_widget_chat/messages?path=/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");

    let (status, _) = send(&app, "GET", "/api/plg_widget_chat/messages?path=/", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn messages_are_listed_under_the_path() {
    let app = sidebar_api::router(state(Features::default()));

    for (path, text) in [("/docs/a.txt", "first"), ("/docs/b.txt", "second"), ("/tmp/x", "other")] {
        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/plg_widget_chat/messages?path={}", path),
            Some("alice"),
            Some(json!({ "message": text })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok", "result": null }));
    }

    let (_, body) = send(&app, "GET", "/api/plg_widget_chat/messages?path=/docs/", Some("bob"), None).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["message"], "first");
    assert_eq!(results[1]["message"], "second");
    assert_eq!(results[0]["author"], "alice");
}

#[tokio::test]
async fn relative_paths_and_empty_messages_are_rejected() {
    let app = sidebar_api::router(state(Features::default()));

    let (status, body) = send(&app, "GET", "/api/plg_widget_chat/messages?path=docs", Some("a"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid path");

    let (status, _) = send(
        &app,
        "POST",
        "/api/plg_widget_chat/messages?path=/docs/",
        Some("a"),
        Some(json!({ "message": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn posting_broadcasts_mentions() {
    let state = state(Features::default());
    state.db.record_user("Bob Stone").unwrap();
    let mut events = state.dispatcher.subscribe();
    let app = sidebar_api::router(state);

    send(
        &app,
        "POST",
        "/api/plg_widget_chat/messages?path=/docs/",
        Some("alice"),
        Some(json!({ "message": "ping @bob.stone and @new.person" })),
    )
    .await;

    let mut mentions = Vec::new();
    let mut created = false;
    while let Ok(event) = events.try_recv() {
        match event {
            SidebarEvent::Mention { mention, author, .. } => {
                assert_eq!(author, "alice");
                mentions.push(mention);
            }
            SidebarEvent::MessageCreate { path, .. } => {
                assert_eq!(path, "/docs/");
                created = true;
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert_eq!(mentions, ["Bob Stone", "new person"]);
    assert!(created);
}

#[tokio::test]
async fn lookup_matches_prefix_and_hides_from_shares() {
    let state = state(Features::default());
    for name in ["Alice", "alan", "Bob"] {
        state.db.record_user(name).unwrap();
    }
    let app = sidebar_api::router(state);

    let (_, body) = send(&app, "GET", "/api/plg_widget_chat/lookup?q=al", Some("x"), None).await;
    assert_eq!(body["results"], json!([{ "name": "alan" }, { "name": "Alice" }]));

    let (_, body) = send(&app, "GET", "/api/plg_widget_chat/lookup?q=al&share=s1", Some("x"), None).await;
    assert_eq!(body["results"], json!([]));
}

#[tokio::test]
async fn descriptions_round_trip() {
    let state = state(Features::default());
    let mut events = state.dispatcher.subscribe();
    let app = sidebar_api::router(state);
    let uri = "/api/plg_widget_description/description?path=/docs/";

    let (status, body) = send(&app, "GET", uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], Value::Null);

    let (status, _) = send(&app, "PUT", uri, None, Some(json!({ "text": "Team docs" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        events.try_recv().unwrap(),
        SidebarEvent::DescriptionUpdate {
            path: "/docs/".into()
        }
    );

    let (_, body) = send(&app, "GET", uri, None, None).await;
    assert_eq!(body["result"], json!({ "path": "/docs/", "text": "Team docs" }));
}

#[tokio::test]
async fn disabled_widgets_answer_forbidden() {
    let app = sidebar_api::router(state(Features {
        chat: false,
        description: true,
    }));

    let (status, body) = send(&app, "GET", "/api/plg_widget_chat/lookup?q=a", Some("x"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "status": "error", "message": "Not allowed" }));

    let (status, _) = send(&app, "GET", "/api/plg_widget_description/description?path=/", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
