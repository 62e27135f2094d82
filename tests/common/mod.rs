use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use tower::ServiceExt;
use triviarush::db::Db;
use triviarush::{names, router, AppState};

pub async fn create_test_db() -> Db {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let path =
        std::env::temp_dir().join(format!("triviarush_test_{}_{}.db", std::process::id(), id));
    // Clean up leftover file from previous runs
    let _ = std::fs::remove_file(&path);
    let url = format!("sqlite:{}", path.display());
    Db::new(url).await.expect("failed to create test database")
}

/// Returns the app plus a seeded player and their session token.
pub async fn app_with_player() -> (axum::Router, Db, i64, String) {
    let db = create_test_db().await;
    let user_id = db.create_user("tester").await.expect("create user");
    let token = db
        .create_user_session(user_id)
        .await
        .expect("create session");
    let app = router(AppState { db: db.clone() });
    (app, db, user_id, token)
}

pub async fn post_json(
    app: &axum::Router,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Response {
    let mut req = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        req = req.header(names::SESSION_TOKEN_HEADER, token);
    }
    app.clone()
        .oneshot(req.body(Body::from(body.to_string())).expect("request build"))
        .await
        .expect("router should respond")
}

pub async fn body_json(resp: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("body should be json")
}
