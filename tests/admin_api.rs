use std::{
    env, fs,
    path::PathBuf,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    Router, body,
    body::Body,
    http::{Request, StatusCode},
};
use futures::future::BoxFuture;
use serde_json::{Value, json};
use tower::ServiceExt;

use trivia_back::{
    config::SettingsStore,
    dao::question_source::{QuestionFilters, QuestionSource, SourceBatch, SourceResult},
    routes,
    state::{AppState, SharedState},
};

const TOKEN: &str = "operator-token";

struct EmptySource;

impl QuestionSource for EmptySource {
    fn fetch(
        &self,
        _amount: u32,
        _filters: QuestionFilters,
    ) -> BoxFuture<'static, SourceResult<SourceBatch>> {
        Box::pin(async { Ok(SourceBatch::default()) })
    }
}

struct TestApp {
    app: Router,
    state: SharedState,
    settings_path: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(dir) = self.settings_path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }
}

async fn test_app(name: &str) -> TestApp {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let settings_path = env::temp_dir()
        .join(format!("trivia_back_api_{name}_{suffix}"))
        .join("trivia.json");

    let (state, runner) =
        AppState::new(SettingsStore::open(&settings_path), Arc::new(EmptySource)).await;
    tokio::spawn(runner.run());
    state.admin_token().lock().await.replace(TOKEN.to_string());

    TestApp {
        app: routes::router(state.clone()),
        state,
        settings_path,
    }
}

fn admin_request(method: &str, uri: &str, payload: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-admin-token", TOKEN);
    match payload {
        Some(payload) => builder
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn admin_routes_require_the_stream_token() {
    let test = test_app("token").await;

    let missing = Request::get("/admin/trivia/status")
        .body(Body::empty())
        .expect("request");
    let response = test.app.clone().oneshot(missing).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let wrong = Request::get("/admin/trivia/status")
        .header("x-admin-token", "guess")
        .body(Body::empty())
        .expect("request");
    let response = test.app.clone().oneshot(wrong).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = test
        .app
        .clone()
        .oneshot(admin_request("GET", "/admin/trivia/status", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let status = json_body(response).await;
    assert_eq!(status["enabled"], true);
    assert_eq!(status["audience"], 0);
    assert_eq!(status["fetching"], false);
}

#[tokio::test]
async fn invalid_difficulty_is_rejected_before_persisting() {
    let test = test_app("difficulty").await;

    let response = test
        .app
        .clone()
        .oneshot(admin_request(
            "PUT",
            "/admin/trivia/difficulty",
            Some(json!({ "difficulty": "extreme" })),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!test.settings_path.exists());

    let response = test
        .app
        .clone()
        .oneshot(admin_request(
            "PUT",
            "/admin/trivia/difficulty",
            Some(json!({ "difficulty": "Hard" })),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["difficulty"], "hard");

    let persisted: Value =
        serde_json::from_str(&fs::read_to_string(&test.settings_path).expect("settings file"))
            .expect("json");
    assert_eq!(persisted["difficulty"], "hard");
}

#[tokio::test]
async fn wildcard_filters_are_stored_empty() {
    let test = test_app("wildcards").await;

    for (uri, payload, field) in [
        ("/admin/trivia/category", json!({ "category": "none" }), "category"),
        ("/admin/trivia/type", json!({ "type": "-" }), "type"),
    ] {
        let response = test
            .app
            .clone()
            .oneshot(admin_request("PUT", uri, Some(payload)))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await[field], "");
    }
}

#[tokio::test]
async fn trigger_now_conflicts_while_disabled() {
    let test = test_app("now").await;

    let response = test
        .app
        .clone()
        .oneshot(admin_request("POST", "/admin/trivia/disable", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = test
        .app
        .clone()
        .oneshot(admin_request("POST", "/admin/trivia/now", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let status = test.state.scheduler().status().await.expect("status");
    assert!(!status.enabled);
    assert!(!status.running);
}

#[tokio::test]
async fn delay_change_restarts_and_is_reported_in_config() {
    let test = test_app("delay").await;
    let before = test.state.scheduler().status().await.expect("status");

    let response = test
        .app
        .clone()
        .oneshot(admin_request(
            "PUT",
            "/admin/trivia/delay",
            Some(json!({ "answer_seconds": 20, "between_seconds": 0 })),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = test
        .app
        .clone()
        .oneshot(admin_request("GET", "/admin/trivia/config", None))
        .await
        .expect("response");
    let config = json_body(response).await;
    assert_eq!(config["answer_delay_seconds"], 20);
    assert_eq!(config["between_questions_delay_seconds"], 0);

    let after = test.state.scheduler().status().await.expect("status");
    assert!(after.generation > before.generation);
    assert_eq!(after.queue_size, 0);

    let response = test
        .app
        .clone()
        .oneshot(admin_request(
            "PUT",
            "/admin/trivia/delay",
            Some(json!({ "answer_seconds": 0, "between_seconds": 5 })),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn healthcheck_reports_ok_while_the_loop_runs() {
    let test = test_app("health").await;

    let response = test
        .app
        .clone()
        .oneshot(
            Request::get("/healthcheck")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}
