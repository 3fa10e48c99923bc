//! End-to-end tests of login and the live data path against a stub API
//! server bound to an ephemeral port.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use dairyview_core::api::ApiClient;
use dairyview_core::auth::{AuthState, Credentials, FileStore, HttpAuthenticator, KeyValueStore, SessionManager};
use dairyview_core::source::HttpSource;
use dairyview_core::{ApiError, Gateway};

const TOKEN: &str = "tok-1";

#[derive(Default)]
struct Stub {
    revoked: AtomicBool,
    last_auth: Mutex<Option<String>>,
    last_month: Mutex<Option<String>>,
}

type Shared = Arc<Stub>;

fn authorized(stub: &Stub, headers: &HeaderMap) -> bool {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *stub.last_auth.lock().unwrap() = auth.clone();
    !stub.revoked.load(Ordering::SeqCst) && auth.as_deref() == Some("Bearer tok-1")
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["username"] == "farmer" && body["password"] == "cows" {
        Json(json!({
            "token": TOKEN,
            "dairy_name": "T&K Dairy",
            "dairy_id": "401",
            "expires_in": 3600,
        }))
        .into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid username or password"}))).into_response()
    }
}

async fn tanks(State(stub): State<Shared>, Path(id): Path<String>, headers: HeaderMap) -> Response {
    if !authorized(&stub, &headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Token expired"}))).into_response();
    }
    Json(json!({
        "dairy_id": id,
        "tanks": [
            {"id": 1, "barn_name": "North Barn", "tank_name": "Tank 1",
             "current_volume_lbs": 42000, "capacity_lbs": 60000, "status": "normal"},
            {"id": 2, "barn_name": "South Barn", "tank_name": "Tank 2",
             "current_volume_lbs": 1200, "capacity_lbs": 50000, "status": "washing"}
        ]
    }))
    .into_response()
}

async fn routes(State(stub): State<Shared>, headers: HeaderMap) -> Response {
    authorized(&stub, &headers);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": "Routes database offline"}))).into_response()
}

async fn dashboard(State(stub): State<Shared>, headers: HeaderMap) -> Response {
    authorized(&stub, &headers);
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
}

async fn volumes(
    State(stub): State<Shared>,
    Query(params): Query<std::collections::HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&stub, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let month = params.get("month").cloned().unwrap_or_default();
    *stub.last_month.lock().unwrap() = Some(month.clone());
    Json(json!({
        "month": month,
        "total_volume": 300000,
        "total_pickup_count": 6,
        "volumes": [
            {"date": "2025-06-01", "volume": 200000, "pickup_count": 4, "customer": "Fairlife"},
            {"date": "2025-06-02", "volume": 100000, "pickup_count": 2, "customer": "Horizon"}
        ]
    }))
    .into_response()
}

struct Harness {
    stub: Shared,
    base_url: String,
    dir: tempfile::TempDir,
    store: Arc<FileStore>,
    sessions: Arc<SessionManager>,
    gateway: Gateway,
}

async fn setup() -> Harness {
    let stub = Shared::default();
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/tanks/:id", get(tanks))
        .route("/api/routes/:id/today", get(routes))
        .route("/api/dashboard/:id", get(dashboard))
        .route("/api/volumes/:id", get(volumes))
        .with_state(stub.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let base_url = format!("http://{}", addr);

    let api = ApiClient::new(&base_url, Duration::from_secs(5)).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let sessions = Arc::new(SessionManager::new(
        store.clone(),
        Arc::new(HttpAuthenticator::new(api.clone())),
    ));
    sessions.restore();
    let gateway = Gateway::new(Arc::new(HttpSource::new(api)), sessions.clone());

    Harness {
        stub,
        base_url,
        dir,
        store,
        sessions,
        gateway,
    }
}

async fn logged_in() -> Harness {
    let h = setup().await;
    h.sessions
        .login(&Credentials::new("farmer", "cows"))
        .await
        .expect("stub login should succeed");
    h
}

#[tokio::test]
async fn login_persists_session_fields() {
    let h = logged_in().await;

    let session = h.sessions.current().unwrap();
    assert_eq!(session.token, TOKEN);
    assert_eq!(session.tenant_name, "T&K Dairy");
    assert_eq!(session.tenant_id, "401");
    assert_eq!(h.store.get("auth_token").as_deref(), Some(TOKEN));
    assert_eq!(h.store.get("dairy_id").as_deref(), Some("401"));
    assert!(h.store.get("demo_mode").is_none());
    assert!(h.store.path().exists());
}

#[tokio::test]
async fn rejected_login_leaves_storage_untouched() {
    let h = setup().await;

    let err = h.sessions.login(&Credentials::new("farmer", "goats")).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidCredentials));
    assert_eq!(h.sessions.state(), AuthState::Anonymous);
    assert!(h.store.get("auth_token").is_none());
    assert!(!h.store.path().exists());
}

#[tokio::test]
async fn tanks_are_fetched_with_bearer_token() {
    let h = logged_in().await;

    let snapshot = h.gateway.tanks("401").await.unwrap();
    assert_eq!(snapshot.dairy_id, "401");
    assert_eq!(snapshot.tanks.len(), 2);
    assert_eq!(snapshot.tanks[0].name, "Tank 1");
    assert_eq!(snapshot.tanks[0].current_volume, 42000);
    assert_eq!(snapshot.total_volume(), 43200);
    // washing tanks never count as needing a wash
    assert!(snapshot.needing_wash().is_empty());
    assert_eq!(h.stub.last_auth.lock().unwrap().as_deref(), Some("Bearer tok-1"));
}

#[tokio::test]
async fn unauthorized_response_clears_session() {
    let h = logged_in().await;
    let mut rx = h.sessions.subscribe();
    h.stub.revoked.store(true, Ordering::SeqCst);

    let err = h.gateway.tanks("401").await.unwrap_err();
    assert!(matches!(err, ApiError::SessionExpired));
    assert!(h.sessions.current().is_none());
    assert!(h.store.get("auth_token").is_none());
    assert!(!h.store.path().exists());

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), AuthState::Anonymous);

    // Nothing left to send; the next call does not reach the server
    *h.stub.last_auth.lock().unwrap() = None;
    let err = h.gateway.tanks("401").await.unwrap_err();
    assert!(matches!(err, ApiError::NoSession));
    assert!(h.stub.last_auth.lock().unwrap().is_none());
}

#[tokio::test]
async fn error_detail_becomes_message() {
    let h = logged_in().await;

    let err = h.gateway.routes("401").await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "Routes database offline");
    assert!(h.sessions.is_authenticated());
}

#[tokio::test]
async fn unparseable_error_body_gets_generic_message() {
    let h = logged_in().await;

    let err = h.gateway.dashboard("401").await.unwrap_err();
    assert_eq!(err.to_string(), "API error: 500");
}

#[tokio::test]
async fn volumes_send_month_query() {
    let h = logged_in().await;

    let snapshot = h.gateway.volumes("401", Some("2025-06")).await.unwrap();
    assert_eq!(h.stub.last_month.lock().unwrap().as_deref(), Some("2025-06"));
    assert_eq!(snapshot.total_pickups, 6);

    let customers = snapshot.customer_summaries();
    assert_eq!(customers[0].customer, "Fairlife");
    assert_eq!(customers[0].invoice_count, 4);
    assert!((customers[0].market_share - 66.666).abs() < 0.01);
}

#[tokio::test]
async fn restart_restores_persisted_session() {
    let h = logged_in().await;

    let api = ApiClient::new(&h.base_url, Duration::from_secs(5)).unwrap();
    let reopened = Arc::new(FileStore::open(h.dir.path()).unwrap());
    let sessions = SessionManager::new(reopened, Arc::new(HttpAuthenticator::new(api)));
    let restored = sessions.restore().expect("session should restore");
    assert_eq!(restored.tenant_id, "401");
    assert!(sessions.is_authenticated());
}
