//! In-process mock of the facility backend for integration tests
//!
//! Binds an ephemeral port, so tests can run in parallel.

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use facility_client::auth::TokenStore;
use facility_client::config::ApiConfig;
use facility_client::ApiClient;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const EMAIL: &str = "ops@example.com";
pub const PASSWORD: &str = "secret";
pub const REFRESH_TOKEN: &str = "refresh-1";
pub const INITIAL_ACCESS: &str = "access-1";

pub struct MockState {
    pub base_url: String,
    /// The only access token the backend currently accepts
    pub valid_access: Mutex<String>,
    pub refresh_ok: AtomicBool,
    /// Answer the refresh endpoint with 503
    pub refresh_unavailable: AtomicBool,
    pub rotate_refresh: AtomicBool,
    pub paginate: AtomicBool,
    /// Point the first page's `next` link at another host
    pub foreign_next: AtomicBool,
    pub fail_logout: AtomicBool,
    pub fail_deletes: AtomicBool,
    /// Answer every location request with 401, even with a fresh token
    pub always_reject: AtomicBool,
    pub refresh_calls: AtomicUsize,
    pub location_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub authorization_headers: Mutex<Vec<Option<String>>>,
    pub locations: Mutex<Vec<Value>>,
    pub superuser: AtomicBool,
    pub next_id: AtomicUsize,
}

impl MockState {
    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn location_count(&self) -> usize {
        self.location_calls.load(Ordering::SeqCst)
    }

    pub fn logout_count(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    /// Make the backend reject the current access token (as if it expired)
    pub fn expire_access(&self, replacement: &str) {
        *self.valid_access.lock().unwrap() = replacement.to_string();
    }

    pub fn set(&self, flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn user_json(superuser: bool) -> Value {
    json!({
        "id": 7,
        "email": EMAIL,
        "username": "ops",
        "first_name": "Olive",
        "last_name": "Operator",
        "role": "operator",
        "organization": "Acme Fuels",
        "is_superuser": superuser,
        "permissions": ["facilities.view_location", "facilities.add_location"]
    })
}

pub async fn start() -> MockBackend {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("local addr");
    let base_url = format!("http://{}/api", addr);

    let state = Arc::new(MockState {
        base_url: base_url.clone(),
        valid_access: Mutex::new(INITIAL_ACCESS.to_string()),
        refresh_ok: AtomicBool::new(true),
        refresh_unavailable: AtomicBool::new(false),
        rotate_refresh: AtomicBool::new(false),
        paginate: AtomicBool::new(false),
        foreign_next: AtomicBool::new(false),
        fail_logout: AtomicBool::new(false),
        fail_deletes: AtomicBool::new(false),
        always_reject: AtomicBool::new(false),
        refresh_calls: AtomicUsize::new(0),
        location_calls: AtomicUsize::new(0),
        logout_calls: AtomicUsize::new(0),
        authorization_headers: Mutex::new(Vec::new()),
        locations: Mutex::new(vec![
            json!({"id": 1, "name": "North Depot", "address": "1 Main St", "city": "Springfield", "state": "IL", "zip_code": "62701"}),
            json!({"id": 2, "name": "South Yard", "city": "Shelbyville"}),
            json!({"id": 3, "name": "River Terminal", "is_active": false}),
        ]),
        superuser: AtomicBool::new(false),
        next_id: AtomicUsize::new(4),
    });

    let app = Router::new()
        .route("/api/auth/login/", post(login))
        .route("/api/auth/logout/", post(logout))
        .route("/api/auth/token/refresh/", post(refresh))
        .route("/api/auth/profile/", get(profile))
        .route("/api/facilities/locations/", get(list_locations).post(create_location))
        .route(
            "/api/facilities/locations/{id}/",
            get(get_location).patch(update_location).delete(delete_location),
        )
        .route("/api/facilities/tanks/", get(list_tanks))
        .route("/api/facilities/permits/", get(list_permits))
        .route("/api/permissions/users/{id}/grant/", post(grant))
        .with_state(state.clone());

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend {
        base_url,
        state,
        handle,
    }
}

pub fn client(backend: &MockBackend, store: Arc<dyn TokenStore>) -> Arc<ApiClient> {
    let config = ApiConfig {
        base_url: backend.base_url.clone(),
        timeout_secs: 5,
    };
    Arc::new(ApiClient::new(&config, store).expect("client"))
}

fn authorized(state: &MockState, headers: &HeaderMap) -> bool {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let expected = format!("Bearer {}", state.valid_access.lock().unwrap());
    header.as_deref() == Some(expected.as_str())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Given token not valid for any token type", "code": "token_not_valid"})),
    )
        .into_response()
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    if body["email"] == EMAIL && body["password"] == PASSWORD {
        let access = state.valid_access.lock().unwrap().clone();
        let superuser = state.superuser.load(Ordering::SeqCst);
        Json(json!({"access": access, "refresh": REFRESH_TOKEN, "user": user_json(superuser)})).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid email or password"}))).into_response()
    }
}

async fn logout(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    if state.fail_logout.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "Logout failed"}))).into_response();
    }
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    StatusCode::RESET_CONTENT.into_response()
}

async fn refresh(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let count = state.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;

    if state.refresh_unavailable.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"detail": "Service temporarily unavailable"})))
            .into_response();
    }

    if !state.refresh_ok.load(Ordering::SeqCst) || body["refresh"] != REFRESH_TOKEN {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Token is invalid or expired", "code": "token_not_valid"})),
        )
            .into_response();
    }

    let access = format!("access-refreshed-{}", count);
    *state.valid_access.lock().unwrap() = access.clone();

    if state.rotate_refresh.load(Ordering::SeqCst) {
        Json(json!({"access": access, "refresh": "refresh-rotated"})).into_response()
    } else {
        Json(json!({"access": access})).into_response()
    }
}

async fn profile(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let mut user = user_json(state.superuser.load(Ordering::SeqCst));
    user["first_name"] = json!("Olivia");
    Json(user).into_response()
}

async fn list_locations(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.location_calls.fetch_add(1, Ordering::SeqCst);
    state.authorization_headers.lock().unwrap().push(
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );

    if state.always_reject.load(Ordering::SeqCst) || !authorized(&state, &headers) {
        return unauthorized();
    }

    let locations = state.locations.lock().unwrap().clone();
    if !state.paginate.load(Ordering::SeqCst) {
        return Json(Value::Array(locations)).into_response();
    }

    let count = locations.len();
    let next_base = if state.foreign_next.load(Ordering::SeqCst) {
        "http://pages.elsewhere.invalid/api".to_string()
    } else {
        state.base_url.clone()
    };
    match query.get("page").map(String::as_str) {
        Some("2") => Json(json!({
            "count": count,
            "next": null,
            "previous": format!("{}/facilities/locations/", state.base_url),
            "results": locations[2..].to_vec(),
        }))
        .into_response(),
        _ => Json(json!({
            "count": count,
            "next": format!("{}/facilities/locations/?page=2", next_base),
            "previous": null,
            "results": locations[..2].to_vec(),
        }))
        .into_response(),
    }
}

async fn create_location(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    if body["name"].as_str().unwrap_or("").is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"name": ["This field may not be blank."]}))).into_response();
    }

    body["id"] = json!(state.next_id.fetch_add(1, Ordering::SeqCst));
    state.locations.lock().unwrap().push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

fn find_location(state: &MockState, id: i64) -> Option<Value> {
    state
        .locations
        .lock()
        .unwrap()
        .iter()
        .find(|l| l["id"] == id)
        .cloned()
}

async fn get_location(State(state): State<Arc<MockState>>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    match find_location(&state, id) {
        Some(location) => Json(location).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "No Location matches the given query."}))).into_response(),
    }
}

async fn update_location(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(patch): Json<Value>,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    let mut locations = state.locations.lock().unwrap();
    let Some(location) = locations.iter_mut().find(|l| l["id"] == id) else {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response();
    };
    if let (Some(target), Some(fields)) = (location.as_object_mut(), patch.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
    Json(location.clone()).into_response()
}

async fn delete_location(State(state): State<Arc<MockState>>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    if state.fail_deletes.load(Ordering::SeqCst) {
        return (
            StatusCode::CONFLICT,
            Json(json!({"error": "Location still has active tanks"})),
        )
            .into_response();
    }
    state.locations.lock().unwrap().retain(|l| l["id"] != id);
    StatusCode::NO_CONTENT.into_response()
}

async fn list_tanks(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let tanks = vec![
        json!({"id": 10, "location": 1, "tank_number": "T-1", "product": "diesel", "capacity": 10000.0, "status": "active"}),
        json!({"id": 11, "location": 2, "tank_number": "T-2", "product": "gasoline", "capacity": 8000.0, "status": "closed"}),
    ];
    let filtered: Vec<Value> = match query.get("location").and_then(|v| v.parse::<i64>().ok()) {
        Some(location) => tanks.into_iter().filter(|t| t["location"] == location).collect(),
        None => tanks,
    };
    Json(Value::Array(filtered)).into_response()
}

async fn list_permits(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "Permit registry is offline"}))).into_response()
}

async fn grant(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    Json(json!({"user_id": id, "permissions": ["facilities.view_location", body["code"]]})).into_response()
}
