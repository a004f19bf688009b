use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Widget {
    pub id: Uuid,
    pub name: String,
}

#[derive(Deserialize)]
pub struct NewWidget {
    pub name: String,
}

#[derive(Deserialize)]
pub struct UpdateWidget {
    pub name: Option<String>,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Widget>>>;

/// Shared server state. `hits` counts requests to the redirect chain.
#[derive(Clone, Default)]
pub struct AppState {
    pub widgets: Db,
    pub hits: Arc<AtomicUsize>,
}

pub fn app() -> Router {
    router(AppState::default())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/widgets", get(list_widgets).post(create_widget))
        .route(
            "/api/widgets/{id}",
            get(get_widget).put(update_widget).delete(delete_widget),
        )
        .route("/redirect/{n}", any(redirect_hop))
        .route("/hits", get(hits))
        .route("/relative", get(relative_redirect))
        .route("/bare-redirect", get(bare_redirect))
        .route("/moved/echo", any(moved_echo))
        .route("/echo", any(echo))
        .route("/text", get(text))
        .route("/blob", get(blob))
        .route("/malformed", get(malformed))
        .route("/status/{code}", any(status))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, AppState::default()).await
}

pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, router(state)).await
}

/// Bytes served by `/blob`: every byte value once.
pub fn blob_bytes() -> Vec<u8> {
    (0..=255).collect()
}

async fn list_widgets(State(state): State<AppState>) -> Json<Vec<Widget>> {
    let widgets = state.widgets.read().await;
    Json(widgets.values().cloned().collect())
}

async fn create_widget(
    State(state): State<AppState>,
    Json(input): Json<NewWidget>,
) -> (StatusCode, Json<Widget>) {
    let widget = Widget {
        id: Uuid::new_v4(),
        name: input.name,
    };
    state.widgets.write().await.insert(widget.id, widget.clone());
    (StatusCode::CREATED, Json(widget))
}

async fn get_widget(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Widget>, (StatusCode, String)> {
    let widgets = state.widgets.read().await;
    widgets.get(&id).cloned().map(Json).ok_or_else(|| not_found(id))
}

async fn update_widget(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateWidget>,
) -> Result<Json<Widget>, (StatusCode, String)> {
    let mut widgets = state.widgets.write().await;
    let widget = widgets.get_mut(&id).ok_or_else(|| not_found(id))?;
    if let Some(name) = input.name {
        widget.name = name;
    }
    Ok(Json(widget.clone()))
}

async fn delete_widget(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Widget>, (StatusCode, String)> {
    let mut widgets = state.widgets.write().await;
    widgets.remove(&id).map(Json).ok_or_else(|| not_found(id))
}

fn not_found(id: Uuid) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("widget {id} not found"))
}

async fn redirect_hop(State(state): State<AppState>, Path(n): Path<u32>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    if n == 0 {
        return Json(json!({ "redirects": "done" })).into_response();
    }
    (StatusCode::FOUND, [(header::LOCATION, format!("/redirect/{}", n - 1))]).into_response()
}

async fn hits(State(state): State<AppState>) -> Json<usize> {
    Json(state.hits.load(Ordering::SeqCst))
}

async fn relative_redirect() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "api/widgets")])
}

async fn bare_redirect() -> impl IntoResponse {
    (StatusCode::MOVED_PERMANENTLY, "moved somewhere")
}

async fn moved_echo() -> impl IntoResponse {
    (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, "/echo")])
}

/// Reflects the request back as JSON.
async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Value> {
    let value_of = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "method": method.as_str(),
        "accept": value_of(header::ACCEPT),
        "content_type": value_of(header::CONTENT_TYPE),
        "body": body,
    }))
}

async fn text() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "ninja")
}

async fn blob() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/octet-stream")], blob_bytes())
}

async fn malformed() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "{\"name\": ")
}

async fn status(Path(code): Path<u16>) -> impl IntoResponse {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, format!("status {code}"))
}
