//! Mock of the note application's Local REST API.
//!
//! Serves an in-memory `Vault` over the same paths, headers and status codes
//! the real plugin uses, behind a bearer-token check. Integration tests start
//! it on a random port; `main.rs` runs it standalone.

pub mod vault;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, RawQuery, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub use vault::{Opened, Position, Vault};

const NOTE_JSON: &str = "application/vnd.olrapi.note+json";
const DQL: &str = "application/vnd.olrapi.dataview.dql+txt";
const JSON_LOGIC: &str = "application/vnd.olrapi.jsonlogic+json";
const DEFAULT_BOUNDARY: &str = "::";
const DEFAULT_CONTEXT_LENGTH: usize = 100;

pub type SharedVault = Arc<RwLock<Vault>>;

#[derive(Clone)]
pub struct AppState {
    token: Arc<str>,
    vault: SharedVault,
}

/// Router over a fresh vault.
pub fn app(token: &str) -> Router {
    router(token, Arc::new(RwLock::new(Vault::new())))
}

/// Router over a caller-held vault, so tests can seed it and inspect it.
pub fn router(token: &str, vault: SharedVault) -> Router {
    let state = AppState {
        token: Arc::from(token),
        vault,
    };
    Router::new()
        .route(
            "/active/",
            get(get_active)
                .post(append_active)
                .put(replace_active)
                .patch(patch_active)
                .delete(delete_active),
        )
        .route("/vault/", get(list_root))
        .route(
            "/vault/{*path}",
            get(get_file)
                .put(put_file)
                .post(append_file)
                .patch(patch_file)
                .delete(delete_file),
        )
        .route(
            "/periodic/{period}/",
            get(get_periodic)
                .post(append_periodic)
                .put(replace_periodic)
                .patch(patch_periodic)
                .delete(delete_periodic),
        )
        .route("/commands/", get(list_commands))
        .route("/commands/{id}", post(run_command))
        .route("/search/", post(structured_search))
        .route("/search/gui/", post(gui_search))
        .route("/search/{*query}", post(simple_search))
        .route("/open/{*path}", post(open_file))
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state)
}

pub async fn run(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}

fn failure(status: StatusCode, error_code: u32, message: &str) -> Response {
    (
        status,
        Json(json!({ "errorCode": error_code, "message": message })),
    )
        .into_response()
}

fn not_found() -> Response {
    failure(StatusCode::NOT_FOUND, 40400, "File does not exist")
}

async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let expected = format!("Bearer {}", state.token);
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if presented == Some(expected.as_str()) {
        next.run(request).await
    } else {
        failure(
            StatusCode::UNAUTHORIZED,
            40101,
            "Authorization required. Find your API Key in the 'Local REST API' section of your settings.",
        )
    }
}

// -- Note operations shared by active, vault and periodic routes ------------

fn wants_note_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(NOTE_JSON))
}

async fn read_note(vault: &SharedVault, path: &str, headers: &HeaderMap) -> Response {
    let vault = vault.read().await;
    let Some(file) = vault.read(path) else {
        return not_found();
    };
    if wants_note_json(headers) {
        (
            [(header::CONTENT_TYPE, NOTE_JSON)],
            Json(vault::note_json(path, file)),
        )
            .into_response()
    } else {
        (
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            file.content.clone(),
        )
            .into_response()
    }
}

async fn patch_note(vault: &SharedVault, path: &str, headers: &HeaderMap, body: &str) -> Response {
    let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let Some(heading) = header_str("Heading") else {
        return failure(StatusCode::BAD_REQUEST, 40050, "Heading header is required");
    };
    let position = match header_str("Content-Insertion-Position") {
        Some("end") => Position::End,
        Some("beginning") => Position::Beginning,
        _ => {
            return failure(
                StatusCode::BAD_REQUEST,
                40051,
                "Content-Insertion-Position must be 'beginning' or 'end'",
            )
        }
    };
    let boundary = header_str("Heading-Boundary").unwrap_or(DEFAULT_BOUNDARY);
    let heading_path: Vec<&str> = heading.split(boundary).collect();

    let mut vault = vault.write().await;
    if vault.read(path).is_none() {
        return not_found();
    }
    match vault.insert(path, &heading_path, position, body) {
        Some(()) => StatusCode::OK.into_response(),
        None => failure(StatusCode::BAD_REQUEST, 40080, "Heading not found"),
    }
}

async fn active_path(vault: &SharedVault) -> Option<String> {
    vault.read().await.active.clone()
}

// -- /active/ ----------------------------------------------------------------

async fn get_active(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match active_path(&state.vault).await {
        Some(path) => read_note(&state.vault, &path, &headers).await,
        None => not_found(),
    }
}

async fn append_active(State(state): State<AppState>, body: String) -> Response {
    let Some(path) = active_path(&state.vault).await else {
        return not_found();
    };
    state.vault.write().await.append(&path, &body);
    StatusCode::NO_CONTENT.into_response()
}

async fn replace_active(State(state): State<AppState>, body: String) -> Response {
    let Some(path) = active_path(&state.vault).await else {
        return not_found();
    };
    state.vault.write().await.write(&path, &body);
    StatusCode::NO_CONTENT.into_response()
}

async fn patch_active(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    match active_path(&state.vault).await {
        Some(path) => patch_note(&state.vault, &path, &headers, &body).await,
        None => not_found(),
    }
}

async fn delete_active(State(state): State<AppState>) -> Response {
    let Some(path) = active_path(&state.vault).await else {
        return not_found();
    };
    state.vault.write().await.delete(&path);
    StatusCode::NO_CONTENT.into_response()
}

// -- /vault/ -----------------------------------------------------------------

async fn list_root(State(state): State<AppState>) -> Response {
    list_dir(&state.vault, "").await
}

async fn list_dir(vault: &SharedVault, dir: &str) -> Response {
    match vault.read().await.list(dir) {
        Some(files) => Json(json!({ "files": files })).into_response(),
        None => not_found(),
    }
}

async fn get_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    if path.ends_with('/') {
        return list_dir(&state.vault, &path).await;
    }
    read_note(&state.vault, &path, &headers).await
}

async fn put_file(State(state): State<AppState>, Path(path): Path<String>, body: String) -> Response {
    state.vault.write().await.write(&path, &body);
    StatusCode::NO_CONTENT.into_response()
}

async fn append_file(State(state): State<AppState>, Path(path): Path<String>, body: String) -> Response {
    state.vault.write().await.append(&path, &body);
    StatusCode::NO_CONTENT.into_response()
}

async fn patch_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    patch_note(&state.vault, &path, &headers, &body).await
}

async fn delete_file(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    if state.vault.write().await.delete(&path) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        not_found()
    }
}

// -- /periodic/{period}/ -----------------------------------------------------

fn periodic_path(period: &str) -> Option<String> {
    matches!(period, "daily" | "weekly" | "monthly" | "quarterly" | "yearly")
        .then(|| format!("periodic/{period}.md"))
}

fn unknown_period() -> Response {
    failure(StatusCode::BAD_REQUEST, 40060, "Unknown period")
}

async fn get_periodic(
    State(state): State<AppState>,
    Path(period): Path<String>,
    headers: HeaderMap,
) -> Response {
    let Some(path) = periodic_path(&period) else {
        return unknown_period();
    };
    read_note(&state.vault, &path, &headers).await
}

async fn append_periodic(State(state): State<AppState>, Path(period): Path<String>, body: String) -> Response {
    let Some(path) = periodic_path(&period) else {
        return unknown_period();
    };
    state.vault.write().await.append(&path, &body);
    StatusCode::NO_CONTENT.into_response()
}

async fn replace_periodic(State(state): State<AppState>, Path(period): Path<String>, body: String) -> Response {
    let Some(path) = periodic_path(&period) else {
        return unknown_period();
    };
    state.vault.write().await.write(&path, &body);
    StatusCode::NO_CONTENT.into_response()
}

async fn patch_periodic(
    State(state): State<AppState>,
    Path(period): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let Some(path) = periodic_path(&period) else {
        return unknown_period();
    };
    patch_note(&state.vault, &path, &headers, &body).await
}

async fn delete_periodic(State(state): State<AppState>, Path(period): Path<String>) -> Response {
    let Some(path) = periodic_path(&period) else {
        return unknown_period();
    };
    if state.vault.write().await.delete(&path) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        not_found()
    }
}

// -- /commands/ --------------------------------------------------------------

async fn list_commands(State(state): State<AppState>) -> Response {
    let vault = state.vault.read().await;
    Json(json!({ "commands": vault.commands })).into_response()
}

async fn run_command(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let mut vault = state.vault.write().await;
    if !vault.commands.iter().any(|c| c.id == id) {
        return failure(StatusCode::NOT_FOUND, 40400, "Command does not exist");
    }
    tracing::debug!(command = %id, "running command");
    vault.commands_run.push(id);
    StatusCode::NO_CONTENT.into_response()
}

// -- /search/ ----------------------------------------------------------------

async fn structured_search(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let vault = state.vault.read().await;

    if content_type.starts_with(DQL) {
        if !body.trim_start().to_ascii_uppercase().starts_with("TABLE") {
            return failure(StatusCode::BAD_REQUEST, 40070, "Only TABLE queries are supported");
        }
        let results: Vec<Value> = vault
            .paths()
            .map(|(path, _)| json!({ "filename": path, "result": {} }))
            .collect();
        return Json(results).into_response();
    }

    if content_type.starts_with(JSON_LOGIC) {
        let Ok(query) = serde_json::from_str::<Value>(&body) else {
            return failure(StatusCode::BAD_REQUEST, 40090, "Invalid JSON");
        };
        let Some(pattern) = glob_on_path(&query) else {
            return failure(StatusCode::BAD_REQUEST, 40071, "Unsupported JsonLogic expression");
        };
        let results: Vec<Value> = vault
            .paths()
            .filter(|(path, _)| vault::glob_match(pattern, path))
            .map(|(path, _)| json!({ "filename": path, "result": true }))
            .collect();
        return Json(results).into_response();
    }

    failure(
        StatusCode::BAD_REQUEST,
        40010,
        "Content-Type must name a supported query format",
    )
}

/// Pattern of a `{"glob": [PATTERN, {"var": "path"}]}` expression.
fn glob_on_path(query: &Value) -> Option<&str> {
    let args = query.get("glob")?.as_array()?;
    match args.as_slice() {
        [pattern, target] if target.get("var").and_then(Value::as_str) == Some("path") => pattern.as_str(),
        _ => None,
    }
}

/// Split `QUERY&contextLength=N`, falling back to the default length.
fn split_context_length(raw: &str) -> (&str, usize) {
    match raw.rsplit_once("&contextLength=") {
        Some((query, n)) => (query, n.parse().unwrap_or(DEFAULT_CONTEXT_LENGTH)),
        None => (raw, DEFAULT_CONTEXT_LENGTH),
    }
}

fn text_search(vault: &Vault, query: &str, context_length: usize) -> Vec<Value> {
    vault
        .paths()
        .filter_map(|(path, file)| {
            let matches = vault::find_matches(&file.content, query, context_length);
            (!matches.is_empty()).then(|| {
                json!({
                    "filename": path,
                    "score": matches.len() as f64,
                    "matches": matches,
                })
            })
        })
        .collect()
}

async fn simple_search(State(state): State<AppState>, Path(raw): Path<String>) -> Response {
    let (query, context_length) = split_context_length(&raw);
    let vault = state.vault.read().await;
    Json(text_search(&vault, query, context_length)).into_response()
}

async fn gui_search(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Response {
    let raw = raw.unwrap_or_default();
    let (query, context_length) = split_context_length(&raw);
    let vault = state.vault.read().await;
    Json(text_search(&vault, query, context_length)).into_response()
}

// -- /open/ ------------------------------------------------------------------

#[derive(Deserialize)]
struct OpenParams {
    #[serde(rename = "newLeaf", default)]
    new_leaf: bool,
}

async fn open_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(params): Query<OpenParams>,
) -> Response {
    let mut vault = state.vault.write().await;
    if vault.read(&path).is_none() {
        vault.write(&path, "");
    }
    tracing::debug!(path = %path, new_leaf = params.new_leaf, "opening note");
    vault.active = Some(path.clone());
    vault.opened.push(Opened {
        path,
        new_leaf: params.new_leaf,
    });
    StatusCode::OK.into_response()
}
