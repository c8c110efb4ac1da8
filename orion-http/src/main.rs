use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::{extract::State, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use orion_calendar::{CalendarNotifier, HttpCalendarNotifier};
use orion_core::{ProjectError, ProjectService};
use orion_store::{InMemoryProjectStore, ProjectStore};
use orion_types::{Caller, Project, ProjectChanges, ProjectKey, Role};

#[derive(Clone)]
struct AppState {
    service: Arc<ProjectService>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let bind_addr =
        std::env::var("ORION_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:7000".into());
    let calendar_url = std::env::var("ORION_CALENDAR_URL")
        .unwrap_or_else(|_| "https://calendar.photonranch.org".into());
    let stage = std::env::var("ORION_STAGE").unwrap_or_else(|_| "dev".into());

    // In-memory store for local serving; deployments plug a persistent
    // ProjectStore in here.
    let store: Arc<dyn ProjectStore> = Arc::new(InMemoryProjectStore::new());
    let calendar: Arc<dyn CalendarNotifier> =
        Arc::new(HttpCalendarNotifier::new(calendar_url, stage));
    let service = Arc::new(ProjectService::new(store, calendar));

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/new-project", post(new_project))
        .route("/modify-project", post(modify_project))
        .route("/get-project", post(get_project))
        .route("/get-all-projects", post(get_all_projects))
        .route("/get-user-projects", post(get_user_projects))
        .route("/add-project-event", post(add_project_event))
        .route("/add-project-data", post(add_project_data))
        .route("/delete-project", post(delete_project))
        .with_state(AppState { service })
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("Orion project store listening on {bind_addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Deserialize)]
struct KeyRequest {
    project_name: String,
    created_at: String,
}

impl KeyRequest {
    fn key(&self) -> ProjectKey {
        ProjectKey::new(self.project_name.clone(), self.created_at.clone())
    }
}

#[derive(Serialize)]
struct NewProjectResponse {
    new_project: Project,
}

async fn new_project(
    State(state): State<AppState>,
    Json(project): Json<Project>,
) -> Result<Json<NewProjectResponse>, (StatusCode, String)> {
    let new_project = state
        .service
        .add_project(project)
        .await
        .map_err(error_response)?;
    Ok(Json(NewProjectResponse { new_project }))
}

#[derive(Deserialize)]
struct ModifyRequest {
    project_name: String,
    created_at: String,
    project_changes: ProjectChanges,
}

async fn modify_project(
    State(state): State<AppState>,
    Json(req): Json<ModifyRequest>,
) -> Result<Json<orion_core::ModifyOutcome>, (StatusCode, String)> {
    let key = ProjectKey::new(req.project_name, req.created_at);
    // A missing project is a `false` envelope with status 200, as callers
    // have always seen from this endpoint.
    let outcome = state
        .service
        .modify_project(&key, req.project_changes)
        .await
        .map_err(error_response)?;
    Ok(Json(outcome))
}

async fn get_project(
    State(state): State<AppState>,
    Json(req): Json<KeyRequest>,
) -> Result<Json<Project>, (StatusCode, String)> {
    let project = state
        .service
        .get_project(&req.key())
        .await
        .map_err(error_response)?;
    Ok(Json(project))
}

async fn get_all_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<Project>>, (StatusCode, String)> {
    let projects = state
        .service
        .get_all_projects()
        .await
        .map_err(error_response)?;
    Ok(Json(projects))
}

#[derive(Deserialize)]
struct UserProjectsRequest {
    #[serde(default)]
    user_id: String,
}

async fn get_user_projects(
    State(state): State<AppState>,
    Json(req): Json<UserProjectsRequest>,
) -> Result<Json<Vec<Project>>, (StatusCode, String)> {
    let projects = state
        .service
        .get_user_projects(&req.user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(projects))
}

#[derive(Deserialize)]
struct AddEventRequest {
    project_name: String,
    created_at: String,
    event_id: String,
}

async fn add_project_event(
    State(state): State<AppState>,
    Json(req): Json<AddEventRequest>,
) -> Result<String, (StatusCode, String)> {
    let key = ProjectKey::new(req.project_name, req.created_at);
    let outcome = state
        .service
        .add_project_event(&key, req.event_id)
        .await
        .map_err(error_response)?;
    Ok(outcome.message().to_string())
}

#[derive(Deserialize)]
struct AddDataRequest {
    project_name: String,
    created_at: String,
    exposure_index: usize,
    base_filename: String,
}

async fn add_project_data(
    State(state): State<AppState>,
    Json(req): Json<AddDataRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let key = ProjectKey::new(req.project_name, req.created_at);
    state
        .service
        .add_project_data(&key, req.exposure_index, req.base_filename)
        .await
        .map_err(error_response)?;
    Ok(Json(serde_json::json!({ "message": "success" })))
}

async fn delete_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<KeyRequest>,
) -> Result<Json<Project>, (StatusCode, String)> {
    let caller = caller_from_headers(&headers)?;
    let deleted = state
        .service
        .delete_project(&req.key(), &caller)
        .await
        .map_err(error_response)?;
    Ok(Json(deleted))
}

/// Rebuild the caller identity the external authorizer forwarded:
/// `x-principal-id` holds the caller id, `x-user-roles` a JSON array of
/// role strings.
fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, (StatusCode, String)> {
    let principal = headers
        .get("x-principal-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                "missing x-principal-id header".to_string(),
            )
        })?;

    let roles: Vec<Role> = match headers.get("x-user-roles") {
        Some(value) => {
            let raw = value.to_str().map_err(|_| {
                (
                    StatusCode::BAD_REQUEST,
                    "x-user-roles header is not valid UTF-8".to_string(),
                )
            })?;
            serde_json::from_str(raw).map_err(|e| {
                (
                    StatusCode::BAD_REQUEST,
                    format!("x-user-roles header is not a JSON role list: {e}"),
                )
            })?
        }
        None => Vec::new(),
    };

    Ok(Caller::new(principal, roles))
}

fn error_response(err: ProjectError) -> (StatusCode, String) {
    let status = match &err {
        ProjectError::InvalidInput(_) | ProjectError::OutOfRange { .. } => {
            StatusCode::BAD_REQUEST
        }
        ProjectError::NotFound => StatusCode::NOT_FOUND,
        ProjectError::Forbidden => StatusCode::FORBIDDEN,
        ProjectError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        ProjectError::StoreWriteFailure(_) | ProjectError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}
