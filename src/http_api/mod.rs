use std::{collections::BTreeMap, net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::allocation::{AllocationFragment, DayPlan, MultiDayAllocationPlan, merge_consecutive_days};
use crate::calculations::CpmResult;
use crate::error::ScheduleError;
use crate::metadata::ProjectMetadata;
use crate::project::{Project, RefreshSummary};
use crate::propagation::ValidationResult;
use crate::resource::Resource;
use crate::task::{Dependency, DependencyType, Task, TaskUpdate};

#[derive(Clone)]
pub struct AppState {
    project: Arc<RwLock<Project>>,
}

impl AppState {
    pub fn new(project: Project) -> Self {
        Self {
            project: Arc::new(RwLock::new(project)),
        }
    }

    pub fn with_shared(project: Arc<RwLock<Project>>) -> Self {
        Self { project }
    }

    fn project(&self) -> Arc<RwLock<Project>> {
        self.project.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<ScheduleError> for ApiError {
    fn from(value: ScheduleError) -> Self {
        match value {
            ScheduleError::TaskNotFound(_) => ApiError::NotFound(value.to_string()),
            ScheduleError::CycleDetected { .. }
            | ScheduleError::DuplicateTask(_)
            | ScheduleError::Validation { .. } => ApiError::Conflict(value.to_string()),
            other => ApiError::Invalid(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct LinkPayload {
    task_id: i32,
    predecessor_id: i32,
    #[serde(default, rename = "type")]
    dependency_type: DependencyType,
    /// Falls back to the predecessor's `lag_days` when absent.
    #[serde(default)]
    lag_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StartDatePayload {
    start_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct PlanPayload {
    total_minutes: u32,
    resource: Resource,
    start_date: NaiveDate,
    #[serde(default)]
    existing: BTreeMap<NaiveDate, u32>,
    #[serde(default)]
    use_overtime_by_default: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metadata", get(get_metadata).put(update_metadata))
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/:id/move", post(move_task))
        .route("/tasks/:id/validate", post(validate_move))
        .route("/dependencies", get(list_dependencies).post(create_dependency))
        .route("/cpm", get(get_cpm))
        .route("/refresh", post(refresh_project))
        .route("/audit", get(get_audit))
        .route("/audit/apply", post(apply_audit))
        .route("/allocations/plan", post(plan_allocation))
        .route("/allocations/merge", post(merge_allocation))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, project: Project) -> std::io::Result<()> {
    let state = AppState::new(project);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn get_metadata(State(state): State<AppState>) -> Json<ProjectMetadata> {
    let project = state.project();
    let metadata = project.read().metadata().clone();
    Json(metadata)
}

async fn update_metadata(
    State(state): State<AppState>,
    Json(metadata): Json<ProjectMetadata>,
) -> Json<ProjectMetadata> {
    let project = state.project();
    project.write().set_metadata(metadata.clone());
    Json(metadata)
}

async fn list_tasks(State(state): State<AppState>) -> Json<Vec<Task>> {
    let project = state.project();
    let tasks = project.read().tasks().to_vec();
    Json(tasks)
}

async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<i32>,
) -> Result<Json<Task>, ApiError> {
    let project = state.project();
    let guard = project.read();
    guard
        .task(task_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("task {task_id} not found")))
}

async fn create_task(
    State(state): State<AppState>,
    Json(task): Json<Task>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let project = state.project();
    let mut guard = project.write();
    if guard.task(task.id).is_some() {
        return Err(ScheduleError::DuplicateTask(task.id).into());
    }
    guard.upsert_task(task.clone())?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<i32>,
    Json(task): Json<Task>,
) -> Result<Json<Task>, ApiError> {
    if task.id != task_id {
        return Err(ApiError::invalid(
            "task id in payload does not match path parameter",
        ));
    }
    let project = state.project();
    let mut guard = project.write();
    if guard.task(task_id).is_none() {
        return Err(ApiError::not_found(format!("task {task_id} not found")));
    }
    guard.upsert_task(task.clone())?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let project = state.project();
    let removed = project.write().remove_task(task_id);
    if !removed {
        return Err(ApiError::not_found(format!("task {task_id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn move_task(
    State(state): State<AppState>,
    Path(task_id): Path<i32>,
    Json(payload): Json<StartDatePayload>,
) -> Result<Json<Vec<TaskUpdate>>, ApiError> {
    let project = state.project();
    let updates = project.write().move_task(task_id, payload.start_date)?;
    Ok(Json(updates))
}

async fn validate_move(
    State(state): State<AppState>,
    Path(task_id): Path<i32>,
    Json(payload): Json<StartDatePayload>,
) -> Result<Json<ValidationResult>, ApiError> {
    let project = state.project();
    let result = project.read().validate_move(task_id, payload.start_date)?;
    Ok(Json(result))
}

async fn list_dependencies(State(state): State<AppState>) -> Json<Vec<Dependency>> {
    let project = state.project();
    let dependencies = project.read().dependencies().to_vec();
    Json(dependencies)
}

async fn create_dependency(
    State(state): State<AppState>,
    Json(payload): Json<LinkPayload>,
) -> Result<(StatusCode, Json<Dependency>), ApiError> {
    let project = state.project();
    let dependency = project.write().link(
        payload.task_id,
        payload.predecessor_id,
        payload.dependency_type,
        payload.lag_time,
    )?;
    Ok((StatusCode::CREATED, Json(dependency)))
}

async fn get_cpm(State(state): State<AppState>) -> Result<Json<CpmResult>, ApiError> {
    let project = state.project();
    let result = project.read().critical_path()?;
    Ok(Json(result))
}

async fn refresh_project(
    State(state): State<AppState>,
) -> Result<Json<RefreshSummary>, ApiError> {
    let project = state.project();
    let summary = project.write().refresh()?;
    Ok(Json(summary))
}

async fn get_audit(State(state): State<AppState>) -> Json<Vec<TaskUpdate>> {
    let project = state.project();
    let updates = project.read().audit();
    Json(updates)
}

async fn apply_audit(State(state): State<AppState>) -> Json<Vec<TaskUpdate>> {
    let project = state.project();
    let updates = project.write().apply_audit();
    Json(updates)
}

async fn plan_allocation(
    State(state): State<AppState>,
    Json(payload): Json<PlanPayload>,
) -> Result<Json<MultiDayAllocationPlan>, ApiError> {
    let project = state.project();
    let plan = project.read().plan_allocation(
        payload.total_minutes,
        &payload.resource,
        payload.start_date,
        &payload.existing,
        payload.use_overtime_by_default,
    )?;
    Ok(Json(plan))
}

async fn merge_allocation(
    Json(days): Json<Vec<DayPlan>>,
) -> Result<Json<Vec<AllocationFragment>>, ApiError> {
    Ok(Json(merge_consecutive_days(&days)?))
}
