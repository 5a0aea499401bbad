// Resource Allocation - REST API with Axum
//
// Same calculator and submitter as the terminal dialog, behind HTTP.
// The connection is shared through a mutex; every insert goes through the
// conditional insert so concurrent requests cannot over-allocate.

use crate::allocation::submit_allocation;
use crate::availability::{annotate, annotate_all, compute_availability, ResourceAvailability};
use crate::db;
use crate::entities::Allocation;
use crate::error::AllocationError;
use crate::notify::{Notification, NotificationSink, TracingSink};
use crate::store::SqliteStore;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        AppState {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::internal("database lock poisoned".to_string()))
    }
}

/// API Response wrapper
#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Resource with availability (flattened for API)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResourceResponse {
    pub id: String,
    pub name: String,
    pub resource_type: String,
    pub unit: String,
    pub quantity: f64,
    pub cost_per_unit: f64,
    pub returnable: bool,
    pub allocated: f64,
    pub available: f64,
    pub status: String,
}

impl From<ResourceAvailability> for ResourceResponse {
    fn from(view: ResourceAvailability) -> Self {
        Self {
            status: view.status.as_str().to_string(),
            allocated: view.allocated,
            available: view.available,
            id: view.resource.id,
            name: view.resource.name,
            resource_type: view.resource.resource_type,
            unit: view.resource.unit,
            quantity: view.resource.quantity,
            cost_per_unit: view.resource.cost_per_unit,
            returnable: view.resource.returnable,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct CreateAllocationRequest {
    #[serde(default)]
    pub resource_id: Option<String>,
    pub quantity: f64,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }
}

impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        let status = match err {
            AllocationError::Selection(_) => StatusCode::BAD_REQUEST,
            AllocationError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AllocationError::Busy => StatusCode::CONFLICT,
            AllocationError::Fetch(_) | AllocationError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        AllocationError::Fetch(format!("{:#}", err)).into()
    }
}

/// Malformed or mistyped request bodies get the same envelope as every
/// other error.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, "{}", self.message);
        }
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/resources - All resources, exhausted ones included
async fn list_resources(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ResourceResponse>>>, ApiError> {
    let conn = state.conn()?;
    let resources = db::get_resources_by_name(&conn)?;
    let allocations = db::get_all_allocations(&conn)?;

    let response = annotate_all(&resources, &allocations)
        .into_iter()
        .map(ResourceResponse::from)
        .collect();

    Ok(Json(ApiResponse::ok(response)))
}

/// GET /api/resources/available - Resources that can still be allocated
async fn list_available(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ResourceResponse>>>, ApiError> {
    let conn = state.conn()?;
    let resources = db::get_resources_by_name(&conn)?;
    let allocations = db::get_all_allocations(&conn)?;

    let response = compute_availability(&resources, &allocations)
        .into_iter()
        .map(ResourceResponse::from)
        .collect();

    Ok(Json(ApiResponse::ok(response)))
}

/// GET /api/projects/:project_id/allocations
async fn project_allocations(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Allocation>>>, ApiError> {
    let conn = state.conn()?;
    let allocations = db::get_allocations_for_project(&conn, &project_id)?;
    Ok(Json(ApiResponse::ok(allocations)))
}

/// POST /api/projects/:project_id/allocations
async fn create_allocation(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    payload: Result<Json<CreateAllocationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Allocation>>), ApiError> {
    let Json(request) = payload?;
    let conn = state.conn()?;

    let resource_id = request.resource_id.as_deref().map(str::trim).unwrap_or("");
    let available = if resource_id.is_empty() {
        0.0
    } else {
        let resource = db::get_resource(&conn, resource_id)?.ok_or_else(|| {
            AllocationError::Selection(format!("unknown resource: {}", resource_id))
        })?;
        let allocations = db::get_all_allocations(&conn)?;
        annotate(&resource, &allocations).available
    };

    let mut store = SqliteStore::new(&conn);
    let result = submit_allocation(
        &mut store,
        &project_id,
        request.resource_id.as_deref(),
        request.quantity,
        available,
    );

    let mut sink = TracingSink;
    match &result {
        Ok(allocation) => sink.notify(Notification::success(
            "Success",
            &format!("Resource {} added to project {}", allocation.resource_id, project_id),
        )),
        Err(err) => sink.notify(Notification::error(err.title(), &err.to_string())),
    }
    let allocation = result?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(allocation))))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/resources", get(list_resources))
        .route("/resources/available", get(list_available))
        .route(
            "/projects/:project_id/allocations",
            get(project_allocations).post(create_allocation),
        )
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
