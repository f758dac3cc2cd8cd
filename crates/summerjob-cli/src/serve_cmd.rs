use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use summerjob_core::adoration::{self, AdjacencyConfig};
use summerjob_core::planned::{self, PlannedJob};
use summerjob_core::{ActiveEventCache, EngineError, assignment, events, my_plan, plans, rides};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let status = match &err {
            EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
            EngineError::DuplicateAssignment { .. } | EngineError::CapacityExceeded { .. } => {
                StatusCode::CONFLICT
            }
            EngineError::InvalidRange(_) | EngineError::InvalidInput(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            EngineError::NoActiveEvent => StatusCode::PRECONDITION_FAILED,
            EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %format!("{err:#}"), "request failed");
        }
        Self {
            status,
            message: format!("{err:#}"),
        }
    }
}

type ApiResult = std::result::Result<Response, AppError>;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pool: PgPool,
    cache: Arc<ActiveEventCache>,
    adjacency: AdjacencyConfig,
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct WorkersBody {
    pub worker_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct PassengersBody {
    pub passenger_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub day: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub day: NaiveDate,
    pub worker: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(pool: PgPool, adjacency: AdjacencyConfig) -> Router {
    let state = AppState {
        pool,
        cache: Arc::new(ActiveEventCache::new()),
        adjacency,
    };
    Router::new()
        .route("/api/events/{id}/activate", post(activate_event))
        .route("/api/plans", get(list_plans))
        .route("/api/plans/{id}", get(get_plan))
        .route("/api/plans/{id}/planned-jobs", post(apply_planned))
        .route("/api/jobs/{id}/workers", put(update_job_workers))
        .route("/api/rides/{id}/passengers", put(update_ride_passengers))
        .route("/api/adoration", get(list_slots))
        .route(
            "/api/adoration/{slot_id}/workers/{worker_id}",
            post(signup).delete(cancel_signup),
        )
        .route("/api/workers/{id}/my-plan", get(worker_plan))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(
    pool: PgPool,
    adjacency: AdjacencyConfig,
    bind: &str,
    port: u16,
) -> Result<()> {
    let app = build_router(pool, adjacency);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("summerjob serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("summerjob serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for Ctrl+C; serving until killed");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn activate_event(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult {
    let ctx = events::activate_event(&state.pool, &state.cache, id).await?;
    Ok(Json(ctx.event).into_response())
}

async fn list_plans(State(state): State<AppState>) -> ApiResult {
    let ctx = state.cache.get(&state.pool).await?;
    let all = plans::list_plans(&state.pool, &ctx).await?;
    Ok(Json(all).into_response())
}

async fn get_plan(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult {
    let snapshot = plans::get_plan(&state.pool, id).await?;
    Ok(Json(snapshot).into_response())
}

async fn apply_planned(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(batch): Json<Vec<PlannedJob>>,
) -> ApiResult {
    let jobs = planned::apply_planned_jobs(&state.pool, id, &batch).await?;
    Ok((StatusCode::CREATED, Json(jobs)).into_response())
}

async fn update_job_workers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<WorkersBody>,
) -> ApiResult {
    let change = assignment::update_active_job_workers(&state.pool, id, &body.worker_ids).await?;
    Ok(Json(change).into_response())
}

async fn update_ride_passengers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<PassengersBody>,
) -> ApiResult {
    let ride = rides::update_ride(&state.pool, id, &body.passenger_ids).await?;
    Ok(Json(ride).into_response())
}

async fn list_slots(State(state): State<AppState>, Query(q): Query<SlotQuery>) -> ApiResult {
    let ctx = state.cache.get(&state.pool).await?;
    match q.worker {
        Some(worker_id) => {
            let slots =
                adoration::slots_for_day_user(&state.pool, ctx.event_id(), q.day, worker_id).await?;
            Ok(Json(slots).into_response())
        }
        None => {
            let slots = adoration::slots_for_day_admin(&state.pool, ctx.event_id(), q.day).await?;
            Ok(Json(slots).into_response())
        }
    }
}

async fn signup(
    State(state): State<AppState>,
    Path((slot_id, worker_id)): Path<(Uuid, Uuid)>,
) -> ApiResult {
    adoration::signup(&state.pool, slot_id, worker_id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn cancel_signup(
    State(state): State<AppState>,
    Path((slot_id, worker_id)): Path<(Uuid, Uuid)>,
) -> ApiResult {
    adoration::cancel_signup(&state.pool, slot_id, worker_id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn worker_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(q): Query<DayQuery>,
) -> ApiResult {
    let ctx = state.cache.get(&state.pool).await?;
    match q.day {
        Some(day) => {
            let view = my_plan::my_plan_on(&state.pool, &ctx, day, id, &state.adjacency).await?;
            Ok(Json(view).into_response())
        }
        None => {
            let views = my_plan::my_plans(&state.pool, &ctx, id, &state.adjacency).await?;
            Ok(Json(views).into_response())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
