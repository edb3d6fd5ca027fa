use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use log::info;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::PlannerConfig;
use crate::data::{
    LoadSummary, OverflowIssue, OverflowResolution, RawRow, Room, RoomDesign, RoomDesignResponse,
    ScheduleEntry, ScheduleRequest, ScheduleResponse, Seat, SeatingOutcome, SeatingRequest,
    Statistics, TimeSlot, TimeSlotRequest,
};
use crate::error::PlannerError;
use crate::overflow::detect_overflow;
use crate::state::AppState;

pub type SharedState = Arc<RwLock<AppState>>;

type ApiResult<T> = Result<Json<T>, PlannerError>;

async fn timeslots_handler(
    State(state): State<SharedState>,
    Json(input): Json<TimeSlotRequest>,
) -> ApiResult<Vec<TimeSlot>> {
    let slots = state
        .read()
        .await
        .time_slots(input.duration_minutes, input.break_minutes)?;
    Ok(Json(slots))
}

async fn load_students_handler(
    State(state): State<SharedState>,
    Json(rows): Json<Vec<RawRow>>,
) -> ApiResult<LoadSummary> {
    let loaded = state.write().await.load_students(&rows)?;
    Ok(Json(LoadSummary { loaded }))
}

async fn load_courses_handler(
    State(state): State<SharedState>,
    Json(rows): Json<Vec<RawRow>>,
) -> ApiResult<LoadSummary> {
    let loaded = state.write().await.load_courses(&rows)?;
    Ok(Json(LoadSummary { loaded }))
}

async fn load_rooms_handler(
    State(state): State<SharedState>,
    Json(rows): Json<Vec<RawRow>>,
) -> ApiResult<LoadSummary> {
    let loaded = state.write().await.load_rooms(&rows)?;
    Ok(Json(LoadSummary { loaded }))
}

async fn add_room_handler(
    State(state): State<SharedState>,
    Json(design): Json<RoomDesign>,
) -> ApiResult<RoomDesignResponse> {
    Ok(Json(state.write().await.add_room(design)?))
}

async fn delete_room_handler(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
) -> ApiResult<Room> {
    Ok(Json(state.write().await.delete_room(&room_id)?))
}

async fn layout_handler(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
) -> ApiResult<Vec<Seat>> {
    Ok(Json(state.read().await.seat_layout(&room_id)?))
}

async fn solve_handler(
    State(state): State<SharedState>,
    Json(input): Json<ScheduleRequest>,
) -> ApiResult<ScheduleResponse> {
    let job = state.read().await.schedule_job(&input)?;
    // exact solves can take a while; keep them off the async workers
    let (schedule, constraints) = tokio::task::spawn_blocking(move || job.run())
        .await
        .map_err(|e| PlannerError::Worker(e.to_string()))??;
    let overflow = detect_overflow(&schedule, &constraints);
    state
        .write()
        .await
        .set_schedule(schedule.clone(), constraints);
    Ok(Json(ScheduleResponse { schedule, overflow }))
}

async fn schedule_handler(State(state): State<SharedState>) -> Json<Vec<ScheduleEntry>> {
    Json(state.read().await.schedule.clone())
}

async fn overflow_handler(State(state): State<SharedState>) -> Json<Vec<OverflowIssue>> {
    Json(state.read().await.overflow())
}

async fn resolve_handler(State(state): State<SharedState>) -> Json<OverflowResolution> {
    Json(state.read().await.resolve_overflow())
}

async fn seating_handler(
    State(state): State<SharedState>,
    Json(input): Json<SeatingRequest>,
) -> ApiResult<SeatingOutcome> {
    let outcome = state.read().await.plan_seating(&input)?;
    state
        .write()
        .await
        .set_seating(input.room_id, outcome.assignments.clone());
    Ok(Json(outcome))
}

async fn stats_handler(State(state): State<SharedState>) -> Json<Statistics> {
    Json(state.read().await.statistics())
}

async fn export_handler(State(state): State<SharedState>) -> ApiResult<serde_json::Value> {
    let guard = state.read().await;
    Ok(Json(serde_json::to_value(guard.snapshot())?))
}

async fn import_handler(
    State(state): State<SharedState>,
    Json(document): Json<serde_json::Value>,
) -> ApiResult<Statistics> {
    let mut guard = state.write().await;
    guard.import(document)?;
    Ok(Json(guard.statistics()))
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/v1/timeslots", post(timeslots_handler))
        .route("/v1/students", put(load_students_handler))
        .route("/v1/courses", put(load_courses_handler))
        .route("/v1/rooms", put(load_rooms_handler).post(add_room_handler))
        .route("/v1/rooms/:room_id", delete(delete_room_handler))
        .route("/v1/rooms/:room_id/layout", get(layout_handler))
        .route("/v1/schedule", get(schedule_handler))
        .route("/v1/schedule/solve", post(solve_handler))
        .route("/v1/overflow", get(overflow_handler))
        .route("/v1/overflow/resolve", post(resolve_handler))
        .route("/v1/seating/assign", post(seating_handler))
        .route("/v1/stats", get(stats_handler))
        .route("/v1/state/export", get(export_handler))
        .route("/v1/state/import", post(import_handler))
        .with_state(state)
}

pub async fn run_server(config: PlannerConfig) -> std::io::Result<()> {
    let addr = config.bind_addr.clone();
    let app = router(Arc::new(RwLock::new(AppState::new(config))));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await
}
