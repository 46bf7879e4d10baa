//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::domain::{Route, StationId, VehicleStop};

use super::dto::*;
use super::error::AppError;
use super::state::AppState;

/// Upper bound on station search results.
const MAX_STATION_RESULTS: usize = 50;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stations", get(search_stations))
        .route(
            "/liveboard",
            get(get_liveboard).post(start_liveboard).delete(clear_liveboard),
        )
        .route("/liveboard/extend", post(extend_liveboard))
        .route("/liveboard/abort", post(abort_liveboard))
        .route("/liveboard/corrections", post(correct_liveboard))
        .route(
            "/routes",
            get(get_routes).post(start_routes).delete(clear_routes),
        )
        .route("/routes/extend", post(extend_routes))
        .route("/routes/abort", post(abort_routes))
        .route("/routes/corrections", post(correct_routes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health(State(state): State<AppState>) -> Result<&'static str, AppError> {
    let stopped = state.stopped_drivers();
    if !stopped.is_empty() {
        return Err(AppError::Unavailable {
            message: format!("Stopped drivers: {}", stopped.join(", ")),
        });
    }
    Ok("ok")
}

/// Parse a station id and check the directory knows it.
fn known_station(state: &AppState, field: &str, value: &str) -> Result<StationId, AppError> {
    let id = StationId::parse(value).map_err(|e| AppError::BadRequest {
        message: format!("Invalid {field}: {e}"),
    })?;
    if state.stations.name(&id).is_none() {
        return Err(AppError::NotFound {
            message: format!("Unknown station: {id}"),
        });
    }
    Ok(id)
}

/// Search stations by name.
async fn search_stations(
    State(state): State<AppState>,
    Query(req): Query<StationSearchRequest>,
) -> Json<StationSearchResponse> {
    let limit = req.limit.unwrap_or(10).min(MAX_STATION_RESULTS);
    let stations = state.stations.search_by_name(&req.q, limit);
    Json(StationSearchResponse { stations })
}

async fn get_liveboard(State(state): State<AppState>) -> Json<BoardView> {
    let board = state.liveboard.lock().await;
    let name = board
        .station()
        .and_then(|id| state.stations.name(id))
        .map(str::to_string);
    Json(BoardView::from_liveboard(&board, name))
}

async fn start_liveboard(
    State(state): State<AppState>,
    Json(req): Json<BoardStartRequest>,
) -> Result<(StatusCode, Json<StartedResponse>), AppError> {
    let station = known_station(&state, "station", &req.station)?;
    let generation = state.liveboard.lock().await.get_board(station, req.mode)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(StartedResponse {
            generation: generation.get(),
        }),
    ))
}

async fn extend_liveboard(
    State(state): State<AppState>,
    Json(req): Json<ExtendRequest>,
) -> Result<(StatusCode, Json<StartedResponse>), AppError> {
    let generation = state.liveboard.lock().await.extend(req.direction)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(StartedResponse {
            generation: generation.get(),
        }),
    ))
}

async fn abort_liveboard(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.liveboard.lock().await.abort()?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_liveboard(State(state): State<AppState>) -> StatusCode {
    state.liveboard.lock().await.clear_board();
    StatusCode::NO_CONTENT
}

async fn correct_liveboard(
    State(state): State<AppState>,
    Json(stop): Json<VehicleStop>,
) -> Result<Json<CorrectionResponse>, AppError> {
    let notified = state.liveboard.lock().await.publish_correction(stop)?;
    Ok(Json(CorrectionResponse { notified }))
}

async fn get_routes(State(state): State<AppState>) -> Json<RouteView> {
    let planner = state.planner.lock().await;
    Json(RouteView::from_planner(&planner))
}

async fn start_routes(
    State(state): State<AppState>,
    Json(req): Json<RouteStartRequest>,
) -> Result<(StatusCode, Json<StartedResponse>), AppError> {
    let from = known_station(&state, "from", &req.from)?;
    let to = known_station(&state, "to", &req.to)?;
    if from == to {
        return Err(AppError::BadRequest {
            message: "Origin and destination must differ".into(),
        });
    }

    let generation = state.planner.lock().await.get_connections(
        from,
        to,
        req.departure_time,
        req.max_transfers,
    )?;
    Ok((
        StatusCode::ACCEPTED,
        Json(StartedResponse {
            generation: generation.get(),
        }),
    ))
}

async fn extend_routes(
    State(state): State<AppState>,
    Json(req): Json<ExtendRequest>,
) -> Result<(StatusCode, Json<StartedResponse>), AppError> {
    let generation = state.planner.lock().await.extend(req.direction)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(StartedResponse {
            generation: generation.get(),
        }),
    ))
}

async fn abort_routes(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.planner.lock().await.abort()?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_routes(State(state): State<AppState>) -> StatusCode {
    state.planner.lock().await.clear_routes();
    StatusCode::NO_CONTENT
}

async fn correct_routes(
    State(state): State<AppState>,
    Json(route): Json<Route>,
) -> Result<Json<CorrectionResponse>, AppError> {
    let notified = state.planner.lock().await.publish_correction(route)?;
    Ok(Json(CorrectionResponse { notified }))
}
