use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::schedule::{Clock, SportScheduler};
use crate::scores::{ScoreCache, ScoreSnapshot};
use crate::sports::{SeasonWindow, Sport, SportCatalog};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<SportCatalog>,
    pub cache: ScoreCache,
    pub scheduler: SportScheduler,
    pub clock: Arc<dyn Clock>,
}

/// Build the Axum router for the score API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/:sport/events", get(events_handler))
        .route("/api/schedule", get(schedule_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

#[derive(Debug, Serialize)]
struct EventsResponse {
    date: DateTime<Utc>,
    scores: Option<ScoreSnapshot>,
}

/// GET /:sport/events
///
/// Pure cache read. A configured sport that has never been fetched answers
/// with `"scores": null`.
async fn events_handler(
    State(state): State<Arc<AppState>>,
    Path(sport): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let sport: Sport = sport.parse().map_err(|_| StatusCode::NOT_FOUND)?;
    if !state.catalog.is_configured(sport) {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(Json(EventsResponse {
        date: Utc::now(),
        scores: state.cache.get(sport).await,
    }))
}

#[derive(Debug, Serialize)]
struct ScheduleResponse {
    today: NaiveDate,
    sports: Vec<SportStatus>,
}

#[derive(Debug, Serialize)]
struct SportStatus {
    sport: Sport,
    window: Option<SeasonWindow>,
    in_season: bool,
    running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    excluded: Option<String>,
    captured_at: Option<DateTime<Utc>>,
}

/// GET /api/schedule
async fn schedule_handler(State(state): State<Arc<AppState>>) -> Json<ScheduleResponse> {
    let today = state.clock.today();

    let mut sports = Vec::new();
    for sport in state.catalog.sports() {
        let window = state.catalog.get(sport).and_then(|c| c.window);
        sports.push(SportStatus {
            sport,
            window,
            in_season: window.is_some_and(|w| w.contains(today)),
            running: state.scheduler.is_active(sport),
            excluded: state.scheduler.exclusion(sport).map(|e| e.to_string()),
            captured_at: state.cache.get(sport).await.map(|s| s.captured_at),
        });
    }

    Json(ScheduleResponse { today, sports })
}
