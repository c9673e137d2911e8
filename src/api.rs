use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::SeriesConfig;
use crate::error::ApiError;
use crate::models::{
    BreakdownRequest, BucketedCount, SeriesRequest, SeriesResponse, Session,
    StatusBucketedCount, Task,
};
use crate::projections::{Bucketer, Series, StatusBreakdown};
use crate::windows::{self, clamp_count, WindowUnit};

/// Chart data API
/// Stateless: every request carries the records it wants bucketed
#[derive(Clone)]
pub struct AppState {
    series: SeriesConfig,
}

impl AppState {
    pub fn new(series: SeriesConfig) -> Self {
        Self { series }
    }

    /// Builds the bucketer for one request, reading the clock at most once.
    fn bucketer(
        &self,
        unit: WindowUnit,
        requested: Option<i64>,
        now: Option<i64>,
    ) -> Result<Bucketer, ApiError> {
        let count = match (requested, unit) {
            (Some(requested), _) => clamp_count(requested),
            (None, WindowUnit::Day) => self.series.default_days,
            (None, WindowUnit::Minute) => self.series.default_minutes,
        };
        if count > self.series.max_windows {
            return Err(ApiError::TooManyWindows {
                requested: count,
                max: self.series.max_windows,
            });
        }

        let now = match now {
            Some(seconds) => {
                DateTime::from_timestamp(seconds, 0).ok_or(ApiError::InvalidNow(seconds))?
            }
            None => Utc::now(),
        };
        if !windows::fits(unit, count, now) {
            return Err(ApiError::InvalidNow(now.timestamp()));
        }

        Ok(Bucketer::new(unit, count)
            .at(now)
            .with_day_boundary(self.series.day_boundary))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/series/sessions/daily", post(sessions_daily))
        .route("/series/sessions/minutely", post(sessions_minutely))
        .route("/series/tasks/daily", post(tasks_daily))
        .route("/series/tasks/minutely", post(tasks_minutely))
        .route("/breakdown/tasks", post(tasks_breakdown))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn root() -> &'static str {
    concat!("Chart Series API v", env!("CARGO_PKG_VERSION"))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

fn respond<T>(bucketer: &Bucketer, series: Series<T>) -> Json<SeriesResponse<T>> {
    Json(SeriesResponse {
        unit: bucketer.unit(),
        generated_at: bucketer.now(),
        series: series.points,
        excluded: series.excluded,
    })
}

/// Sessions per day
async fn sessions_daily(
    State(state): State<AppState>,
    Json(request): Json<SeriesRequest<Session>>,
) -> Result<Json<SeriesResponse<BucketedCount>>, ApiError> {
    let bucketer = state.bucketer(WindowUnit::Day, request.days, request.now)?;
    let series = bucketer.counts(&request.records);
    Ok(respond(&bucketer, series))
}

/// Sessions per minute
async fn sessions_minutely(
    State(state): State<AppState>,
    Json(request): Json<SeriesRequest<Session>>,
) -> Result<Json<SeriesResponse<BucketedCount>>, ApiError> {
    let bucketer = state.bucketer(WindowUnit::Minute, request.minutes, request.now)?;
    let series = bucketer.counts(&request.records);
    Ok(respond(&bucketer, series))
}

/// Tasks per day, split by outcome
async fn tasks_daily(
    State(state): State<AppState>,
    Json(request): Json<SeriesRequest<Task>>,
) -> Result<Json<SeriesResponse<StatusBucketedCount>>, ApiError> {
    let bucketer = state.bucketer(WindowUnit::Day, request.days, request.now)?;
    let series = bucketer.status_counts(&request.records);
    Ok(respond(&bucketer, series))
}

/// Tasks per minute, split by outcome
async fn tasks_minutely(
    State(state): State<AppState>,
    Json(request): Json<SeriesRequest<Task>>,
) -> Result<Json<SeriesResponse<StatusBucketedCount>>, ApiError> {
    let bucketer = state.bucketer(WindowUnit::Minute, request.minutes, request.now)?;
    let series = bucketer.status_counts(&request.records);
    Ok(respond(&bucketer, series))
}

async fn tasks_breakdown(Json(request): Json<BreakdownRequest>) -> Json<StatusBreakdown> {
    Json(StatusBreakdown::from_tasks(&request.records))
}
