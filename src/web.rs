//! HTTP API for the substitution plan.
//!
//! ## Endpoints
//!
//! - `GET /api/date/{date}` — snapshot for one date
//! - `GET /api/both/{date1}/{date2}` — merged two-date result
//! - `GET /api/both/{dates}` — merged result for a comma-separated list
//! - `GET /api/both` — merged result for the next school days
//! - `GET /api/data` — snapshot for the effective date
//! - `GET /api/morgen` — snapshot for the school day after the effective date
//!
//! Date parameters must be `YYYY-MM-DD`; anything else is a 400 with a
//! JSON `error` body. Everything under `/` that is not `/api` serves the
//! static client.

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

use crate::calendar;
use crate::config::{CalendarConfig, ServerConfig};
use crate::error::{PlanError, Result};
use crate::query::PlanService;
use crate::types::DaySnapshot;

/// School days covered by the parameterless `/api/both`, counting the
/// effective date itself.
const DEFAULT_MERGE_DAYS: usize = 4;

/// Shared state for axum handlers.
#[derive(Clone)]
struct AppState {
    service: PlanService,
    calendar: CalendarConfig,
}

/// Build the API router over `service`.
fn router(service: PlanService, calendar: CalendarConfig, config: &ServerConfig) -> Router {
    let state = AppState { service, calendar };

    Router::new()
        .route("/api/date/{date}", get(handle_date))
        .route("/api/both", get(handle_both_default))
        .route("/api/both/{dates}", get(handle_both_list))
        .route("/api/both/{date1}/{date2}", get(handle_both_pair))
        .route("/api/data", get(handle_data))
        .route("/api/morgen", get(handle_morgen))
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// PlanServer
// ---------------------------------------------------------------------------

/// The running HTTP server.
///
/// Binds on construction and serves from a background tokio task; the
/// task is aborted on [`PlanServer::shutdown`] or drop.
pub struct PlanServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl PlanServer {
    /// Start serving the API and static client.
    ///
    /// Binds to `{config.host}:{config.port}` (use port `0` for
    /// auto-assign in tests).
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Server`] if the TCP listener cannot bind.
    pub async fn start(
        service: PlanService,
        calendar: CalendarConfig,
        config: &ServerConfig,
    ) -> Result<Self> {
        let app = router(service, calendar, config);

        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| PlanError::Server(format!("bind to {bind_addr} failed: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| PlanError::Server(format!("failed to get local addr: {e}")))?;

        info!("serving plan API on http://{addr}");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("plan server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// The address the server is listening on.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The port the server is listening on.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for PlanServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Date validation
// ---------------------------------------------------------------------------

/// Rejection carrying the HTTP status and JSON error body for a bad
/// date parameter.
type BadRequest = (StatusCode, Json<Value>);

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap_or_else(|e| unreachable!("static regex: {e}"))
    })
}

/// Validate one externally supplied date segment.
///
/// The value must match `YYYY-MM-DD` and be a real calendar date.
fn parse_date_param(raw: &str) -> std::result::Result<NaiveDate, BadRequest> {
    if !date_pattern().is_match(raw) {
        return Err(bad_request(format!(
            "invalid date '{raw}': expected YYYY-MM-DD"
        )));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| bad_request(format!("invalid date '{raw}': no such calendar date")))
}

fn bad_request(message: String) -> BadRequest {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// `GET /api/date/{date}` — snapshot for one date, no `datum` tags.
async fn handle_date(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> std::result::Result<Json<DaySnapshot>, BadRequest> {
    let date = parse_date_param(&raw)?;
    Ok(Json(state.service.day(date).await))
}

/// `GET /api/both/{date1}/{date2}` — merged two-date result.
async fn handle_both_pair(
    State(state): State<AppState>,
    Path((raw1, raw2)): Path<(String, String)>,
) -> std::result::Result<Json<DaySnapshot>, BadRequest> {
    let dates = [parse_date_param(&raw1)?, parse_date_param(&raw2)?];
    Ok(Json(state.service.merged(&dates).await))
}

/// `GET /api/both/{dates}` — merged result for a comma-separated list.
async fn handle_both_list(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> std::result::Result<Json<DaySnapshot>, BadRequest> {
    let mut dates = Vec::new();
    for segment in raw.split(',') {
        dates.push(parse_date_param(segment.trim())?);
    }
    Ok(Json(state.service.merged(&dates).await))
}

/// `GET /api/both` — merged result for the next school days, counting
/// the effective date itself.
async fn handle_both_default(State(state): State<AppState>) -> Json<DaySnapshot> {
    let anchor = effective(&state.calendar);
    Json(state.service.next_days(anchor, DEFAULT_MERGE_DAYS).await)
}

/// `GET /api/data` — snapshot for the effective date.
async fn handle_data(State(state): State<AppState>) -> Json<DaySnapshot> {
    let date = effective(&state.calendar);
    Json(state.service.day(date).await)
}

/// `GET /api/morgen` — snapshot for the school day after the effective
/// date.
async fn handle_morgen(State(state): State<AppState>) -> Json<DaySnapshot> {
    let date = calendar::next_school_day(effective(&state.calendar));
    Json(state.service.day(date).await)
}

fn effective(calendar: &CalendarConfig) -> NaiveDate {
    calendar::effective_today(calendar.utc_offset_minutes, calendar.cutoff_hour)
}
