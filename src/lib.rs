//! vplan: mirror of a school's substitution plan ("Vertretungsplan").
//!
//! The service keeps a rolling window of school days warm in a two-tier
//! disk cache and serves it over a small JSON API:
//!
//! - **calendar** — weekend stepping, effective-date resolution, window
//!   generation
//! - **scrape** — the fetch connector posting one upstream query per date
//! - **rate_limit** / **retry** — the shared minimum-interval gate and
//!   the staged retry schedule around every fetch
//! - **store** — per-date snapshot files in a temporary and a backup tier
//! - **refresh** — the periodic window refresh and daily backup drivers
//! - **query** — tier-precedence reads with on-demand fetch fallback and
//!   multi-date merging
//! - **web** — the axum API plus static client assets
//!
//! The `vplan-server` binary under `src/bin/` wires these together from
//! a TOML config.

pub mod calendar;
pub mod config;
pub mod error;
pub mod query;
pub mod rate_limit;
pub mod refresh;
pub mod retry;
pub mod scrape;
pub mod store;
pub mod types;
pub mod web;

pub use config::AppConfig;
pub use error::{PlanError, Result};
pub use query::PlanService;
pub use store::{PlanStore, Tier};
pub use types::{DaySnapshot, ScheduleEntry};
