//! Upstream fetch connector for the substitution plan source.
//!
//! Posts one form-encoded query per school date and parses the returned
//! HTML table fragment into [`ScheduleEntry`] rows. All requests pass
//! through a shared [`FetchGate`] so the source never sees two fetches
//! closer together than the configured minimum interval.

use crate::config::SourceConfig;
use crate::error::{PlanError, Result};
use crate::rate_limit::FetchGate;
use crate::types::ScheduleEntry;
use chrono::NaiveDate;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;

/// Build a [`reqwest::Client`] configured for the plan source.
///
/// The client has:
/// - Timeout from config
/// - Redirects disabled (a redirect from the source means a login wall,
///   not data, and must surface as an error)
/// - Fixed User-Agent from config
///
/// # Errors
///
/// Returns [`PlanError::Fetch`] if the client cannot be constructed.
pub fn build_client(config: &SourceConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| PlanError::Fetch(format!("failed to build HTTP client: {e}")))
}

/// Connector that retrieves one day of substitution data per request.
#[derive(Debug, Clone)]
pub struct PlanFetcher {
    client: reqwest::Client,
    url: String,
    course_filter: String,
    gate: Arc<FetchGate>,
}

impl PlanFetcher {
    /// Create a fetcher for the configured source, sharing `gate` with
    /// any other fetch paths in the process.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Fetch`] if the HTTP client cannot be built.
    pub fn new(config: &SourceConfig, gate: Arc<FetchGate>) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            url: config.url.clone(),
            course_filter: config.course_filter.clone(),
            gate,
        })
    }

    /// Fetch the substitution entries for a single date.
    ///
    /// Waits on the shared gate first, then posts the
    /// `date=YYYY-MM-DD&kurs=<filter>` form. Only a 200 response with a
    /// parseable table counts as success and arms the gate; any failure
    /// leaves the gate untouched so a retry may go out immediately.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Fetch`] for transport failures and non-200
    /// statuses, [`PlanError::Parse`] for malformed HTML.
    pub async fn fetch_day(&self, date: NaiveDate) -> Result<Vec<ScheduleEntry>> {
        self.gate.wait_ready().await;

        let date_param = date.format("%Y-%m-%d").to_string();
        let params = [
            ("date", date_param.as_str()),
            ("kurs", self.course_filter.as_str()),
        ];

        tracing::debug!(date = %date_param, "requesting plan from source");

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "*/*")
            .form(&params)
            .send()
            .await
            .map_err(|e| PlanError::Fetch(format!("plan request for {date_param} failed: {e}")))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(PlanError::Fetch(format!(
                "plan request for {date_param} returned status {status}"
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| PlanError::Fetch(format!("failed to read plan body: {e}")))?;

        let entries = parse_plan_html(&html)?;
        self.gate.record_success().await;

        tracing::debug!(date = %date_param, count = entries.len(), "plan fetched");
        Ok(entries)
    }
}

/// Parse the HTML table fragment returned by the plan source.
///
/// The source sends `<thead>`/`<tbody>` without an enclosing `<table>`,
/// so the fragment is wrapped before parsing. Each body row carries the
/// course in a `th[scope="row"]` and five `td` cells in fixed order:
/// period, room, teacher, kind, note. Rows with fewer cells are skipped,
/// rows without a course are dropped.
///
/// # Errors
///
/// Returns [`PlanError::Parse`] if a selector fails to compile.
pub fn parse_plan_html(html: &str) -> Result<Vec<ScheduleEntry>> {
    let wrapped = format!("<table>{html}</table>");
    let document = Html::parse_fragment(&wrapped);

    let row_selector = Selector::parse("tbody tr")
        .map_err(|e| PlanError::Parse(format!("invalid row selector: {e:?}")))?;
    let course_selector = Selector::parse("th[scope=\"row\"]")
        .map_err(|e| PlanError::Parse(format!("invalid course selector: {e:?}")))?;
    let cell_selector = Selector::parse("td")
        .map_err(|e| PlanError::Parse(format!("invalid cell selector: {e:?}")))?;

    let mut entries = Vec::new();

    for row in document.select(&row_selector) {
        let course = row
            .select(&course_selector)
            .next()
            .map(|th| cell_text(&th))
            .unwrap_or_default();

        let cells: Vec<String> = row.select(&cell_selector).map(|td| cell_text(&td)).collect();

        if cells.len() < 5 {
            tracing::warn!(
                course = %course,
                cells = cells.len(),
                "skipping plan row with too few cells"
            );
            continue;
        }

        if course.is_empty() {
            continue;
        }

        entries.push(ScheduleEntry {
            course,
            period: cells[0].clone(),
            room: cells[1].clone(),
            teacher: cells[2].clone(),
            kind: cells[3].clone(),
            note: cells[4].clone(),
            date: None,
        });
    }

    tracing::debug!(count = entries.len(), "plan rows parsed");
    Ok(entries)
}

/// Collect the visible text of a cell, collapsing it to a trimmed string.
/// Empty cells normalize to "-" so downstream consumers never see blanks.
fn cell_text(element: &scraper::ElementRef<'_>) -> String {
    let text = element.text().collect::<String>().trim().to_string();
    if text.is_empty() {
        "-".to_string()
    } else {
        text
    }
}
