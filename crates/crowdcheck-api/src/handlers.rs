//! API Handlers
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use crowdcheck_core::{
    Admission, Coordinates, HistoryFilter, ProviderError, ReportRecord, ReportSubmission,
    CROWDCHECK_VERSION,
};
use crowdcheck_verify::Evaluation;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::middleware::{NetworkIdentity, UNKNOWN_IDENTITY};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportRequest {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub city: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub identity: Option<String>,
    #[serde(default)]
    pub flagged: bool,
}

/// Drop angle brackets and surrounding whitespace
pub fn sanitize(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .collect::<String>()
        .trim()
        .to_string()
}

fn error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "ok": false, "error": message })))
}

pub async fn submit_report(
    State(state): State<AppState>,
    Extension(NetworkIdentity(identity)): Extension<NetworkIdentity>,
    headers: HeaderMap,
    payload: Result<Json<SubmitReportRequest>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejected report body");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "ok": false,
                    "error": "Invalid request body",
                    "details": rejection.body_text(),
                })),
            );
        }
    };
    let description = sanitize(&payload.description);
    let location = sanitize(&payload.location);
    if description.is_empty() || location.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "ok": false,
                "error": "Missing required fields",
                "required": ["description", "location"],
            })),
        );
    }

    let mut submission = ReportSubmission::new(description, location).at(state.clock.now());
    submission.coordinates = payload.coordinates;
    if identity != UNKNOWN_IDENTITY {
        submission = submission.from_identity(identity);
    }
    if let Some(agent) = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
    {
        submission = submission.with_signature(agent);
    }

    let evaluation = state.engine.evaluate(&submission).await;
    state
        .audit
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .log_evaluation(&submission, &evaluation, state.clock.now());

    let accepted = match evaluation {
        Evaluation::DuplicateRejected { reason } => {
            state.metrics.record_duplicate();
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "ok": false,
                    "error": "Too many reports. Please try again later.",
                    "reason": reason,
                })),
            );
        }
        Evaluation::Accepted(accepted) => accepted,
    };

    let admission = accepted.result.admission;
    state.metrics.record_evaluation(admission);

    let record = ReportRecord::from_evaluation(
        &submission,
        &accepted.result,
        &accepted.annotations,
        state.clock.now(),
    );
    if let Err(e) = state.history.insert(record.clone()).await {
        tracing::error!(error = %e, "failed to store report");
        return error(StatusCode::SERVICE_UNAVAILABLE, "Report storage unavailable");
    }

    let events = state.events.publish_for(&record, admission);
    tracing::info!(
        report_id = %record.id,
        %admission,
        events = events.len(),
        "report stored"
    );

    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "report": record,
            "verification": accepted.result,
        })),
    )
}

/// Verified reports, newest first
pub async fn list_reports(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let filter = HistoryFilter::new().verified_only();
    match state.history.find_recent(&filter, None).await {
        Ok(reports) => (StatusCode::OK, Json(json!(reports))),
        Err(e) => {
            tracing::error!(error = %e, "failed to list reports");
            error(StatusCode::SERVICE_UNAVAILABLE, "Report storage unavailable")
        }
    }
}

pub async fn geocode(
    State(state): State<AppState>,
    Query(query): Query<GeocodeQuery>,
) -> (StatusCode, Json<Value>) {
    let city = query.city.as_deref().map(str::trim).unwrap_or_default();
    if city.is_empty() {
        return error(StatusCode::BAD_REQUEST, "city query required");
    }

    match state.weather.geocode(city).await {
        Ok(place) => (StatusCode::OK, Json(json!({ "ok": true, "data": place }))),
        Err(ProviderError::NotFound(_)) => error(StatusCode::NOT_FOUND, "city not found"),
        Err(e) => {
            tracing::warn!(error = %e, %city, "geocode failed");
            error(StatusCode::BAD_GATEWAY, &e.to_string())
        }
    }
}

pub async fn audit_stats(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let stats = state.audit.lock().unwrap_or_else(|e| e.into_inner()).stats();
    (StatusCode::OK, Json(json!({ "ok": true, "data": stats })))
}

/// Audit entries, optionally narrowed to one identity or to flagged reports
pub async fn audit_entries(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> (StatusCode, Json<Value>) {
    let log = state.audit.lock().unwrap_or_else(|e| e.into_inner());
    let mut entries = match query.identity.as_deref() {
        Some(identity) => log.entries_for_identity(identity),
        None if query.flagged => log.flagged_entries(),
        None => log.entries().iter().collect(),
    };
    if query.identity.is_some() && query.flagged {
        entries.retain(|e| e.admission == Some(Admission::Flagged));
    }
    let body = json!({ "ok": true, "data": entries });
    (StatusCode::OK, Json(body))
}

/// Full audit log as JSON lines
pub async fn audit_export(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.audit.lock().unwrap_or_else(|e| e.into_inner()).to_jsonl();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        body,
    )
}

pub async fn metrics(State(state): State<AppState>) -> (StatusCode, String) {
    match state.metrics.encode() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "version": CROWDCHECK_VERSION })),
    )
}
