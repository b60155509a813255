use super::{ApiResponse, AppState};
use axum::{Json, extract::State};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub ai_configured: bool,
    pub knowledge_entries: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    ApiResponse::ok(HealthStatus {
        status: "ok",
        service: "zangli",
        version: crate::VERSION,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        ai_configured: state.assistant.is_configured(),
        knowledge_entries: state.assistant.knowledge().len(),
    })
}
