//! HTTP handlers mounted under `/api`
//!
//! Every handler answers with the `{"success": true, "data": ...}` envelope
//! or a [`ZangliError`], which renders the matching error envelope.

mod assistant;
mod astrology;
mod calendar;
mod comprehensive;
mod echo;
mod health;
pub mod params;

use crate::assistant::AssistantService;
use crate::config::ZangliConfig;
use crate::error::ZangliError;
use axum::{
    Json, Router,
    routing::{get, post},
};
use chrono::{NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;

pub use params::JsonObject;

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ZangliConfig>,
    pub assistant: Arc<AssistantService>,
    /// Zone used to report event times unless a request overrides it
    pub timezone: Tz,
}

impl AppState {
    pub fn new(config: ZangliConfig, assistant: AssistantService) -> anyhow::Result<Self> {
        let timezone = config.timezone()?;
        Ok(Self {
            config: Arc::new(config),
            assistant: Arc::new(assistant),
            timezone,
        })
    }

    /// Current local date and minute-resolution time in `tz`
    #[must_use]
    pub fn now_in(tz: Tz) -> (NaiveDate, NaiveTime) {
        let now = Utc::now().with_timezone(&tz);
        let time = NaiveTime::from_hms_opt(now.hour(), now.minute(), 0).unwrap_or(NaiveTime::MIN);
        (now.date_naive(), time)
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        Self::now_in(self.timezone).0
    }
}

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ZangliError>;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/calendar/tibetan", get(calendar::tibetan))
        .route("/calendar/convert", post(calendar::convert))
        .route(
            "/calendar/date-comprehensive-data",
            post(comprehensive::date_comprehensive_data),
        )
        .route("/astrology/planets", post(astrology::planets))
        .route("/planets", post(astrology::planets))
        .route("/astrology/moon-phase", get(astrology::moon_phase))
        .route("/calculate", post(astrology::calculate))
        .route("/ask", post(assistant::ask))
        .route("/chat", post(assistant::chat))
        .route("/echo", post(echo::echo))
}
