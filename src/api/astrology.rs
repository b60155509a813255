//! Sun, Moon and planet endpoints

use super::params::{self, JsonObject};
use super::{ApiResponse, ApiResult, AppState};
use crate::astronomy::Observation;
use crate::astronomy::report::{self, MoonPhaseReport, PlanetsReport, SunMoonReport};
use crate::error::ZangliError;
use axum::extract::{Query, State};
use chrono::NaiveTime;
use std::collections::HashMap;
use tracing::debug;

/// Local time a moon phase is observed at when only a date is given
#[must_use]
pub fn representative_time() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// `POST /astrology/planets` and `POST /planets`
pub async fn planets(State(state): State<AppState>, body: JsonObject) -> ApiResult<PlanetsReport> {
    body.require_non_empty()?;
    let obs = params::observation(&body, &state)?;
    debug!(date = %obs.date, location = %obs.location.format_coordinates(), "planets");
    Ok(ApiResponse::ok(report::planets(&obs)?))
}

/// `POST /calculate`
///
/// The report is wrapped in the usual `{"success": true, "data": ...}`
/// envelope. Older clients that read the sunrise fields from the top level
/// of the response need to read them from `data` instead.
pub async fn calculate(State(state): State<AppState>, body: JsonObject) -> ApiResult<SunMoonReport> {
    body.require_non_empty()?;
    let obs = params::observation(&body, &state)?;
    debug!(date = %obs.date, location = %obs.location.format_coordinates(), "sun and moon");
    Ok(ApiResponse::ok(report::sun_moon(&obs)?))
}

/// Observation for the moon phase card
///
/// With a date the observation is at `time` or local noon; without one the
/// current local time is used. The phase name itself is fixed per date.
pub fn moon_observation(query: &JsonObject, state: &AppState) -> Result<Observation, ZangliError> {
    let tz = params::request_timezone(query, state)?;
    let location = params::location(query, state)?;

    let (date, time) = match query.str("date") {
        Some(value) => {
            let time = match query.str("time") {
                Some(t) => params::time(t)?,
                None => representative_time(),
            };
            (params::date(value)?, time)
        }
        None => AppState::now_in(tz),
    };
    params::check_year(date)?;
    Ok(Observation::new(location, date, time, tz))
}

/// `GET /astrology/moon-phase?date=&latitude=&longitude=&timezone=`
pub async fn moon_phase(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<MoonPhaseReport> {
    let obs = moon_observation(&JsonObject::from_query(query), &state)?;
    Ok(ApiResponse::ok(report::moon_phase(&obs)?))
}
