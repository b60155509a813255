//! The calendar page bundle: date texts, almanac table, moon phase and solar chart
//!
//! Each card is computed independently. A card that fails is logged and
//! replaced by placeholder values so the page still renders.

use super::astrology::representative_time;
use super::params::{self, JsonObject};
use super::{ApiResponse, ApiResult, AppState};
use crate::astronomy::{Observation, report};
use crate::calendar::{FiveElements, chinese, elements, solar_text, tibetan};
use crate::models::Location;
use axum::extract::State;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensiveData {
    pub selected_date: String,
    pub selected_city: String,
    pub location: Location,
    pub date_events: Value,
    pub astrological_table: Value,
    pub moon_phase: Value,
    pub planetary_chart: Value,
}

/// Six table rows; only the first two carry an effect and 定日 has five values
fn table_rows(elements: &FiveElements) -> Vec<Value> {
    (0..6)
        .map(|i| {
            json!({
                "fixedWeekday": elements.fixed_weekday[i],
                "solarLunar": elements.solar_lunar[i],
                "fixedDay": elements.fixed_day.get(i).map_or(json!(""), |v| json!(v)),
                "conjunction": elements.conjunction[i],
                "effect": elements.effects.get(i).copied().unwrap_or(""),
            })
        })
        .collect()
}

fn moon_phase_placeholder() -> Value {
    json!({
        "lunarDate": "",
        "lunar_day": 0,
        "observationTime": "00:00",
        "illumination": 0,
        "culminationTime": "00:00",
        "moonriseTime": "00:00",
        "moonsetTime": "00:00",
        "phaseName": "未知",
        "phaseAngle": 0
    })
}

fn chart_placeholder(date: NaiveDate) -> Value {
    json!({
        "solarDate": solar_text(date),
        "constellation": "未知",
        "riseTime": "00:00",
        "setTime": "00:00",
        "transitTime": "00:00",
        "zodiacPosition": { "sign": "未知", "degree": 0, "minute": 0 }
    })
}

/// Serialize a card, falling back to `placeholder` on any failure
fn card<T: Serialize>(
    name: &str,
    date: NaiveDate,
    result: anyhow::Result<T>,
    placeholder: impl FnOnce() -> Value,
) -> Value {
    match result.and_then(|value| Ok(serde_json::to_value(value)?)) {
        Ok(value) => value,
        Err(e) => {
            warn!("{name} failed for {date}: {e:#}");
            placeholder()
        }
    }
}

fn date_events(date: NaiveDate, tibetan_text: &str) -> Value {
    let lunar_text = chinese::lunar_text(date);
    if lunar_text.is_empty() {
        warn!("Lunar date unavailable for {date}");
    }
    json!({
        "lunarInfo": { "fullDate": lunar_text },
        "solarInfo": { "fullDate": solar_text(date) },
        "tibetanInfo": { "fullDate": tibetan_text },
    })
}

/// `POST /calendar/date-comprehensive-data`
///
/// Body fields are all optional: `date` (default today), `cityName`
/// (default 上海市, unknown names fall back to it) or `latitude` and
/// `longitude`.
pub async fn date_comprehensive_data(
    State(state): State<AppState>,
    body: JsonObject,
) -> ApiResult<ComprehensiveData> {
    let tz = params::request_timezone(&body, &state)?;
    let date = match body.str("date") {
        Some(value) => params::date(value)?,
        None => AppState::now_in(tz).0,
    };
    params::check_year(date)?;
    let location = params::location(&body, &state)?;
    debug!(%date, city = %location.name, "comprehensive calendar data");

    let tibetan_text = tibetan::from_gregorian(date)
        .map(|t| t.full_text())
        .unwrap_or_default();
    if tibetan_text.is_empty() {
        warn!("Tibetan date unavailable for {date}");
    }

    let five_elements = elements::for_gregorian(date);
    let astrological_table = json!({
        "tibetanDate": tibetan_text,
        "tableData": table_rows(&five_elements),
    });

    let obs = Observation::new(location.clone(), date, representative_time(), tz);
    let moon_phase = card("Moon phase", date, report::moon_phase(&obs), moon_phase_placeholder);
    let planetary_chart = card("Planetary chart", date, report::solar_chart(&obs), || {
        chart_placeholder(date)
    });

    Ok(ApiResponse::ok(ComprehensiveData {
        selected_date: date.format("%Y-%m-%d").to_string(),
        selected_city: location.name.clone(),
        date_events: date_events(date, &tibetan_text),
        astrological_table,
        moon_phase,
        planetary_chart,
        location,
    }))
}
