//! Request body extraction and parameter parsing
//!
//! Bodies are read as loose JSON objects so that a malformed or empty body
//! maps onto the error codes clients expect instead of axum's plain-text
//! rejections. Query strings go through the same accessors.

use super::AppState;
use crate::astronomy::Observation;
use crate::calendar;
use crate::error::{ErrorCode, ZangliError};
use crate::models::{Location, default_city, find_city, nearest_city};
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Years the astronomy and almanac endpoints accept
pub const SUPPORTED_YEARS: std::ops::RangeInclusive<i32> = 1900..=2100;

/// Registry cities within this distance lend their name to raw coordinates
const CITY_MATCH_RADIUS_KM: f64 = 100.0;

pub const MISSING_OBSERVATION_PARAMS: &str = "缺少必需参数 latitude, longitude, date";

/// A request body parsed as a JSON object; an empty body yields an empty map
#[derive(Debug, Default, Clone)]
pub struct JsonObject(pub Map<String, Value>);

impl<S: Send + Sync> FromRequest<S> for JsonObject {
    type Rejection = ZangliError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = body_bytes(req, state).await?;
        parse_object(&bytes).map(JsonObject)
    }
}

/// Buffer the request body, reporting an over-limit body as `PAYLOAD_TOO_LARGE`
pub async fn body_bytes<S: Send + Sync>(req: Request, state: &S) -> Result<Bytes, ZangliError> {
    Bytes::from_request(req, state).await.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ZangliError::payload_too_large("请求体过大")
        } else {
            ZangliError::invalid_request(rejection.body_text())
        }
    })
}

/// Parse raw bytes into a JSON object
pub fn parse_object(bytes: &[u8]) -> Result<Map<String, Value>, ZangliError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(_) => Err(ZangliError::invalid_request("请求体必须是JSON对象")),
        Err(e) => Err(ZangliError::invalid_request(format!("无效的JSON请求体: {e}"))),
    }
}

fn not_a_number(key: &str) -> ZangliError {
    ZangliError::invalid_request(format!("参数 {key} 必须为数字"))
}

impl JsonObject {
    #[must_use]
    pub fn from_query(query: HashMap<String, String>) -> Self {
        Self(
            query
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
        )
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn require_non_empty(&self) -> Result<(), ZangliError> {
        if self.is_empty() {
            return Err(ZangliError::validation(
                ErrorCode::EmptyRequest,
                "请求体不能为空",
            ));
        }
        Ok(())
    }

    /// A non-blank string field
    #[must_use]
    pub fn str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// A numeric field; numeric strings are accepted
    pub fn f64(&self, key: &str) -> Result<Option<f64>, ZangliError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(|| not_a_number(key)),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Some)
                .ok_or_else(|| not_a_number(key)),
            Some(_) => Err(not_a_number(key)),
        }
    }

    /// An integer field; integral floats and numeric strings are accepted
    pub fn i64(&self, key: &str) -> Result<Option<i64>, ZangliError> {
        match self.f64(key)? {
            None => Ok(None),
            Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => Ok(Some(v as i64)),
            Some(_) => Err(ZangliError::invalid_request(format!("参数 {key} 必须为整数"))),
        }
    }

    #[must_use]
    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            Value::Number(n) => n.as_i64().map(|v| v != 0),
            _ => None,
        }
    }
}

/// `YYYY-MM-DD`
pub fn date(value: &str) -> Result<NaiveDate, ZangliError> {
    calendar::parse_date(value).ok_or_else(|| ZangliError::invalid_date("日期格式必须为YYYY-MM-DD"))
}

/// `HH:MM` or `HH:MM:SS`
pub fn time(value: &str) -> Result<NaiveTime, ZangliError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| ZangliError::invalid_date("时间格式必须为HH:MM"))
}

/// A local date-time, or an RFC 3339 timestamp converted into `tz`
pub fn datetime(value: &str, tz: Tz) -> Result<(NaiveDate, NaiveTime), ZangliError> {
    let value = value.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        let local = instant.with_timezone(&tz);
        return Ok((local.date_naive(), local.time()));
    }
    let (d, t) = value
        .split_once(['T', ' '])
        .ok_or_else(|| ZangliError::invalid_date("日期时间格式必须为YYYY-MM-DDTHH:MM"))?;
    Ok((date(d)?, time(t)?))
}

/// An IANA zone name, or a whole-hour UTC offset such as `8` or `-5`
pub fn timezone(value: &str) -> Result<Tz, ZangliError> {
    let value = value.trim();
    if let Ok(tz) = value.parse::<Tz>() {
        return Ok(tz);
    }
    let invalid = || ZangliError::invalid_request(format!("无效的时区: {value}"));
    let hours: i32 = value.parse().map_err(|_| invalid())?;
    if !(-12..=14).contains(&hours) {
        return Err(invalid());
    }
    // Etc zones use inverted signs
    let name = if hours == 0 {
        "Etc/GMT".to_string()
    } else {
        format!("Etc/GMT{:+}", -hours)
    };
    name.parse::<Tz>().map_err(|_| invalid())
}

pub fn check_year(date: NaiveDate) -> Result<(), ZangliError> {
    if SUPPORTED_YEARS.contains(&date.year()) {
        Ok(())
    } else {
        Err(ZangliError::out_of_range("使用1900-2100年范围内的日期"))
    }
}

pub fn coordinates(latitude: f64, longitude: f64, altitude: f64) -> Result<Location, ZangliError> {
    let location = Location::new(latitude, longitude, altitude, String::new());
    if location.is_valid() {
        Ok(location)
    } else {
        Err(ZangliError::invalid_request(
            "经纬度超出范围: 纬度须在-90到90之间，经度须在-180到180之间",
        ))
    }
}

/// Location from `latitude`/`longitude`, else `cityName`, else the default city
///
/// Raw coordinates are named after the closest registry city when one is
/// near enough.
pub fn location(params: &JsonObject, state: &AppState) -> Result<Location, ZangliError> {
    match (params.f64("latitude")?, params.f64("longitude")?) {
        (Some(lat), Some(lon)) => {
            let altitude = params
                .f64("altitude")?
                .unwrap_or(state.config.astronomy.altitude);
            let mut location = coordinates(lat, lon, altitude)?;
            let (city, distance) = nearest_city(&location);
            location.name = if distance <= CITY_MATCH_RADIUS_KM {
                city.name
            } else {
                location.format_coordinates()
            };
            Ok(location)
        }
        (Some(_), None) | (None, Some(_)) => Err(ZangliError::missing_params(
            "latitude 和 longitude 必须同时提供",
        )),
        (None, None) => Ok(params
            .str("cityName")
            .and_then(find_city)
            .unwrap_or_else(default_city)),
    }
}

/// Resolve the request time zone, falling back to the configured one
pub fn request_timezone(params: &JsonObject, state: &AppState) -> Result<Tz, ZangliError> {
    params
        .str("timezone")
        .map_or(Ok(state.timezone), timezone)
}

/// Observation for the rise/set endpoints
///
/// Requires `latitude`, `longitude` and either `datetime` or `date` with an
/// optional `time` (default midnight).
pub fn observation(params: &JsonObject, state: &AppState) -> Result<Observation, ZangliError> {
    let latitude = params.f64("latitude")?;
    let longitude = params.f64("longitude")?;
    let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
        return Err(ZangliError::missing_params(MISSING_OBSERVATION_PARAMS));
    };
    let tz = request_timezone(params, state)?;

    let (date, time) = match (params.str("datetime"), params.str("date")) {
        (Some(value), _) => datetime(value, tz)?,
        (None, Some(value)) => (date(value)?, time(params.str("time").unwrap_or("00:00"))?),
        (None, None) => return Err(ZangliError::missing_params(MISSING_OBSERVATION_PARAMS)),
    };
    check_year(date)?;

    let altitude = params
        .f64("altitude")?
        .unwrap_or(state.config.astronomy.altitude);
    let location = coordinates(latitude, longitude, altitude)?;
    Ok(Observation::new(location, date, time, tz))
}
