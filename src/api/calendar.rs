//! Calendar lookup and conversion endpoints

use super::params::{self, JsonObject};
use super::{ApiResponse, ApiResult, AppState};
use crate::calendar::{
    ChineseLunarDate, FiveElements, TibetanDate, chinese, elements, solar_text, tibetan,
    weekday_name,
};
use crate::error::ZangliError;
use axum::extract::{Query, State};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

const TIBETAN_RANGE: &str = "藏历换算支持 1951-01-08 至 2051-02-11";

/// A Tibetan date with its display names
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TibetanView {
    #[serde(flatten)]
    pub date: TibetanDate,
    pub year_name: String,
    pub month_name: &'static str,
    pub month_title: &'static str,
    pub day_name: &'static str,
    pub full_text: String,
}

impl From<TibetanDate> for TibetanView {
    fn from(date: TibetanDate) -> Self {
        Self {
            year_name: date.year_name(),
            month_name: date.month_name(),
            month_title: date.month_title(),
            day_name: date.day_name(),
            full_text: date.full_text(),
            date,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LunarView {
    #[serde(flatten)]
    pub date: ChineseLunarDate,
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TibetanLookup {
    pub gregorian_date: String,
    pub tibetan: TibetanView,
}

/// A Gregorian day in every supported calendar
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    pub gregorian_date: String,
    pub solar_text: String,
    pub weekday: &'static str,
    pub tibetan: TibetanView,
    pub lunar: Option<LunarView>,
    pub five_elements: FiveElements,
}

fn tibetan_for(date: NaiveDate) -> Result<TibetanDate, ZangliError> {
    tibetan::from_gregorian(date).ok_or_else(|| ZangliError::out_of_range(TIBETAN_RANGE))
}

fn convert_gregorian(date: NaiveDate) -> Result<Conversion, ZangliError> {
    let tibetan_date = tibetan_for(date)?;
    Ok(Conversion {
        gregorian_date: date.format("%Y-%m-%d").to_string(),
        solar_text: solar_text(date),
        weekday: weekday_name(date.weekday()),
        five_elements: elements::for_tibetan(&tibetan_date),
        tibetan: tibetan_date.into(),
        lunar: chinese::from_gregorian(date).map(|lunar| LunarView {
            text: lunar.text(),
            date: lunar,
        }),
    })
}

fn required_u32(params: &JsonObject, key: &str) -> Result<u32, ZangliError> {
    let value = params
        .i64(key)?
        .ok_or_else(|| ZangliError::missing_params(format!("缺少必需参数 {key}")))?;
    u32::try_from(value).map_err(|_| ZangliError::invalid_request(format!("参数 {key} 超出范围")))
}

/// `GET /calendar/tibetan?year=&month=&day=`; no parameters means today
pub async fn tibetan(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<TibetanLookup> {
    let params = JsonObject::from_query(query);

    let date = if ["year", "month", "day"].iter().all(|k| params.str(k).is_none()) {
        state.today()
    } else {
        let year = params
            .i64("year")?
            .ok_or_else(|| ZangliError::missing_params("缺少必需参数 year, month, day"))?;
        let month = required_u32(&params, "month")?;
        let day = required_u32(&params, "day")?;
        i32::try_from(year)
            .ok()
            .and_then(|y| NaiveDate::from_ymd_opt(y, month, day))
            .ok_or_else(|| ZangliError::invalid_date("日期无效"))?
    };

    let tibetan = tibetan_for(date)?;
    Ok(ApiResponse::ok(TibetanLookup {
        gregorian_date: date.format("%Y-%m-%d").to_string(),
        tibetan: tibetan.into(),
    }))
}

/// `POST /calendar/convert`
///
/// `{"date": "YYYY-MM-DD"}` converts from the Gregorian calendar;
/// `{"from": "tibetan", "year", "month", "day", "leapMonth"?}` converts a
/// Tibetan date, resolving doubled days to their first occurrence.
pub async fn convert(body: JsonObject) -> ApiResult<Conversion> {
    body.require_non_empty()?;

    let date = match body.str("from").unwrap_or("gregorian") {
        "gregorian" | "solar" => {
            let value = body
                .str("date")
                .ok_or_else(|| ZangliError::missing_params("缺少必需参数 date"))?;
            params::date(value)?
        }
        "tibetan" => {
            let year = body
                .i64("year")?
                .and_then(|y| i32::try_from(y).ok())
                .ok_or_else(|| ZangliError::missing_params("缺少必需参数 year, month, day"))?;
            let month = required_u32(&body, "month")?;
            let day = required_u32(&body, "day")?;
            if !(1..=12).contains(&month) || !(1..=30).contains(&day) {
                return Err(ZangliError::invalid_date("藏历月份须在1-12之间，日期须在1-30之间"));
            }
            let leap_month = body.bool("leapMonth").unwrap_or(false);
            tibetan::to_gregorian(year, month, day, leap_month).ok_or_else(|| {
                ZangliError::out_of_range(format!(
                    "藏历 {year}年{month}月{day}日 不存在或超出范围 ({TIBETAN_RANGE})"
                ))
            })?
        }
        other => {
            return Err(ZangliError::invalid_request(format!(
                "不支持的历法: {other}，可选 gregorian 或 tibetan"
            )));
        }
    };

    Ok(ApiResponse::ok(convert_gregorian(date)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_gregorian() {
        let conversion = convert_gregorian(NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()).unwrap();
        assert_eq!(conversion.gregorian_date, "2025-11-01");
        assert_eq!(conversion.weekday, "周六");
        assert_eq!(conversion.tibetan.full_text, "木蛇年 九月十一");
        assert_eq!(conversion.lunar.as_ref().unwrap().text, "二零二五年 九月十二");
        assert_eq!(conversion.five_elements.fixed_weekday, [0, 46, 51, 2, 29, 195]);

        let json = serde_json::to_value(&conversion).unwrap();
        assert_eq!(json["tibetan"]["year"], 2025);
        assert_eq!(json["tibetan"]["leapMonth"], false);
        assert_eq!(json["tibetan"]["monthTitle"], "天降");
        assert_eq!(json["lunar"]["month"], 9);
    }

    #[test]
    fn test_convert_out_of_range() {
        let err = convert_gregorian(NaiveDate::from_ymd_opt(2051, 2, 12).unwrap()).unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::DateOutOfRange);
    }
}
