//! Calendar conversions: Tibetan, Chinese lunisolar and Gregorian display text

pub mod chinese;
pub mod elements;
pub mod tibetan;
mod tibetan_table;

use chrono::{Datelike, NaiveDate, Weekday};

pub use chinese::ChineseLunarDate;
pub use elements::FiveElements;
pub use tibetan::TibetanDate;

/// Day names shared by the Tibetan and Chinese calendars
pub(crate) const DAY_NAMES: [&str; 30] = [
    "初一", "初二", "初三", "初四", "初五", "初六", "初七", "初八", "初九", "初十", "十一", "十二",
    "十三", "十四", "十五", "十六", "十七", "十八", "十九", "二十", "廿一", "廿二", "廿三", "廿四",
    "廿五", "廿六", "廿七", "廿八", "廿九", "三十",
];

/// Chinese weekday label, Monday first
#[must_use]
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "周一",
        Weekday::Tue => "周二",
        Weekday::Wed => "周三",
        Weekday::Thu => "周四",
        Weekday::Fri => "周五",
        Weekday::Sat => "周六",
        Weekday::Sun => "周日",
    }
}

/// Gregorian date text such as `2025年11月1日 周六`
#[must_use]
pub fn solar_text(date: NaiveDate) -> String {
    format!(
        "{}年{}月{}日 {}",
        date.year(),
        date.month(),
        date.day(),
        weekday_name(date.weekday())
    )
}

/// Parse a `YYYY-MM-DD` date, tolerating missing zero padding
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let mut parts = value.trim().splitn(3, '-');
    let year = parts.next()?.trim().parse().ok()?;
    let month = parts.next()?.trim().parse().ok()?;
    let day = parts.next()?.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
