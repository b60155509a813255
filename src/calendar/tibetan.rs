//! Table driven Tibetan calendar conversion
//!
//! Every Gregorian day from 1951-01-08 onwards is counted through the month
//! table. A month normally has 30 days; each negative adjustment removes a
//! day and each positive adjustment repeats one.

use super::DAY_NAMES;
use super::tibetan_table::MONTH_ADJUSTMENTS;
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::sync::LazyLock;

const ELEMENTS: [char; 5] = ['铁', '水', '木', '火', '土'];
const ANIMALS: [char; 12] = ['虎', '兔', '龙', '蛇', '马', '羊', '猴', '鸡', '狗', '猪', '鼠', '牛'];
const MONTH_NUMERALS: [&str; 12] = [
    "正", "二", "三", "四", "五", "六", "七", "八", "九", "十", "十一", "十二",
];
const MONTH_TITLES: [&str; 12] = [
    "神变", "苦行", "具香", "萨嘎", "作净", "明净", "具醉", "具贤", "天降", "持众", "庄严", "满意",
];

/// A date in the Tibetan calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TibetanDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// The month is an intercalary month
    pub leap_month: bool,
    /// This day number repeats
    pub leap_day: bool,
    /// The previous day number was skipped
    pub after_skipped_day: bool,
}

struct MonthSpan {
    year: i32,
    month: u32,
    leap_month: bool,
    /// Offset of the first day from the epoch
    start: i64,
    length: i64,
    adjustments: &'static [i8],
}

static MONTH_SPANS: LazyLock<Vec<MonthSpan>> = LazyLock::new(build_spans);

fn build_spans() -> Vec<MonthSpan> {
    let mut spans = Vec::new();
    let mut start = 0i64;

    for (year_index, months) in MONTH_ADJUSTMENTS.iter().enumerate() {
        let mut leap_months = 0usize;
        // The first row only holds the final month of 1950
        let first_month = if year_index == 0 { 12 - months.len() } else { 0 };

        for (month_index, adjustments) in months.iter().enumerate() {
            let leap_markers = adjustments.iter().filter(|&&a| a == 0).count();
            leap_months += leap_markers;
            let length = month_length(adjustments);

            spans.push(MonthSpan {
                year: 1950 + year_index as i32,
                month: (first_month + month_index + 1 - leap_months) as u32,
                leap_month: leap_markers > 0,
                start,
                length,
                adjustments,
            });
            start += length;
        }
    }
    spans
}

fn month_length(adjustments: &[i8]) -> i64 {
    adjustments.iter().fold(30, |length, &a| match a.signum() {
        -1 => length - 1,
        1 => length + 1,
        _ => length,
    })
}

/// Map a day offset inside a month to (day number, leap day, after skipped day)
fn resolve_day(adjustments: &[i8], offset: i64) -> (u32, bool, bool) {
    let mut t = offset;
    let mut leap_day = false;
    let mut after_skipped_day = false;

    for &adjustment in adjustments {
        let a = i64::from(adjustment);
        if a == 0 {
            continue;
        }
        if a + 1 == -t {
            after_skipped_day = true;
            t += 1;
        } else if a == t {
            leap_day = true;
            t -= 1;
        } else if a > 0 && a < t {
            t -= 1;
        } else if a < 0 && -a - 1 < t {
            t += 1;
        }
    }
    ((t + 1) as u32, leap_day, after_skipped_day)
}

/// First Gregorian day covered by the table
#[must_use]
pub fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1951, 1, 8).unwrap_or_default()
}

/// Last Gregorian day covered by the table
#[must_use]
pub fn last_supported_date() -> NaiveDate {
    let total: i64 = MONTH_SPANS.last().map_or(0, |s| s.start + s.length);
    epoch() + Days::new(total.saturating_sub(1) as u64)
}

/// Convert a Gregorian date, `None` outside 1951-01-08..=2051-02-11
#[must_use]
pub fn from_gregorian(date: NaiveDate) -> Option<TibetanDate> {
    let offset = (date - epoch()).num_days();
    if offset < 0 {
        return None;
    }

    let index = MONTH_SPANS.partition_point(|span| span.start + span.length <= offset);
    let span = MONTH_SPANS.get(index)?;
    let (day, leap_day, after_skipped_day) = resolve_day(span.adjustments, offset - span.start);

    Some(TibetanDate {
        year: span.year,
        month: span.month,
        day,
        leap_month: span.leap_month,
        leap_day,
        after_skipped_day,
    })
}

/// Convert a Tibetan date back to the Gregorian calendar.
///
/// A doubled day resolves to its first occurrence; a skipped day has no
/// Gregorian counterpart.
#[must_use]
pub fn to_gregorian(year: i32, month: u32, day: u32, leap_month: bool) -> Option<NaiveDate> {
    MONTH_SPANS
        .iter()
        .filter(|span| span.year == year && span.month == month && span.leap_month == leap_month)
        .find_map(|span| {
            (0..span.length)
                .find(|&offset| resolve_day(span.adjustments, offset).0 == day)
                .map(|offset| span.start + offset)
        })
        .and_then(|offset| u64::try_from(offset).ok())
        .map(|offset| epoch() + Days::new(offset))
}

impl TibetanDate {
    /// Element and animal of the year, e.g. `木蛇`
    #[must_use]
    pub fn year_name(&self) -> String {
        let cycle = self.year - 1950;
        let element = ELEMENTS[(cycle.div_euclid(2)).rem_euclid(5) as usize];
        let animal = ANIMALS[cycle.rem_euclid(12) as usize];
        format!("{element}{animal}")
    }

    fn month_index(&self) -> usize {
        (i64::from(self.month) - 1).rem_euclid(12) as usize
    }

    /// Month numeral, `正` through `十二`
    #[must_use]
    pub fn month_name(&self) -> &'static str {
        MONTH_NUMERALS[self.month_index()]
    }

    /// Traditional month title such as `神变`
    #[must_use]
    pub fn month_title(&self) -> &'static str {
        MONTH_TITLES[self.month_index()]
    }

    #[must_use]
    pub fn day_name(&self) -> &'static str {
        DAY_NAMES[(i64::from(self.day) - 1).rem_euclid(30) as usize]
    }

    /// Display text, e.g. `木蛇年 九月十一`
    #[must_use]
    pub fn full_text(&self) -> String {
        format!(
            "{}年 {}月{}",
            self.year_name(),
            self.month_name(),
            self.day_name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(date(1951, 1, 8), 1950, 12, 1)]
    #[case(date(1951, 2, 7), 1951, 1, 1)]
    #[case(date(1990, 5, 17), 1990, 3, 22)]
    #[case(date(2000, 1, 1), 1999, 11, 25)]
    #[case(date(2024, 2, 10), 2024, 1, 1)]
    #[case(date(2025, 11, 1), 2025, 9, 11)]
    #[case(date(2051, 2, 10), 2050, 12, 29)]
    #[case(date(2051, 2, 11), 2050, 12, 30)]
    fn test_known_dates(
        #[case] gregorian: NaiveDate,
        #[case] year: i32,
        #[case] month: u32,
        #[case] day: u32,
    ) {
        let tibetan = from_gregorian(gregorian).unwrap();
        assert_eq!((tibetan.year, tibetan.month, tibetan.day), (year, month, day));
    }

    #[test]
    fn test_out_of_range() {
        assert!(from_gregorian(date(2051, 2, 12)).is_none());
        assert!(from_gregorian(date(2100, 1, 1)).is_none());
        assert!(from_gregorian(date(1951, 1, 7)).is_none());
        assert_eq!(last_supported_date(), date(2051, 2, 11));
    }

    #[test]
    fn test_leap_month() {
        let tibetan = from_gregorian(date(1951, 6, 5)).unwrap();
        assert_eq!((tibetan.year, tibetan.month, tibetan.day), (1951, 4, 1));
        assert!(tibetan.leap_month);
    }

    #[test]
    fn test_doubled_day() {
        let first = from_gregorian(date(2021, 1, 17)).unwrap();
        let second = from_gregorian(date(2021, 1, 18)).unwrap();
        assert_eq!((first.year, first.month, first.day), (2020, 12, 5));
        assert_eq!((second.year, second.month, second.day), (2020, 12, 5));
        assert!(second.leap_day);
        assert!(!second.after_skipped_day);
    }

    #[test]
    fn test_skipped_day() {
        let before = from_gregorian(date(2021, 1, 13)).unwrap();
        let after = from_gregorian(date(2021, 1, 14)).unwrap();
        assert_eq!((before.month, before.day), (11, 30));
        assert_eq!((after.year, after.month, after.day), (2020, 12, 2));
        assert!(after.after_skipped_day);
    }

    #[test]
    fn test_names() {
        let tibetan = from_gregorian(date(2025, 11, 1)).unwrap();
        assert_eq!(tibetan.year_name(), "木蛇");
        assert_eq!(tibetan.month_name(), "九");
        assert_eq!(tibetan.month_title(), "天降");
        assert_eq!(tibetan.day_name(), "十一");
        assert_eq!(tibetan.full_text(), "木蛇年 九月十一");
    }

    #[test]
    fn test_to_gregorian_roundtrip() {
        assert_eq!(to_gregorian(2025, 9, 11, false), Some(date(2025, 11, 1)));
        assert_eq!(to_gregorian(2024, 1, 1, false), Some(date(2024, 2, 10)));
        assert_eq!(to_gregorian(1951, 4, 1, true), Some(date(1951, 6, 5)));
    }

    #[test]
    fn test_to_gregorian_doubled_day_returns_first() {
        assert_eq!(to_gregorian(2020, 12, 5, false), Some(date(2021, 1, 17)));
    }

    #[test]
    fn test_to_gregorian_missing() {
        // Day 1 of the twelfth month 2020 is skipped
        assert_eq!(to_gregorian(2020, 12, 1, false), None);
        assert_eq!(to_gregorian(2060, 1, 1, false), None);
        assert_eq!(to_gregorian(2025, 9, 11, true), None);
    }
}
