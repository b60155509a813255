//! Chinese lunisolar calendar lookup for 1900-01-31 through 2100
//!
//! Each year is packed into one word: bits 0-3 hold the leap month (0 for
//! none), bits 4-15 flag 30-day months from the twelfth month up to the first,
//! and bit 16 marks a 30-day leap month.

use super::DAY_NAMES;
use chrono::NaiveDate;
use serde::Serialize;

const FIRST_YEAR: i32 = 1900;

#[rustfmt::skip]
const YEAR_INFO: [u32; 201] = [
    0x04bd8, 0x04ae0, 0x0a570, 0x054d5, 0x0d260, 0x0d950, 0x16554, 0x056a0, 0x09ad0, 0x055d2,
    0x04ae0, 0x0a5b6, 0x0a4d0, 0x0d250, 0x1d255, 0x0b540, 0x0d6a0, 0x0ada2, 0x095b0, 0x14977,
    0x04970, 0x0a4b0, 0x0b4b5, 0x06a50, 0x06d40, 0x1ab54, 0x02b60, 0x09570, 0x052f2, 0x04970,
    0x06566, 0x0d4a0, 0x0ea50, 0x16a95, 0x05ad0, 0x02b60, 0x186e3, 0x092e0, 0x1c8d7, 0x0c950,
    0x0d4a0, 0x1d8a6, 0x0b550, 0x056a0, 0x1a5b4, 0x025d0, 0x092d0, 0x0d2b2, 0x0a950, 0x0b557,
    0x06ca0, 0x0b550, 0x15355, 0x04da0, 0x0a5b0, 0x14573, 0x052b0, 0x0a9a8, 0x0e950, 0x06aa0,
    0x0aea6, 0x0ab50, 0x04b60, 0x0aae4, 0x0a570, 0x05260, 0x0f263, 0x0d950, 0x05b57, 0x056a0,
    0x096d0, 0x04dd5, 0x04ad0, 0x0a4d0, 0x0d4d4, 0x0d250, 0x0d558, 0x0b540, 0x0b6a0, 0x195a6,
    0x095b0, 0x049b0, 0x0a974, 0x0a4b0, 0x0b27a, 0x06a50, 0x06d40, 0x0af46, 0x0ab60, 0x09570,
    0x04af5, 0x04970, 0x064b0, 0x074a3, 0x0ea50, 0x06b58, 0x05ac0, 0x0ab60, 0x096d5, 0x092e0,
    0x0c960, 0x0d954, 0x0d4a0, 0x0da50, 0x07552, 0x056a0, 0x0abb7, 0x025d0, 0x092d0, 0x0cab5,
    0x0a950, 0x0b4a0, 0x0baa4, 0x0ad50, 0x055d9, 0x04ba0, 0x0a5b0, 0x15176, 0x052b0, 0x0a930,
    0x07954, 0x06aa0, 0x0ad50, 0x05b52, 0x04b60, 0x0a6e6, 0x0a4e0, 0x0d260, 0x0ea65, 0x0d530,
    0x05aa0, 0x076a3, 0x096d0, 0x04afb, 0x04ad0, 0x0a4d0, 0x1d0b6, 0x0d250, 0x0d520, 0x0dd45,
    0x0b5a0, 0x056d0, 0x055b2, 0x049b0, 0x0a577, 0x0a4b0, 0x0aa50, 0x1b255, 0x06d20, 0x0ada0,
    0x14b63, 0x09370, 0x049f8, 0x04970, 0x064b0, 0x168a6, 0x0ea50, 0x06b20, 0x1a6c4, 0x0aae0,
    0x0a2e0, 0x0d2e3, 0x0c960, 0x0d557, 0x0d4a0, 0x0da50, 0x05d55, 0x056a0, 0x0a6d0, 0x055d4,
    0x052d0, 0x0a9b8, 0x0a950, 0x0b4a0, 0x0b6a6, 0x0ad50, 0x055a0, 0x0aba4, 0x0a5b0, 0x052b0,
    0x0b273, 0x06930, 0x07337, 0x06aa0, 0x0ad50, 0x14b55, 0x04b60, 0x0a570, 0x054e4, 0x0d160,
    0x0e968, 0x0d520, 0x0daa0, 0x16aa6, 0x056d0, 0x04ae0, 0x0a9d4, 0x0a2d0, 0x0d150, 0x0f252,
    0x0d520,
];

const DIGITS: [char; 10] = ['零', '一', '二', '三', '四', '五', '六', '七', '八', '九'];

/// A date in the Chinese lunisolar calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChineseLunarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub leap: bool,
}

fn year_info(year: i32) -> Option<u32> {
    usize::try_from(year - FIRST_YEAR)
        .ok()
        .and_then(|index| YEAR_INFO.get(index).copied())
}

fn leap_month(info: u32) -> u32 {
    info & 0xf
}

fn leap_month_days(info: u32) -> i64 {
    match (leap_month(info), info & 0x10000) {
        (0, _) => 0,
        (_, 0) => 29,
        _ => 30,
    }
}

fn month_days(info: u32, month: u32) -> i64 {
    if info & (0x10000 >> month) == 0 { 29 } else { 30 }
}

fn year_days(info: u32) -> i64 {
    (1..=12).map(|m| month_days(info, m)).sum::<i64>() + leap_month_days(info)
}

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 31).unwrap_or_default()
}

/// Convert a Gregorian date, `None` before 1900-01-31 or past the table
#[must_use]
pub fn from_gregorian(date: NaiveDate) -> Option<ChineseLunarDate> {
    let mut offset = (date - base_date()).num_days();
    if offset < 0 {
        return None;
    }

    let mut year = FIRST_YEAR;
    let mut info = year_info(year)?;
    while offset >= year_days(info) {
        offset -= year_days(info);
        year += 1;
        info = year_info(year)?;
    }

    let leap = leap_month(info);
    let mut month = 1;
    let mut in_leap = false;
    loop {
        let length = if in_leap {
            leap_month_days(info)
        } else {
            month_days(info, month)
        };
        if offset < length {
            return Some(ChineseLunarDate {
                year,
                month,
                day: (offset + 1) as u32,
                leap: in_leap,
            });
        }
        offset -= length;
        if leap != 0 && month == leap && !in_leap {
            in_leap = true;
        } else {
            in_leap = false;
            month += 1;
        }
        if month > 12 {
            return None;
        }
    }
}

impl ChineseLunarDate {
    fn year_text(&self) -> String {
        self.year
            .to_string()
            .chars()
            .filter_map(|c| c.to_digit(10))
            .map(|d| DIGITS[d as usize])
            .collect()
    }

    fn month_text(&self) -> String {
        let name = match self.month {
            1 => "正".to_string(),
            12 => "腊".to_string(),
            10 => "十".to_string(),
            11 => "十一".to_string(),
            m => DIGITS[m as usize].to_string(),
        };
        if self.leap { format!("闰{name}月") } else { format!("{name}月") }
    }

    /// Display text such as `二零二五年 九月十二`
    #[must_use]
    pub fn text(&self) -> String {
        let day = DAY_NAMES[(i64::from(self.day) - 1).rem_euclid(30) as usize];
        format!("{}年 {}{}", self.year_text(), self.month_text(), day)
    }
}

/// Lunar text for a Gregorian date; empty outside the supported range
#[must_use]
pub fn lunar_text(date: NaiveDate) -> String {
    from_gregorian(date).map(|d| d.text()).unwrap_or_default()
}

/// Day of the lunar month (1-30), 0 when unavailable
#[must_use]
pub fn lunar_day(date: NaiveDate) -> u32 {
    from_gregorian(date).map_or(0, |d| d.day)
}
