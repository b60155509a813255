//! Tibetan almanac "five elements" (定曜, 太阳日月宿, 定日, 会合, 作用)
//!
//! All quantities are mixed-radix numbers. Moon related values use the
//! periods `[7, 60, 60, 6, 707]`, sun related values `[27, 60, 60, 6, 67]`.
//! Monthly bases are counted from the start of the Rabjung era in 1027.

use super::tibetan::{self, TibetanDate};
use chrono::NaiveDate;
use serde::Serialize;

const MOON_PERIODS: [i64; 5] = [7, 60, 60, 6, 707];
const SUN_PERIODS: [i64; 5] = [27, 60, 60, 6, 67];
const SUN_PERIODS_FINE: [i64; 6] = [27, 60, 60, 6, 67, 707];
const WEEKDAY_PERIODS: [i64; 6] = [7, 60, 60, 6, 67, 707];

const MOON_DAILY_STEP: [i64; 5] = [0, 59, 3, 4, 16];
const SUN_DAILY_STEP: [i64; 5] = [0, 4, 21, 5, 43];

const MOON_ANOMALY_STEP: [i64; 14] = [5, 5, 5, 4, 3, 2, 1, 1, 2, 3, 4, 5, 5, 5];
const MOON_ANOMALY_SUM: [i64; 14] = [5, 10, 15, 19, 22, 24, 25, 24, 22, 19, 15, 10, 5, 0];
const SUN_ANOMALY_STEP: [i64; 6] = [6, 4, 1, 1, 4, 6];
const SUN_ANOMALY_SUM: [i64; 6] = [6, 10, 11, 10, 6, 0];

const RABJUNG_EPOCH: i64 = 1027;

/// Almanac values for one Tibetan day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiveElements {
    /// 定曜, true weekday
    pub fixed_weekday: [i64; 6],
    /// 太阴日月宿, lunar mansion
    pub lunar_mansion: [i64; 6],
    /// 太阳日月宿, solar-lunar mansion
    pub solar_lunar: [i64; 6],
    /// 定日, true sun
    pub fixed_day: [i64; 5],
    /// 会合, conjunction
    pub conjunction: [i64; 6],
    /// 作用, the two half-day karanas
    pub effects: [&'static str; 2],
}

/// Normalize a mixed-radix number, borrowing from the next higher place once
/// for a negative digit and carrying overflow upwards. The top place wraps.
fn reduction<const N: usize>(values: [i64; N], periods: [i64; N]) -> [i64; N] {
    let mut v = values;
    let mut rem = [0i64; N];
    let mut quo = [0i64; N];
    let last = N - 1;

    if v[last] < 0 {
        v[last] += periods[last];
        v[last - 1] -= 1;
    }
    quo[last] = v[last].div_euclid(periods[last]);
    rem[last] = v[last].rem_euclid(periods[last]);

    for j in (1..last).rev() {
        if v[j] < 0 {
            v[j] += periods[j];
            v[j - 1] -= 1;
        }
        let total = v[j] + quo[j + 1];
        quo[j] = total.div_euclid(periods[j]);
        rem[j] = total.rem_euclid(periods[j]);
    }

    if v[0] < 0 {
        v[0] += periods[0];
    }
    rem[0] = (v[0] + quo[1]).rem_euclid(periods[0]);
    rem
}

/// Long division of a mixed-radix number by 135, returning the quotient digits
fn divide_by_135<const N: usize>(values: [i64; N], periods: [i64; N]) -> [i64; N] {
    let mut quo = [0i64; N];
    let mut rem = values[0].rem_euclid(135);
    quo[0] = values[0].div_euclid(135);
    for j in 1..N {
        let total = values[j] + rem * periods[j];
        quo[j] = total.div_euclid(135);
        rem = total.rem_euclid(135);
    }
    quo
}

fn add<const N: usize>(a: [i64; N], b: [i64; N]) -> [i64; N] {
    std::array::from_fn(|i| a[i] + b[i])
}

fn sub<const N: usize>(a: [i64; N], b: [i64; N]) -> [i64; N] {
    std::array::from_fn(|i| a[i] - b[i])
}

fn effect_name(index: i64) -> &'static str {
    match index {
        1 => "枝稍",
        2 => "孺蜜",
        3 => "贵种",
        4 => "捣麻",
        5 => "家生",
        6 => "商贾",
        0 => "毗支",
        7 => "吉祥",
        8 => "四足",
        9 => "蛟龙",
        _ => "不净",
    }
}

fn effects(day: i64) -> [&'static str; 2] {
    let (first, second) = match day {
        1 => (10, 1),
        29 => (0, 7),
        30 => (8, 9),
        _ => {
            let base = (2 * day - 1).rem_euclid(7);
            ((base - 1).rem_euclid(7), base)
        }
    };
    [effect_name(first), effect_name(second)]
}

/// Compute the almanac for a Gregorian date; zeros outside the table range
#[must_use]
pub fn for_gregorian(date: NaiveDate) -> FiveElements {
    tibetan::from_gregorian(date).map_or_else(FiveElements::default, |t| for_tibetan(&t))
}

/// Compute the almanac for a Tibetan date
#[must_use]
pub fn for_tibetan(date: &TibetanDate) -> FiveElements {
    let year = i64::from(date.year);
    let month = i64::from(date.month);
    let day = i64::from(date.day);

    // Months elapsed since the epoch, with intercalations folded in
    let months = (year - RABJUNG_EPOCH).rem_euclid(60) * 12 + (month - 3).rem_euclid(12);
    let months = months + months * 2 / 65;

    let weekday_base = reduction(
        [months + 3, months * 31 + 11, months * 50 + 27, 2, months * 480 + 332],
        MOON_PERIODS,
    );
    let sun_base = reduction(
        [months * 2, months * 10, months * 58, months, months * 17],
        SUN_PERIODS,
    );
    let [anomaly, anomaly_fraction] = reduction([months * 2 + 21, months + 90], [28, 126]);

    let mean_weekday = reduction(
        add(weekday_base, reduction(MOON_DAILY_STEP.map(|s| s * day), MOON_PERIODS)),
        MOON_PERIODS,
    );
    let mean_sun = reduction(
        add(sun_base, reduction(SUN_DAILY_STEP.map(|s| s * day), SUN_PERIODS)),
        SUN_PERIODS,
    );

    // Moon anomaly correction
    let step = (anomaly + day).rem_euclid(14);
    let odd_half = (anomaly + day).div_euclid(14) % 2 != 0;
    let leading = step <= 6;
    let step_size = MOON_ANOMALY_STEP[step as usize];
    let sum_index = if step == 0 { 14 } else { step };
    let mut moon_terms = [MOON_ANOMALY_SUM[(sum_index - 1) as usize], 0, 0, 0, 0];
    let multipliers = [1, step_size, 60, 6, 707];
    let mut carry = anomaly_fraction;
    for i in 1..5 {
        moon_terms[i] = carry * multipliers[i] / 126;
        carry = carry * multipliers[i] % 126;
    }
    let moon_correction = if leading {
        [moon_terms[0] + moon_terms[1], moon_terms[2], moon_terms[3], moon_terms[4]]
    } else {
        let [a, b, c] = reduction(
            [59 - moon_terms[2], 5 - moon_terms[3], 707 - moon_terms[4]],
            [60, 6, 707],
        );
        [moon_terms[0] - moon_terms[1] - 1, a, b, c]
    };
    let [c0, c1, c2, c3] = reduction(moon_correction, [60, 60, 6, 707]);
    let moon_correction = [0, c0, c1, c2, c3];

    let half_weekday = if odd_half {
        reduction(sub(mean_weekday, moon_correction), MOON_PERIODS)
    } else {
        reduction(add(mean_weekday, moon_correction), MOON_PERIODS)
    };
    let half_weekday = [
        half_weekday[0],
        half_weekday[1],
        half_weekday[2],
        half_weekday[3],
        half_weekday[4] * 67 / 707,
        half_weekday[4] * 67 % 707,
    ];

    // Sun anomaly correction
    let shifted = reduction(sub(mean_sun, [6, 45, 0, 0, 0]), SUN_PERIODS);
    let past_half = shifted[0] >= 14 || (shifted[0] == 13 && shifted[1] >= 30);
    let shifted = if past_half {
        reduction(sub(shifted, [13, 30, 0, 0, 0]), SUN_PERIODS)
    } else {
        shifted
    };

    let arc = shifted[1] + shifted[0] * 60;
    let mut sun_step = arc / 135;
    let arc_rest = arc % 135;
    if sun_step == 6 {
        sun_step = 0;
    }
    let sun_leading = sun_step <= 2;
    let sun_step_size = SUN_ANOMALY_STEP[sun_step as usize];
    let sun_sum_index = if sun_step == 0 { 6 } else { sun_step };
    let sun_sum = SUN_ANOMALY_SUM[(sun_sum_index - 1) as usize];

    let scaled = [arc_rest, shifted[2], shifted[3], shifted[4]].map(|v| v * sun_step_size);
    let [q0, q1, q2, q3] = divide_by_135(scaled, [60, 60, 6, 67]);
    let sun_correction = if sun_leading {
        [sun_sum + q0, q1, q2, q3]
    } else {
        [sun_sum - q0 - 1, 59 - q1, 5 - q2, 67 - q3]
    };
    let [s0, s1, s2, s3] = reduction(sun_correction, [60, 60, 6, 67]);

    let (fixed_weekday, fixed_day) = if past_half {
        (
            reduction(add(half_weekday, [0, s0, s1, s2, s3, 0]), WEEKDAY_PERIODS),
            reduction(add(mean_sun, [0, s0, s1, s2, s3]), SUN_PERIODS),
        )
    } else {
        (
            reduction(sub(half_weekday, [0, s0, s1, s2, s3, 0]), WEEKDAY_PERIODS),
            reduction(sub(mean_sun, [0, s0, s1, s2, s3]), SUN_PERIODS),
        )
    };

    // The moon covers 54 arc-minutes more than the sun per lunar day
    let travelled = [54 * day / 60, 54 * day % 60, 0, 0, 0];
    let [m0, m1, m2, m3, m4] = reduction(add(fixed_day, travelled), SUN_PERIODS);
    let lunar_mansion = [m0, m1, m2, m3, m4, 0];

    let mut weekday_fraction = fixed_weekday;
    weekday_fraction[0] = 0;
    let solar_lunar = reduction(sub(lunar_mansion, weekday_fraction), SUN_PERIODS_FINE);

    let [d0, d1, d2, d3, d4] = fixed_day;
    let conjunction = reduction(add(solar_lunar, [d0, d1, d2, d3, d4, 0]), SUN_PERIODS_FINE);

    FiveElements {
        fixed_weekday,
        lunar_mansion,
        solar_lunar,
        fixed_day,
        conjunction,
        effects: effects(day),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_reduction_carries_and_borrows() {
        assert_eq!(reduction([0, 0, 61], [7, 60, 60]), [0, 1, 1]);
        assert_eq!(reduction([1, 0, -1], [7, 60, 60]), [0, 59, 59]);
        assert_eq!(reduction([8, 59, 60], [7, 60, 60]), [2, 0, 0]);
    }

    #[test]
    fn test_divide_by_135() {
        // 1 * 60 + 75 = 135 -> quotient digit 1 in the second place
        assert_eq!(divide_by_135([1, 75], [60, 60]), [0, 1]);
        assert_eq!(divide_by_135([270, 0], [60, 60]), [2, 0]);
    }

    #[rstest]
    #[case(
        date(2025, 11, 1),
        [0, 46, 51, 2, 29, 195],
        [22, 46, 6, 1, 15, 512],
        [13, 38, 57, 3, 45],
        [9, 25, 3, 4, 60, 512],
        ["商贾", "毗支"]
    )]
    #[case(
        date(2000, 1, 1),
        [0, 10, 2, 5, 18, 551],
        [13, 35, 20, 5, 7, 156],
        [18, 15, 23, 4, 26],
        [4, 50, 44, 3, 33, 156],
        ["商贾", "毗支"]
    )]
    #[case(
        date(1990, 5, 17),
        [5, 3, 6, 2, 29, 215],
        [21, 17, 13, 3, 37, 492],
        [1, 32, 20, 0, 0],
        [22, 49, 33, 3, 37, 492],
        ["毗支", "枝稍"]
    )]
    fn test_known_almanac_values(
        #[case] gregorian: NaiveDate,
        #[case] fixed_weekday: [i64; 6],
        #[case] solar_lunar: [i64; 6],
        #[case] fixed_day: [i64; 5],
        #[case] conjunction: [i64; 6],
        #[case] effects: [&str; 2],
    ) {
        let elements = for_gregorian(gregorian);
        assert_eq!(elements.fixed_weekday, fixed_weekday);
        assert_eq!(elements.solar_lunar, solar_lunar);
        assert_eq!(elements.fixed_day, fixed_day);
        assert_eq!(elements.conjunction, conjunction);
        assert_eq!(elements.effects, effects);
    }

    #[test]
    fn test_lunar_mansion() {
        let elements = for_gregorian(date(2025, 11, 1));
        assert_eq!(elements.lunar_mansion, [23, 32, 57, 3, 45, 0]);
    }

    #[test]
    fn test_out_of_range_is_zeroed() {
        let elements = for_gregorian(date(2060, 1, 1));
        assert_eq!(elements, FiveElements::default());
        assert_eq!(elements.effects, ["", ""]);
    }

    #[rstest]
    #[case(1, ["不净", "枝稍"])]
    #[case(29, ["毗支", "吉祥"])]
    #[case(30, ["四足", "蛟龙"])]
    #[case(4, ["商贾", "毗支"])]
    #[case(5, ["枝稍", "孺蜜"])]
    fn test_effects(#[case] day: i64, #[case] expected: [&str; 2]) {
        assert_eq!(effects(day), expected);
    }
}
