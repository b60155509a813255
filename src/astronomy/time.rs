//! Julian dates and sidereal time

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Julian date of the Unix epoch
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
/// Julian date of J2000.0
pub const J2000: f64 = 2_451_545.0;

/// Normalize an angle to `[0, 360)`
#[must_use]
pub fn normalize_degrees(angle: f64) -> f64 {
    angle.rem_euclid(360.0)
}

/// Normalize an angle to `[-180, 180)`
#[must_use]
pub fn signed_degrees(angle: f64) -> f64 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

/// Julian date for a UTC instant
#[must_use]
pub fn julian_day(instant: DateTime<Utc>) -> f64 {
    let millis = instant.timestamp_millis() as f64;
    UNIX_EPOCH_JD + millis / 86_400_000.0
}

/// UTC instant for a Julian date, rounded to the millisecond
#[must_use]
pub fn from_julian_day(jd: f64) -> Option<DateTime<Utc>> {
    let millis = ((jd - UNIX_EPOCH_JD) * 86_400_000.0).round();
    DateTime::from_timestamp_millis(millis as i64)
}

/// Greenwich mean sidereal time in degrees
#[must_use]
pub fn gmst_degrees(jd: f64) -> f64 {
    let t = (jd - J2000) / 36_525.0;
    normalize_degrees(
        280.460_618_37 + 360.985_647_366_29 * (jd - J2000) + 0.000_387_933 * t * t
            - t * t * t / 38_710_000.0,
    )
}

/// Local mean sidereal time in degrees for an east-positive longitude
#[must_use]
pub fn local_sidereal_degrees(jd: f64, longitude: f64) -> f64 {
    normalize_degrees(gmst_degrees(jd) + longitude)
}

/// The UTC span covering one local calendar day
#[must_use]
pub fn local_day_bounds(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_instant(date, NaiveTime::MIN, tz);
    let end = date
        .succ_opt()
        .map_or(start + Duration::days(1), |next| {
            local_instant(next, NaiveTime::MIN, tz)
        });
    (start, end)
}

/// Resolve a local wall-clock time; ambiguous times take the earlier instant
/// and skipped times are shifted forward by the gap.
#[must_use]
pub fn local_instant(date: NaiveDate, time: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(time);
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map_or_else(|| naive.and_utc(), |local| local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_julian_day_j2000() {
        let instant = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert_abs_diff_eq!(julian_day(instant), J2000, epsilon = 1e-9);
    }

    #[test]
    fn test_julian_day_known_date() {
        // Meeus, example 7.a: 1957 October 4.81
        let instant = Utc.with_ymd_and_hms(1957, 10, 4, 19, 26, 24).unwrap();
        assert_abs_diff_eq!(julian_day(instant), 2_436_116.31, epsilon = 1e-6);
    }

    #[test]
    fn test_from_julian_day() {
        let instant = Utc.with_ymd_and_hms(2025, 11, 1, 4, 30, 0).unwrap();
        assert_eq!(from_julian_day(julian_day(instant)), Some(instant));
    }

    #[test]
    fn test_gmst() {
        // Meeus, example 12.a: 1987 April 10, 0h UT -> 13h10m46.3668s
        let instant = Utc.with_ymd_and_hms(1987, 4, 10, 0, 0, 0).unwrap();
        let expected = (13.0 + 10.0 / 60.0 + 46.3668 / 3600.0) * 15.0;
        assert_abs_diff_eq!(gmst_degrees(julian_day(instant)), expected, epsilon = 1e-3);
    }

    #[test]
    fn test_angle_normalization() {
        assert_abs_diff_eq!(normalize_degrees(-30.0), 330.0);
        assert_abs_diff_eq!(normalize_degrees(725.0), 5.0);
        assert_abs_diff_eq!(signed_degrees(190.0), -170.0);
        assert_abs_diff_eq!(signed_degrees(-190.0), 170.0);
    }

    #[test]
    fn test_local_day_bounds_shanghai() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let (start, end) = local_day_bounds(date, chrono_tz::Asia::Shanghai);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 10, 31, 16, 0, 0).unwrap());
        assert_eq!(end - start, Duration::hours(24));
    }
}
