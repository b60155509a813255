//! Rise, set and transit search within one local calendar day
//!
//! The Sun's rise and set come from the `sunrise` crate. Everything else is
//! found by sampling the altitude every ten minutes across the day and
//! bisecting each sign change.

use super::Body;
use super::ephemeris::{equatorial, moon_parallax};
use super::time::{
    from_julian_day, julian_day, local_day_bounds, local_sidereal_degrees, signed_degrees,
};
use crate::models::Location;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use sunrise::{Coordinates, SolarDay, SolarEvent};

const SAMPLE_STEP_DAYS: f64 = 10.0 / 1440.0;
const BISECTION_ROUNDS: usize = 30;

/// Event times for one body on one local day; `None` when the event does not occur
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayEvents {
    pub rise: Option<DateTime<Utc>>,
    pub set: Option<DateTime<Utc>>,
    pub transit: Option<DateTime<Utc>>,
}

/// Altitude of the body's center at which it rises or sets
#[must_use]
pub fn standard_altitude(body: Body, jd: f64) -> f64 {
    match body {
        Body::Sun => -0.8333,
        Body::Moon => 0.7275 * moon_parallax(jd) - 0.5667,
        _ => -0.5667,
    }
}

/// Geocentric altitude in degrees
#[must_use]
pub fn altitude(body: Body, jd: f64, location: &Location) -> f64 {
    let eq = equatorial(body, jd);
    let hour_angle = local_sidereal_degrees(jd, location.longitude) - eq.right_ascension;
    let lat = location.latitude.to_radians();
    let dec = eq.declination.to_radians();
    (lat.sin() * dec.sin() + lat.cos() * dec.cos() * hour_angle.to_radians().cos())
        .clamp(-1.0, 1.0)
        .asin()
        .to_degrees()
}

/// Local hour angle in degrees, `[-180, 180)`
#[must_use]
pub fn hour_angle(body: Body, jd: f64, location: &Location) -> f64 {
    let eq = equatorial(body, jd);
    signed_degrees(local_sidereal_degrees(jd, location.longitude) - eq.right_ascension)
}

fn bisect<F: Fn(f64) -> f64>(f: F, mut lo: f64, mut hi: f64) -> f64 {
    let rising = f(lo) < f(hi);
    for _ in 0..BISECTION_ROUNDS {
        let mid = 0.5 * (lo + hi);
        if (f(mid) < 0.0) == rising {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Search the local day of `date` for the body's events
#[must_use]
pub fn search_day(body: Body, date: NaiveDate, tz: Tz, location: &Location) -> DayEvents {
    let (start, end) = local_day_bounds(date, tz);
    let start_jd = julian_day(start);
    let end_jd = julian_day(end);

    let horizon = |jd: f64| altitude(body, jd, location) - standard_altitude(body, jd);
    let meridian = |jd: f64| hour_angle(body, jd, location);

    let mut events = DayEvents::default();
    let mut t0 = start_jd;
    let mut h0 = horizon(t0);
    let mut m0 = meridian(t0);

    while t0 < end_jd {
        let t1 = (t0 + SAMPLE_STEP_DAYS).min(end_jd);
        let h1 = horizon(t1);
        let m1 = meridian(t1);

        if events.rise.is_none() && h0 < 0.0 && h1 >= 0.0 {
            events.rise = from_julian_day(bisect(horizon, t0, t1));
        }
        if events.set.is_none() && h0 >= 0.0 && h1 < 0.0 {
            events.set = from_julian_day(bisect(horizon, t0, t1));
        }
        // Upper culmination only; the lower one wraps from +180 to -180
        if events.transit.is_none() && m0 < 0.0 && m1 >= 0.0 && m0 > -90.0 && m1 < 90.0 {
            events.transit = from_julian_day(bisect(meridian, t0, t1));
        }

        t0 = t1;
        h0 = h1;
        m0 = m1;
    }
    events
}

/// Sunrise and sunset from the `sunrise` crate
pub fn sunrise_sunset(
    location: &Location,
    date: NaiveDate,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    let coordinates =
        Coordinates::new(location.latitude, location.longitude).with_context(|| {
            format!(
                "Invalid coordinates: lat={}, lng={}",
                location.latitude, location.longitude
            )
        })?;

    let solar_day = SolarDay::new(coordinates, date);
    Ok((
        solar_day.event_time(SolarEvent::Sunrise),
        solar_day.event_time(SolarEvent::Sunset),
    ))
}

/// All events for a body on the local day of `date`
pub fn day_events(body: Body, date: NaiveDate, tz: Tz, location: &Location) -> Result<DayEvents> {
    let mut events = search_day(body, date, tz, location);

    if body == Body::Sun {
        let (start, end) = local_day_bounds(date, tz);
        let in_day = |t: &DateTime<Utc>| *t >= start && *t < end;
        let (rise, set) = sunrise_sunset(location, date)?;
        if let Some(rise) = rise.filter(in_day) {
            events.rise = Some(rise);
        }
        if let Some(set) = set.filter(in_day) {
            events.set = Some(set);
        }
    }

    tracing::trace!(%body, %date, ?events, "day events");
    Ok(events)
}
