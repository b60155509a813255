//! Endpoint-level astronomy reports
//!
//! Times are rendered in the observation's time zone. Events that do not
//! happen on the local day are reported as `null`.

use super::events::day_events;
use super::time::{julian_day, local_instant};
use super::zodiac::{ZodiacPosition, ZodiacSign};
use super::{Body, ephemeris, moon};
use crate::calendar::{chinese, solar_text};
use crate::models::Location;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

const CLOCK_SECONDS: &str = "%H:%M:%S";
const CLOCK_MINUTES: &str = "%H:%M";

/// Where and when an observation is made
#[derive(Debug, Clone)]
pub struct Observation {
    pub location: Location,
    pub date: NaiveDate,
    /// Local wall-clock time
    pub time: NaiveTime,
    pub tz: Tz,
}

impl Observation {
    #[must_use]
    pub fn new(location: Location, date: NaiveDate, time: NaiveTime, tz: Tz) -> Self {
        Self {
            location,
            date,
            time,
            tz,
        }
    }

    /// The observation instant in UTC
    #[must_use]
    pub fn instant(&self) -> DateTime<Utc> {
        local_instant(self.date, self.time, self.tz)
    }

    #[must_use]
    pub fn julian_day(&self) -> f64 {
        julian_day(self.instant())
    }

    fn clock(&self, instant: Option<DateTime<Utc>>, format: &str) -> Option<String> {
        instant.map(|t| t.with_timezone(&self.tz).format(format).to_string())
    }
}

/// Sun and Moon rise/set summary
#[derive(Debug, Clone, Serialize)]
pub struct SunMoonReport {
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    pub sun_declination: String,
    pub daylight_duration: Option<String>,
    pub moonrise: Option<String>,
    pub moonset: Option<String>,
    pub moon_declination: String,
}

/// Rise/set/transit and declination of one planet
#[derive(Debug, Clone, Serialize)]
pub struct PlanetTimes {
    pub rise: Option<String>,
    pub set: Option<String>,
    pub transit: Option<String>,
    pub declination: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanetsReport {
    #[serde(rename = "Mercury")]
    pub mercury: PlanetTimes,
    #[serde(rename = "Venus")]
    pub venus: PlanetTimes,
    #[serde(rename = "Mars")]
    pub mars: PlanetTimes,
    #[serde(rename = "Jupiter")]
    pub jupiter: PlanetTimes,
    #[serde(rename = "Saturn")]
    pub saturn: PlanetTimes,
}

/// Moon phase card
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoonPhaseReport {
    pub lunar_date: String,
    #[serde(rename = "lunar_day")]
    pub lunar_day: u32,
    pub observation_time: String,
    /// Illuminated fraction, one decimal
    pub illumination: f64,
    pub culmination_time: Option<String>,
    pub moonrise_time: Option<String>,
    pub moonset_time: Option<String>,
    pub phase_name: &'static str,
    pub phase_angle: f64,
}

/// Solar planetary chart card
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanetaryChart {
    pub solar_date: String,
    pub constellation: &'static str,
    pub rise_time: Option<String>,
    pub set_time: Option<String>,
    pub transit_time: Option<String>,
    pub zodiac_position: ZodiacPosition,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn declination(body: Body, jd: f64) -> String {
    format!("{:.6}", ephemeris::equatorial(body, jd).declination)
}

fn daylight(rise: Option<DateTime<Utc>>, set: Option<DateTime<Utc>>) -> Option<String> {
    let seconds = (set? - rise?).num_seconds();
    if seconds < 0 {
        return None;
    }
    Some(format!("{}h{}min", seconds / 3600, seconds % 3600 / 60))
}

/// Sun and Moon rise/set times with declinations at the observation instant
pub fn sun_moon(obs: &Observation) -> Result<SunMoonReport> {
    let jd = obs.julian_day();
    let sun = day_events(Body::Sun, obs.date, obs.tz, &obs.location)?;
    let moon = day_events(Body::Moon, obs.date, obs.tz, &obs.location)?;

    Ok(SunMoonReport {
        sunrise: obs.clock(sun.rise, CLOCK_SECONDS),
        sunset: obs.clock(sun.set, CLOCK_SECONDS),
        sun_declination: declination(Body::Sun, jd),
        daylight_duration: daylight(sun.rise, sun.set),
        moonrise: obs.clock(moon.rise, CLOCK_SECONDS),
        moonset: obs.clock(moon.set, CLOCK_SECONDS),
        moon_declination: declination(Body::Moon, jd),
    })
}

/// Rise/set/transit times of the five naked-eye planets
pub fn planets(obs: &Observation) -> Result<PlanetsReport> {
    let jd = obs.julian_day();
    let times = |body: Body| -> Result<PlanetTimes> {
        let events = day_events(body, obs.date, obs.tz, &obs.location)?;
        Ok(PlanetTimes {
            rise: obs.clock(events.rise, CLOCK_SECONDS),
            set: obs.clock(events.set, CLOCK_SECONDS),
            transit: obs.clock(events.transit, CLOCK_SECONDS),
            declination: declination(body, jd),
        })
    };

    Ok(PlanetsReport {
        mercury: times(Body::Mercury)?,
        venus: times(Body::Venus)?,
        mars: times(Body::Mars)?,
        jupiter: times(Body::Jupiter)?,
        saturn: times(Body::Saturn)?,
    })
}

/// Julian day at 0h UT of `date`, the epoch for day-level ecliptic placements
fn day_epoch(date: NaiveDate) -> f64 {
    julian_day(date.and_time(NaiveTime::MIN).and_utc())
}

/// Moon phase, illumination and moon events for the observation day
///
/// The phase name and angle belong to the date (0h UT) so that every
/// observation time on one day names the same phase. Illumination is taken
/// at the observation time.
pub fn moon_phase(obs: &Observation) -> Result<MoonPhaseReport> {
    let phase_angle = moon::phase_angle(day_epoch(obs.date));
    let events = day_events(Body::Moon, obs.date, obs.tz, &obs.location)?;

    Ok(MoonPhaseReport {
        lunar_date: chinese::lunar_text(obs.date),
        lunar_day: chinese::lunar_day(obs.date),
        observation_time: obs.time.format(CLOCK_MINUTES).to_string(),
        illumination: round1(moon::illumination(obs.julian_day())),
        culmination_time: obs.clock(events.transit, CLOCK_MINUTES),
        moonrise_time: obs.clock(events.rise, CLOCK_MINUTES),
        moonset_time: obs.clock(events.set, CLOCK_MINUTES),
        phase_name: moon::phase_name(phase_angle),
        phase_angle: round1(phase_angle),
    })
}

/// The Sun's zodiac placement and day events
pub fn solar_chart(obs: &Observation) -> Result<PlanetaryChart> {
    let longitude = ephemeris::ecliptic(Body::Sun, day_epoch(obs.date)).longitude;
    let (sign, zodiac_position) = ZodiacSign::position(longitude);
    let events = day_events(Body::Sun, obs.date, obs.tz, &obs.location)?;

    Ok(PlanetaryChart {
        solar_date: solar_text(obs.date),
        constellation: sign.constellation(),
        rise_time: obs.clock(events.rise, CLOCK_MINUTES),
        set_time: obs.clock(events.set, CLOCK_MINUTES),
        transit_time: obs.clock(events.transit, CLOCK_MINUTES),
        zodiac_position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Shanghai;

    fn observation(y: i32, m: u32, d: u32) -> Observation {
        Observation::new(
            Location::new(31.2304, 121.4737, 4.0, "上海市".to_string()),
            NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            Shanghai,
        )
    }

    #[test]
    fn test_sun_moon_report() {
        let report = sun_moon(&observation(2024, 3, 20)).unwrap();
        assert!(report.sunrise.as_deref().unwrap().starts_with("05:5"));
        assert!(report.sunset.as_deref().unwrap().starts_with("18:0"));
        assert!(report.daylight_duration.as_deref().unwrap().starts_with("12h"));
        assert_eq!(report.sun_declination.split('.').nth(1).unwrap().len(), 6);
    }

    #[test]
    fn test_daylight_duration_format() {
        let rise = DateTime::from_timestamp(0, 0);
        let set = DateTime::from_timestamp(12 * 3600 + 7 * 60 + 30, 0);
        assert_eq!(daylight(rise, set).as_deref(), Some("12h7min"));
        assert_eq!(daylight(None, set), None);
    }

    #[test]
    fn test_planets_report_serializes_in_order() {
        let report = planets(&observation(2025, 11, 1)).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        let mercury = json.find("Mercury").unwrap();
        let saturn = json.find("Saturn").unwrap();
        assert!(mercury < saturn);
        assert!(report.venus.rise.is_some());
    }

    #[test]
    fn test_moon_phase_report() {
        let report = moon_phase(&observation(2025, 11, 1)).unwrap();
        assert_eq!(report.lunar_date, "二零二五年 九月十二");
        assert_eq!(report.lunar_day, 12);
        assert_eq!(report.observation_time, "12:00");
        assert_eq!(report.phase_name, "盈凸月");
        assert!((0.7..=0.8).contains(&report.illumination));
        assert!(report.moonrise_time.is_some());

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("lunar_day").is_some());
        assert!(json.get("phaseAngle").is_some());
    }

    #[test]
    fn test_moon_phase_is_fixed_per_date() {
        let noon = observation(2025, 11, 1);
        let mut evening = observation(2025, 11, 1);
        evening.time = NaiveTime::from_hms_opt(23, 30, 0).unwrap();

        let at_noon = moon_phase(&noon).unwrap();
        let at_evening = moon_phase(&evening).unwrap();
        assert_eq!(at_noon.phase_name, at_evening.phase_name);
        assert_eq!(at_noon.phase_angle, at_evening.phase_angle);
        assert!(at_evening.illumination >= at_noon.illumination);

        let epoch = julian_day(Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap());
        assert_eq!(at_noon.phase_angle, round1(moon::phase_angle(epoch)));
    }

    #[test]
    fn test_solar_chart() {
        let chart = solar_chart(&observation(2025, 11, 1)).unwrap();
        assert_eq!(chart.solar_date, "2025年11月1日 周六");
        assert_eq!(chart.constellation, "天蝎座");
        assert_eq!(chart.zodiac_position.sign, "天蝎宫");
        assert!(chart.zodiac_position.degree >= 8.0 && chart.zodiac_position.degree < 10.0);
    }
}
