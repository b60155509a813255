//! Low precision ephemeris from mean orbital elements
//!
//! Orbital elements are linear in the day number `d` (days since
//! 1999-12-31 0h UT) and already referred to the equinox of date. The Moon,
//! Jupiter and Saturn carry their principal periodic perturbations. Accuracy
//! is on the order of an arc-minute, which is plenty for rise and set times.

use super::Body;
use super::time::normalize_degrees;

/// Julian date of day number zero
const DAY_ZERO_JD: f64 = 2_451_543.5;
/// Equatorial Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6378.14;
/// Astronomical unit in kilometers
pub const AU_KM: f64 = 149_597_870.7;

/// Geocentric ecliptic coordinates of date
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ecliptic {
    /// Longitude in degrees, `[0, 360)`
    pub longitude: f64,
    /// Latitude in degrees
    pub latitude: f64,
    /// Distance in kilometers
    pub distance_km: f64,
}

/// Geocentric equatorial coordinates of date
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equatorial {
    /// Right ascension in degrees, `[0, 360)`
    pub right_ascension: f64,
    /// Declination in degrees
    pub declination: f64,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Copy)]
struct OrbitalElements {
    /// Longitude of the ascending node
    node: f64,
    inclination: f64,
    /// Argument of perihelion
    perihelion: f64,
    /// Semi-major axis, AU (Earth radii for the Moon)
    axis: f64,
    eccentricity: f64,
    mean_anomaly: f64,
}

fn sin_deg(x: f64) -> f64 {
    x.to_radians().sin()
}

fn cos_deg(x: f64) -> f64 {
    x.to_radians().cos()
}

fn atan2_deg(y: f64, x: f64) -> f64 {
    y.atan2(x).to_degrees()
}

/// Day number for a Julian date
#[must_use]
pub fn day_number(jd: f64) -> f64 {
    jd - DAY_ZERO_JD
}

/// Obliquity of the ecliptic in degrees
#[must_use]
pub fn obliquity(jd: f64) -> f64 {
    23.4393 - 3.563e-7 * day_number(jd)
}

fn elements(body: Body, d: f64) -> OrbitalElements {
    let (node, inclination, perihelion, axis, eccentricity, mean_anomaly) = match body {
        Body::Sun => (
            0.0,
            0.0,
            282.9404 + 4.70935e-5 * d,
            1.0,
            0.016709 - 1.151e-9 * d,
            356.0470 + 0.985_600_258_5 * d,
        ),
        Body::Moon => (
            125.1228 - 0.052_953_808_3 * d,
            5.1454,
            318.0634 + 0.164_357_322_3 * d,
            60.2666,
            0.054900,
            115.3654 + 13.064_992_950_9 * d,
        ),
        Body::Mercury => (
            48.3313 + 3.24587e-5 * d,
            7.0047 + 5.00e-8 * d,
            29.1241 + 1.01444e-5 * d,
            0.387098,
            0.205635 + 5.59e-10 * d,
            168.6562 + 4.092_334_436_8 * d,
        ),
        Body::Venus => (
            76.6799 + 2.46590e-5 * d,
            3.3946 + 2.75e-8 * d,
            54.8910 + 1.38374e-5 * d,
            0.723330,
            0.006773 - 1.302e-9 * d,
            48.0052 + 1.602_130_224_4 * d,
        ),
        Body::Mars => (
            49.5574 + 2.11081e-5 * d,
            1.8497 - 1.78e-8 * d,
            286.5016 + 2.92961e-5 * d,
            1.523688,
            0.093405 + 2.516e-9 * d,
            18.6021 + 0.524_020_776_6 * d,
        ),
        Body::Jupiter => (
            100.4542 + 2.76854e-5 * d,
            1.3030 - 1.557e-7 * d,
            273.8777 + 1.64505e-5 * d,
            5.20256,
            0.048498 + 4.469e-9 * d,
            19.8950 + 0.083_085_300_1 * d,
        ),
        Body::Saturn => (
            113.6634 + 2.38980e-5 * d,
            2.4886 - 1.081e-7 * d,
            339.3939 + 2.97661e-5 * d,
            9.55475,
            0.055546 - 9.499e-9 * d,
            316.9670 + 0.033_444_228_2 * d,
        ),
    };
    OrbitalElements {
        node: normalize_degrees(node),
        inclination,
        perihelion: normalize_degrees(perihelion),
        axis,
        eccentricity,
        mean_anomaly: normalize_degrees(mean_anomaly),
    }
}

/// Solve Kepler's equation, returning the eccentric anomaly in degrees
fn eccentric_anomaly(mean_anomaly: f64, eccentricity: f64) -> f64 {
    let e = eccentricity;
    let mut anomaly = mean_anomaly
        + e.to_degrees() * sin_deg(mean_anomaly) * (1.0 + e * cos_deg(mean_anomaly));
    for _ in 0..10 {
        let delta = (anomaly - e.to_degrees() * sin_deg(anomaly) - mean_anomaly)
            / (1.0 - e * cos_deg(anomaly));
        anomaly -= delta;
        if delta.abs() < 1e-7 {
            break;
        }
    }
    anomaly
}

/// True anomaly (degrees) and radius vector
fn orbit_position(el: &OrbitalElements) -> (f64, f64) {
    let ecc = eccentric_anomaly(el.mean_anomaly, el.eccentricity);
    let xv = el.axis * (cos_deg(ecc) - el.eccentricity);
    let yv = el.axis * (1.0 - el.eccentricity * el.eccentricity).sqrt() * sin_deg(ecc);
    (atan2_deg(yv, xv), xv.hypot(yv))
}

/// Ecliptic longitude, latitude and distance in the orbit's own frame
fn ecliptic_from_orbit(el: &OrbitalElements) -> (f64, f64, f64) {
    let (v, r) = orbit_position(el);
    let u = v + el.perihelion;
    let x = r * (cos_deg(el.node) * cos_deg(u)
        - sin_deg(el.node) * sin_deg(u) * cos_deg(el.inclination));
    let y = r * (sin_deg(el.node) * cos_deg(u)
        + cos_deg(el.node) * sin_deg(u) * cos_deg(el.inclination));
    let z = r * sin_deg(u) * sin_deg(el.inclination);
    (
        normalize_degrees(atan2_deg(y, x)),
        atan2_deg(z, x.hypot(y)),
        r,
    )
}

/// Geocentric Sun: longitude and distance in AU
fn sun_position(d: f64) -> (f64, f64) {
    let el = elements(Body::Sun, d);
    let (v, r) = orbit_position(&el);
    (normalize_degrees(v + el.perihelion), r)
}

fn moon_ecliptic(d: f64) -> Ecliptic {
    let moon = elements(Body::Moon, d);
    let sun = elements(Body::Sun, d);
    let (mut longitude, mut latitude, mut distance) = ecliptic_from_orbit(&moon);

    let ms = sun.mean_anomaly;
    let mm = moon.mean_anomaly;
    let ls = ms + sun.perihelion;
    let lm = mm + moon.perihelion + moon.node;
    let elongation = lm - ls;
    let f = lm - moon.node;

    longitude += -1.274 * sin_deg(mm - 2.0 * elongation)
        + 0.658 * sin_deg(2.0 * elongation)
        - 0.186 * sin_deg(ms)
        - 0.059 * sin_deg(2.0 * mm - 2.0 * elongation)
        - 0.057 * sin_deg(mm - 2.0 * elongation + ms)
        + 0.053 * sin_deg(mm + 2.0 * elongation)
        + 0.046 * sin_deg(2.0 * elongation - ms)
        + 0.041 * sin_deg(mm - ms)
        - 0.035 * sin_deg(elongation)
        - 0.031 * sin_deg(mm + ms)
        - 0.015 * sin_deg(2.0 * f - 2.0 * elongation)
        + 0.011 * sin_deg(mm - 4.0 * elongation);
    latitude += -0.173 * sin_deg(f - 2.0 * elongation)
        - 0.055 * sin_deg(mm - f - 2.0 * elongation)
        - 0.046 * sin_deg(mm + f - 2.0 * elongation)
        + 0.033 * sin_deg(f + 2.0 * elongation)
        + 0.017 * sin_deg(2.0 * mm + f);
    distance += -0.58 * cos_deg(mm - 2.0 * elongation) - 0.46 * cos_deg(2.0 * elongation);

    Ecliptic {
        longitude: normalize_degrees(longitude),
        latitude,
        distance_km: distance * EARTH_RADIUS_KM,
    }
}

/// Heliocentric position of a planet with the Jupiter/Saturn perturbations
fn planet_heliocentric(body: Body, d: f64) -> (f64, f64, f64) {
    let el = elements(body, d);
    let (mut longitude, mut latitude, r) = ecliptic_from_orbit(&el);

    if matches!(body, Body::Jupiter | Body::Saturn) {
        let mj = elements(Body::Jupiter, d).mean_anomaly;
        let ms = elements(Body::Saturn, d).mean_anomaly;
        if body == Body::Jupiter {
            longitude += -0.332 * sin_deg(2.0 * mj - 5.0 * ms - 67.6)
                - 0.056 * sin_deg(2.0 * mj - 2.0 * ms + 21.0)
                + 0.042 * sin_deg(3.0 * mj - 5.0 * ms + 21.0)
                - 0.036 * sin_deg(mj - 2.0 * ms)
                + 0.022 * cos_deg(mj - ms)
                + 0.023 * sin_deg(2.0 * mj - 3.0 * ms + 52.0)
                - 0.016 * sin_deg(mj - 5.0 * ms - 69.0);
        } else {
            longitude += 0.812 * sin_deg(2.0 * mj - 5.0 * ms - 67.6)
                - 0.229 * cos_deg(2.0 * mj - 4.0 * ms - 2.0)
                + 0.119 * sin_deg(mj - 2.0 * ms - 3.0)
                + 0.046 * sin_deg(2.0 * mj - 6.0 * ms - 69.0)
                + 0.014 * sin_deg(mj - 3.0 * ms + 32.0);
            latitude += -0.020 * cos_deg(2.0 * mj - 4.0 * ms - 2.0)
                + 0.018 * sin_deg(2.0 * mj - 6.0 * ms - 49.0);
        }
    }
    (longitude, latitude, r)
}

/// Geocentric ecliptic rectangular coordinates, AU (Earth radii for the Moon)
fn geocentric_rectangular(body: Body, d: f64) -> (f64, f64, f64) {
    let spherical = |lon: f64, lat: f64, r: f64| {
        (
            r * cos_deg(lon) * cos_deg(lat),
            r * sin_deg(lon) * cos_deg(lat),
            r * sin_deg(lat),
        )
    };
    match body {
        Body::Sun => {
            let (lon, r) = sun_position(d);
            spherical(lon, 0.0, r)
        }
        Body::Moon => {
            let moon = moon_ecliptic(d);
            spherical(moon.longitude, moon.latitude, moon.distance_km / AU_KM)
        }
        _ => {
            let (lon, lat, r) = planet_heliocentric(body, d);
            let (xh, yh, zh) = spherical(lon, lat, r);
            let (sun_lon, sun_r) = sun_position(d);
            (
                xh + sun_r * cos_deg(sun_lon),
                yh + sun_r * sin_deg(sun_lon),
                zh,
            )
        }
    }
}

/// Geocentric ecliptic coordinates of a body
#[must_use]
pub fn ecliptic(body: Body, jd: f64) -> Ecliptic {
    let d = day_number(jd);
    if body == Body::Moon {
        return moon_ecliptic(d);
    }
    let (x, y, z) = geocentric_rectangular(body, d);
    Ecliptic {
        longitude: normalize_degrees(atan2_deg(y, x)),
        latitude: atan2_deg(z, x.hypot(y)),
        distance_km: (x * x + y * y + z * z).sqrt() * AU_KM,
    }
}

/// Geocentric equatorial coordinates of a body
#[must_use]
pub fn equatorial(body: Body, jd: f64) -> Equatorial {
    let ecl = ecliptic(body, jd);
    let eps = obliquity(jd);
    let x = cos_deg(ecl.longitude) * cos_deg(ecl.latitude);
    let y = sin_deg(ecl.longitude) * cos_deg(ecl.latitude);
    let z = sin_deg(ecl.latitude);

    let ye = y * cos_deg(eps) - z * sin_deg(eps);
    let ze = y * sin_deg(eps) + z * cos_deg(eps);

    Equatorial {
        right_ascension: normalize_degrees(atan2_deg(ye, x)),
        declination: atan2_deg(ze, x.hypot(ye)),
        distance_km: ecl.distance_km,
    }
}

/// Horizontal parallax of the Moon in degrees
#[must_use]
pub fn moon_parallax(jd: f64) -> f64 {
    (EARTH_RADIUS_KM / moon_ecliptic(day_number(jd)).distance_km)
        .asin()
        .to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astronomy::time::julian_day;
    use approx::assert_abs_diff_eq;
    use chrono::{TimeZone, Utc};

    fn jd(y: i32, m: u32, d: u32, h: u32, min: u32) -> f64 {
        julian_day(Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap())
    }

    #[test]
    fn test_sun_declination_at_equinox() {
        let sun = equatorial(Body::Sun, jd(2024, 3, 20, 3, 6));
        assert_abs_diff_eq!(sun.declination, 0.0, epsilon = 0.05);
        let lon = ecliptic(Body::Sun, jd(2024, 3, 20, 3, 6)).longitude;
        assert!(lon < 0.1 || lon > 359.9);
    }

    #[test]
    fn test_sun_declination_at_solstice() {
        let sun = equatorial(Body::Sun, jd(2024, 6, 20, 20, 51));
        assert_abs_diff_eq!(sun.declination, 23.44, epsilon = 0.05);
    }

    #[test]
    fn test_sun_distance() {
        // Perihelion in early January, aphelion in early July
        let january = ecliptic(Body::Sun, jd(2024, 1, 3, 0, 0)).distance_km / AU_KM;
        let july = ecliptic(Body::Sun, jd(2024, 7, 5, 0, 0)).distance_km / AU_KM;
        assert_abs_diff_eq!(january, 0.9833, epsilon = 0.001);
        assert_abs_diff_eq!(july, 1.0167, epsilon = 0.001);
    }

    #[test]
    fn test_moon_position_meeus_example() {
        // Meeus, example 47.a: 1992 April 12, 0h TD
        let moon = ecliptic(Body::Moon, 2_448_724.5);
        assert_abs_diff_eq!(moon.longitude, 133.167, epsilon = 0.3);
        assert_abs_diff_eq!(moon.latitude, -3.229, epsilon = 0.3);
        assert_abs_diff_eq!(moon.distance_km, 368_409.7, epsilon = 1500.0);
        let eq = equatorial(Body::Moon, 2_448_724.5);
        assert_abs_diff_eq!(eq.declination, 13.768, epsilon = 0.3);
    }

    #[test]
    fn test_moon_parallax_range() {
        let parallax = moon_parallax(jd(2025, 11, 1, 0, 0));
        assert!((0.88..1.03).contains(&parallax));
    }

    #[test]
    fn test_planets_geocentric_distance_plausible() {
        let at = jd(2025, 11, 1, 0, 0);
        for (body, min, max) in [
            (Body::Mercury, 0.5, 1.5),
            (Body::Venus, 0.25, 1.75),
            (Body::Mars, 0.35, 2.7),
            (Body::Jupiter, 3.9, 6.5),
            (Body::Saturn, 7.9, 11.1),
        ] {
            let au = ecliptic(body, at).distance_km / AU_KM;
            assert!(au > min && au < max, "{body:?} at {au} AU");
        }
    }

    #[test]
    fn test_venus_meeus_example() {
        // Meeus, example 33.a: 1992 December 20, 0h TD
        let venus = equatorial(Body::Venus, 2_448_976.5);
        assert_abs_diff_eq!(venus.right_ascension, 316.1725, epsilon = 0.2);
        assert_abs_diff_eq!(venus.declination, -18.8880, epsilon = 0.2);
    }

    #[test]
    fn test_obliquity() {
        assert_abs_diff_eq!(obliquity(2_451_545.0), 23.4393, epsilon = 1e-3);
    }
}
