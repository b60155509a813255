//! Moon phase and illumination

use super::Body;
use super::ephemeris::ecliptic;
use super::time::normalize_degrees;
use serde::Serialize;

/// Phase of the Moon at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoonPhase {
    /// Elongation in ecliptic longitude from the Sun, `[0, 360)`
    pub angle: f64,
    pub name: &'static str,
    /// Illuminated fraction of the disk, `[0, 1]`
    pub illumination: f64,
}

/// Moon minus Sun ecliptic longitude in degrees
#[must_use]
pub fn phase_angle(jd: f64) -> f64 {
    normalize_degrees(ecliptic(Body::Moon, jd).longitude - ecliptic(Body::Sun, jd).longitude)
}

/// Illuminated fraction from the Sun-Moon-Earth phase angle
#[must_use]
pub fn illumination(jd: f64) -> f64 {
    let moon = ecliptic(Body::Moon, jd);
    let sun = ecliptic(Body::Sun, jd);

    let elongation = (moon.latitude.to_radians().cos()
        * (moon.longitude - sun.longitude).to_radians().cos())
    .clamp(-1.0, 1.0)
    .acos();
    let phase = (sun.distance_km * elongation.sin())
        .atan2(moon.distance_km - sun.distance_km * elongation.cos());
    (1.0 + phase.cos()) / 2.0
}

/// Conventional name for a phase angle
#[must_use]
pub fn phase_name(angle: f64) -> &'static str {
    let angle = normalize_degrees(angle);
    match angle {
        a if !(5.0..355.0).contains(&a) => "新月",
        a if a < 85.0 => "上娥眉月",
        a if a < 95.0 => "上弦月",
        a if a < 175.0 => "盈凸月",
        a if a < 185.0 => "满月",
        a if a < 265.0 => "亏凸月",
        a if a < 275.0 => "下弦月",
        _ => "下娥眉月",
    }
}

/// Phase angle, name and illumination at a Julian date
#[must_use]
pub fn phase(jd: f64) -> MoonPhase {
    let angle = phase_angle(jd);
    MoonPhase {
        angle,
        name: phase_name(angle),
        illumination: illumination(jd),
    }
}
