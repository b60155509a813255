//! Observer location model and the built-in city registry

use serde::{Deserialize, Serialize};

/// Observer location
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Latitude in decimal degrees, north positive
    pub latitude: f64,
    /// Longitude in decimal degrees, east positive
    pub longitude: f64,
    /// Altitude above sea level in meters
    pub altitude: f64,
    /// City or place name
    #[serde(skip)]
    pub name: String,
}

/// A registry entry: name, latitude, longitude, altitude
type CityEntry = (&'static str, f64, f64, f64);

/// Cities selectable by name; the first entry is the default
const CITIES: [CityEntry; 10] = [
    ("上海市", 31.2304, 121.4737, 4.0),
    ("北京市", 39.9042, 116.4074, 43.5),
    ("广州市", 23.1291, 113.2644, 21.0),
    ("深圳市", 22.5431, 114.0579, 6.0),
    ("成都市", 30.5728, 104.0668, 505.0),
    ("杭州市", 30.2741, 120.1551, 8.0),
    ("重庆市", 29.5630, 106.5516, 259.0),
    ("武汉市", 30.5928, 114.3055, 23.3),
    ("西安市", 34.2658, 108.9541, 396.9),
    ("拉萨市", 29.6470, 91.1175, 3658.0),
];

/// Name of the default city
pub const DEFAULT_CITY: &str = CITIES[0].0;

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, altitude: f64, name: String) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            name,
        }
    }

    /// Create an unnamed location at sea level
    #[must_use]
    pub fn from_coordinates(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, 0.0, String::new())
    }

    /// Whether the coordinates lie on the globe
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && self.latitude.is_finite()
            && self.longitude.is_finite()
    }

    /// Great-circle distance in kilometers
    #[must_use]
    pub fn distance_km(&self, other: &Location) -> f64 {
        haversine::distance(
            haversine::Location {
                latitude: self.latitude,
                longitude: self.longitude,
            },
            haversine::Location {
                latitude: other.latitude,
                longitude: other.longitude,
            },
            haversine::Units::Kilometers,
        )
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

fn city(entry: &CityEntry) -> Location {
    let (name, latitude, longitude, altitude) = *entry;
    Location::new(latitude, longitude, altitude, name.to_string())
}

/// Look up a registry city by its exact name
#[must_use]
pub fn find_city(name: &str) -> Option<Location> {
    CITIES
        .iter()
        .find(|(city_name, ..)| *city_name == name.trim())
        .map(city)
}

/// The default city (上海市)
#[must_use]
pub fn default_city() -> Location {
    city(&CITIES[0])
}

/// Closest registry city and its distance in kilometers
#[must_use]
pub fn nearest_city(location: &Location) -> (Location, f64) {
    CITIES
        .iter()
        .map(city)
        .map(|c| {
            let distance = location.distance_km(&c);
            (c, distance)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap_or_else(|| (default_city(), 0.0))
}
