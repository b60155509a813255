//! Astronomy engine: positions, rise/set/transit search, moon phase and zodiac

pub mod ephemeris;
pub mod events;
pub mod moon;
pub mod report;
pub mod time;
pub mod zodiac;

use std::fmt;

pub use events::DayEvents;
pub use report::Observation;
pub use zodiac::ZodiacSign;

/// Bodies covered by the ephemeris
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Body {
    Sun,
    Moon,
    Mercury,
    Venus,
    Mars,
    Jupiter,
    Saturn,
}

impl Body {
    /// The naked-eye planets, in order from the Sun
    pub const PLANETS: [Body; 5] = [
        Body::Mercury,
        Body::Venus,
        Body::Mars,
        Body::Jupiter,
        Body::Saturn,
    ];
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Body::Sun => "Sun",
            Body::Moon => "Moon",
            Body::Mercury => "Mercury",
            Body::Venus => "Venus",
            Body::Mars => "Mars",
            Body::Jupiter => "Jupiter",
            Body::Saturn => "Saturn",
        };
        write!(f, "{name}")
    }
}
