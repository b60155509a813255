//! Shared domain models
//!
//! - Location: observer coordinates and the city registry

pub mod location;

pub use location::{DEFAULT_CITY, Location, default_city, find_city, nearest_city};
