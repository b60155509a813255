//! `zangli` - Tibetan calendar, astronomy and almanac assistant service
//!
//! This library provides the calendar conversions, the astronomy engine,
//! the retrieval-augmented assistant and the HTTP API that serves them.

pub mod api;
pub mod assistant;
pub mod astronomy;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod error;
pub mod models;
pub mod telemetry;
pub mod web;

// Re-export core types for public API
pub use api::AppState;
pub use assistant::{AssistantService, ChatProvider};
pub use calendar::{ChineseLunarDate, FiveElements, TibetanDate};
pub use config::ZangliConfig;
pub use error::{ErrorCode, ZangliError};
pub use models::Location;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, ZangliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
