pub mod config;
pub mod detector;
pub mod energy;
pub mod stats;
pub mod types;

// Core exports - grouped and sorted alphabetically
pub use config::LeakageConfig;
pub use detector::LeakageDetector;
pub use stats::{LeakageStats, LeakageStatsSnapshot};
pub use types::{LeakageDecision, LeakageReason};
