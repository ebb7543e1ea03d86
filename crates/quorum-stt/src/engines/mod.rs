//! Recognition engine variants.
//!
//! Real backends live behind feature flags in downstream crates; the mock
//! engine ships here so every consumer can exercise the session machinery.

pub mod mock;

pub use mock::{MockConfig, MockRecognitionEngine};
