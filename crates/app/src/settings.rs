use serde::{Deserialize, Serialize};
use std::path::Path;

use quorum_foundation::PipelineError;
use quorum_leakage::LeakageConfig;
use quorum_stt::SessionConfig;

/// Runtime-tunable pipeline settings.
///
/// Everything numeric here is calibration data: real rooms and hardware
/// need different thresholds, so the whole surface loads from TOML and
/// `QUORUM_`-prefixed environment variables without a rebuild.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub session: SessionConfig,
    pub leakage: LeakageConfig,
}

impl PipelineSettings {
    /// Load from an optional TOML file, layered under `QUORUM_*` env
    /// overrides (`QUORUM_LEAKAGE__LEAKAGE_THRESHOLD=0.6` style).
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let mut builder = config::Config::builder();
        if let Some(p) = path {
            builder = builder.add_source(config::File::from(p));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("QUORUM")
                .separator("__")
                .try_parsing(true),
        );
        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Parse settings from inline TOML; used by tests and embedders.
    pub fn from_toml_str(source: &str) -> Result<Self, PipelineError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| PipelineError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let settings = PipelineSettings::from_toml_str("").unwrap();
        assert_eq!(settings.session.locale, "en-US");
        assert_eq!(settings.leakage.leakage_threshold, 0.5);
        assert_eq!(settings.leakage.energy_ratio_threshold, 2.0);
    }

    #[test]
    fn partial_overrides_keep_other_defaults() {
        let settings = PipelineSettings::from_toml_str(
            r#"
            [session]
            locale = "de-DE"
            fallback_locales = ["de"]

            [leakage]
            leakage_threshold = 0.65
            max_lag_ms = 150
            "#,
        )
        .unwrap();
        assert_eq!(settings.session.locale, "de-DE");
        assert_eq!(settings.session.fallback_locales, vec!["de"]);
        assert_eq!(settings.leakage.leakage_threshold, 0.65);
        assert_eq!(settings.leakage.max_lag_ms, 150);
        // Untouched fields keep their defaults.
        assert_eq!(settings.leakage.min_lag_ms, 10);
        assert_eq!(settings.leakage.sample_rate_hz, 16_000);
    }

    #[test]
    fn malformed_document_is_config_error() {
        let err = PipelineSettings::from_toml_str("leakage = 3").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
