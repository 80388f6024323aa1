//! Analytics configuration
//!
//! Trend and forecast thresholds are tunable rather than hard-coded.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a three-layer resolution:
//! 1. An explicit path (CLI `--config` or `TALLY_CONFIG`), if given
//! 2. Override in data dir (~/.local/share/tally/config/analytics.toml)
//! 3. Embedded defaults (compiled into binary)

use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/analytics.toml");

/// Tunable parameters of the analytics engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Relative change between early and recent thirds that counts as a trend
    pub trend_threshold: Decimal,
    /// Confidence of a horizon-1 prediction on a perfectly stable series
    pub confidence_ceiling: Decimal,
    /// Lowest confidence ever reported
    pub confidence_floor: Decimal,
    /// Multiplicative confidence decay per additional month of horizon
    pub confidence_decay: Decimal,
    /// Predictions are clipped to this multiple of the largest historical |net|
    pub extrapolation_cap: Decimal,
    /// Months of history behind the overview's cash-flow profile
    pub overview_history_months: u32,
    /// Months of history behind the cash-flow endpoint
    pub cash_flow_history_months: u32,
    pub default_horizon_months: u32,
    pub max_horizon_months: u32,
    /// Number of spending categories shown in the overview
    pub top_categories: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            trend_threshold: Decimal::new(5, 2),
            confidence_ceiling: Decimal::from(90),
            confidence_floor: Decimal::from(10),
            confidence_decay: Decimal::new(9, 1),
            extrapolation_cap: Decimal::from(3),
            overview_history_months: 12,
            cash_flow_history_months: 12,
            default_horizon_months: 3,
            max_horizon_months: 24,
            top_categories: 5,
        }
    }
}

impl AnalyticsConfig {
    /// Load using the standard resolution order
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let content = match explicit {
            Some(path) => fs::read_to_string(path)
                .map_err(|e| Error::InvalidData(format!("Failed to read config {}: {}", path.display(), e)))?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => {
                    debug!(path = %path.display(), "Using analytics config override");
                    fs::read_to_string(&path)
                        .map_err(|e| Error::InvalidData(format!("Failed to read config: {}", e)))?
                }
                None => DEFAULT_CONFIG.to_string(),
            },
        };

        parse_config(&content)
    }

    /// Check that the values describe a usable model
    pub fn validate(&self) -> Result<()> {
        let hundred = Decimal::ONE_HUNDRED;
        if self.trend_threshold.is_sign_negative() {
            return Err(Error::InvalidData("trend threshold must be >= 0".into()));
        }
        if self.confidence_ceiling > hundred || self.confidence_ceiling.is_sign_negative() {
            return Err(Error::InvalidData("confidence ceiling must be within 0..100".into()));
        }
        if self.confidence_floor.is_sign_negative() || self.confidence_floor > self.confidence_ceiling {
            return Err(Error::InvalidData(
                "confidence floor must be within 0..ceiling".into(),
            ));
        }
        if self.confidence_decay <= Decimal::ZERO || self.confidence_decay > Decimal::ONE {
            return Err(Error::InvalidData("confidence decay must be within (0, 1]".into()));
        }
        if self.extrapolation_cap <= Decimal::ZERO {
            return Err(Error::InvalidData("extrapolation cap must be > 0".into()));
        }
        if self.overview_history_months == 0 || self.cash_flow_history_months == 0 {
            return Err(Error::InvalidData("history windows must be at least one month".into()));
        }
        if self.default_horizon_months > self.max_horizon_months {
            return Err(Error::InvalidData(
                "default horizon exceeds max horizon".into(),
            ));
        }
        Ok(())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("config").join("analytics.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    trend: Option<RawTrend>,
    forecast: Option<RawForecast>,
    overview: Option<RawOverview>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTrend {
    threshold: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawForecast {
    confidence_ceiling: Option<Decimal>,
    confidence_floor: Option<Decimal>,
    confidence_decay: Option<Decimal>,
    extrapolation_cap: Option<Decimal>,
    history_months: Option<u32>,
    default_horizon_months: Option<u32>,
    max_horizon_months: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOverview {
    history_months: Option<u32>,
    top_categories: Option<usize>,
}

/// Parse config from TOML content, layering it over the defaults
pub fn parse_config(content: &str) -> Result<AnalyticsConfig> {
    let raw: RawConfig = toml::from_str(content)?;
    let mut config = AnalyticsConfig::default();

    if let Some(trend) = raw.trend {
        if let Some(threshold) = trend.threshold {
            config.trend_threshold = threshold;
        }
    }

    if let Some(forecast) = raw.forecast {
        if let Some(v) = forecast.confidence_ceiling {
            config.confidence_ceiling = v;
        }
        if let Some(v) = forecast.confidence_floor {
            config.confidence_floor = v;
        }
        if let Some(v) = forecast.confidence_decay {
            config.confidence_decay = v;
        }
        if let Some(v) = forecast.extrapolation_cap {
            config.extrapolation_cap = v;
        }
        if let Some(v) = forecast.history_months {
            config.cash_flow_history_months = v;
        }
        if let Some(v) = forecast.default_horizon_months {
            config.default_horizon_months = v;
        }
        if let Some(v) = forecast.max_horizon_months {
            config.max_horizon_months = v;
        }
    }

    if let Some(overview) = raw.overview {
        if let Some(v) = overview.history_months {
            config.overview_history_months = v;
        }
        if let Some(v) = overview.top_categories {
            config.top_categories = v;
        }
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_embedded_defaults_match_default_impl() {
        let parsed = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed, AnalyticsConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = parse_config(
            r#"
            [trend]
            threshold = 0.1

            [forecast]
            confidence_ceiling = 80
            "#,
        )
        .unwrap();

        assert_eq!(config.trend_threshold, dec!(0.1));
        assert_eq!(config.confidence_ceiling, dec!(80));
        assert_eq!(config.confidence_floor, dec!(10));
        assert_eq!(config.top_categories, 5);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result = parse_config("[trend]\nthreshhold = 0.1\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = parse_config("[forecast]\nconfidence_floor = 95\n");
        assert!(matches!(result, Err(Error::InvalidData(_))));

        let result = parse_config("[forecast]\nconfidence_decay = 1.5\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analytics.toml");
        std::fs::write(&path, "[overview]\ntop_categories = 3\n").unwrap();

        let config = AnalyticsConfig::load(Some(&path)).unwrap();
        assert_eq!(config.top_categories, 3);

        let missing = AnalyticsConfig::load(Some(&dir.path().join("nope.toml")));
        assert!(missing.is_err());
    }
}
