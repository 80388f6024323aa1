//! Volatility & Cash-Flow Analyzer
//!
//! Summarizes a trend series into a monthly average, a trend direction and a
//! 0..1 volatility score. Predictions are filled in by the forecaster.

use rust_decimal::{Decimal, MathematicalOps};
use tracing::debug;

use crate::config::AnalyticsConfig;
use crate::error::{Error, Result};
use crate::models::{CashFlowProfile, TrendDirection, TrendPoint};

/// Decimal places kept for volatility scores
const VOLATILITY_DP: u32 = 4;

/// Series shorter than this are never classified as trending
pub const MIN_TREND_POINTS: usize = 3;

pub(crate) fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().sum::<Decimal>() / Decimal::from(values.len())
}

pub(crate) fn population_std_dev(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    let m = mean(values);
    let variance = values
        .iter()
        .map(|v| {
            let d = *v - m;
            d * d
        })
        .sum::<Decimal>()
        / Decimal::from(values.len());
    variance.sqrt().unwrap_or(Decimal::ZERO)
}

/// Standard deviation normalized by |mean|, clamped to 0..1
///
/// A zero mean scores 1 if the series varies at all, 0 if it is flat.
/// Unrounded; `volatility_score` is the reported form.
pub(crate) fn volatility(values: &[Decimal]) -> Decimal {
    let std_dev = population_std_dev(values);
    let m = mean(values).abs();

    if m.is_zero() {
        if std_dev.is_zero() {
            Decimal::ZERO
        } else {
            Decimal::ONE
        }
    } else {
        (std_dev / m).clamp(Decimal::ZERO, Decimal::ONE)
    }
}

/// Volatility rounded for reporting
pub fn volatility_score(values: &[Decimal]) -> Decimal {
    volatility(values).round_dp(VOLATILITY_DP)
}

/// Compare the most recent third of the series against the earliest third
///
/// Returns the direction and whether the series was too short to judge.
pub fn trend_direction(values: &[Decimal], threshold: Decimal) -> (TrendDirection, bool) {
    if values.len() < MIN_TREND_POINTS {
        return (TrendDirection::Stable, true);
    }

    let third = values.len() / 3;
    let early = mean(&values[..third]);
    let recent = mean(&values[values.len() - third..]);
    let diff = recent - early;

    let direction = if early.is_zero() {
        match diff {
            d if d > Decimal::ZERO => TrendDirection::Up,
            d if d < Decimal::ZERO => TrendDirection::Down,
            _ => TrendDirection::Stable,
        }
    } else {
        let relative = diff / early.abs();
        if relative > threshold {
            TrendDirection::Up
        } else if relative < -threshold {
            TrendDirection::Down
        } else {
            TrendDirection::Stable
        }
    };

    (direction, false)
}

/// Analyze a trend series
///
/// Fails with `InsufficientData` on an empty series; callers handle the
/// "no data" case before asking for a profile.
pub fn analyze(points: &[TrendPoint], config: &AnalyticsConfig) -> Result<CashFlowProfile> {
    if points.is_empty() {
        return Err(Error::InsufficientData(
            "cash-flow analysis needs at least one period".into(),
        ));
    }

    let nets: Vec<Decimal> = points.iter().map(|p| p.net).collect();
    let (trend_direction, low_confidence) = trend_direction(&nets, config.trend_threshold);
    let profile = CashFlowProfile {
        monthly_average: mean(&nets),
        trend_direction,
        volatility_score: volatility_score(&nets),
        predictions: vec![],
        low_confidence,
    };

    debug!(
        points = points.len(),
        trend = profile.trend_direction.as_str(),
        volatility = %profile.volatility_score,
        "Analyzed cash flow"
    );

    Ok(profile)
}
