//! Forecaster
//!
//! Linear extrapolation of monthly net cash flow. The slope is an ordinary
//! least-squares fit of `net` over the point index, anchored at the series
//! mean and clipped to a multiple of the largest historical |net|.

use rust_decimal::{Decimal, MathematicalOps};
use tracing::debug;

use super::cash_flow::{mean, volatility};
use super::period::{advance, parse_month_key, period_key};
use crate::config::AnalyticsConfig;
use crate::error::{Error, Result};
use crate::models::{Granularity, MonthlyPrediction, TrendPoint};

/// Decimal places kept for predicted amounts and confidence
const OUTPUT_DP: u32 = 2;

/// Least-squares slope of `values` over their index
fn ols_slope(values: &[Decimal]) -> Decimal {
    let n = Decimal::from(values.len());
    let x_mean = (n - Decimal::ONE) / Decimal::TWO;
    let y_mean = mean(values);

    let (mut sxy, mut sxx) = (Decimal::ZERO, Decimal::ZERO);
    for (i, y) in values.iter().enumerate() {
        let dx = Decimal::from(i) - x_mean;
        sxy += dx * (*y - y_mean);
        sxx += dx * dx;
    }

    if sxx.is_zero() {
        Decimal::ZERO
    } else {
        sxy / sxx
    }
}

/// Confidence of the first predicted month, before decay and clamping
fn base_confidence(nets: &[Decimal], config: &AnalyticsConfig) -> Decimal {
    config.confidence_ceiling * (Decimal::ONE - volatility(nets))
}

/// Label for the `h`-th month after `last`
fn prediction_label(last: &str, h: u32) -> String {
    parse_month_key(last)
        .and_then(|start| advance(start, Granularity::Month, h as i32).ok())
        .map(|start| period_key(start, Granularity::Month))
        .unwrap_or_else(|| format!("{}+{}", last, h))
}

/// Split a predicted net into income and expenses
///
/// Both sides start at their historical means and absorb the difference in
/// proportion to their share of gross flow. Neither goes below zero.
fn reconcile(predicted_net: Decimal, income_mean: Decimal, expense_mean: Decimal) -> (Decimal, Decimal) {
    let gross = income_mean + expense_mean;
    if gross.is_zero() {
        return if predicted_net.is_sign_negative() {
            (Decimal::ZERO, -predicted_net)
        } else {
            (predicted_net, Decimal::ZERO)
        };
    }

    let delta = predicted_net - (income_mean - expense_mean);
    let income = income_mean + delta * income_mean / gross;
    let expenses = expense_mean - delta * expense_mean / gross;

    if income < Decimal::ZERO {
        (Decimal::ZERO, -predicted_net)
    } else if expenses < Decimal::ZERO {
        (predicted_net, Decimal::ZERO)
    } else {
        (income, expenses)
    }
}

/// Predict the next `horizon` months from a monthly trend series
///
/// Fails with `InsufficientData` when fewer than two points are supplied.
/// Confidence never increases with horizon.
pub fn forecast(
    points: &[TrendPoint],
    horizon: u32,
    config: &AnalyticsConfig,
) -> Result<Vec<MonthlyPrediction>> {
    if points.len() < 2 {
        return Err(Error::InsufficientData(format!(
            "forecast needs at least 2 periods, got {}",
            points.len()
        )));
    }
    let last = &points[points.len() - 1];

    let nets: Vec<Decimal> = points.iter().map(|p| p.net).collect();
    let incomes: Vec<Decimal> = points.iter().map(|p| p.income).collect();
    let expenses: Vec<Decimal> = points.iter().map(|p| p.expenses).collect();

    let average = mean(&nets);
    let slope = ols_slope(&nets);
    let cap = config.extrapolation_cap * nets.iter().map(|n| n.abs()).max().unwrap_or_default();
    let (income_mean, expense_mean) = (mean(&incomes), mean(&expenses));
    let base_confidence = base_confidence(&nets, config);

    let predictions: Vec<MonthlyPrediction> = (1..=horizon)
        .map(|h| {
            let predicted_net = (average + slope * Decimal::from(h)).clamp(-cap, cap);
            let (income, expense) = reconcile(predicted_net, income_mean, expense_mean);
            let decay = config.confidence_decay.powu(u64::from(h - 1));
            let confidence = (base_confidence * decay)
                .clamp(config.confidence_floor, config.confidence_ceiling);

            MonthlyPrediction {
                period: prediction_label(&last.period, h),
                predicted_income: income.round_dp(OUTPUT_DP),
                predicted_expenses: expense.round_dp(OUTPUT_DP),
                predicted_net: predicted_net.round_dp(OUTPUT_DP),
                confidence: confidence.round_dp(OUTPUT_DP),
            }
        })
        .collect();

    debug!(
        history = points.len(),
        horizon,
        slope = %slope.round_dp(4),
        "Forecast cash flow"
    );

    Ok(predictions)
}
