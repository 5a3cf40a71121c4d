use std::collections::BTreeMap;

use serde::Serialize;

use super::error::ModelError;
use super::sequencer::withdrawal_sequence;
use super::types::{
    PortfolioDefinition, PortfolioResult, SimulationOutcome, SuccessTier, SummaryMetrics,
    WithdrawalPolicy,
};

/// Everything the presentation layer needs for one strategy: the scalar
/// metrics plus the full withdrawal schedule for charting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategySummary {
    pub portfolio: PortfolioDefinition,
    pub success_rate: f64,
    pub success_tier: SuccessTier,
    pub median_final_balance: f64,
    pub percentile_10: f64,
    pub percentile_90: f64,
    pub withdrawal_schedule: Vec<f64>,
    pub metrics: SummaryMetrics,
}

/// Aggregates one strategy's trajectory and withdrawal sequence into
/// scalar metrics and qualitative insights.
pub fn summarize(
    result: &PortfolioResult,
    policy: &WithdrawalPolicy,
    starting_balance: f64,
) -> Result<SummaryMetrics, ModelError> {
    if starting_balance <= 0.0 {
        return Err(ModelError::NonPositiveStartingBalance);
    }
    if policy.years == 0 {
        return Err(ModelError::ZeroYears);
    }

    let sequence = withdrawal_sequence(&result.percentile_paths.p50, policy)?;
    let total_withdrawals: f64 = sequence.iter().sum();
    let final_year_withdrawal = sequence.last().copied().unwrap_or(0.0);

    // Annualized return that would reproduce the combined outcome
    // (remaining balance plus everything withdrawn) from the original
    // balance, netting out the effect of the withdrawals.
    let total_value = result.median_final_balance + total_withdrawals;
    let average_growth_rate =
        (total_value / starting_balance).powf(1.0 / policy.years as f64) - 1.0;

    Ok(SummaryMetrics {
        total_withdrawals,
        final_year_withdrawal,
        average_growth_rate,
        insights: build_insights(result, starting_balance, average_growth_rate),
    })
}

/// Summarizes one strategy including its withdrawal schedule.
pub fn summarize_strategy(
    result: &PortfolioResult,
    policy: &WithdrawalPolicy,
    starting_balance: f64,
) -> Result<StrategySummary, ModelError> {
    let metrics = summarize(result, policy, starting_balance)?;
    let withdrawal_schedule = withdrawal_sequence(&result.percentile_paths.p50, policy)?;

    Ok(StrategySummary {
        portfolio: result.portfolio.clone(),
        success_rate: result.success_rate,
        success_tier: SuccessTier::classify(result.success_rate),
        median_final_balance: result.median_final_balance,
        percentile_10: result.percentile_10,
        percentile_90: result.percentile_90,
        withdrawal_schedule,
        metrics,
    })
}

/// Summarizes every strategy in the outcome independently. A failure in
/// one strategy is reported in its own slot and never suppresses the
/// other strategies' computations.
pub fn summarize_all(
    outcome: &SimulationOutcome,
    policy: &WithdrawalPolicy,
    starting_balance: f64,
) -> BTreeMap<String, Result<StrategySummary, ModelError>> {
    match outcome {
        SimulationOutcome::Single(result) => {
            let id = if result.portfolio.id.is_empty() {
                "portfolio".to_string()
            } else {
                result.portfolio.id.clone()
            };
            BTreeMap::from([(id, summarize_strategy(result, policy, starting_balance))])
        }
        SimulationOutcome::Multi { portfolios } => portfolios
            .iter()
            .map(|(id, result)| {
                (
                    id.clone(),
                    summarize_strategy(result, policy, starting_balance),
                )
            })
            .collect(),
    }
}

fn build_insights(
    result: &PortfolioResult,
    starting_balance: f64,
    average_growth_rate: f64,
) -> Vec<String> {
    let mut insights = Vec::new();
    if result.success_rate >= 0.8 {
        insights.push("High success rate indicates sustainable withdrawal strategy".to_string());
    }
    if result.success_rate < 0.6 {
        insights.push("Low success rate suggests withdrawal rate may be too aggressive".to_string());
    }
    if result.median_final_balance > starting_balance {
        insights.push("Portfolio expected to grow despite withdrawals".to_string());
    }
    if average_growth_rate > 0.0 {
        insights.push(format!(
            "Average growth rate of {} after withdrawals",
            format_percentage(average_growth_rate)
        ));
    }
    insights
}

fn format_percentage(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}
