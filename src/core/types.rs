use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Static strategy descriptor produced by the external simulator.
/// Field names follow the simulator's snake_case wire contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioDefinition {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub stocks_percentage: f64,
    #[serde(default)]
    pub bonds_percentage: f64,
    pub expected_return: f64,
    #[serde(alias = "std_deviation")]
    pub volatility: f64,
}

/// Percentile trajectories from the simulator, one value per simulated
/// year index 0..=years. Index 0 is the starting balance.
#[derive(Debug, Clone, Deserialize)]
pub struct PercentilePaths {
    pub p10: Vec<f64>,
    pub p50: Vec<f64>,
    pub p90: Vec<f64>,
}

/// One simulation outcome for one strategy. Read-only to this crate;
/// the simulator owns it. Unknown simulator fields (annual stats, chart
/// payloads) are ignored during deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioResult {
    pub portfolio: PortfolioDefinition,
    pub success_rate: f64,
    pub median_final_balance: f64,
    pub percentile_paths: PercentilePaths,
    #[serde(default)]
    pub percentile_10: f64,
    #[serde(default)]
    pub percentile_90: f64,
}

/// The simulator returns either one result or a map of results keyed by
/// strategy id, discriminated only by the presence of a `portfolios`
/// key. Resolved into a proper variant once at the boundary.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SimulationOutcome {
    Multi {
        portfolios: BTreeMap<String, PortfolioResult>,
    },
    Single(PortfolioResult),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalMethod {
    Percentage,
    Fixed,
}

/// Caller-owned withdrawal policy. Only the amount field matching
/// `method` is consulted; the other is ignored even when present.
#[derive(Debug, Clone)]
pub struct WithdrawalPolicy {
    pub method: WithdrawalMethod,
    /// Annual withdrawal as a percent of the current balance.
    pub rate: Option<f64>,
    /// Annual withdrawal in currency units.
    pub fixed_amount: Option<f64>,
    pub years: u32,
    pub adjust_for_inflation: bool,
    /// Percent per year, compounded from year 2 onward.
    pub inflation_rate: f64,
}

/// Scalar metrics derived fresh from a (result, policy, starting
/// balance) triple. No independent lifecycle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMetrics {
    pub total_withdrawals: f64,
    pub final_year_withdrawal: f64,
    pub average_growth_rate: f64,
    pub insights: Vec<String>,
}

/// Qualitative verdict on a strategy's success rate. Total over [0,1]
/// with lower bounds inclusive.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessTier {
    Excellent,
    Good,
    Moderate,
    Low,
}

impl SuccessTier {
    pub fn classify(rate: f64) -> Self {
        if rate >= 0.8 {
            SuccessTier::Excellent
        } else if rate >= 0.6 {
            SuccessTier::Good
        } else if rate >= 0.4 {
            SuccessTier::Moderate
        } else {
            SuccessTier::Low
        }
    }

    /// Severity bucket used for card coloring in the presentation layer.
    pub fn severity(self) -> &'static str {
        match self {
            SuccessTier::Excellent => "success",
            SuccessTier::Good => "warning",
            SuccessTier::Moderate | SuccessTier::Low => "danger",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            SuccessTier::Excellent => {
                "Excellent - Very high probability of maintaining withdrawals"
            }
            SuccessTier::Good => "Good - Reasonable probability of success",
            SuccessTier::Moderate => "Moderate - Consider reducing withdrawal rate",
            SuccessTier::Low => "Low - High risk of depleting funds",
        }
    }
}
