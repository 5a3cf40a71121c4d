use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{
    Router,
    extract::Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::core::{
    PortfolioDefinition, RiskLevel, SimulationOutcome, StrategySummary, SuccessTier,
    WithdrawalMethod, WithdrawalPolicy, presets, summarize_all,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliWithdrawalMethod {
    Percentage,
    Fixed,
}

impl From<CliWithdrawalMethod> for WithdrawalMethod {
    fn from(value: CliWithdrawalMethod) -> Self {
        match value {
            CliWithdrawalMethod::Percentage => WithdrawalMethod::Percentage,
            CliWithdrawalMethod::Fixed => WithdrawalMethod::Fixed,
        }
    }
}

impl From<WithdrawalMethod> for CliWithdrawalMethod {
    fn from(value: WithdrawalMethod) -> Self {
        match value {
            WithdrawalMethod::Percentage => CliWithdrawalMethod::Percentage,
            WithdrawalMethod::Fixed => CliWithdrawalMethod::Fixed,
        }
    }
}

#[derive(Args, Debug, Clone)]
struct PolicyArgs {
    #[arg(
        long,
        default_value_t = 1_000_000.0,
        help = "Endowment balance at the start of the horizon"
    )]
    starting_balance: f64,
    #[arg(
        long,
        value_enum,
        default_value_t = CliWithdrawalMethod::Percentage,
        help = "Withdraw a percent of the balance or a fixed annual amount"
    )]
    withdrawal_method: CliWithdrawalMethod,
    #[arg(
        long,
        default_value_t = 4.0,
        help = "Annual withdrawal as a percent of the current balance"
    )]
    withdrawal_rate: f64,
    #[arg(
        long,
        default_value_t = 40_000.0,
        help = "Annual fixed withdrawal in currency units"
    )]
    withdrawal_amount: f64,
    #[arg(long, default_value_t = 30, help = "Projection horizon in years")]
    years: u32,
    #[arg(
        long,
        default_value_t = 3.0,
        help = "Annual inflation in percent applied to fixed withdrawals"
    )]
    inflation_rate: f64,
    #[arg(
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        help = "Escalate fixed withdrawals with inflation"
    )]
    adjust_for_inflation: bool,
}

#[derive(Parser, Debug)]
#[command(
    name = "spenddown",
    about = "Endowment spend-down analyzer (withdrawal sequencing and outcome summaries over simulated portfolio paths)"
)]
struct Cli {
    #[arg(
        long,
        help = "Path to a simulator results JSON file, either a single result or {\"portfolios\": {...}}"
    )]
    input: PathBuf,
    #[command(flatten)]
    policy: PolicyArgs,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SummarizePayload {
    starting_balance: Option<f64>,
    withdrawal_method: Option<WithdrawalMethod>,
    withdrawal_rate: Option<f64>,
    withdrawal_amount: Option<f64>,
    years: Option<u32>,
    inflation_rate: Option<f64>,
    adjust_for_inflation: Option<bool>,
    results: Option<SimulationOutcome>,
}

#[derive(Debug)]
struct ApiRequest {
    starting_balance: f64,
    policy: WithdrawalPolicy,
    outcome: SimulationOutcome,
}

fn default_policy_args() -> PolicyArgs {
    PolicyArgs {
        starting_balance: 1_000_000.0,
        withdrawal_method: CliWithdrawalMethod::Percentage,
        withdrawal_rate: 4.0,
        withdrawal_amount: 40_000.0,
        years: 30,
        inflation_rate: 3.0,
        adjust_for_inflation: true,
    }
}

fn build_policy(args: &PolicyArgs) -> Result<(WithdrawalPolicy, f64), String> {
    if args.starting_balance <= 0.0 {
        return Err("--starting-balance must be > 0".to_string());
    }
    if args.years == 0 {
        return Err("--years must be >= 1".to_string());
    }
    if args.withdrawal_rate < 0.0 {
        return Err("--withdrawal-rate must be >= 0".to_string());
    }
    if args.withdrawal_amount < 0.0 {
        return Err("--withdrawal-amount must be >= 0".to_string());
    }
    if args.inflation_rate <= -100.0 {
        return Err("--inflation-rate must be > -100".to_string());
    }

    let policy = WithdrawalPolicy {
        method: args.withdrawal_method.into(),
        rate: Some(args.withdrawal_rate),
        fixed_amount: Some(args.withdrawal_amount),
        years: args.years,
        adjust_for_inflation: args.adjust_for_inflation,
        inflation_rate: args.inflation_rate,
    };
    Ok((policy, args.starting_balance))
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SummarizePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SummarizePayload) -> Result<ApiRequest, String> {
    let mut args = default_policy_args();

    if let Some(v) = payload.starting_balance {
        args.starting_balance = v;
    }
    if let Some(v) = payload.withdrawal_method {
        args.withdrawal_method = v.into();
    }
    if let Some(v) = payload.withdrawal_rate {
        args.withdrawal_rate = v;
    }
    if let Some(v) = payload.withdrawal_amount {
        args.withdrawal_amount = v;
    }
    if let Some(v) = payload.years {
        args.years = v;
    }
    if let Some(v) = payload.inflation_rate {
        args.inflation_rate = v;
    }
    if let Some(v) = payload.adjust_for_inflation {
        args.adjust_for_inflation = v;
    }

    let (policy, starting_balance) = build_policy(&args)?;
    let outcome = payload
        .results
        .ok_or_else(|| "results with simulator output are required".to_string())?;

    Ok(ApiRequest {
        starting_balance,
        policy,
        outcome,
    })
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    version: &'static str,
}

/// One catalog entry, serialized with the simulator's snake_case field
/// names so the presentation layer sees one consistent contract.
#[derive(Debug, Serialize)]
struct PortfolioListing {
    id: String,
    name: String,
    stocks_percentage: f64,
    bonds_percentage: f64,
    expected_return: f64,
    volatility: f64,
    risk_level: RiskLevel,
}

impl From<PortfolioDefinition> for PortfolioListing {
    fn from(definition: PortfolioDefinition) -> Self {
        let risk_level = RiskLevel::from_stock_allocation(definition.stocks_percentage);
        PortfolioListing {
            id: definition.id,
            name: definition.name,
            stocks_percentage: definition.stocks_percentage,
            bonds_percentage: definition.bonds_percentage,
            expected_return: definition.expected_return,
            volatility: definition.volatility,
            risk_level,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StrategyReport {
    portfolio: PortfolioDefinition,
    success_rate: f64,
    success_tier: SuccessTier,
    success_severity: &'static str,
    success_message: &'static str,
    median_final_balance: f64,
    percentile_10: f64,
    percentile_90: f64,
    total_withdrawals: f64,
    final_year_withdrawal: f64,
    average_growth_rate: f64,
    insights: Vec<String>,
    withdrawal_schedule: Vec<f64>,
}

impl From<StrategySummary> for StrategyReport {
    fn from(summary: StrategySummary) -> Self {
        StrategyReport {
            portfolio: summary.portfolio,
            success_rate: summary.success_rate,
            success_tier: summary.success_tier,
            success_severity: summary.success_tier.severity(),
            success_message: summary.success_tier.message(),
            median_final_balance: summary.median_final_balance,
            percentile_10: summary.percentile_10,
            percentile_90: summary.percentile_90,
            total_withdrawals: summary.metrics.total_withdrawals,
            final_year_withdrawal: summary.metrics.final_year_withdrawal,
            average_growth_rate: summary.metrics.average_growth_rate,
            insights: summary.metrics.insights,
            withdrawal_schedule: summary.withdrawal_schedule,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummarizeResponse {
    withdrawal_method: WithdrawalMethod,
    years: u32,
    starting_balance: f64,
    strategies: BTreeMap<String, StrategyReport>,
    failures: BTreeMap<String, String>,
}

fn build_summarize_response(request: &ApiRequest) -> SummarizeResponse {
    let mut strategies = BTreeMap::new();
    let mut failures = BTreeMap::new();

    for (id, outcome) in summarize_all(&request.outcome, &request.policy, request.starting_balance)
    {
        match outcome {
            Ok(summary) => {
                strategies.insert(id, StrategyReport::from(summary));
            }
            Err(err) => {
                tracing::warn!(strategy = %id, error = %err, "strategy summary failed");
                failures.insert(id, err.to_string());
            }
        }
    }

    SummarizeResponse {
        withdrawal_method: request.policy.method,
        years: request.policy.years,
        starting_balance: request.starting_balance,
        strategies,
        failures,
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/portfolios", get(portfolios_handler))
        .route("/api/summarize", post(summarize_post_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("spenddown HTTP API listening on http://{addr}");

    axum::serve(listener, app).await
}

/// Reads a simulator results file and prints the summary report, using
/// the same request shaping as the HTTP surface.
pub fn run_analyze() -> Result<(), String> {
    let cli = Cli::parse();
    let (policy, starting_balance) = build_policy(&cli.policy)?;

    let raw = std::fs::read_to_string(&cli.input)
        .map_err(|e| format!("failed to read {}: {e}", cli.input.display()))?;
    let outcome = serde_json::from_str::<SimulationOutcome>(&raw)
        .map_err(|e| format!("invalid simulator payload: {e}"))?;

    let request = ApiRequest {
        starting_balance,
        policy,
        outcome,
    };
    let response = build_summarize_response(&request);
    let json = serde_json::to_string_pretty(&response)
        .map_err(|e| format!("failed to encode report: {e}"))?;
    println!("{json}");
    Ok(())
}

async fn health_handler() -> Response {
    json_response(
        StatusCode::OK,
        HealthResponse {
            status: "ok",
            message: "spenddown API is running",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

async fn portfolios_handler() -> Response {
    let catalog: Vec<PortfolioListing> = presets().into_iter().map(Into::into).collect();
    json_response(StatusCode::OK, catalog)
}

async fn summarize_post_handler(Json(payload): Json<SummarizePayload>) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    json_response(StatusCode::OK, build_summarize_response(&request))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn single_result_json() -> String {
        r#"{
          "portfolio": {
            "id": "balanced",
            "name": "Balanced (70/30)",
            "stocks_percentage": 70,
            "bonds_percentage": 30,
            "expected_return": 0.085,
            "std_deviation": 0.1423
          },
          "success_rate": 0.82,
          "median_final_balance": 1100000,
          "percentile_paths": {
            "p10": [1000000, 900000, 820000, 760000],
            "p50": [1000000, 1020000, 1050000, 1100000],
            "p90": [1000000, 1150000, 1300000, 1480000]
          },
          "percentile_10": 760000,
          "percentile_90": 1480000,
          "annual_stats": [{"year": 0, "p10": 1000000, "p50": 1000000, "p90": 1000000}]
        }"#
        .to_string()
    }

    fn multi_results_json() -> String {
        let single = single_result_json();
        format!(
            r#"{{"portfolios": {{"balanced": {single}, "conservative": {single}, "aggressive": {single}}}}}"#
        )
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = format!(
            r#"{{
              "startingBalance": 2000000,
              "withdrawalMethod": "fixed",
              "withdrawalAmount": 75000,
              "years": 3,
              "inflationRate": 2.5,
              "adjustForInflation": false,
              "results": {}
            }}"#,
            single_result_json()
        );
        let request = api_request_from_json(&json).expect("json should parse");

        assert_approx(request.starting_balance, 2_000_000.0);
        assert_eq!(request.policy.method, WithdrawalMethod::Fixed);
        assert_eq!(request.policy.fixed_amount, Some(75_000.0));
        assert_eq!(request.policy.years, 3);
        assert_approx(request.policy.inflation_rate, 2.5);
        assert!(!request.policy.adjust_for_inflation);
        assert!(matches!(request.outcome, SimulationOutcome::Single(_)));
    }

    #[test]
    fn api_request_applies_documented_defaults() {
        let json = format!(r#"{{"results": {}}}"#, single_result_json());
        let request = api_request_from_json(&json).expect("json should parse");

        assert_approx(request.starting_balance, 1_000_000.0);
        assert_eq!(request.policy.method, WithdrawalMethod::Percentage);
        assert_eq!(request.policy.rate, Some(4.0));
        assert_eq!(request.policy.years, 30);
        assert!(request.policy.adjust_for_inflation);
    }

    #[test]
    fn api_request_requires_a_results_payload() {
        let err = api_request_from_json(r#"{"years": 10}"#).expect_err("must reject");
        assert!(err.contains("results"));
    }

    #[test]
    fn payload_with_portfolios_key_resolves_to_the_multi_variant() {
        let json = format!(r#"{{"years": 3, "results": {}}}"#, multi_results_json());
        let request = api_request_from_json(&json).expect("json should parse");

        match &request.outcome {
            SimulationOutcome::Multi { portfolios } => {
                assert_eq!(portfolios.len(), 3);
                assert!(portfolios.contains_key("conservative"));
            }
            SimulationOutcome::Single(_) => panic!("expected the multi-strategy variant"),
        }
    }

    #[test]
    fn build_policy_rejects_a_non_positive_starting_balance() {
        let mut args = default_policy_args();
        args.starting_balance = 0.0;
        let err = build_policy(&args).expect_err("must reject");
        assert!(err.contains("--starting-balance"));
    }

    #[test]
    fn build_policy_rejects_a_zero_year_horizon() {
        let mut args = default_policy_args();
        args.years = 0;
        let err = build_policy(&args).expect_err("must reject");
        assert!(err.contains("--years"));
    }

    #[test]
    fn build_policy_rejects_negative_withdrawal_inputs() {
        let mut args = default_policy_args();
        args.withdrawal_rate = -1.0;
        assert!(build_policy(&args).expect_err("must reject").contains("--withdrawal-rate"));

        let mut args = default_policy_args();
        args.withdrawal_amount = -1.0;
        assert!(
            build_policy(&args)
                .expect_err("must reject")
                .contains("--withdrawal-amount")
        );
    }

    #[test]
    fn summarize_response_serialization_contains_expected_fields() {
        let json = format!(r#"{{"years": 3, "results": {}}}"#, single_result_json());
        let request = api_request_from_json(&json).expect("json should parse");
        let response = build_summarize_response(&request);
        let encoded = serde_json::to_string(&response).expect("response should serialize");

        assert!(encoded.contains("\"strategies\""));
        assert!(encoded.contains("\"failures\""));
        assert!(encoded.contains("\"successTier\""));
        assert!(encoded.contains("\"successSeverity\""));
        assert!(encoded.contains("\"withdrawalSchedule\""));
        assert!(encoded.contains("\"totalWithdrawals\""));
        assert!(encoded.contains("\"finalYearWithdrawal\""));
        assert!(encoded.contains("\"averageGrowthRate\""));
        assert!(encoded.contains("\"medianFinalBalance\""));
    }

    #[test]
    fn summarize_response_reports_per_strategy_failures_independently() {
        let broken = r#"{
          "portfolio": {"name": "Broken", "expected_return": 0.08, "std_deviation": 0.15},
          "success_rate": 0.8,
          "median_final_balance": 1000000,
          "percentile_paths": {"p10": [1000000], "p50": [1000000], "p90": [1000000]}
        }"#;
        let single = single_result_json();
        let json = format!(
            r#"{{"years": 3, "results": {{"portfolios": {{"balanced": {single}, "broken": {broken}}}}}}}"#
        );
        let request = api_request_from_json(&json).expect("json should parse");
        let response = build_summarize_response(&request);

        assert_eq!(response.strategies.len(), 1);
        assert!(response.strategies.contains_key("balanced"));
        assert_eq!(response.failures.len(), 1);
        assert!(response.failures["broken"].contains("median path"));
    }

    #[test]
    fn summarize_response_carries_the_expected_metrics() {
        let json = format!(r#"{{"years": 3, "results": {}}}"#, single_result_json());
        let request = api_request_from_json(&json).expect("json should parse");
        let response = build_summarize_response(&request);

        let report = &response.strategies["balanced"];
        assert_eq!(report.success_tier, SuccessTier::Excellent);
        assert_eq!(report.success_severity, "success");
        assert_eq!(report.withdrawal_schedule.len(), 3);
        // 4% of [1000000, 1020000, 1050000] entering years 1..=3.
        assert_approx(report.withdrawal_schedule[0], 40_000.0);
        assert_approx(report.withdrawal_schedule[1], 40_800.0);
        assert_approx(report.withdrawal_schedule[2], 42_000.0);
        assert_approx(report.total_withdrawals, 122_800.0);
        assert_approx(report.final_year_withdrawal, 42_000.0);
    }

    #[test]
    fn portfolio_listing_serializes_the_catalog_contract() {
        let catalog: Vec<PortfolioListing> = presets().into_iter().map(Into::into).collect();
        let encoded = serde_json::to_string(&catalog).expect("catalog should serialize");

        assert!(encoded.contains("\"stocks_percentage\""));
        assert!(encoded.contains("\"expected_return\""));
        assert!(encoded.contains("\"risk_level\":\"Balanced\""));
        assert!(encoded.contains("\"id\":\"conservative\""));
    }

    #[test]
    fn unknown_simulator_fields_are_ignored_at_the_boundary() {
        let json = format!(
            r#"{{"results": {}, "years": 3}}"#,
            single_result_json().replace(
                "\"annual_stats\"",
                "\"projection_data\": {\"labels\": [0, 1, 2, 3]}, \"annual_stats\""
            )
        );
        let request = api_request_from_json(&json).expect("extra fields must be ignored");
        assert!(matches!(request.outcome, SimulationOutcome::Single(_)));
    }
}
