mod error;
mod presets;
mod sequencer;
mod summarizer;
mod types;

pub use error::ModelError;
pub use presets::{RiskLevel, derived_expected_return, derived_volatility, preset, presets};
pub use sequencer::withdrawal_sequence;
pub use summarizer::{StrategySummary, summarize, summarize_all, summarize_strategy};
pub use types::{
    PercentilePaths, PortfolioDefinition, PortfolioResult, SimulationOutcome, SuccessTier,
    SummaryMetrics, WithdrawalMethod, WithdrawalPolicy,
};
