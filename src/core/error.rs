use thiserror::Error;

/// Input-validation failures for the sequencer and summarizer. All are
/// reported synchronously to the caller; nothing here is retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("withdrawal rate is required when the withdrawal method is percentage")]
    MissingRate,
    #[error("withdrawal amount is required when the withdrawal method is fixed")]
    MissingFixedAmount,
    #[error("median path has {actual} points but {required} are needed for a {years}-year horizon")]
    PathTooShort {
        actual: usize,
        required: usize,
        years: u32,
    },
    #[error("median path value at index {index} is negative")]
    NegativePathValue { index: usize },
    #[error("starting balance must be greater than 0")]
    NonPositiveStartingBalance,
    #[error("withdrawal horizon must cover at least one year")]
    ZeroYears,
}
