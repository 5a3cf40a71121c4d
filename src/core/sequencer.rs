use super::error::ModelError;
use super::types::{WithdrawalMethod, WithdrawalPolicy};

/// Derives the year-by-year withdrawal amounts for one strategy from
/// its median portfolio-value trajectory.
///
/// Year `y` (1-based) withdraws against `median_path[y - 1]`, the value
/// recorded at the end of the previous year, or the starting balance
/// for year 1. A depleted path value yields a zero withdrawal; the path
/// itself, not this function, encodes that depletion is permanent. The
/// returned sequence has exactly `policy.years` elements.
pub fn withdrawal_sequence(
    median_path: &[f64],
    policy: &WithdrawalPolicy,
) -> Result<Vec<f64>, ModelError> {
    let amount = active_amount(policy)?;
    if policy.years == 0 {
        return Ok(Vec::new());
    }
    validate_path(median_path, policy.years)?;

    let mut sequence = Vec::with_capacity(policy.years as usize);
    for year in 1..=policy.years {
        let current_value = median_path[(year - 1) as usize];
        if current_value <= 0.0 {
            sequence.push(0.0);
            continue;
        }

        let withdrawal = match policy.method {
            // The percentage scales with whatever the path shows that
            // year; the percentage itself is the inflation adjustment.
            WithdrawalMethod::Percentage => current_value * (amount / 100.0),
            WithdrawalMethod::Fixed => {
                let base = if policy.adjust_for_inflation {
                    amount * (1.0 + policy.inflation_rate / 100.0).powi(year as i32 - 1)
                } else {
                    amount
                };
                // Forced under-withdrawal rather than a negative balance.
                base.min(current_value)
            }
        };
        sequence.push(withdrawal);
    }

    Ok(sequence)
}

/// The amount field matching the policy's method. Absent amounts fail
/// fast: a silent zero would be indistinguishable from a legitimately
/// depleted portfolio.
fn active_amount(policy: &WithdrawalPolicy) -> Result<f64, ModelError> {
    match policy.method {
        WithdrawalMethod::Percentage => policy.rate.ok_or(ModelError::MissingRate),
        WithdrawalMethod::Fixed => policy.fixed_amount.ok_or(ModelError::MissingFixedAmount),
    }
}

fn validate_path(median_path: &[f64], years: u32) -> Result<(), ModelError> {
    let required = years as usize + 1;
    if median_path.len() < required {
        return Err(ModelError::PathTooShort {
            actual: median_path.len(),
            required,
            years,
        });
    }
    for (index, value) in median_path.iter().take(required).enumerate() {
        if *value < 0.0 {
            return Err(ModelError::NegativePathValue { index });
        }
    }
    Ok(())
}
