//! Risk / position-size calculator behind the `risk` command.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::RelayError;

/// Inputs and derived values of one risk calculation. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskCalculation {
    pub capital: Decimal,
    pub risk_percent: Decimal,
    pub stop_loss: Decimal,
    /// `capital * risk_percent / 100`, rounded to 2 dp.
    pub risk_amount: Decimal,
    /// `risk_amount / stop_loss`, rounded to 2 dp.
    pub position_size: Decimal,
}

/// Compute risk amount and position size.
///
/// Zero or negative inputs are rejected with `InvalidInput` before any
/// division happens.
pub fn compute_risk(
    capital: Decimal,
    risk_percent: Decimal,
    stop_loss: Decimal,
) -> Result<RiskCalculation, RelayError> {
    require_positive("capital", capital)?;
    require_positive("riskpercent", risk_percent)?;
    require_positive("stoploss", stop_loss)?;

    let risk_amount = capital
        .checked_mul(risk_percent)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(|| RelayError::InvalidInput("capital * riskpercent overflows".into()))?;
    let position_size = risk_amount
        .checked_div(stop_loss)
        .ok_or_else(|| RelayError::InvalidInput("position size overflows".into()))?;

    Ok(RiskCalculation {
        capital,
        risk_percent,
        stop_loss,
        risk_amount: risk_amount.round_dp(2),
        position_size: position_size.round_dp(2),
    })
}

fn require_positive(name: &str, value: Decimal) -> Result<(), RelayError> {
    if value <= Decimal::ZERO {
        return Err(RelayError::InvalidInput(format!(
            "{name} must be greater than zero (got {value})"
        )));
    }
    Ok(())
}
