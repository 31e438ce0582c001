//! Refund amount calculation for received returns.

use serde::{Deserialize, Serialize};

use super::{ReturnError, ReturnLine, ReturnReason};
use crate::domain::{CurrencyCode, Money};

/// How a refund total was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundBreakdown {
    /// Sum of unit price times quantity over every returned line.
    pub subtotal: Money,
    /// Fee withheld for change-of-mind returns.
    pub restocking_fee: Money,
    /// Amount refunded after the fee and the order's refundable cap.
    pub total: Money,
}

/// Compute the refund for `lines`.
///
/// The restocking fee applies once, to the combined value of change-of-mind
/// lines, and the result never exceeds what the order still has to refund.
pub(crate) fn calculate(
    lines: &[ReturnLine],
    currency: CurrencyCode,
    restocking_fee_bps: u32,
    refundable_remaining: Money,
) -> Result<RefundBreakdown, ReturnError> {
    let mut subtotal = Money::zero(currency);
    let mut fee_base = Money::zero(currency);
    for line in lines {
        let value = line.unit_price.times(line.quantity)?;
        subtotal = subtotal.plus(&value)?;
        if line.reason == ReturnReason::ChangedMind {
            fee_base = fee_base.plus(&value)?;
        }
    }
    let restocking_fee = fee_base.basis_points(restocking_fee_bps)?;
    let net = subtotal.minus(&restocking_fee)?;
    let total = net.min(&refundable_remaining)?;
    Ok(RefundBreakdown {
        subtotal,
        restocking_fee,
        total,
    })
}
