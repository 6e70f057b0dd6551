use super::draw;
use crate::core::types::{RetirementData, WithdrawalAmounts};

/// Non-registered first, then RRSP/RRIF above the minimum, TFSA last.
pub(super) fn withdrawals(
    data: &RetirementData,
    remaining_needed: f64,
    mandatory_rsp: f64,
    mandatory_spouse_rsp: f64,
) -> WithdrawalAmounts {
    let balances = &data.balances;
    let mut still_needed = remaining_needed;

    let other = draw(&mut still_needed, balances.other);
    let spouse_other = draw(&mut still_needed, balances.spouse_other);
    let extra_rsp = draw(&mut still_needed, balances.rsp - mandatory_rsp);
    let extra_spouse_rsp = draw(&mut still_needed, balances.spouse_rsp - mandatory_spouse_rsp);
    let tfsa = draw(&mut still_needed, balances.tfsa);
    let spouse_tfsa = draw(&mut still_needed, balances.spouse_tfsa);

    WithdrawalAmounts {
        rsp: mandatory_rsp + extra_rsp,
        tfsa,
        other,
        spouse_rsp: mandatory_spouse_rsp + extra_spouse_rsp,
        spouse_tfsa,
        spouse_other,
    }
}
