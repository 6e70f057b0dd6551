use super::{ASSUMED_GAIN_FRACTION, Account, draw, draw_in_rate_order};
use crate::core::tax::{TAX_CONSTANTS, TaxBracket, effective_tax_rate};
use crate::core::types::{RetirementData, WithdrawalAmounts};

const PLANNING_HORIZON_AGE: u32 = 95;
const MIN_YEARS_LEFT: u32 = 5;
const LATE_RETIREMENT_YEARS: u32 = 15;
/// Taxable income up to which late-life RRSP draws are still considered cheap.
const REASONABLE_TAXABLE_INCOME: f64 = 80_000.0;
/// Rate assigned to spouse sources when there is no spouse income to rank on.
const UNRANKED_RATE: f64 = 1.0;

pub(super) fn years_left(age: u32) -> u32 {
    PLANNING_HORIZON_AGE.saturating_sub(age).max(MIN_YEARS_LEFT)
}

pub(super) fn withdrawals(
    data: &RetirementData,
    remaining_needed: f64,
    mandatory_rsp: f64,
    mandatory_spouse_rsp: f64,
    provincial: &[TaxBracket],
) -> WithdrawalAmounts {
    let mut amounts = WithdrawalAmounts::mandatory_only(mandatory_rsp, mandatory_spouse_rsp);
    let mut still_needed = remaining_needed;

    if years_left(data.age) < LATE_RETIREMENT_YEARS {
        draw_down_late(data, &mut amounts, &mut still_needed, mandatory_rsp, mandatory_spouse_rsp);
    } else {
        draw_early(
            data,
            &mut amounts,
            &mut still_needed,
            mandatory_rsp,
            mandatory_spouse_rsp,
            provincial,
        );
    }
    amounts
}

/// Few years left: empty registered money up to a moderate income first so
/// little is stranded, then everything else, then more RRSP regardless of rate.
fn draw_down_late(
    data: &RetirementData,
    amounts: &mut WithdrawalAmounts,
    still_needed: &mut f64,
    mandatory_rsp: f64,
    mandatory_spouse_rsp: f64,
) {
    let balances = &data.balances;

    let headroom = (REASONABLE_TAXABLE_INCOME - data.taxable_income - mandatory_rsp).max(0.0);
    let rsp_within_headroom = (balances.rsp - mandatory_rsp).min(headroom);
    amounts.add(Account::Rsp, draw(still_needed, rsp_within_headroom));

    if let Some(spouse_income) = data.spouse_taxable_income {
        let headroom =
            (REASONABLE_TAXABLE_INCOME - spouse_income - mandatory_spouse_rsp).max(0.0);
        let spouse_rsp_within_headroom = (balances.spouse_rsp - mandatory_spouse_rsp).min(headroom);
        amounts.add(Account::SpouseRsp, draw(still_needed, spouse_rsp_within_headroom));
    }

    amounts.add(Account::Other, draw(still_needed, balances.other));
    amounts.add(Account::SpouseOther, draw(still_needed, balances.spouse_other));
    amounts.add(Account::Tfsa, draw(still_needed, balances.tfsa));
    amounts.add(Account::SpouseTfsa, draw(still_needed, balances.spouse_tfsa));

    amounts.add(Account::Rsp, draw(still_needed, balances.rsp - amounts.rsp));
    amounts.add(
        Account::SpouseRsp,
        draw(still_needed, balances.spouse_rsp - amounts.spouse_rsp),
    );
}

/// Many years left: TFSA first, then taxable sources cheapest first.
fn draw_early(
    data: &RetirementData,
    amounts: &mut WithdrawalAmounts,
    still_needed: &mut f64,
    mandatory_rsp: f64,
    mandatory_spouse_rsp: f64,
    provincial: &[TaxBracket],
) {
    let balances = &data.balances;

    amounts.add(Account::Tfsa, draw(still_needed, balances.tfsa));
    amounts.add(Account::SpouseTfsa, draw(still_needed, balances.spouse_tfsa));
    if *still_needed <= 0.0 {
        return;
    }

    let need = *still_needed;
    let gain_weight = ASSUMED_GAIN_FRACTION * TAX_CONSTANTS.capital_gains_inclusion_rate;
    let rsp_available = balances.rsp - mandatory_rsp;
    let spouse_rsp_available = balances.spouse_rsp - mandatory_spouse_rsp;

    let primary_base = data.taxable_income + mandatory_rsp;
    let other_rate =
        effective_tax_rate(primary_base, balances.other.min(need) * gain_weight, provincial);
    let rsp_rate = effective_tax_rate(primary_base, rsp_available.min(need), provincial);

    let (spouse_other_rate, spouse_rsp_rate) = match data.spouse_taxable_income {
        Some(income) => {
            let spouse_base = income + mandatory_spouse_rsp;
            (
                effective_tax_rate(
                    spouse_base,
                    balances.spouse_other.min(need) * gain_weight,
                    provincial,
                ),
                effective_tax_rate(spouse_base, spouse_rsp_available.min(need), provincial),
            )
        }
        None => (UNRANKED_RATE, UNRANKED_RATE),
    };

    draw_in_rate_order(
        amounts,
        still_needed,
        vec![
            (Account::Other, other_rate, balances.other),
            (Account::Rsp, rsp_rate, rsp_available),
            (Account::SpouseOther, spouse_other_rate, balances.spouse_other),
            (Account::SpouseRsp, spouse_rsp_rate, spouse_rsp_available),
        ],
    );
}
