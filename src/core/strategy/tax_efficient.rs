use super::draw;
use crate::core::tax::{TAX_CONSTANTS, TaxBracket, effective_tax_rate};
use crate::core::types::{RetirementData, WithdrawalAmounts};

const SHORTFALL_TOLERANCE: f64 = 0.01;

/// Split of the still-needed amount across the four taxable sources.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Mix {
    rsp: f64,
    other: f64,
    spouse_rsp: f64,
    spouse_other: f64,
}

impl Mix {
    const fn new(rsp: f64, other: f64, spouse_rsp: f64, spouse_other: f64) -> Self {
        Self {
            rsp,
            other,
            spouse_rsp,
            spouse_other,
        }
    }

    fn total(&self) -> f64 {
        self.rsp + self.other + self.spouse_rsp + self.spouse_other
    }

    fn proportional_to(available: Mix) -> Self {
        let total = available.total();
        if total <= 0.0 {
            return EVEN_MIX;
        }
        Mix::new(
            available.rsp / total,
            available.other / total,
            available.spouse_rsp / total,
            available.spouse_other / total,
        )
    }
}

const RSP_HEAVY: Mix = Mix::new(0.8, 0.2, 0.0, 0.0);
const OTHER_HEAVY: Mix = Mix::new(0.2, 0.8, 0.0, 0.0);
const PERSON_SPLIT: Mix = Mix::new(0.4, 0.1, 0.4, 0.1);
const EVEN_MIX: Mix = Mix::new(0.25, 0.25, 0.25, 0.25);

pub(super) fn withdrawals(
    data: &RetirementData,
    remaining_needed: f64,
    mandatory_rsp: f64,
    mandatory_spouse_rsp: f64,
    provincial: &[TaxBracket],
) -> WithdrawalAmounts {
    let balances = &data.balances;
    let mut still_needed = remaining_needed;

    let tfsa = draw(&mut still_needed, balances.tfsa);
    let spouse_tfsa = draw(&mut still_needed, balances.spouse_tfsa);

    let mut best = Mix::default();
    if still_needed > 0.0 {
        let available = Mix::new(
            (balances.rsp - mandatory_rsp).max(0.0),
            balances.other.max(0.0),
            (balances.spouse_rsp - mandatory_spouse_rsp).max(0.0),
            balances.spouse_other.max(0.0),
        );
        let candidates = [
            RSP_HEAVY,
            OTHER_HEAVY,
            PERSON_SPLIT,
            EVEN_MIX,
            Mix::proportional_to(available),
        ];

        let mut lowest_rate = f64::MAX;
        for ratios in candidates {
            let amounts = allocate(ratios, available, still_needed);
            let rate = weighted_marginal_rate(
                data,
                amounts,
                mandatory_rsp,
                mandatory_spouse_rsp,
                provincial,
            );
            if rate < lowest_rate {
                lowest_rate = rate;
                best = amounts;
            }
        }
    }

    WithdrawalAmounts {
        rsp: mandatory_rsp + best.rsp,
        tfsa,
        other: best.other,
        spouse_rsp: mandatory_spouse_rsp + best.spouse_rsp,
        spouse_tfsa,
        spouse_other: best.spouse_other,
    }
}

/// Applies the ratios, caps at what each source holds, then spreads any
/// shortfall over the remaining capacity.
fn allocate(ratios: Mix, available: Mix, needed: f64) -> Mix {
    let mut amounts = Mix::new(
        (ratios.rsp * needed).min(available.rsp),
        (ratios.other * needed).min(available.other),
        (ratios.spouse_rsp * needed).min(available.spouse_rsp),
        (ratios.spouse_other * needed).min(available.spouse_other),
    );

    let total = amounts.total();
    if total < needed - SHORTFALL_TOLERANCE {
        let shortfall = needed - total;
        let headroom = Mix::new(
            available.rsp - amounts.rsp,
            available.other - amounts.other,
            available.spouse_rsp - amounts.spouse_rsp,
            available.spouse_other - amounts.spouse_other,
        );
        let capacity = headroom.total();
        if capacity > 0.0 {
            let top_up = |room: f64| {
                if room > 0.0 {
                    (shortfall * room / capacity).min(room)
                } else {
                    0.0
                }
            };
            amounts.rsp += top_up(headroom.rsp);
            amounts.other += top_up(headroom.other);
            amounts.spouse_rsp += top_up(headroom.spouse_rsp);
            amounts.spouse_other += top_up(headroom.spouse_other);
        }
    }
    amounts
}

/// Withdrawal-weighted average of each source's marginal rate. Only the
/// included portion of a non-registered withdrawal is taxed.
fn weighted_marginal_rate(
    data: &RetirementData,
    amounts: Mix,
    mandatory_rsp: f64,
    mandatory_spouse_rsp: f64,
    provincial: &[TaxBracket],
) -> f64 {
    let inclusion = TAX_CONSTANTS.capital_gains_inclusion_rate;

    let primary_base = data.taxable_income + mandatory_rsp;
    let rsp_rate = effective_tax_rate(primary_base, amounts.rsp, provincial);
    let other_rate = effective_tax_rate(primary_base, amounts.other * inclusion, provincial);

    let (spouse_rsp_rate, spouse_other_rate) = match data.spouse_taxable_income {
        Some(income) => {
            let spouse_base = income + mandatory_spouse_rsp;
            (
                effective_tax_rate(spouse_base, amounts.spouse_rsp, provincial),
                effective_tax_rate(spouse_base, amounts.spouse_other * inclusion, provincial),
            )
        }
        None => (0.0, 0.0),
    };

    let weighted = amounts.rsp * rsp_rate
        + amounts.other * other_rate
        + amounts.spouse_rsp * spouse_rsp_rate
        + amounts.spouse_other * spouse_other_rate;
    let total = amounts.total();
    weighted / if total > 0.0 { total } else { 1.0 }
}
