use super::{ASSUMED_GAIN_FRACTION, Account, draw_in_rate_order};
use crate::core::tax::{TAX_CONSTANTS, TaxBracket, effective_tax_rate};
use crate::core::types::{AccountBalances, RetirementData, WithdrawalAmounts};

/// Withdrawal size used to sample each source's marginal cost.
const RATE_SAMPLE: f64 = 10_000.0;
const MAX_TAX_DISCOUNT: f64 = 0.5;

fn tax_adjuster(rate: f64) -> f64 {
    1.0 - rate.min(MAX_TAX_DISCOUNT)
}

pub(super) fn withdrawals(
    data: &RetirementData,
    remaining_needed: f64,
    mandatory_rsp: f64,
    mandatory_spouse_rsp: f64,
    provincial: &[TaxBracket],
) -> WithdrawalAmounts {
    let balances = &data.balances;
    let available = AccountBalances {
        rsp: (balances.rsp - mandatory_rsp).max(0.0),
        tfsa: balances.tfsa.max(0.0),
        other: balances.other.max(0.0),
        spouse_rsp: (balances.spouse_rsp - mandatory_spouse_rsp).max(0.0),
        spouse_tfsa: balances.spouse_tfsa.max(0.0),
        spouse_other: balances.spouse_other.max(0.0),
    };
    let mut amounts = WithdrawalAmounts::mandatory_only(mandatory_rsp, mandatory_spouse_rsp);

    let total_assets = available.total();
    if total_assets <= 0.0 {
        return amounts;
    }

    let gain_weight = ASSUMED_GAIN_FRACTION * TAX_CONSTANTS.capital_gains_inclusion_rate;
    let primary_base = data.taxable_income + mandatory_rsp;
    let rsp_rate = effective_tax_rate(primary_base, available.rsp.min(RATE_SAMPLE), provincial);
    let other_rate = effective_tax_rate(
        primary_base,
        available.other.min(RATE_SAMPLE) * gain_weight,
        provincial,
    );
    let (spouse_rsp_rate, spouse_other_rate) = match data.spouse_taxable_income {
        Some(income) => {
            let spouse_base = income + mandatory_spouse_rsp;
            (
                effective_tax_rate(spouse_base, available.spouse_rsp.min(RATE_SAMPLE), provincial),
                effective_tax_rate(
                    spouse_base,
                    available.spouse_other.min(RATE_SAMPLE) * gain_weight,
                    provincial,
                ),
            )
        }
        None => (0.0, 0.0),
    };

    // Shortfall pass order; the stable sort keeps it on equal rates.
    let sources = [
        (Account::Tfsa, 0.0),
        (Account::SpouseTfsa, 0.0),
        (Account::Other, other_rate),
        (Account::SpouseOther, spouse_other_rate),
        (Account::Rsp, rsp_rate),
        (Account::SpouseRsp, spouse_rsp_rate),
    ];

    let weights: Vec<f64> = sources
        .iter()
        .map(|(account, rate)| available.get(*account) / total_assets * tax_adjuster(*rate))
        .collect();
    let total_weight: f64 = weights.iter().sum();

    let mut drawn = WithdrawalAmounts::default();
    if total_weight > 0.0 {
        for ((account, _), weight) in sources.iter().zip(&weights) {
            let share = remaining_needed * (weight / total_weight);
            drawn.add(*account, share.min(available.get(*account)));
        }
    }

    let mut shortfall = remaining_needed - drawn.total();
    if shortfall > 0.0 {
        let options = sources
            .iter()
            .map(|(account, rate)| (*account, *rate, available.get(*account) - drawn.get(*account)))
            .collect();
        draw_in_rate_order(&mut drawn, &mut shortfall, options);
    }

    for (account, _) in sources {
        amounts.add(account, drawn.get(account));
    }
    amounts
}
