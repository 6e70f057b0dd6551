mod balanced;
mod max_end_worth;
mod spend_it_all;
mod tax_efficient;

use tracing::debug;

use super::rrif::rrif_minimum_withdrawal;
use super::tax::TaxBracket;
use super::types::{AccountBalances, OptimizationGoal, RetirementData, WithdrawalAmounts};

/// Share of a non-registered withdrawal assumed to be realized gain when
/// ranking it against other sources.
pub(crate) const ASSUMED_GAIN_FRACTION: f64 = 0.5;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Account {
    Rsp,
    Tfsa,
    Other,
    SpouseRsp,
    SpouseTfsa,
    SpouseOther,
}

impl AccountBalances {
    pub fn get(&self, account: Account) -> f64 {
        match account {
            Account::Rsp => self.rsp,
            Account::Tfsa => self.tfsa,
            Account::Other => self.other,
            Account::SpouseRsp => self.spouse_rsp,
            Account::SpouseTfsa => self.spouse_tfsa,
            Account::SpouseOther => self.spouse_other,
        }
    }
}

impl WithdrawalAmounts {
    pub fn get(&self, account: Account) -> f64 {
        match account {
            Account::Rsp => self.rsp,
            Account::Tfsa => self.tfsa,
            Account::Other => self.other,
            Account::SpouseRsp => self.spouse_rsp,
            Account::SpouseTfsa => self.spouse_tfsa,
            Account::SpouseOther => self.spouse_other,
        }
    }

    pub fn add(&mut self, account: Account, amount: f64) {
        let slot = match account {
            Account::Rsp => &mut self.rsp,
            Account::Tfsa => &mut self.tfsa,
            Account::Other => &mut self.other,
            Account::SpouseRsp => &mut self.spouse_rsp,
            Account::SpouseTfsa => &mut self.spouse_tfsa,
            Account::SpouseOther => &mut self.spouse_other,
        };
        *slot += amount;
    }
}

/// What a benefit-timing search scores each simulated plan on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimingObjective {
    MinimizeLifetimeTax,
    MaximizeFinalNetWorth,
    MaximizeAnnualFunMoney,
}

impl OptimizationGoal {
    /// `None` means the goal does not search and claims at the standard ages.
    pub fn timing_objective(self) -> Option<TimingObjective> {
        match self {
            OptimizationGoal::LowestTax => Some(TimingObjective::MinimizeLifetimeTax),
            OptimizationGoal::MaxEndWorth => Some(TimingObjective::MaximizeFinalNetWorth),
            OptimizationGoal::SpendItAll => Some(TimingObjective::MaximizeAnnualFunMoney),
            OptimizationGoal::Balanced => None,
        }
    }
}

/// Decides the year's withdrawals. The RRIF minimums come out first; the
/// goal's strategy only allocates whatever is still needed after them.
pub fn determine_optimal_withdrawals(
    data: &RetirementData,
    withdrawal_needed: f64,
    goal: OptimizationGoal,
    provincial: &[TaxBracket],
) -> WithdrawalAmounts {
    let mandatory_rsp = if data.is_rrif {
        rrif_minimum_withdrawal(data.age, data.balances.rsp)
    } else {
        0.0
    };
    let mandatory_spouse_rsp = match data.spouse_age {
        Some(spouse_age) if data.is_spouse_rrif => {
            rrif_minimum_withdrawal(spouse_age, data.balances.spouse_rsp)
        }
        _ => 0.0,
    };

    let remaining = withdrawal_needed - (mandatory_rsp + mandatory_spouse_rsp);
    if remaining <= 0.0 {
        return WithdrawalAmounts::mandatory_only(mandatory_rsp, mandatory_spouse_rsp);
    }

    let amounts = determine_withdrawals(
        goal,
        data,
        remaining,
        mandatory_rsp,
        mandatory_spouse_rsp,
        provincial,
    );
    debug!(
        goal = %goal,
        age = data.age,
        remaining_needed = remaining,
        withdrawn = amounts.total(),
        "strategy allocated withdrawals"
    );
    amounts
}

/// The common strategy contract. `remaining_needed` already excludes the
/// mandatory RRIF amounts, which come back summed into the RSP fields.
pub fn determine_withdrawals(
    goal: OptimizationGoal,
    data: &RetirementData,
    remaining_needed: f64,
    mandatory_rsp: f64,
    mandatory_spouse_rsp: f64,
    provincial: &[TaxBracket],
) -> WithdrawalAmounts {
    let amounts = match goal {
        OptimizationGoal::LowestTax => tax_efficient::withdrawals(
            data,
            remaining_needed,
            mandatory_rsp,
            mandatory_spouse_rsp,
            provincial,
        ),
        OptimizationGoal::MaxEndWorth => {
            max_end_worth::withdrawals(data, remaining_needed, mandatory_rsp, mandatory_spouse_rsp)
        }
        OptimizationGoal::SpendItAll => spend_it_all::withdrawals(
            data,
            remaining_needed,
            mandatory_rsp,
            mandatory_spouse_rsp,
            provincial,
        ),
        OptimizationGoal::Balanced => balanced::withdrawals(
            data,
            remaining_needed,
            mandatory_rsp,
            mandatory_spouse_rsp,
            provincial,
        ),
    };
    clamp_to_balances(amounts, &data.balances)
}

fn clamp_to_balances(amounts: WithdrawalAmounts, balances: &AccountBalances) -> WithdrawalAmounts {
    let clamp = |amount: f64, balance: f64| amount.min(balance).max(0.0);
    WithdrawalAmounts {
        rsp: clamp(amounts.rsp, balances.rsp),
        tfsa: clamp(amounts.tfsa, balances.tfsa),
        other: clamp(amounts.other, balances.other),
        spouse_rsp: clamp(amounts.spouse_rsp, balances.spouse_rsp),
        spouse_tfsa: clamp(amounts.spouse_tfsa, balances.spouse_tfsa),
        spouse_other: clamp(amounts.spouse_other, balances.spouse_other),
    }
}

/// Takes up to `available` from `still_needed`, returning the amount taken.
fn draw(still_needed: &mut f64, available: f64) -> f64 {
    if *still_needed <= 0.0 {
        return 0.0;
    }
    let amount = available.min(*still_needed).max(0.0);
    *still_needed -= amount;
    amount
}

/// Ranked draw: ascending rate, first listed wins ties.
fn draw_in_rate_order(
    amounts: &mut WithdrawalAmounts,
    still_needed: &mut f64,
    mut options: Vec<(Account, f64, f64)>,
) {
    options.retain(|(_, _, available)| *available > 0.0);
    options.sort_by(|a, b| a.1.total_cmp(&b.1));
    for (account, _, available) in options {
        if *still_needed <= 0.0 {
            break;
        }
        let amount = draw(still_needed, available);
        amounts.add(account, amount);
    }
}
