use tracing::debug;

use super::benefits::{cpp_income_for, extra_income, oas_income_for};
use super::rrif::{is_rrif_age, should_convert_rrsp_to_rrif};
use super::strategy::determine_optimal_withdrawals;
use super::tax::{
    TAX_CONSTANTS, TaxBracket, capital_gains_tax, combined_income_tax, max_rrsp_contribution,
    oas_clawback,
};
use super::types::{
    AccountBalances, BenefitStartAges, ContributionRoom, OptimizationGoal, RetirementData,
    UserInput, WithdrawalAmounts, YearlyPlan,
};

#[derive(Debug, Clone, Copy)]
pub struct YearContext<'a> {
    pub input: &'a UserInput,
    pub goal: OptimizationGoal,
    pub provincial: &'a [TaxBracket],
    pub benefit_ages: BenefitStartAges,
    pub start_year: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PreviousIncome {
    pub primary: f64,
    pub spouse: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearState {
    pub balances: AccountBalances,
    pub room: ContributionRoom,
    pub previous_income: PreviousIncome,
    pub is_first_year: bool,
}

impl YearState {
    pub fn initial(input: &UserInput) -> Self {
        Self {
            balances: AccountBalances::from_input(input),
            room: ContributionRoom::from_input(input),
            previous_income: PreviousIncome {
                primary: input.employment_income,
                spouse: input.spouse().map(|s| s.employment_income).unwrap_or(0.0),
            },
            is_first_year: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaxSummary {
    pub income_tax: f64,
    pub capital_gains_tax: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearOutcome {
    pub plan: YearlyPlan,
    pub next: YearState,
    pub tax: TaxSummary,
}

#[derive(Debug, Clone, Copy, Default)]
struct PersonIncome {
    employment: f64,
    cpp: f64,
    oas: f64,
    extra: f64,
}

impl PersonIncome {
    fn total(&self) -> f64 {
        self.employment + self.cpp + self.oas + self.extra
    }

    /// Clawback is assessed on income before any withdrawal.
    fn after_clawback(mut self) -> Self {
        let clawback = oas_clawback(self.total());
        self.oas = (self.oas - clawback).max(0.0);
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Contributions {
    rsp: f64,
    tfsa: f64,
    other: f64,
}

fn already_collecting(is_collecting: bool, current: Option<f64>) -> Option<f64> {
    if is_collecting { current } else { None }
}

fn grow(balance: f64, rate_pct: f64) -> f64 {
    balance * (1.0 + rate_pct / 100.0)
}

fn roll_room_forward(ctx: &YearContext<'_>, state: &YearState) -> ContributionRoom {
    let mut room = state.room;
    let has_spouse = ctx.input.spouse().is_some();

    room.tfsa_room += room.tfsa_withdrawals_last_year + TAX_CONSTANTS.tfsa_annual_room;
    room.tfsa_withdrawals_last_year = 0.0;
    if has_spouse {
        room.spouse_tfsa_room +=
            room.spouse_tfsa_withdrawals_last_year + TAX_CONSTANTS.tfsa_annual_room;
        room.spouse_tfsa_withdrawals_last_year = 0.0;
    }

    // Starting room already reflects last year's income.
    if !state.is_first_year {
        if state.previous_income.primary > 0.0 {
            room.rrsp_room += max_rrsp_contribution(state.previous_income.primary);
        }
        if has_spouse && state.previous_income.spouse > 0.0 {
            room.spouse_rrsp_room += max_rrsp_contribution(state.previous_income.spouse);
        }
    }
    room
}

/// Surplus goes to RRSP room, then TFSA room, then the taxable account.
fn contribute_surplus(
    surplus: f64,
    room: &mut ContributionRoom,
    balances: &mut AccountBalances,
) -> Contributions {
    let mut left = surplus.max(0.0);

    let rsp = left.min(room.rrsp_room.max(0.0));
    room.rrsp_room -= rsp;
    balances.rsp += rsp;
    left -= rsp;

    let tfsa = left.min(room.tfsa_room.max(0.0));
    room.tfsa_room -= tfsa;
    balances.tfsa += tfsa;
    left -= tfsa;

    balances.other += left;
    Contributions {
        rsp,
        tfsa,
        other: left,
    }
}

pub fn simulate_year(ctx: &YearContext<'_>, age: u32, state: &YearState) -> YearOutcome {
    let input = ctx.input;
    let spouse = input.spouse();
    let ages = ctx.benefit_ages;

    let mut room = roll_room_forward(ctx, state);
    let mut balances = state.balances;

    let spouse_age = spouse.map(|s| s.age + age.saturating_sub(input.age));
    let is_retired = age >= input.retirement_age;
    let spouse_is_retired = match (spouse, spouse_age) {
        (Some(s), Some(spouse_age)) => spouse_age >= s.retirement_age,
        _ => false,
    };

    let primary = PersonIncome {
        employment: if is_retired { 0.0 } else { input.employment_income },
        cpp: cpp_income_for(
            age,
            ages.cpp_start_age,
            input.expected_cpp,
            already_collecting(input.is_collecting_cpp, input.current_cpp),
        ),
        oas: oas_income_for(
            age,
            ages.oas_start_age,
            input.expected_oas,
            already_collecting(input.is_collecting_oas, input.current_oas),
        ),
        extra: extra_income(
            age,
            input.age,
            ctx.start_year,
            input.inflation_rate,
            &input.extra_income_streams,
        ),
    }
    .after_clawback();

    let spouse_income = match (spouse, spouse_age) {
        (Some(s), Some(spouse_age)) => PersonIncome {
            employment: if spouse_is_retired { 0.0 } else { s.employment_income },
            cpp: cpp_income_for(
                spouse_age,
                ages.spouse_cpp(),
                s.expected_cpp,
                already_collecting(s.is_collecting_cpp, s.current_cpp),
            ),
            oas: oas_income_for(
                spouse_age,
                ages.spouse_oas(),
                s.expected_oas,
                already_collecting(s.is_collecting_oas, s.current_oas),
            ),
            extra: extra_income(
                spouse_age,
                s.age,
                ctx.start_year,
                input.inflation_rate,
                &s.extra_income_streams,
            ),
        }
        .after_clawback(),
        _ => PersonIncome::default(),
    };

    let total_income = primary.total();
    let spouse_total_income = spouse_income.total();
    let combined_income = total_income + spouse_total_income;

    let inflation_factor =
        (1.0 + input.inflation_rate / 100.0).powi(age.saturating_sub(input.age) as i32);
    let base_expenses = if is_retired {
        input.retirement_annual_expenses
    } else {
        input.current_annual_expenses
    };
    let expenses = base_expenses * inflation_factor;

    let contributions = if !is_retired && combined_income > expenses {
        contribute_surplus(combined_income - expenses, &mut room, &mut balances)
    } else {
        Contributions::default()
    };
    let withdrawal_needed = (expenses - combined_income).max(0.0);

    let retirement_data = RetirementData {
        age,
        is_rrif: is_rrif_age(age),
        balances,
        taxable_income: total_income,
        spouse_age,
        is_spouse_rrif: spouse_age.is_some_and(is_rrif_age),
        spouse_taxable_income: spouse.map(|_| spouse_total_income),
    };
    let withdrawals = determine_optimal_withdrawals(
        &retirement_data,
        withdrawal_needed,
        ctx.goal,
        ctx.provincial,
    );

    room.tfsa_withdrawals_last_year = withdrawals.tfsa;
    if spouse.is_some() {
        room.spouse_tfsa_withdrawals_last_year = withdrawals.spouse_tfsa;
    }

    let primary_taxable = total_income + withdrawals.rsp;
    let income_tax = combined_income_tax(primary_taxable, ctx.provincial);
    let cg_tax = capital_gains_tax(withdrawals.other, primary_taxable, &input.province);
    let (spouse_income_tax, spouse_cg_tax) = if spouse.is_some() {
        let spouse_taxable = spouse_total_income + withdrawals.spouse_rsp;
        (
            combined_income_tax(spouse_taxable, ctx.provincial),
            capital_gains_tax(withdrawals.spouse_other, spouse_taxable, &input.province),
        )
    } else {
        (0.0, 0.0)
    };
    let total_tax = income_tax + cg_tax + spouse_income_tax + spouse_cg_tax;

    let balances = grow_after_withdrawals(input, balances, &withdrawals);

    let withdrawn = withdrawals.total();
    let fun_money = combined_income + withdrawn - expenses - total_tax;

    let plan = YearlyPlan {
        age,
        year: ctx.start_year + age.saturating_sub(input.age) as i32,
        is_retired,
        employment_income: primary.employment,
        cpp_income: primary.cpp,
        oas_income: primary.oas,
        extra_income: primary.extra,
        rsp_withdrawal: withdrawals.rsp,
        tfsa_withdrawal: withdrawals.tfsa,
        other_investments_withdrawal: withdrawals.other,
        rrif_converted: should_convert_rrsp_to_rrif(age),
        spouse_age,
        spouse_is_retired,
        spouse_employment_income: spouse_income.employment,
        spouse_cpp_income: spouse_income.cpp,
        spouse_oas_income: spouse_income.oas,
        spouse_extra_income: spouse_income.extra,
        spouse_rsp_withdrawal: withdrawals.spouse_rsp,
        spouse_tfsa_withdrawal: withdrawals.spouse_tfsa,
        spouse_other_investments_withdrawal: withdrawals.spouse_other,
        spouse_rrif_converted: spouse_age.is_some_and(should_convert_rrsp_to_rrif),
        total_income: combined_income + withdrawn,
        expenses,
        fun_money: (fun_money > 0.0).then_some(fun_money),
        income_tax,
        spouse_income_tax,
        capital_gains_tax: cg_tax,
        spouse_capital_gains_tax: spouse_cg_tax,
        total_tax,
        rsp_contribution: contributions.rsp,
        tfsa_contribution: contributions.tfsa,
        other_investments_contribution: contributions.other,
        spouse_rsp_contribution: 0.0,
        spouse_tfsa_contribution: 0.0,
        spouse_other_investments_contribution: 0.0,
        rsp_balance: balances.rsp,
        tfsa_balance: balances.tfsa,
        other_investments_balance: balances.other,
        spouse_rsp_balance: balances.spouse_rsp,
        spouse_tfsa_balance: balances.spouse_tfsa,
        spouse_other_investments_balance: balances.spouse_other,
        total_net_worth: balances.total(),
    };

    debug!(
        age,
        retired = is_retired,
        expenses,
        total_tax,
        net_worth = plan.total_net_worth,
        "simulated year"
    );

    YearOutcome {
        plan,
        next: YearState {
            balances,
            room,
            previous_income: PreviousIncome {
                primary: primary.employment,
                spouse: spouse_income.employment,
            },
            is_first_year: false,
        },
        tax: TaxSummary {
            income_tax: income_tax + spouse_income_tax,
            capital_gains_tax: cg_tax + spouse_cg_tax,
        },
    }
}

fn grow_after_withdrawals(
    input: &UserInput,
    balances: AccountBalances,
    withdrawals: &WithdrawalAmounts,
) -> AccountBalances {
    AccountBalances {
        rsp: grow(balances.rsp - withdrawals.rsp, input.rsp_growth_rate),
        tfsa: grow(balances.tfsa - withdrawals.tfsa, input.tfsa_growth_rate),
        other: grow(balances.other - withdrawals.other, input.other_investments_growth_rate),
        spouse_rsp: grow(balances.spouse_rsp - withdrawals.spouse_rsp, input.rsp_growth_rate),
        spouse_tfsa: grow(balances.spouse_tfsa - withdrawals.spouse_tfsa, input.tfsa_growth_rate),
        spouse_other: grow(
            balances.spouse_other - withdrawals.spouse_other,
            input.other_investments_growth_rate,
        ),
    }
}
