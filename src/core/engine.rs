use serde::Serialize;
use tracing::debug;

use super::solver::find_optimal_benefit_timing;
use super::tax::provincial_brackets;
use super::types::{
    AccountBalances, BenefitStartAges, OptimizationGoal, PlanOptions, PlanSummary,
    RetirementPlan, UserInput, YearlyPlan,
};
use super::yearly::{YearContext, YearState, simulate_year};

// Only `shortfall_years` tolerates this gap; the success flag is strict.
const SHORTFALL_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedPlan {
    pub goal: OptimizationGoal,
    pub timing: BenefitStartAges,
    pub plan: RetirementPlan,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyComparison {
    pub goal: OptimizationGoal,
    pub label: &'static str,
    pub timing: BenefitStartAges,
    pub summary: PlanSummary,
}

#[derive(Debug, Default)]
struct SummaryAccumulator {
    years_of_retirement: u32,
    income_tax: f64,
    capital_gains_tax: f64,
    fun_money: f64,
    income_below_expenses: bool,
    shortfall_years: u32,
    first_shortfall_age: Option<u32>,
}

impl SummaryAccumulator {
    fn record(&mut self, year: &YearlyPlan, income_tax: f64, capital_gains_tax: f64) {
        self.income_tax += income_tax;
        self.capital_gains_tax += capital_gains_tax;
        if !year.is_retired {
            return;
        }
        self.years_of_retirement += 1;
        self.fun_money += year.fun_money.unwrap_or(0.0);
        if year.total_income < year.expenses {
            self.income_below_expenses = true;
        }
        if year.total_income < year.expenses - SHORTFALL_TOLERANCE {
            self.shortfall_years += 1;
            self.first_shortfall_age.get_or_insert(year.age);
        }
    }

    fn finish(self, final_net_worth: f64) -> PlanSummary {
        let annual_fun_money = (self.years_of_retirement > 0)
            .then(|| self.fun_money / self.years_of_retirement as f64);
        PlanSummary {
            years_of_retirement: self.years_of_retirement,
            total_income_tax_paid: self.income_tax,
            total_capital_gains_tax_paid: self.capital_gains_tax,
            final_net_worth,
            successful_retirement: !self.income_below_expenses,
            annual_fun_money,
            total_lifetime_fun_money: (self.fun_money > 0.0).then_some(self.fun_money),
            shortfall_years: self.shortfall_years,
            first_shortfall_age: self.first_shortfall_age,
        }
    }
}

pub fn generate_retirement_plan(input: &UserInput, options: &PlanOptions) -> RetirementPlan {
    let ctx = YearContext {
        input,
        goal: options.goal,
        provincial: provincial_brackets(&input.province),
        benefit_ages: options.benefit_ages,
        start_year: options.start_year,
    };

    let mut years = Vec::with_capacity(input.years_to_simulate() as usize);
    let mut totals = SummaryAccumulator::default();
    let mut state = YearState::initial(input);
    for age in input.age..=input.life_expectancy {
        let outcome = simulate_year(&ctx, age, &state);
        totals.record(
            &outcome.plan,
            outcome.tax.income_tax,
            outcome.tax.capital_gains_tax,
        );
        state = outcome.next;
        years.push(outcome.plan);
    }

    let final_net_worth = years
        .last()
        .map(|year| year.total_net_worth)
        .unwrap_or_else(|| AccountBalances::from_input(input).total());
    let summary = totals.finish(final_net_worth);
    debug!(
        goal = %options.goal,
        years = years.len(),
        successful = summary.successful_retirement,
        final_net_worth,
        "generated retirement plan"
    );

    RetirementPlan { years, summary }
}

pub fn generate_optimized_plan(
    input: &UserInput,
    goal: OptimizationGoal,
    start_year: i32,
) -> OptimizedPlan {
    let timing = find_optimal_benefit_timing(input, goal, start_year).best;
    let plan = generate_retirement_plan(
        input,
        &PlanOptions::new(goal, start_year).with_benefit_ages(timing),
    );
    OptimizedPlan { goal, timing, plan }
}

pub fn compare_strategies(input: &UserInput, start_year: i32) -> Vec<StrategyComparison> {
    OptimizationGoal::ALL
        .iter()
        .map(|&goal| {
            let optimized = generate_optimized_plan(input, goal, start_year);
            StrategyComparison {
                goal,
                label: goal.label(),
                timing: optimized.timing,
                summary: optimized.plan.summary,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CppSchedule, OasSchedule, SpouseInfo};
    use proptest::prelude::{any, prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_input() -> UserInput {
        UserInput {
            age: 60,
            retirement_age: 65,
            life_expectancy: 90,
            province: "ON".to_string(),
            current_rsp: 400_000.0,
            current_tfsa: 90_000.0,
            current_other_investments: 150_000.0,
            rrsp_room: 10_000.0,
            tfsa_room: 5_000.0,
            employment_income: 85_000.0,
            expected_cpp: CppSchedule {
                at60: 9_000.0,
                at65: 13_000.0,
                at70: 18_000.0,
            },
            expected_oas: OasSchedule {
                at65: 8_700.0,
                at70: 11_800.0,
            },
            current_annual_expenses: 55_000.0,
            retirement_annual_expenses: 50_000.0,
            inflation_rate: 2.0,
            rsp_growth_rate: 5.0,
            tfsa_growth_rate: 5.0,
            other_investments_growth_rate: 4.0,
            ..UserInput::default()
        }
    }

    fn plan_for(input: &UserInput, goal: OptimizationGoal) -> RetirementPlan {
        generate_retirement_plan(input, &PlanOptions::new(goal, 2025))
    }

    #[test]
    fn plan_covers_every_age_through_life_expectancy() {
        let plan = plan_for(&sample_input(), OptimizationGoal::Balanced);
        assert_eq!(plan.years.len(), 31);
        assert_eq!(plan.years.first().map(|y| y.age), Some(60));
        assert_eq!(plan.years.last().map(|y| y.age), Some(90));
        assert_eq!(plan.years.last().map(|y| y.year), Some(2055));
        assert_eq!(plan.summary.years_of_retirement, 26);
    }

    #[test]
    fn summary_totals_match_the_yearly_rows() {
        let plan = plan_for(&sample_input(), OptimizationGoal::LowestTax);
        let income_tax: f64 = plan
            .years
            .iter()
            .map(|y| y.income_tax + y.spouse_income_tax)
            .sum();
        let cg_tax: f64 = plan
            .years
            .iter()
            .map(|y| y.capital_gains_tax + y.spouse_capital_gains_tax)
            .sum();
        assert_approx(plan.summary.total_income_tax_paid, income_tax);
        assert_approx(plan.summary.total_capital_gains_tax_paid, cg_tax);
        assert_approx(
            plan.summary.final_net_worth,
            plan.years.last().map(|y| y.total_net_worth).unwrap_or(0.0),
        );
    }

    fn retired_year(age: u32, total_income: f64, expenses: f64) -> YearlyPlan {
        let mut year = plan_for(&sample_input(), OptimizationGoal::Balanced).years[10].clone();
        year.age = age;
        year.is_retired = true;
        year.total_income = total_income;
        year.expenses = expenses;
        year.fun_money = None;
        year
    }

    #[test]
    fn success_flag_is_strict_while_shortfall_count_tolerates_rounding() {
        let mut totals = SummaryAccumulator::default();
        totals.record(&retired_year(70, 49_999.999, 50_000.0), 0.0, 0.0);
        totals.record(&retired_year(71, 50_000.0, 50_000.0), 0.0, 0.0);
        let summary = totals.finish(0.0);
        assert!(!summary.successful_retirement);
        assert_eq!(summary.shortfall_years, 0);
        assert_eq!(summary.first_shortfall_age, None);

        let mut totals = SummaryAccumulator::default();
        totals.record(&retired_year(70, 50_000.0, 50_000.0), 0.0, 0.0);
        totals.record(&retired_year(71, 40_000.0, 50_000.0), 0.0, 0.0);
        let summary = totals.finish(0.0);
        assert!(!summary.successful_retirement);
        assert_eq!(summary.shortfall_years, 1);
        assert_eq!(summary.first_shortfall_age, Some(71));
    }

    #[test]
    fn benefits_above_expenses_succeed_without_withdrawals() {
        let mut input = sample_input();
        input.age = 70;
        input.retirement_age = 65;
        input.life_expectancy = 80;
        input.inflation_rate = 0.0;
        input.retirement_annual_expenses = 20_000.0;
        let plan = plan_for(&input, OptimizationGoal::Balanced);
        assert!(plan.summary.successful_retirement);
        assert!(plan.years.iter().all(|y| y.total_income >= y.expenses));
    }

    #[test]
    fn well_funded_household_succeeds() {
        let plan = plan_for(&sample_input(), OptimizationGoal::Balanced);
        assert_eq!(plan.summary.shortfall_years, 0);
        assert_eq!(plan.summary.first_shortfall_age, None);
        assert!(plan.summary.annual_fun_money.is_some());
    }

    #[test]
    fn empty_accounts_report_first_shortfall_age() {
        let input = UserInput {
            age: 64,
            retirement_age: 65,
            life_expectancy: 70,
            province: "ON".to_string(),
            current_annual_expenses: 40_000.0,
            retirement_annual_expenses: 40_000.0,
            employment_income: 40_000.0,
            ..UserInput::default()
        };
        let plan = plan_for(&input, OptimizationGoal::Balanced);
        assert!(!plan.summary.successful_retirement);
        assert_eq!(plan.summary.first_shortfall_age, Some(65));
        assert_eq!(plan.summary.shortfall_years, 6);
        assert_eq!(plan.summary.annual_fun_money, Some(0.0));
        assert_eq!(plan.summary.total_lifetime_fun_money, None);
    }

    #[test]
    fn working_years_do_not_count_towards_fun_money() {
        let input = UserInput {
            age: 40,
            retirement_age: 80,
            life_expectancy: 45,
            province: "BC".to_string(),
            employment_income: 120_000.0,
            current_annual_expenses: 50_000.0,
            ..UserInput::default()
        };
        let plan = plan_for(&input, OptimizationGoal::MaxEndWorth);
        assert_eq!(plan.summary.years_of_retirement, 0);
        assert_eq!(plan.summary.annual_fun_money, None);
        assert!(plan.summary.successful_retirement);
        assert!(plan.summary.final_net_worth > 0.0);
    }

    #[test]
    fn life_expectancy_equal_to_age_gives_one_year() {
        let mut input = sample_input();
        input.life_expectancy = input.age;
        let plan = plan_for(&input, OptimizationGoal::SpendItAll);
        assert_eq!(plan.years.len(), 1);
    }

    #[test]
    fn compare_strategies_reports_every_goal_in_order() {
        let comparisons = compare_strategies(&sample_input(), 2025);
        let goals: Vec<OptimizationGoal> = comparisons.iter().map(|c| c.goal).collect();
        assert_eq!(goals, OptimizationGoal::ALL.to_vec());
        let balanced = &comparisons[3];
        assert_eq!(balanced.timing, BenefitStartAges::standard(false));
    }

    #[test]
    fn optimized_plan_uses_the_chosen_timing() {
        let input = sample_input();
        let optimized = generate_optimized_plan(&input, OptimizationGoal::MaxEndWorth, 2025);
        let replay = generate_retirement_plan(
            &input,
            &PlanOptions::new(OptimizationGoal::MaxEndWorth, 2025)
                .with_benefit_ages(optimized.timing),
        );
        assert_eq!(optimized.plan, replay);
    }

    #[test]
    fn spouse_balances_grow_when_present() {
        let mut input = sample_input();
        input.has_spouse = true;
        input.spouse_info = Some(SpouseInfo {
            age: 58,
            retirement_age: 63,
            life_expectancy: 92,
            current_rsp: 100_000.0,
            current_tfsa: 20_000.0,
            employment_income: 30_000.0,
            ..SpouseInfo::default()
        });
        let plan = plan_for(&input, OptimizationGoal::Balanced);
        let first = &plan.years[0];
        assert_eq!(first.spouse_age, Some(58));
        assert_approx(first.spouse_rsp_balance, 105_000.0);
        assert_approx(first.spouse_tfsa_balance, 21_000.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(24))]

        #[test]
        fn prop_plan_rows_are_consistent_and_balances_non_negative(
            age in 30u32..80,
            work_span in 0u32..15,
            life_span in 0u32..30,
            (rsp, tfsa, other) in (0u32..800_000, 0u32..200_000, 0u32..400_000),
            income in 0u32..150_000,
            expenses in 10_000u32..90_000,
            growth_bp in -300i32..900,
            goal_idx in 0usize..4,
            has_spouse in any::<bool>(),
            (spouse_age_gap, spouse_income) in (-8i32..9, 0u32..90_000),
            (spouse_rsp, spouse_tfsa, spouse_other) in
                (0u32..500_000, 0u32..150_000, 0u32..300_000)
        ) {
            let spouse_age = (age as i32 + spouse_age_gap).max(18) as u32;
            let input = UserInput {
                age,
                retirement_age: age + work_span,
                life_expectancy: age + life_span,
                province: "QC".to_string(),
                has_spouse,
                spouse_info: Some(SpouseInfo {
                    age: spouse_age,
                    retirement_age: spouse_age + work_span,
                    life_expectancy: spouse_age + life_span,
                    current_rsp: spouse_rsp as f64,
                    current_tfsa: spouse_tfsa as f64,
                    current_other_investments: spouse_other as f64,
                    employment_income: spouse_income as f64,
                    expected_cpp: CppSchedule { at60: 5_000.0, at65: 7_500.0, at70: 10_500.0 },
                    expected_oas: OasSchedule { at65: 8_700.0, at70: 11_800.0 },
                    ..SpouseInfo::default()
                }),
                current_rsp: rsp as f64,
                current_tfsa: tfsa as f64,
                current_other_investments: other as f64,
                employment_income: income as f64,
                current_annual_expenses: expenses as f64,
                retirement_annual_expenses: expenses as f64,
                inflation_rate: 2.0,
                rsp_growth_rate: growth_bp as f64 / 100.0,
                tfsa_growth_rate: growth_bp as f64 / 100.0,
                other_investments_growth_rate: growth_bp as f64 / 100.0,
                expected_cpp: CppSchedule { at60: 8_000.0, at65: 12_000.0, at70: 17_000.0 },
                expected_oas: OasSchedule { at65: 8_700.0, at70: 11_800.0 },
                ..UserInput::default()
            };
            let goal = OptimizationGoal::ALL[goal_idx];
            let plan = generate_retirement_plan(&input, &PlanOptions::new(goal, 2025));

            prop_assert_eq!(plan.years.len() as u32, life_span + 1);
            for year in &plan.years {
                prop_assert!(year.rsp_balance >= -EPS);
                prop_assert!(year.tfsa_balance >= -EPS);
                prop_assert!(year.other_investments_balance >= -EPS);
                prop_assert!(year.spouse_rsp_balance >= -EPS);
                prop_assert!(year.spouse_tfsa_balance >= -EPS);
                prop_assert!(year.spouse_other_investments_balance >= -EPS);
                prop_assert_eq!(year.spouse_age.is_some(), has_spouse);
                prop_assert!(year.total_tax >= 0.0);
                prop_assert!(year.fun_money.is_none_or(|f| f > 0.0));
                let sum = year.rsp_balance
                    + year.tfsa_balance
                    + year.other_investments_balance
                    + year.spouse_rsp_balance
                    + year.spouse_tfsa_balance
                    + year.spouse_other_investments_balance;
                prop_assert!((year.total_net_worth - sum).abs() <= 1e-3);
            }
            if plan.summary.shortfall_years > 0 {
                prop_assert!(!plan.summary.successful_retirement);
            }
        }
    }
}
