pub mod benefits;
mod engine;
pub mod rrif;
mod solver;
pub mod strategy;
pub mod tax;
mod types;
mod validation;
pub mod yearly;

pub use engine::{
    OptimizedPlan, StrategyComparison, compare_strategies, generate_optimized_plan,
    generate_retirement_plan,
};
pub use solver::{
    CPP_CLAIM_AGES, OAS_CLAIM_AGES, TimingCandidate, TimingSearch, find_optimal_benefit_timing,
    timing_grid,
};
pub use strategy::{TimingObjective, determine_optimal_withdrawals, determine_withdrawals};
pub use types::{
    AccountBalances, BenefitStartAges, ContributionRoom, CppSchedule, ExtraIncomeStream,
    OasSchedule, OptimizationGoal, PlanOptions, PlanSummary, RetirementData, RetirementPlan,
    SpouseInfo, UserInput, WithdrawalAmounts, YearlyPlan,
};
pub use validation::{MAX_AGE, PlanError, validate_start_year, validate_user_input};
