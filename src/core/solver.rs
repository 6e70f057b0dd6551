use serde::Serialize;
use tracing::info;

use super::engine::generate_retirement_plan;
use super::strategy::TimingObjective;
use super::types::{BenefitStartAges, OptimizationGoal, PlanOptions, PlanSummary, UserInput};

pub const CPP_CLAIM_AGES: [u32; 3] = [60, 65, 70];
pub const OAS_CLAIM_AGES: [u32; 2] = [65, 70];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingCandidate {
    pub ages: BenefitStartAges,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingSearch {
    pub goal: OptimizationGoal,
    pub best: BenefitStartAges,
    // Empty when the goal claims at the standard ages.
    pub candidates: Vec<TimingCandidate>,
}

// Higher is better.
fn score(objective: TimingObjective, summary: &PlanSummary) -> f64 {
    match objective {
        TimingObjective::MinimizeLifetimeTax => -summary.total_tax_paid(),
        TimingObjective::MaximizeFinalNetWorth => summary.final_net_worth,
        TimingObjective::MaximizeAnnualFunMoney => summary.annual_fun_money.unwrap_or(0.0),
    }
}

pub fn timing_grid(has_spouse: bool) -> Vec<BenefitStartAges> {
    let spouse_cpp: Vec<Option<u32>> = if has_spouse {
        CPP_CLAIM_AGES.iter().copied().map(Some).collect()
    } else {
        vec![None]
    };
    let spouse_oas: Vec<Option<u32>> = if has_spouse {
        OAS_CLAIM_AGES.iter().copied().map(Some).collect()
    } else {
        vec![None]
    };

    let mut grid = Vec::with_capacity(
        CPP_CLAIM_AGES.len() * OAS_CLAIM_AGES.len() * spouse_cpp.len() * spouse_oas.len(),
    );
    for cpp_start_age in CPP_CLAIM_AGES {
        for oas_start_age in OAS_CLAIM_AGES {
            for &spouse_cpp_start_age in &spouse_cpp {
                for &spouse_oas_start_age in &spouse_oas {
                    grid.push(BenefitStartAges {
                        cpp_start_age,
                        oas_start_age,
                        spouse_cpp_start_age,
                        spouse_oas_start_age,
                    });
                }
            }
        }
    }
    grid
}

pub fn find_optimal_benefit_timing(
    input: &UserInput,
    goal: OptimizationGoal,
    start_year: i32,
) -> TimingSearch {
    let has_spouse = input.spouse().is_some();
    let Some(objective) = goal.timing_objective() else {
        return TimingSearch {
            goal,
            best: BenefitStartAges::standard(has_spouse),
            candidates: Vec::new(),
        };
    };

    let mut candidates = Vec::new();
    let mut best: Option<TimingCandidate> = None;
    for ages in timing_grid(has_spouse) {
        let options = PlanOptions::new(goal, start_year).with_benefit_ages(ages);
        let plan = generate_retirement_plan(input, &options);
        let candidate = TimingCandidate {
            ages,
            score: score(objective, &plan.summary),
        };
        // First combination wins ties.
        if best.is_none_or(|current| candidate.score > current.score) {
            best = Some(candidate);
        }
        candidates.push(candidate);
    }

    let (best, best_score) = best
        .map(|candidate| (candidate.ages, candidate.score))
        .unwrap_or((BenefitStartAges::standard(has_spouse), 0.0));
    info!(
        goal = %goal,
        score = best_score,
        cpp = best.cpp_start_age,
        oas = best.oas_start_age,
        spouse_cpp = ?best.spouse_cpp_start_age,
        spouse_oas = ?best.spouse_oas_start_age,
        evaluated = candidates.len(),
        "chose benefit start ages"
    );

    TimingSearch {
        goal,
        best,
        candidates,
    }
}
