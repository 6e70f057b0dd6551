use thiserror::Error;

use super::types::{CppSchedule, ExtraIncomeStream, OasSchedule, SpouseInfo, UserInput};

pub const MAX_AGE: u32 = 120;
pub const MIN_START_YEAR: i32 = 1900;
pub const MAX_START_YEAR: i32 = 2200;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    #[error("{field} {reason}")]
    InvalidInput { field: String, reason: String },
    #[error(
        "unknown optimization goal '{0}' (expected lowest-tax, max-end-worth, spend-it-all or balanced)"
    )]
    UnknownGoal(String),
}

impl PlanError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PlanError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Rejects households the projection cannot represent. The engine assumes
/// its input already passed through here.
pub fn validate_user_input(input: &UserInput) -> Result<(), PlanError> {
    plausible_age("age", input.age)?;
    plausible_age("retirementAge", input.retirement_age)?;
    plausible_age("lifeExpectancy", input.life_expectancy)?;
    if input.life_expectancy < input.age {
        return Err(PlanError::invalid("lifeExpectancy", "must be >= age"));
    }

    non_negative("currentRsp", input.current_rsp)?;
    non_negative("currentTfsa", input.current_tfsa)?;
    non_negative("currentOtherInvestments", input.current_other_investments)?;
    non_negative("rrspRoom", input.rrsp_room)?;
    non_negative("tfsaRoom", input.tfsa_room)?;
    non_negative("employmentIncome", input.employment_income)?;
    non_negative("currentAnnualExpenses", input.current_annual_expenses)?;
    non_negative("retirementAnnualExpenses", input.retirement_annual_expenses)?;
    validate_schedules("", input.expected_cpp, input.expected_oas)?;
    optional_non_negative("currentCpp", input.current_cpp)?;
    optional_non_negative("currentOas", input.current_oas)?;

    rate("inflationRate", input.inflation_rate)?;
    rate("rspGrowthRate", input.rsp_growth_rate)?;
    rate("tfsaGrowthRate", input.tfsa_growth_rate)?;
    rate("otherInvestmentsGrowthRate", input.other_investments_growth_rate)?;

    validate_streams("extraIncomeStreams", &input.extra_income_streams)?;

    if let Some(spouse) = input.spouse() {
        validate_spouse(spouse)?;
    }
    Ok(())
}

fn validate_spouse(spouse: &SpouseInfo) -> Result<(), PlanError> {
    plausible_age("spouseInfo.age", spouse.age)?;
    plausible_age("spouseInfo.retirementAge", spouse.retirement_age)?;
    plausible_age("spouseInfo.lifeExpectancy", spouse.life_expectancy)?;
    if spouse.life_expectancy < spouse.age {
        return Err(PlanError::invalid(
            "spouseInfo.lifeExpectancy",
            "must be >= spouseInfo.age",
        ));
    }
    non_negative("spouseInfo.currentRsp", spouse.current_rsp)?;
    non_negative("spouseInfo.currentTfsa", spouse.current_tfsa)?;
    non_negative(
        "spouseInfo.currentOtherInvestments",
        spouse.current_other_investments,
    )?;
    non_negative("spouseInfo.rrspRoom", spouse.rrsp_room)?;
    non_negative("spouseInfo.tfsaRoom", spouse.tfsa_room)?;
    non_negative("spouseInfo.employmentIncome", spouse.employment_income)?;
    validate_schedules("spouseInfo.", spouse.expected_cpp, spouse.expected_oas)?;
    optional_non_negative("spouseInfo.currentCpp", spouse.current_cpp)?;
    optional_non_negative("spouseInfo.currentOas", spouse.current_oas)?;
    validate_streams(
        "spouseInfo.extraIncomeStreams",
        &spouse.extra_income_streams,
    )
}

fn validate_schedules(prefix: &str, cpp: CppSchedule, oas: OasSchedule) -> Result<(), PlanError> {
    non_negative(&format!("{prefix}expectedCpp.at60"), cpp.at60)?;
    non_negative(&format!("{prefix}expectedCpp.at65"), cpp.at65)?;
    non_negative(&format!("{prefix}expectedCpp.at70"), cpp.at70)?;
    non_negative(&format!("{prefix}expectedOas.at65"), oas.at65)?;
    non_negative(&format!("{prefix}expectedOas.at70"), oas.at70)
}

fn validate_streams(field: &str, streams: &[ExtraIncomeStream]) -> Result<(), PlanError> {
    for (idx, stream) in streams.iter().enumerate() {
        non_negative(&format!("{field}[{idx}].yearlyAmount"), stream.yearly_amount)?;
        if let (Some(start), Some(end)) = (stream.start_year, stream.end_year) {
            if end < start {
                return Err(PlanError::invalid(
                    format!("{field}[{idx}].endYear"),
                    "must be >= startYear",
                ));
            }
        }
    }
    Ok(())
}

fn plausible_age(field: &str, age: u32) -> Result<(), PlanError> {
    if age > MAX_AGE {
        return Err(PlanError::invalid(field, format!("must be <= {MAX_AGE}")));
    }
    Ok(())
}

pub fn validate_start_year(start_year: i32) -> Result<(), PlanError> {
    if !(MIN_START_YEAR..=MAX_START_YEAR).contains(&start_year) {
        return Err(PlanError::invalid(
            "startYear",
            format!("must be between {MIN_START_YEAR} and {MAX_START_YEAR}"),
        ));
    }
    Ok(())
}

fn non_negative(field: &str, value: f64) -> Result<(), PlanError> {
    if !value.is_finite() || value < 0.0 {
        return Err(PlanError::invalid(field, "must be a finite number >= 0"));
    }
    Ok(())
}

fn optional_non_negative(field: &str, value: Option<f64>) -> Result<(), PlanError> {
    match value {
        Some(v) => non_negative(field, v),
        None => Ok(()),
    }
}

fn rate(field: &str, value: f64) -> Result<(), PlanError> {
    if !value.is_finite() || value <= -100.0 {
        return Err(PlanError::invalid(field, "must be a finite percentage > -100"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::generate_retirement_plan;
    use crate::core::types::{OptimizationGoal, PlanOptions};

    fn valid_input() -> UserInput {
        UserInput {
            age: 60,
            retirement_age: 65,
            life_expectancy: 90,
            province: "ON".to_string(),
            current_rsp: 100_000.0,
            ..UserInput::default()
        }
    }

    #[test]
    fn accepts_already_retired_household() {
        let mut input = valid_input();
        input.retirement_age = 55;
        assert!(validate_user_input(&input).is_ok());
    }

    #[test]
    fn rejects_life_expectancy_below_age() {
        let mut input = valid_input();
        input.life_expectancy = 59;
        let err = validate_user_input(&input).expect_err("must reject");
        assert_eq!(err.to_string(), "lifeExpectancy must be >= age");
    }

    #[test]
    fn rejects_negative_balance() {
        let mut input = valid_input();
        input.current_tfsa = -1.0;
        let err = validate_user_input(&input).expect_err("must reject");
        assert!(err.to_string().starts_with("currentTfsa"));
    }

    #[test]
    fn rejects_rate_at_minus_hundred() {
        let mut input = valid_input();
        input.rsp_growth_rate = -100.0;
        assert!(validate_user_input(&input).is_err());
    }

    #[test]
    fn rejects_stream_ending_before_start() {
        let mut input = valid_input();
        input.extra_income_streams.push(ExtraIncomeStream {
            id: "rent".to_string(),
            description: String::new(),
            yearly_amount: 1_000.0,
            start_year: Some(2030),
            end_year: Some(2029),
            has_inflation: false,
        });
        let err = validate_user_input(&input).expect_err("must reject");
        assert!(err.to_string().contains("extraIncomeStreams[0].endYear"));
    }

    #[test]
    fn ignores_spouse_info_when_household_has_no_spouse() {
        let mut input = valid_input();
        input.has_spouse = false;
        input.spouse_info = Some(SpouseInfo {
            age: 70,
            life_expectancy: 10,
            ..SpouseInfo::default()
        });
        assert!(validate_user_input(&input).is_ok());

        input.has_spouse = true;
        assert!(validate_user_input(&input).is_err());
    }

    #[test]
    fn rejects_ages_above_ceiling() {
        let mut input = valid_input();
        input.age = 0;
        input.life_expectancy = u32::MAX;
        let err = validate_user_input(&input).expect_err("must reject");
        assert_eq!(err.to_string(), "lifeExpectancy must be <= 120");

        let mut input = valid_input();
        input.age = 121;
        input.life_expectancy = 125;
        let err = validate_user_input(&input).expect_err("must reject");
        assert!(err.to_string().starts_with("age "));

        let mut input = valid_input();
        input.retirement_age = u32::MAX;
        let err = validate_user_input(&input).expect_err("must reject");
        assert!(err.to_string().starts_with("retirementAge"));

        let mut input = valid_input();
        input.age = 120;
        input.life_expectancy = 120;
        assert!(validate_user_input(&input).is_ok());
    }

    #[test]
    fn rejects_spouse_ages_above_ceiling() {
        let mut input = valid_input();
        input.has_spouse = true;
        input.spouse_info = Some(SpouseInfo {
            age: u32::MAX,
            retirement_age: 65,
            life_expectancy: u32::MAX,
            ..SpouseInfo::default()
        });
        let err = validate_user_input(&input).expect_err("must reject");
        assert!(err.to_string().starts_with("spouseInfo.age"));

        input.spouse_info = Some(SpouseInfo {
            age: 60,
            retirement_age: 500,
            life_expectancy: 90,
            ..SpouseInfo::default()
        });
        let err = validate_user_input(&input).expect_err("must reject");
        assert!(err.to_string().starts_with("spouseInfo.retirementAge"));

        input.spouse_info = Some(SpouseInfo {
            age: 60,
            retirement_age: 65,
            life_expectancy: 121,
            ..SpouseInfo::default()
        });
        let err = validate_user_input(&input).expect_err("must reject");
        assert!(err.to_string().starts_with("spouseInfo.lifeExpectancy"));
    }

    #[test]
    fn oldest_validated_household_simulates_without_overflow() {
        let mut input = valid_input();
        input.age = 0;
        input.retirement_age = MAX_AGE;
        input.life_expectancy = MAX_AGE;
        input.has_spouse = true;
        input.spouse_info = Some(SpouseInfo {
            age: MAX_AGE,
            retirement_age: MAX_AGE,
            life_expectancy: MAX_AGE,
            ..SpouseInfo::default()
        });
        assert!(validate_user_input(&input).is_ok());
        assert!(validate_start_year(MAX_START_YEAR).is_ok());
        let plan = generate_retirement_plan(
            &input,
            &PlanOptions::new(OptimizationGoal::Balanced, MAX_START_YEAR),
        );
        assert_eq!(plan.years.len(), 121);
        assert_eq!(plan.years.last().and_then(|y| y.spouse_age), Some(240));
    }

    #[test]
    fn start_year_must_be_plausible() {
        assert!(validate_start_year(2025).is_ok());
        assert!(validate_start_year(i32::MAX).is_err());
        assert!(validate_start_year(1899).is_err());
    }

    #[test]
    fn goal_parsing_accepts_tags_and_default_alias() {
        assert_eq!(
            "lowest-tax".parse::<OptimizationGoal>(),
            Ok(OptimizationGoal::LowestTax)
        );
        assert_eq!(
            "default".parse::<OptimizationGoal>(),
            Ok(OptimizationGoal::Balanced)
        );
        assert_eq!(
            "yolo".parse::<OptimizationGoal>(),
            Err(PlanError::UnknownGoal("yolo".to_string()))
        );
    }
}
