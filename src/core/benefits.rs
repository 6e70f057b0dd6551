use serde::{Deserialize, Serialize};

use super::types::{CppSchedule, ExtraIncomeStream, OasSchedule};

pub const OAS_MIN_START_AGE: u32 = 65;
pub const OAS_SENIOR_BONUS_AGE: u32 = 75;
pub const OAS_SENIOR_BONUS: f64 = 1.10;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BenefitProgram {
    #[serde(alias = "CPP")]
    Cpp,
    #[serde(alias = "OAS")]
    Oas,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClaimingRules {
    pub earliest_age: u32,
    pub standard_age: u32,
    pub latest_age: u32,
    pub monthly_reduction: f64,
    pub monthly_increase: f64,
    pub max_reduction: f64,
    pub max_increase: f64,
}

impl BenefitProgram {
    pub fn rules(self) -> ClaimingRules {
        match self {
            BenefitProgram::Cpp => ClaimingRules {
                earliest_age: 60,
                standard_age: 65,
                latest_age: 70,
                monthly_reduction: 0.006,
                monthly_increase: 0.007,
                max_reduction: 0.36,
                max_increase: 0.42,
            },
            BenefitProgram::Oas => ClaimingRules {
                earliest_age: 65,
                standard_age: 65,
                latest_age: 70,
                monthly_reduction: 0.0,
                monthly_increase: 0.006,
                max_reduction: 0.0,
                max_increase: 0.30,
            },
        }
    }

    fn tag(self) -> &'static str {
        match self {
            BenefitProgram::Cpp => "CPP",
            BenefitProgram::Oas => "OAS",
        }
    }
}

fn lerp(from: f64, to: f64, start_age: u32, anchor: u32) -> f64 {
    let ratio = (start_age - anchor) as f64 / 5.0;
    from + (to - from) * ratio
}

/// Yearly CPP once the person has reached their chosen start age.
pub fn cpp_income(current_age: u32, start_age: u32, schedule: CppSchedule) -> f64 {
    if current_age < start_age || start_age < 60 {
        return 0.0;
    }
    match start_age {
        60 => schedule.at60,
        65 => schedule.at65,
        70.. => schedule.at70,
        61..=64 => lerp(schedule.at60, schedule.at65, start_age, 60),
        _ => lerp(schedule.at65, schedule.at70, start_age, 65),
    }
}

/// Yearly OAS before clawback, including the bump at 75.
pub fn oas_income(current_age: u32, start_age: u32, schedule: OasSchedule) -> f64 {
    if current_age < start_age || start_age < OAS_MIN_START_AGE {
        return 0.0;
    }
    let base = match start_age {
        65 => schedule.at65,
        70.. => schedule.at70,
        _ => lerp(schedule.at65, schedule.at70, start_age, 65),
    };
    with_senior_bonus(current_age, base)
}

pub fn with_senior_bonus(current_age: u32, oas: f64) -> f64 {
    if current_age >= OAS_SENIOR_BONUS_AGE {
        oas * OAS_SENIOR_BONUS
    } else {
        oas
    }
}

/// CPP for the year, honouring an amount already in pay.
pub fn cpp_income_for(
    current_age: u32,
    start_age: u32,
    schedule: CppSchedule,
    already_collecting: Option<f64>,
) -> f64 {
    match already_collecting {
        Some(amount) => amount,
        None => cpp_income(current_age, start_age, schedule),
    }
}

pub fn oas_income_for(
    current_age: u32,
    start_age: u32,
    schedule: OasSchedule,
    already_collecting: Option<f64>,
) -> f64 {
    match already_collecting {
        Some(amount) => with_senior_bonus(current_age, amount),
        None => oas_income(current_age, start_age, schedule),
    }
}

pub fn extra_income(
    current_age: u32,
    base_age: u32,
    plan_start_year: i32,
    inflation_rate: f64,
    streams: &[ExtraIncomeStream],
) -> f64 {
    let year = plan_start_year + current_age as i32 - base_age as i32;
    streams
        .iter()
        .filter_map(|stream| stream_amount(stream, year, plan_start_year, inflation_rate))
        .sum()
}

fn stream_amount(
    stream: &ExtraIncomeStream,
    year: i32,
    plan_start_year: i32,
    inflation_rate: f64,
) -> Option<f64> {
    let start = stream.start_year.unwrap_or(plan_start_year);
    if year < start || stream.end_year.is_some_and(|end| year > end) {
        return None;
    }
    let years_since_start = year - start;
    if stream.has_inflation && years_since_start > 0 {
        Some(stream.yearly_amount * (1.0 + inflation_rate / 100.0).powi(years_since_start))
    } else {
        Some(stream.yearly_amount)
    }
}

/// Monthly amount after the early/late claiming adjustment.
pub fn adjusted_benefit(base_monthly: f64, claiming_age: u32, program: BenefitProgram) -> f64 {
    let rules = program.rules();
    if claiming_age < rules.earliest_age || claiming_age > rules.latest_age {
        return 0.0;
    }
    if claiming_age < rules.standard_age {
        let months = ((rules.standard_age - claiming_age) * 12) as f64;
        let reduction = (months * rules.monthly_reduction).min(rules.max_reduction);
        return base_monthly * (1.0 - reduction);
    }
    if claiming_age > rules.standard_age {
        let months = ((claiming_age - rules.standard_age) * 12) as f64;
        let increase = (months * rules.monthly_increase).min(rules.max_increase);
        return base_monthly * (1.0 + increase);
    }
    base_monthly
}

/// Monthly amounts quoted for the anchor ages a program publishes.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct QuotedBenefit {
    pub at60: Option<f64>,
    pub at65: f64,
    pub at70: Option<f64>,
}

impl From<CppSchedule> for QuotedBenefit {
    fn from(value: CppSchedule) -> Self {
        Self {
            at60: Some(value.at60),
            at65: value.at65,
            at70: Some(value.at70),
        }
    }
}

impl From<OasSchedule> for QuotedBenefit {
    fn from(value: OasSchedule) -> Self {
        Self {
            at60: None,
            at65: value.at65,
            at70: Some(value.at70),
        }
    }
}

impl QuotedBenefit {
    fn base_for(&self, claiming_age: u32) -> f64 {
        match (claiming_age, self.at60, self.at70) {
            (60, Some(at60), _) => at60,
            (65, _, _) => self.at65,
            (70, _, Some(at70)) => at70,
            (age, _, _) if age <= 65 => self.at65,
            (_, _, at70) => at70.unwrap_or(self.at65),
        }
    }
}

/// Describes a benefit started at `claiming_age` as an indexed income stream.
pub fn benefit_income_stream(
    current_age: u32,
    claiming_age: u32,
    quoted: QuotedBenefit,
    program: BenefitProgram,
    plan_start_year: i32,
) -> Option<ExtraIncomeStream> {
    if !(60..=70).contains(&claiming_age) {
        return None;
    }
    let monthly = adjusted_benefit(quoted.base_for(claiming_age), claiming_age, program);
    let bonus = match program {
        BenefitProgram::Oas if current_age >= OAS_SENIOR_BONUS_AGE => OAS_SENIOR_BONUS,
        _ => 1.0,
    };
    let tag = program.tag();
    Some(ExtraIncomeStream {
        id: format!("{}_benefit_{claiming_age}", tag.to_ascii_lowercase()),
        description: format!("{tag} Benefit (Started at Age {claiming_age})"),
        yearly_amount: monthly * 12.0 * bonus,
        start_year: Some(plan_start_year + claiming_age as i32 - current_age as i32),
        end_year: None,
        has_inflation: true,
    })
}

pub fn benefit_income(
    current_age: u32,
    claiming_age: u32,
    quoted: QuotedBenefit,
    program: BenefitProgram,
    plan_start_year: i32,
) -> f64 {
    benefit_income_stream(current_age, claiming_age, quoted, program, plan_start_year)
        .map(|stream| stream.yearly_amount)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn cpp() -> CppSchedule {
        CppSchedule {
            at60: 6_000.0,
            at65: 10_000.0,
            at70: 14_000.0,
        }
    }

    fn oas() -> OasSchedule {
        OasSchedule {
            at65: 8_000.0,
            at70: 10_800.0,
        }
    }

    fn stream(start: Option<i32>, end: Option<i32>, inflation: bool) -> ExtraIncomeStream {
        ExtraIncomeStream {
            id: "rental".to_string(),
            description: "Basement suite".to_string(),
            yearly_amount: 12_000.0,
            start_year: start,
            end_year: end,
            has_inflation: inflation,
        }
    }

    #[test]
    fn cpp_uses_exact_anchor_amounts() {
        assert_approx(cpp_income(60, 60, cpp()), 6_000.0);
        assert_approx(cpp_income(80, 65, cpp()), 10_000.0);
        assert_approx(cpp_income(70, 70, cpp()), 14_000.0);
    }

    #[test]
    fn cpp_interpolates_between_anchors() {
        assert_approx(cpp_income(62, 62, cpp()), 6_000.0 + 4_000.0 * 0.4);
        assert_approx(cpp_income(68, 68, cpp()), 10_000.0 + 4_000.0 * 0.6);
    }

    #[test]
    fn cpp_is_zero_before_start_age_or_before_60() {
        assert_approx(cpp_income(64, 65, cpp()), 0.0);
        assert_approx(cpp_income(70, 58, cpp()), 0.0);
    }

    #[test]
    fn cpp_start_after_70_uses_age_70_amount() {
        assert_approx(cpp_income(72, 72, cpp()), 14_000.0);
    }

    #[test]
    fn oas_requires_start_at_or_after_65() {
        assert_approx(oas_income(70, 60, oas()), 0.0);
        assert_approx(oas_income(66, 67, oas()), 0.0);
        assert_approx(oas_income(67, 67, oas()), 8_000.0 + 2_800.0 * 0.4);
    }

    #[test]
    fn oas_bonus_applies_after_interpolation_from_75() {
        let base = 8_000.0 + 2_800.0 * 0.4;
        assert_approx(oas_income(74, 67, oas()), base);
        assert_approx(oas_income(75, 67, oas()), base * 1.1);
    }

    #[test]
    fn already_collecting_amount_overrides_schedule() {
        assert_approx(cpp_income_for(62, 70, cpp(), Some(7_500.0)), 7_500.0);
        assert_approx(cpp_income_for(62, 70, cpp(), None), 0.0);
        assert_approx(oas_income_for(76, 70, oas(), Some(8_000.0)), 8_800.0);
    }

    #[test]
    fn extra_income_honours_window() {
        let streams = [stream(Some(2027), Some(2029), false)];
        assert_approx(extra_income(60, 60, 2025, 2.0, &streams), 0.0);
        assert_approx(extra_income(62, 60, 2025, 2.0, &streams), 12_000.0);
        assert_approx(extra_income(64, 60, 2025, 2.0, &streams), 12_000.0);
        assert_approx(extra_income(65, 60, 2025, 2.0, &streams), 0.0);
    }

    #[test]
    fn extra_income_inflates_from_stream_start_not_plan_start() {
        let streams = [stream(Some(2027), None, true)];
        assert_approx(extra_income(62, 60, 2025, 2.0, &streams), 12_000.0);
        assert_approx(
            extra_income(65, 60, 2025, 2.0, &streams),
            12_000.0 * 1.02f64.powi(3),
        );
    }

    #[test]
    fn extra_income_without_start_year_begins_at_plan_start() {
        let streams = [stream(None, None, true), stream(None, Some(2025), false)];
        assert_approx(extra_income(50, 50, 2025, 3.0, &streams), 24_000.0);
        assert_approx(extra_income(51, 50, 2025, 3.0, &streams), 12_000.0 * 1.03);
    }

    #[test]
    fn claiming_adjustment_oracles() {
        assert_approx(adjusted_benefit(1_000.0, 65, BenefitProgram::Cpp), 1_000.0);
        assert_approx(adjusted_benefit(1_000.0, 60, BenefitProgram::Cpp), 640.0);
        assert_approx(adjusted_benefit(1_000.0, 63, BenefitProgram::Cpp), 1_000.0 * (1.0 - 0.144));
        assert_approx(adjusted_benefit(1_000.0, 70, BenefitProgram::Cpp), 1_420.0);
        assert_approx(adjusted_benefit(1_000.0, 70, BenefitProgram::Oas), 1_300.0);
        assert_approx(adjusted_benefit(1_000.0, 64, BenefitProgram::Oas), 0.0);
        assert_approx(adjusted_benefit(1_000.0, 71, BenefitProgram::Cpp), 0.0);
    }

    #[test]
    fn benefit_stream_starts_in_claiming_year_and_is_indexed() {
        let quoted = QuotedBenefit {
            at60: None,
            at65: 700.0,
            at70: None,
        };
        let stream = benefit_income_stream(62, 65, quoted, BenefitProgram::Cpp, 2025)
            .expect("65 is claimable");
        assert_eq!(stream.id, "cpp_benefit_65");
        assert_eq!(stream.start_year, Some(2028));
        assert_eq!(stream.end_year, None);
        assert!(stream.has_inflation);
        assert_approx(stream.yearly_amount, 8_400.0);
    }

    #[test]
    fn benefit_stream_rejects_ages_outside_window() {
        let quoted = QuotedBenefit::from(cpp());
        assert!(benefit_income_stream(55, 59, quoted, BenefitProgram::Cpp, 2025).is_none());
        assert!(benefit_income_stream(55, 71, quoted, BenefitProgram::Cpp, 2025).is_none());
        assert_approx(benefit_income(55, 71, quoted, BenefitProgram::Cpp, 2025), 0.0);
    }

    #[test]
    fn oas_stream_carries_senior_bonus_for_older_claimants() {
        let quoted = QuotedBenefit::from(oas());
        let yearly = benefit_income(76, 65, quoted, BenefitProgram::Oas, 2025);
        assert_approx(yearly, 8_000.0 * 12.0 * 1.1);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_cpp_is_monotone_in_start_age_for_rising_schedule(
            start in 60u32..70,
            at60 in 0u32..10_000,
            step1 in 0u32..10_000,
            step2 in 0u32..10_000
        ) {
            let schedule = CppSchedule {
                at60: at60 as f64,
                at65: (at60 + step1) as f64,
                at70: (at60 + step1 + step2) as f64,
            };
            let now = cpp_income(90, start, schedule);
            let later = cpp_income(90, start + 1, schedule);
            prop_assert!(later + 1e-9 >= now);
        }
    }
}
