use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::validation::PlanError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CppSchedule {
    pub at60: f64,
    pub at65: f64,
    pub at70: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OasSchedule {
    pub at65: f64,
    pub at70: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraIncomeStream {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub yearly_amount: f64,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub end_year: Option<i32>,
    #[serde(default)]
    pub has_inflation: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpouseInfo {
    pub name: Option<String>,
    pub age: u32,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    #[serde(alias = "currentRSP")]
    pub current_rsp: f64,
    #[serde(alias = "currentTFSA")]
    pub current_tfsa: f64,
    pub current_other_investments: f64,
    pub rrsp_room: f64,
    pub tfsa_room: f64,
    pub employment_income: f64,
    #[serde(alias = "expectedCPP")]
    pub expected_cpp: CppSchedule,
    #[serde(alias = "expectedOAS")]
    pub expected_oas: OasSchedule,
    #[serde(alias = "currentCPP")]
    pub current_cpp: Option<f64>,
    #[serde(alias = "currentOAS")]
    pub current_oas: Option<f64>,
    #[serde(alias = "isCollectingCPP")]
    pub is_collecting_cpp: bool,
    #[serde(alias = "isCollectingOAS")]
    pub is_collecting_oas: bool,
    pub extra_income_streams: Vec<ExtraIncomeStream>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserInput {
    pub name: Option<String>,
    pub age: u32,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    pub province: String,

    pub has_spouse: bool,
    pub spouse_info: Option<SpouseInfo>,

    #[serde(alias = "currentRSP")]
    pub current_rsp: f64,
    #[serde(alias = "currentTFSA")]
    pub current_tfsa: f64,
    pub current_other_investments: f64,

    pub rrsp_room: f64,
    pub tfsa_room: f64,

    pub employment_income: f64,

    #[serde(alias = "expectedCPP")]
    pub expected_cpp: CppSchedule,
    #[serde(alias = "expectedOAS")]
    pub expected_oas: OasSchedule,
    #[serde(alias = "currentCPP")]
    pub current_cpp: Option<f64>,
    #[serde(alias = "currentOAS")]
    pub current_oas: Option<f64>,
    #[serde(alias = "isCollectingCPP")]
    pub is_collecting_cpp: bool,
    #[serde(alias = "isCollectingOAS")]
    pub is_collecting_oas: bool,

    pub extra_income_streams: Vec<ExtraIncomeStream>,

    pub current_annual_expenses: f64,
    pub retirement_annual_expenses: f64,

    pub inflation_rate: f64,
    pub rsp_growth_rate: f64,
    pub tfsa_growth_rate: f64,
    pub other_investments_growth_rate: f64,
}

impl UserInput {
    /// Spouse data only counts when the household says it has one.
    pub fn spouse(&self) -> Option<&SpouseInfo> {
        if self.has_spouse {
            self.spouse_info.as_ref()
        } else {
            None
        }
    }

    pub fn years_to_simulate(&self) -> u32 {
        self.life_expectancy.saturating_sub(self.age) + 1
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalances {
    pub rsp: f64,
    pub tfsa: f64,
    pub other: f64,
    pub spouse_rsp: f64,
    pub spouse_tfsa: f64,
    pub spouse_other: f64,
}

impl AccountBalances {
    pub fn from_input(input: &UserInput) -> Self {
        let (spouse_rsp, spouse_tfsa, spouse_other) = input
            .spouse()
            .map(|s| (s.current_rsp, s.current_tfsa, s.current_other_investments))
            .unwrap_or((0.0, 0.0, 0.0));
        Self {
            rsp: input.current_rsp,
            tfsa: input.current_tfsa,
            other: input.current_other_investments,
            spouse_rsp,
            spouse_tfsa,
            spouse_other,
        }
    }

    pub fn total(&self) -> f64 {
        self.rsp + self.tfsa + self.other + self.spouse_rsp + self.spouse_tfsa + self.spouse_other
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionRoom {
    pub rrsp_room: f64,
    pub tfsa_room: f64,
    pub tfsa_withdrawals_last_year: f64,
    pub spouse_rrsp_room: f64,
    pub spouse_tfsa_room: f64,
    pub spouse_tfsa_withdrawals_last_year: f64,
}

impl ContributionRoom {
    pub fn from_input(input: &UserInput) -> Self {
        let (spouse_rrsp_room, spouse_tfsa_room) = input
            .spouse()
            .map(|s| (s.rrsp_room, s.tfsa_room))
            .unwrap_or((0.0, 0.0));
        Self {
            rrsp_room: input.rrsp_room,
            tfsa_room: input.tfsa_room,
            tfsa_withdrawals_last_year: 0.0,
            spouse_rrsp_room,
            spouse_tfsa_room,
            spouse_tfsa_withdrawals_last_year: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalAmounts {
    pub rsp: f64,
    pub tfsa: f64,
    pub other: f64,
    pub spouse_rsp: f64,
    pub spouse_tfsa: f64,
    pub spouse_other: f64,
}

impl WithdrawalAmounts {
    pub fn mandatory_only(rsp: f64, spouse_rsp: f64) -> Self {
        Self {
            rsp,
            spouse_rsp,
            ..Self::default()
        }
    }

    pub fn total(&self) -> f64 {
        self.rsp + self.tfsa + self.other + self.spouse_rsp + self.spouse_tfsa + self.spouse_other
    }
}

/// Per-year view of the household handed to a withdrawal strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RetirementData {
    pub age: u32,
    pub is_rrif: bool,
    pub balances: AccountBalances,
    /// Income before any withdrawal, after the OAS clawback.
    pub taxable_income: f64,
    pub spouse_age: Option<u32>,
    pub is_spouse_rrif: bool,
    pub spouse_taxable_income: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyPlan {
    pub age: u32,
    pub year: i32,
    pub is_retired: bool,

    pub employment_income: f64,
    pub cpp_income: f64,
    pub oas_income: f64,
    pub extra_income: f64,
    pub rsp_withdrawal: f64,
    pub tfsa_withdrawal: f64,
    pub other_investments_withdrawal: f64,
    pub rrif_converted: bool,

    pub spouse_age: Option<u32>,
    pub spouse_is_retired: bool,
    pub spouse_employment_income: f64,
    pub spouse_cpp_income: f64,
    pub spouse_oas_income: f64,
    pub spouse_extra_income: f64,
    pub spouse_rsp_withdrawal: f64,
    pub spouse_tfsa_withdrawal: f64,
    pub spouse_other_investments_withdrawal: f64,
    pub spouse_rrif_converted: bool,

    pub total_income: f64,
    pub expenses: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fun_money: Option<f64>,

    pub income_tax: f64,
    pub spouse_income_tax: f64,
    pub capital_gains_tax: f64,
    pub spouse_capital_gains_tax: f64,
    pub total_tax: f64,

    pub rsp_contribution: f64,
    pub tfsa_contribution: f64,
    pub other_investments_contribution: f64,
    pub spouse_rsp_contribution: f64,
    pub spouse_tfsa_contribution: f64,
    pub spouse_other_investments_contribution: f64,

    pub rsp_balance: f64,
    pub tfsa_balance: f64,
    pub other_investments_balance: f64,
    pub spouse_rsp_balance: f64,
    pub spouse_tfsa_balance: f64,
    pub spouse_other_investments_balance: f64,
    pub total_net_worth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub years_of_retirement: u32,
    pub total_income_tax_paid: f64,
    pub total_capital_gains_tax_paid: f64,
    pub final_net_worth: f64,
    pub successful_retirement: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_fun_money: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_lifetime_fun_money: Option<f64>,
    pub shortfall_years: u32,
    pub first_shortfall_age: Option<u32>,
}

impl PlanSummary {
    pub fn total_tax_paid(&self) -> f64 {
        self.total_income_tax_paid + self.total_capital_gains_tax_paid
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetirementPlan {
    pub years: Vec<YearlyPlan>,
    pub summary: PlanSummary,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptimizationGoal {
    LowestTax,
    MaxEndWorth,
    SpendItAll,
    #[default]
    #[serde(alias = "default")]
    Balanced,
}

impl OptimizationGoal {
    pub const ALL: [OptimizationGoal; 4] = [
        OptimizationGoal::LowestTax,
        OptimizationGoal::MaxEndWorth,
        OptimizationGoal::SpendItAll,
        OptimizationGoal::Balanced,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OptimizationGoal::LowestTax => "lowest-tax",
            OptimizationGoal::MaxEndWorth => "max-end-worth",
            OptimizationGoal::SpendItAll => "spend-it-all",
            OptimizationGoal::Balanced => "balanced",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OptimizationGoal::LowestTax => "Minimize Lifetime Taxes",
            OptimizationGoal::MaxEndWorth => "Maximize End Net Worth",
            OptimizationGoal::SpendItAll => "Spend It All (Max Enjoyment)",
            OptimizationGoal::Balanced => "Balanced Approach",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            OptimizationGoal::LowestTax => {
                "Draws tax-free accounts first, then picks the taxable mix with the lowest \
                 marginal rate each year, and chooses CPP/OAS start ages that minimize \
                 lifetime tax."
            }
            OptimizationGoal::MaxEndWorth => {
                "Spends non-registered money first and keeps RRSP/RRIF and TFSA growing as long \
                 as possible; chooses CPP/OAS start ages that maximize final net worth."
            }
            OptimizationGoal::SpendItAll => {
                "Draws registered money more aggressively late in life to maximize yearly \
                 discretionary spending; chooses CPP/OAS start ages that maximize fun money."
            }
            OptimizationGoal::Balanced => {
                "Draws from every account in proportion to its balance, discounted by its tax \
                 cost, and claims CPP/OAS at 65."
            }
        }
    }
}

impl fmt::Display for OptimizationGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizationGoal {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "lowest-tax" => Ok(OptimizationGoal::LowestTax),
            "max-end-worth" => Ok(OptimizationGoal::MaxEndWorth),
            "spend-it-all" => Ok(OptimizationGoal::SpendItAll),
            "balanced" | "default" => Ok(OptimizationGoal::Balanced),
            other => Err(PlanError::UnknownGoal(other.to_string())),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenefitStartAges {
    pub cpp_start_age: u32,
    pub oas_start_age: u32,
    #[serde(default)]
    pub spouse_cpp_start_age: Option<u32>,
    #[serde(default)]
    pub spouse_oas_start_age: Option<u32>,
}

impl BenefitStartAges {
    pub const STANDARD_AGE: u32 = 65;

    /// 65/65 for everyone; spouse ages only when a spouse exists.
    pub fn standard(has_spouse: bool) -> Self {
        let spouse = has_spouse.then_some(Self::STANDARD_AGE);
        Self {
            cpp_start_age: Self::STANDARD_AGE,
            oas_start_age: Self::STANDARD_AGE,
            spouse_cpp_start_age: spouse,
            spouse_oas_start_age: spouse,
        }
    }

    pub fn spouse_cpp(&self) -> u32 {
        self.spouse_cpp_start_age.unwrap_or(Self::STANDARD_AGE)
    }

    pub fn spouse_oas(&self) -> u32 {
        self.spouse_oas_start_age.unwrap_or(Self::STANDARD_AGE)
    }
}

impl Default for BenefitStartAges {
    fn default() -> Self {
        Self::standard(false)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlanOptions {
    pub goal: OptimizationGoal,
    pub benefit_ages: BenefitStartAges,
    /// Calendar year of the first simulated age.
    pub start_year: i32,
}

impl PlanOptions {
    pub fn new(goal: OptimizationGoal, start_year: i32) -> Self {
        Self {
            goal,
            benefit_ages: BenefitStartAges::default(),
            start_year,
        }
    }

    pub fn with_benefit_ages(mut self, benefit_ages: BenefitStartAges) -> Self {
        self.benefit_ages = benefit_ages;
        self
    }
}
