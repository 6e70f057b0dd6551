use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct TaxBracket {
    pub threshold: f64,
    pub rate: f64,
}

const fn bracket(threshold: f64, rate: f64) -> TaxBracket {
    TaxBracket { threshold, rate }
}

/// Tax-year constants. Swap the whole value when a new year's figures land.
#[derive(Debug, Clone, Copy)]
pub struct TaxConstants {
    pub tax_year: i32,
    pub federal_brackets: &'static [TaxBracket],
    pub capital_gains_inclusion_rate: f64,
    pub rrsp_contribution_rate: f64,
    pub rrsp_contribution_limit: f64,
    pub tfsa_annual_room: f64,
    pub oas_clawback_threshold: f64,
    pub oas_clawback_rate: f64,
    /// Maximum monthly OAS for ages 65-74.
    pub oas_max_monthly: f64,
}

const FEDERAL_BRACKETS_2025: [TaxBracket; 5] = [
    bracket(0.0, 0.15),
    bracket(57_375.0, 0.205),
    bracket(114_750.0, 0.26),
    bracket(177_882.0, 0.29),
    bracket(253_414.0, 0.33),
];

pub const TAX_CONSTANTS_2025: TaxConstants = TaxConstants {
    tax_year: 2025,
    federal_brackets: &FEDERAL_BRACKETS_2025,
    capital_gains_inclusion_rate: 0.5,
    rrsp_contribution_rate: 0.18,
    rrsp_contribution_limit: 32_490.0,
    tfsa_annual_room: 7_000.0,
    oas_clawback_threshold: 142_609.0,
    oas_clawback_rate: 0.15,
    oas_max_monthly: 727.67,
};

pub const TAX_CONSTANTS: TaxConstants = TAX_CONSTANTS_2025;

#[derive(Debug, Clone, Copy)]
pub struct Province {
    pub code: &'static str,
    pub name: &'static str,
    pub brackets: &'static [TaxBracket],
}

pub const DEFAULT_PROVINCE: &str = "ON";

pub static PROVINCES: [Province; 13] = [
    Province {
        code: "AB",
        name: "Alberta",
        brackets: &[
            bracket(0.0, 0.10),
            bracket(142_292.0, 0.12),
            bracket(170_751.0, 0.13),
            bracket(227_668.0, 0.14),
            bracket(341_502.0, 0.15),
        ],
    },
    Province {
        code: "BC",
        name: "British Columbia",
        brackets: &[
            bracket(0.0, 0.0506),
            bracket(45_654.0, 0.077),
            bracket(91_310.0, 0.105),
            bracket(104_835.0, 0.1229),
            bracket(127_299.0, 0.147),
            bracket(172_602.0, 0.168),
            bracket(240_716.0, 0.205),
        ],
    },
    Province {
        code: "MB",
        name: "Manitoba",
        brackets: &[
            bracket(0.0, 0.108),
            bracket(36_842.0, 0.1275),
            bracket(79_625.0, 0.174),
        ],
    },
    Province {
        code: "NB",
        name: "New Brunswick",
        brackets: &[
            bracket(0.0, 0.094),
            bracket(47_715.0, 0.14),
            bracket(95_431.0, 0.16),
            bracket(176_756.0, 0.195),
        ],
    },
    Province {
        code: "NL",
        name: "Newfoundland and Labrador",
        brackets: &[
            bracket(0.0, 0.087),
            bracket(41_457.0, 0.145),
            bracket(82_913.0, 0.158),
            bracket(148_027.0, 0.178),
            bracket(207_239.0, 0.198),
            bracket(264_750.0, 0.208),
            bracket(529_499.0, 0.218),
            bracket(1_059_000.0, 0.228),
        ],
    },
    Province {
        code: "NT",
        name: "Northwest Territories",
        brackets: &[
            bracket(0.0, 0.059),
            bracket(48_326.0, 0.086),
            bracket(96_655.0, 0.122),
            bracket(157_139.0, 0.1405),
        ],
    },
    Province {
        code: "NS",
        name: "Nova Scotia",
        brackets: &[
            bracket(0.0, 0.0879),
            bracket(29_590.0, 0.1495),
            bracket(59_180.0, 0.1667),
            bracket(93_000.0, 0.175),
            bracket(150_000.0, 0.21),
        ],
    },
    Province {
        code: "NU",
        name: "Nunavut",
        brackets: &[
            bracket(0.0, 0.04),
            bracket(50_877.0, 0.07),
            bracket(101_754.0, 0.09),
            bracket(165_429.0, 0.115),
        ],
    },
    Province {
        code: "ON",
        name: "Ontario",
        brackets: &[
            bracket(0.0, 0.0505),
            bracket(52_886.0, 0.0915),
            bracket(105_775.0, 0.1116),
            bracket(150_000.0, 0.1216),
            bracket(220_000.0, 0.1316),
        ],
    },
    Province {
        code: "PE",
        name: "Prince Edward Island",
        brackets: &[
            bracket(0.0, 0.098),
            bracket(32_656.0, 0.138),
            bracket(65_315.0, 0.167),
        ],
    },
    Province {
        code: "QC",
        name: "Quebec",
        brackets: &[
            bracket(0.0, 0.15),
            bracket(49_275.0, 0.20),
            bracket(98_540.0, 0.24),
            bracket(119_910.0, 0.2575),
        ],
    },
    Province {
        code: "SK",
        name: "Saskatchewan",
        brackets: &[
            bracket(0.0, 0.105),
            bracket(49_720.0, 0.125),
            bracket(142_058.0, 0.145),
        ],
    },
    Province {
        code: "YT",
        name: "Yukon",
        brackets: &[
            bracket(0.0, 0.064),
            bracket(53_359.0, 0.09),
            bracket(106_717.0, 0.109),
            bracket(165_430.0, 0.128),
            bracket(500_000.0, 0.15),
        ],
    },
];

/// Unknown codes fall back to Ontario.
pub fn province(code: &str) -> &'static Province {
    let code = code.trim();
    PROVINCES
        .iter()
        .find(|p| p.code.eq_ignore_ascii_case(code))
        .or_else(|| PROVINCES.iter().find(|p| p.code == DEFAULT_PROVINCE))
        .unwrap_or(&PROVINCES[0])
}

pub fn provincial_brackets(code: &str) -> &'static [TaxBracket] {
    province(code).brackets
}

/// Progressive tax over ascending brackets; the last bracket has no ceiling.
pub fn income_tax(income: f64, brackets: &[TaxBracket]) -> f64 {
    let mut tax = 0.0;
    for (idx, current) in brackets.iter().enumerate() {
        if income <= current.threshold {
            continue;
        }
        let ceiling = brackets
            .get(idx + 1)
            .map(|next| income.min(next.threshold))
            .unwrap_or(income);
        tax += (ceiling - current.threshold) * current.rate;
    }
    tax
}

pub fn combined_income_tax(income: f64, provincial: &[TaxBracket]) -> f64 {
    income_tax(income, TAX_CONSTANTS.federal_brackets) + income_tax(income, provincial)
}

/// Tax attributable to `gains` when stacked on top of `other_income`.
pub fn capital_gains_tax(gains: f64, other_income: f64, province_code: &str) -> f64 {
    let taxable_gains = gains * TAX_CONSTANTS.capital_gains_inclusion_rate;
    let provincial = provincial_brackets(province_code);
    let federal = TAX_CONSTANTS.federal_brackets;

    let federal_with = income_tax(other_income + taxable_gains, federal);
    let federal_without = income_tax(other_income, federal);
    let provincial_with = income_tax(other_income + taxable_gains, provincial);
    let provincial_without = income_tax(other_income, provincial);

    (federal_with - federal_without) + (provincial_with - provincial_without)
}

pub fn oas_clawback(income: f64) -> f64 {
    if income <= TAX_CONSTANTS.oas_clawback_threshold {
        return 0.0;
    }
    let cap = 12.0 * TAX_CONSTANTS.oas_max_monthly;
    ((income - TAX_CONSTANTS.oas_clawback_threshold) * TAX_CONSTANTS.oas_clawback_rate).min(cap)
}

/// Average combined rate paid on `additional_income` stacked on `base_income`.
pub fn effective_tax_rate(
    base_income: f64,
    additional_income: f64,
    provincial: &[TaxBracket],
) -> f64 {
    if additional_income <= 0.0 {
        return 0.0;
    }
    let before = combined_income_tax(base_income, provincial);
    let after = combined_income_tax(base_income + additional_income, provincial);
    (after - before) / additional_income
}

pub fn max_rrsp_contribution(income: f64) -> f64 {
    (income * TAX_CONSTANTS.rrsp_contribution_rate).min(TAX_CONSTANTS.rrsp_contribution_limit)
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginalRate {
    pub income: f64,
    pub marginal_rate: f64,
}

/// Combined marginal rate at each federal threshold, using the provincial
/// bracket in force at that threshold.
pub fn marginal_rate_table(provincial: &[TaxBracket]) -> Vec<MarginalRate> {
    TAX_CONSTANTS
        .federal_brackets
        .iter()
        .map(|federal| {
            let provincial_rate = provincial
                .iter()
                .rev()
                .find(|p| federal.threshold >= p.threshold)
                .map(|p| p.rate)
                .unwrap_or(0.0);
            MarginalRate {
                income: federal.threshold,
                marginal_rate: federal.rate + provincial_rate,
            }
        })
        .collect()
}
