pub const RRIF_CONVERSION_AGE: u32 = 71;

const FLAT_FACTOR_FROM_95: f64 = 0.20;

// CRA minimum withdrawal factors, ages 71..=94.
const RRIF_FACTORS: [f64; 24] = [
    0.0528, 0.0540, 0.0553, 0.0567, 0.0582, 0.0598, 0.0617, 0.0636, 0.0658, 0.0682, 0.0708,
    0.0738, 0.0771, 0.0808, 0.0851, 0.0899, 0.0955, 0.1021, 0.1099, 0.1192, 0.1306, 0.1449,
    0.1634, 0.1879,
];

/// The RRSP must become a RRIF in the year its holder turns 71.
pub fn should_convert_rrsp_to_rrif(age: u32) -> bool {
    age == RRIF_CONVERSION_AGE
}

pub fn is_rrif_age(age: u32) -> bool {
    age >= RRIF_CONVERSION_AGE
}

pub fn rrif_minimum_factor(age: u32) -> f64 {
    if age < RRIF_CONVERSION_AGE {
        return 0.0;
    }
    RRIF_FACTORS
        .get((age - RRIF_CONVERSION_AGE) as usize)
        .copied()
        .unwrap_or(FLAT_FACTOR_FROM_95)
}

pub fn rrif_minimum_withdrawal(age: u32, balance: f64) -> f64 {
    balance.max(0.0) * rrif_minimum_factor(age)
}

/// Greater of what is needed and what the RRIF rules force out.
pub fn rsp_withdrawal_with_minimum(age: u32, balance: f64, needed: f64) -> f64 {
    needed.max(rrif_minimum_withdrawal(age, balance))
}
