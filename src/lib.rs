//! Year-by-year Canadian retirement projection: RRSP/RRIF, TFSA and
//! non-registered accounts, CPP/OAS timing, and four withdrawal strategies.

pub mod api;
pub mod core;
