use axum::{
    Router,
    extract::{Json, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Datelike;
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::benefits::{BenefitProgram, benefit_income_stream};
use crate::core::tax::{PROVINCES, TAX_CONSTANTS};
use crate::core::{
    BenefitStartAges, CppSchedule, ExtraIncomeStream, MAX_AGE, OasSchedule, OptimizationGoal,
    OptimizedPlan, PlanOptions, StrategyComparison, UserInput, compare_strategies,
    generate_optimized_plan, generate_retirement_plan, validate_start_year, validate_user_input,
};

const CPP_EARLIEST_CLAIM: u32 = 60;
const OAS_EARLIEST_CLAIM: u32 = 65;
const LATEST_CLAIM: u32 = 70;

#[derive(Parser, Debug)]
#[command(
    name = "canretire",
    about = "Canadian retirement projection (RRSP/RRIF + TFSA + non-registered, CPP/OAS timing)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Project one plan and print it as JSON.
    Plan(PlanArgs),
    /// Run every optimization goal and print the summaries side by side.
    Compare(CompareArgs),
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[arg(long, help = "Household JSON file (same shape as the API's userInput)")]
    input: PathBuf,
    #[arg(long, default_value = "balanced")]
    goal: String,
    #[arg(long, help = "Calendar year of the first simulated age; defaults to this year")]
    start_year: Option<i32>,
    #[arg(
        long,
        default_value_t = false,
        help = "Use the given claiming ages instead of searching"
    )]
    fixed_timing: bool,
    #[arg(long, default_value_t = 65)]
    cpp_age: u32,
    #[arg(long, default_value_t = 65)]
    oas_age: u32,
    #[arg(long)]
    spouse_cpp_age: Option<u32>,
    #[arg(long)]
    spouse_oas_age: Option<u32>,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    #[arg(long, help = "Household JSON file (same shape as the API's userInput)")]
    input: PathBuf,
    #[arg(long)]
    start_year: Option<i32>,
}

#[derive(Debug, Clone)]
struct PlanRequest {
    input: UserInput,
    goal: OptimizationGoal,
    start_year: i32,
    timing: Option<BenefitStartAges>,
}

#[derive(Debug, Clone)]
struct CompareRequest {
    input: UserInput,
    start_year: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PlanPayload {
    user_input: Option<UserInput>,
    goal: Option<String>,
    start_year: Option<i32>,
    benefit_start_ages: Option<BenefitStartAges>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ComparePayload {
    user_input: Option<UserInput>,
    start_year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BenefitsPayload {
    age: Option<u32>,
    #[serde(alias = "expectedCPP")]
    expected_cpp: Option<CppSchedule>,
    #[serde(alias = "expectedOAS")]
    expected_oas: Option<OasSchedule>,
    start_year: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareResponse {
    start_year: i32,
    strategies: Vec<StrategyComparison>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BenefitsResponse {
    start_year: i32,
    cpp: Vec<ExtraIncomeStream>,
    oas: Vec<ExtraIncomeStream>,
}

#[derive(Debug, Serialize)]
struct StrategyDescriptor {
    tag: OptimizationGoal,
    label: &'static str,
    description: &'static str,
}

#[derive(Debug, Serialize)]
struct StrategiesResponse {
    strategies: Vec<StrategyDescriptor>,
}

#[derive(Debug, Serialize)]
struct ProvinceDescriptor {
    code: &'static str,
    name: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProvincesResponse {
    tax_year: i32,
    provinces: Vec<ProvinceDescriptor>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

fn resolve_start_year(start_year: Option<i32>) -> Result<i32, String> {
    let start_year = start_year.unwrap_or_else(current_year);
    validate_start_year(start_year).map_err(|e| e.to_string())?;
    Ok(start_year)
}

fn validate_claim_age(flag: &str, age: u32, earliest: u32) -> Result<(), String> {
    if !(earliest..=LATEST_CLAIM).contains(&age) {
        return Err(format!(
            "{flag} must be between {earliest} and {LATEST_CLAIM}"
        ));
    }
    Ok(())
}

fn validate_timing(timing: &BenefitStartAges) -> Result<(), String> {
    validate_claim_age("cppStartAge", timing.cpp_start_age, CPP_EARLIEST_CLAIM)?;
    validate_claim_age("oasStartAge", timing.oas_start_age, OAS_EARLIEST_CLAIM)?;
    if let Some(age) = timing.spouse_cpp_start_age {
        validate_claim_age("spouseCppStartAge", age, CPP_EARLIEST_CLAIM)?;
    }
    if let Some(age) = timing.spouse_oas_start_age {
        validate_claim_age("spouseOasStartAge", age, OAS_EARLIEST_CLAIM)?;
    }
    Ok(())
}

fn load_user_input(path: &Path) -> Result<UserInput, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("--input could not be read ({}): {e}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| format!("--input is not a valid household: {e}"))
}

fn build_plan_request(args: &PlanArgs, input: UserInput) -> Result<PlanRequest, String> {
    validate_user_input(&input).map_err(|e| e.to_string())?;
    let goal = args
        .goal
        .parse::<OptimizationGoal>()
        .map_err(|e| format!("--goal: {e}"))?;

    let timing = if args.fixed_timing {
        validate_claim_age("--cpp-age", args.cpp_age, CPP_EARLIEST_CLAIM)?;
        validate_claim_age("--oas-age", args.oas_age, OAS_EARLIEST_CLAIM)?;
        let has_spouse = input.spouse().is_some();
        let spouse_cpp = args
            .spouse_cpp_age
            .or(has_spouse.then_some(BenefitStartAges::STANDARD_AGE));
        let spouse_oas = args
            .spouse_oas_age
            .or(has_spouse.then_some(BenefitStartAges::STANDARD_AGE));
        if let Some(age) = spouse_cpp {
            validate_claim_age("--spouse-cpp-age", age, CPP_EARLIEST_CLAIM)?;
        }
        if let Some(age) = spouse_oas {
            validate_claim_age("--spouse-oas-age", age, OAS_EARLIEST_CLAIM)?;
        }
        Some(BenefitStartAges {
            cpp_start_age: args.cpp_age,
            oas_start_age: args.oas_age,
            spouse_cpp_start_age: spouse_cpp,
            spouse_oas_start_age: spouse_oas,
        })
    } else {
        None
    };

    Ok(PlanRequest {
        input,
        goal,
        start_year: resolve_start_year(args.start_year).map_err(|e| format!("--start-year: {e}"))?,
        timing,
    })
}

fn build_compare_request(args: &CompareArgs, input: UserInput) -> Result<CompareRequest, String> {
    validate_user_input(&input).map_err(|e| e.to_string())?;
    Ok(CompareRequest {
        input,
        start_year: resolve_start_year(args.start_year).map_err(|e| format!("--start-year: {e}"))?,
    })
}

fn run_plan(request: &PlanRequest) -> OptimizedPlan {
    match request.timing {
        Some(timing) => OptimizedPlan {
            goal: request.goal,
            timing,
            plan: generate_retirement_plan(
                &request.input,
                &PlanOptions::new(request.goal, request.start_year).with_benefit_ages(timing),
            ),
        },
        None => generate_optimized_plan(&request.input, request.goal, request.start_year),
    }
}

fn run_compare(request: &CompareRequest) -> CompareResponse {
    CompareResponse {
        start_year: request.start_year,
        strategies: compare_strategies(&request.input, request.start_year),
    }
}

fn print_json<T: Serialize>(body: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(body).map_err(|e| format!("JSON output failed: {e}"))?;
    println!("{json}");
    Ok(())
}

pub fn run_plan_command(args: PlanArgs) -> Result<(), String> {
    let input = load_user_input(&args.input)?;
    let request = build_plan_request(&args, input)?;
    print_json(&run_plan(&request))
}

pub fn run_compare_command(args: CompareArgs) -> Result<(), String> {
    let input = load_user_input(&args.input)?;
    let request = build_compare_request(&args, input)?;
    print_json(&run_compare(&request))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/plan", post(plan_handler))
        .route("/api/compare", post(compare_handler))
        .route("/api/benefits", post(benefits_handler))
        .route("/api/strategies", get(strategies_handler))
        .route("/api/provinces", get(provinces_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "retirement planner API listening");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn plan_handler(payload: Result<Json<PlanPayload>, JsonRejection>) -> Response {
    let request = match payload
        .map_err(|rejection| rejection.body_text())
        .and_then(|Json(payload)| plan_request_from_payload(payload))
    {
        Ok(request) => request,
        Err(msg) => return bad_request("plan", &msg),
    };
    match tokio::task::spawn_blocking(move || run_plan(&request)).await {
        Ok(plan) => json_response(StatusCode::OK, plan),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Plan worker failed: {e}"),
        ),
    }
}

async fn compare_handler(payload: Result<Json<ComparePayload>, JsonRejection>) -> Response {
    let request = match payload
        .map_err(|rejection| rejection.body_text())
        .and_then(|Json(payload)| compare_request_from_payload(payload))
    {
        Ok(request) => request,
        Err(msg) => return bad_request("compare", &msg),
    };
    match tokio::task::spawn_blocking(move || run_compare(&request)).await {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Compare worker failed: {e}"),
        ),
    }
}

async fn benefits_handler(payload: Result<Json<BenefitsPayload>, JsonRejection>) -> Response {
    match payload
        .map_err(|rejection| rejection.body_text())
        .and_then(|Json(payload)| benefits_from_payload(payload))
    {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => bad_request("benefits", &msg),
    }
}

async fn strategies_handler() -> Response {
    json_response(StatusCode::OK, strategies_response())
}

async fn provinces_handler() -> Response {
    json_response(StatusCode::OK, provinces_response())
}

fn bad_request(endpoint: &str, msg: &str) -> Response {
    warn!(endpoint, error = msg, "rejected request");
    error_response(StatusCode::BAD_REQUEST, msg)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn plan_request_from_payload(payload: PlanPayload) -> Result<PlanRequest, String> {
    let input = payload
        .user_input
        .ok_or_else(|| "userInput is required".to_string())?;
    validate_user_input(&input).map_err(|e| e.to_string())?;

    let goal = match payload.goal.as_deref() {
        Some(tag) => tag.parse::<OptimizationGoal>().map_err(|e| e.to_string())?,
        None => OptimizationGoal::default(),
    };
    if let Some(timing) = &payload.benefit_start_ages {
        validate_timing(timing)?;
    }

    Ok(PlanRequest {
        input,
        goal,
        start_year: resolve_start_year(payload.start_year)?,
        timing: payload.benefit_start_ages,
    })
}

fn compare_request_from_payload(payload: ComparePayload) -> Result<CompareRequest, String> {
    let input = payload
        .user_input
        .ok_or_else(|| "userInput is required".to_string())?;
    validate_user_input(&input).map_err(|e| e.to_string())?;
    Ok(CompareRequest {
        input,
        start_year: resolve_start_year(payload.start_year)?,
    })
}

fn benefits_from_payload(payload: BenefitsPayload) -> Result<BenefitsResponse, String> {
    let age = payload.age.ok_or_else(|| "age is required".to_string())?;
    if age > MAX_AGE {
        return Err(format!("age must be <= {MAX_AGE}"));
    }
    let start_year = resolve_start_year(payload.start_year)?;
    let cpp_quote = payload.expected_cpp.unwrap_or_default();
    let oas_quote = payload.expected_oas.unwrap_or_default();
    if [cpp_quote.at60, cpp_quote.at65, cpp_quote.at70, oas_quote.at65, oas_quote.at70]
        .iter()
        .any(|amount| *amount < 0.0)
    {
        return Err("benefit amounts must be >= 0".to_string());
    }

    let cpp = (CPP_EARLIEST_CLAIM..=LATEST_CLAIM)
        .filter_map(|claim| {
            benefit_income_stream(age, claim, cpp_quote.into(), BenefitProgram::Cpp, start_year)
        })
        .collect();
    let oas = (OAS_EARLIEST_CLAIM..=LATEST_CLAIM)
        .filter_map(|claim| {
            benefit_income_stream(age, claim, oas_quote.into(), BenefitProgram::Oas, start_year)
        })
        .collect();
    Ok(BenefitsResponse {
        start_year,
        cpp,
        oas,
    })
}

fn strategies_response() -> StrategiesResponse {
    StrategiesResponse {
        strategies: OptimizationGoal::ALL
            .iter()
            .map(|&goal| StrategyDescriptor {
                tag: goal,
                label: goal.label(),
                description: goal.description(),
            })
            .collect(),
    }
}

fn provinces_response() -> ProvincesResponse {
    ProvincesResponse {
        tax_year: TAX_CONSTANTS.tax_year,
        provinces: PROVINCES
            .iter()
            .map(|province| ProvinceDescriptor {
                code: province.code,
                name: province.name,
            })
            .collect(),
    }
}

#[cfg(test)]
fn plan_request_from_json(json: &str) -> Result<PlanRequest, String> {
    let payload = serde_json::from_str::<PlanPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    plan_request_from_payload(payload)
}
