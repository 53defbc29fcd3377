use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::core::{
    AmortizationEntry, EngineError, ExpenseInputs, InvestmentParams, InvestmentResult, LoanResult,
    LoanTerms, TaxRegime, evaluate,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ApiTaxRegime {
    #[serde(alias = "microBic", alias = "micro-bic")]
    MicroBic,
    #[serde(alias = "regime_reel", alias = "real")]
    Reel,
}

impl From<ApiTaxRegime> for TaxRegime {
    fn from(value: ApiTaxRegime) -> Self {
        match value {
            ApiTaxRegime::MicroBic => TaxRegime::MicroBic,
            ApiTaxRegime::Reel => TaxRegime::Reel,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoanPayload {
    loan_amount: Option<f64>,
    interest_rate: Option<f64>,
    term_years: Option<i32>,
    personal_deposit: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExpensesPayload {
    management_fees: Option<f64>,
    /// Annual amount.
    property_tax: Option<f64>,
    insurance: Option<f64>,
    maintenance: Option<f64>,
    condo_fees: Option<f64>,
    other: Option<f64>,
    total_monthly: Option<f64>,
}

impl From<ExpensesPayload> for ExpenseInputs {
    fn from(value: ExpensesPayload) -> Self {
        ExpenseInputs {
            management_fees: value.management_fees,
            property_tax_annual: value.property_tax,
            insurance: value.insurance,
            maintenance: value.maintenance,
            condo_fees: value.condo_fees,
            other: value.other,
            total_monthly: value.total_monthly,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoanDataPayload {
    loan_amount: Option<f64>,
    interest_rate: Option<f64>,
    term_years: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InvestmentPayload {
    purchase_price: Option<f64>,
    notary_fees_rate: Option<f64>,
    rental_income: Option<f64>,
    expenses: Option<ExpensesPayload>,
    tax_regime: Option<ApiTaxRegime>,
    tax_bracket: Option<f64>,
    social_charges_rate: Option<f64>,
    appreciation_rate: Option<f64>,
    annual_depreciation: Option<f64>,
    holding_period_years: Option<u32>,
    horizon_years: Option<u32>,
    yearly_tax_data: Option<bool>,
    personal_deposit: Option<f64>,
    loan_data: Option<LoanDataPayload>,
}

#[derive(Debug, Serialize)]
struct LoanResponse {
    monthly_payment: f64,
    total_interest: f64,
    total_cost: f64,
    annual_payment: f64,
    amortization_schedule: Vec<AmortizationEntry>,
    personal_deposit: f64,
    loan_amount: f64,
    term_years: i32,
    interest_rate: f64,
}

#[derive(Debug, Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

#[derive(Debug, Clone, PartialEq)]
enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) | ApiError::Internal(msg) => msg,
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(value: EngineError) -> Self {
        match value {
            EngineError::InvalidInput { .. } => ApiError::BadRequest(value.to_string()),
            EngineError::ComputationInconsistency(_) => ApiError::Internal(value.to_string()),
        }
    }
}

pub fn router(settings: Settings) -> Router {
    Router::new()
        .route("/api/calculate-loan", post(calculate_loan_handler))
        .route("/api/calculate-investment", post(calculate_investment_handler))
        .fallback(not_found_handler)
        .with_state(settings)
}

pub async fn run_http_server(port: u16, settings: Settings) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(settings);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "rental yield HTTP API listening");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    json_response(
        StatusCode::NOT_FOUND,
        ErrorResponse {
            success: false,
            error: "Not found".to_string(),
        },
    )
}

async fn calculate_loan_handler(
    State(settings): State<Settings>,
    payload: Result<Json<LoanPayload>, JsonRejection>,
) -> Response {
    let outcome = payload
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
        .and_then(|Json(payload)| {
            info!(
                loan_amount = ?payload.loan_amount,
                interest_rate = ?payload.interest_rate,
                term_years = ?payload.term_years,
                "loan calculation request"
            );
            build_loan_response(payload, &settings)
        });
    respond("calculate-loan", outcome)
}

async fn calculate_investment_handler(
    State(settings): State<Settings>,
    payload: Result<Json<InvestmentPayload>, JsonRejection>,
) -> Response {
    let outcome = payload
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
        .and_then(|Json(payload)| {
            info!(
                purchase_price = ?payload.purchase_price,
                rental_income = ?payload.rental_income,
                tax_regime = ?payload.tax_regime,
                with_loan = payload.loan_data.is_some(),
                "investment calculation request"
            );
            build_investment_response(payload, &settings)
        });
    respond("calculate-investment", outcome)
}

fn respond<T: Serialize>(endpoint: &str, outcome: Result<T, ApiError>) -> Response {
    match outcome {
        Ok(data) => json_response(
            StatusCode::OK,
            SuccessResponse {
                success: true,
                data,
            },
        ),
        Err(err) => {
            match &err {
                ApiError::BadRequest(msg) => warn!(endpoint, error = %msg, "rejected request"),
                ApiError::Internal(msg) => error!(endpoint, error = %msg, "calculation failed"),
            }
            error_response(&err)
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(err: &ApiError) -> Response {
    json_response(
        err.status(),
        ErrorResponse {
            success: false,
            error: err.message().to_string(),
        },
    )
}

fn required<T>(value: Option<T>, name: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::BadRequest(format!("{name} is required")))
}

fn loan_terms(
    loan_amount: Option<f64>,
    interest_rate: Option<f64>,
    term_years: Option<i32>,
    settings: &Settings,
) -> Result<LoanTerms, ApiError> {
    let terms = LoanTerms {
        principal: required(loan_amount, "loan_amount")?,
        annual_rate_percent: required(interest_rate, "interest_rate")?,
        term_years: required(term_years, "term_years")?,
    };
    if terms.term_years > settings.max_term_years as i32 {
        return Err(ApiError::BadRequest(format!(
            "term_years must be <= {}",
            settings.max_term_years
        )));
    }
    if terms.annual_rate_percent > 100.0 {
        return Err(ApiError::BadRequest(
            "interest_rate must be between 0 and 100".to_string(),
        ));
    }
    Ok(terms)
}

fn build_loan_response(
    payload: LoanPayload,
    settings: &Settings,
) -> Result<LoanResponse, ApiError> {
    let terms = loan_terms(
        payload.loan_amount,
        payload.interest_rate,
        payload.term_years,
        settings,
    )?;
    let personal_deposit = payload.personal_deposit.unwrap_or(0.0);
    if !personal_deposit.is_finite() || personal_deposit < 0.0 {
        return Err(ApiError::BadRequest(
            "personal_deposit must be >= 0".to_string(),
        ));
    }

    let loan = terms.amortize()?;
    Ok(LoanResponse {
        monthly_payment: loan.monthly_payment,
        total_interest: loan.total_interest,
        total_cost: loan.total_cost,
        annual_payment: loan.monthly_payment * 12.0,
        amortization_schedule: loan.schedule,
        personal_deposit,
        loan_amount: terms.principal,
        term_years: terms.term_years,
        interest_rate: terms.annual_rate_percent,
    })
}

fn build_investment_response(
    payload: InvestmentPayload,
    settings: &Settings,
) -> Result<InvestmentResult, ApiError> {
    let loan: Option<LoanResult> = match payload.loan_data {
        Some(data) => {
            let terms = loan_terms(data.loan_amount, data.interest_rate, data.term_years, settings)?;
            Some(terms.amortize()?)
        }
        None => None,
    };

    let holding_period_years = payload
        .holding_period_years
        .unwrap_or(settings.holding_period_years);
    if holding_period_years > settings.max_term_years {
        return Err(ApiError::BadRequest(format!(
            "holding_period_years must be <= {}",
            settings.max_term_years
        )));
    }

    let horizon = payload
        .horizon_years
        .or_else(|| loan.as_ref().map(LoanResult::term_years).filter(|years| *years > 0))
        .unwrap_or(holding_period_years);
    if horizon > settings.max_term_years {
        return Err(ApiError::BadRequest(format!(
            "horizon_years must be <= {}",
            settings.max_term_years
        )));
    }

    let params = InvestmentParams {
        purchase_price: required(payload.purchase_price, "purchase_price")?,
        notary_fees_rate_percent: payload
            .notary_fees_rate
            .unwrap_or(settings.notary_fees_rate_percent),
        monthly_rental_income: required(payload.rental_income, "rental_income")?,
        expenses: payload.expenses.unwrap_or_default().into(),
        tax_regime: payload
            .tax_regime
            .map(TaxRegime::from)
            .unwrap_or_else(|| settings.tax_regime.into()),
        tax_bracket_percent: payload.tax_bracket.unwrap_or(settings.tax_bracket_percent),
        social_charges_rate_percent: payload
            .social_charges_rate
            .unwrap_or(settings.social_charges_rate_percent),
        appreciation_rate_percent: Some(
            payload
                .appreciation_rate
                .unwrap_or(settings.appreciation_rate_percent),
        ),
        annual_depreciation: payload.annual_depreciation.unwrap_or(0.0),
        holding_period_years,
        yearly_tax_horizon: payload.yearly_tax_data.unwrap_or(true).then_some(horizon),
        personal_deposit: payload.personal_deposit,
    };

    Ok(evaluate(&params, loan.as_ref())?)
}

#[cfg(test)]
fn loan_response_from_json(json: &str, settings: &Settings) -> Result<LoanResponse, ApiError> {
    let payload = serde_json::from_str::<LoanPayload>(json)
        .map_err(|e| ApiError::BadRequest(format!("Invalid API JSON payload: {e}")))?;
    build_loan_response(payload, settings)
}

#[cfg(test)]
fn investment_response_from_json(
    json: &str,
    settings: &Settings,
) -> Result<InvestmentResult, ApiError> {
    let payload = serde_json::from_str::<InvestmentPayload>(json)
        .map_err(|e| ApiError::BadRequest(format!("Invalid API JSON payload: {e}")))?;
    build_investment_response(payload, settings)
}
