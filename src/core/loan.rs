use super::error::{EngineError, require_non_negative};
use super::types::{AmortizationEntry, LoanResult, LoanTerms, MONTHS_PER_YEAR};

impl LoanTerms {
    pub fn amortize(&self) -> Result<LoanResult, EngineError> {
        amortize(self.principal, self.annual_rate_percent, self.term_years)
    }
}

pub fn amortize(
    principal: f64,
    annual_rate_percent: f64,
    term_years: i32,
) -> Result<LoanResult, EngineError> {
    require_non_negative("principal", principal)?;
    require_non_negative("annual_rate_percent", annual_rate_percent)?;
    if term_years < 0 {
        return Err(EngineError::invalid("term_years", "must be >= 0"));
    }

    if principal == 0.0 || term_years == 0 {
        return Ok(LoanResult::empty());
    }

    let periods = (term_years as u32)
        .checked_mul(MONTHS_PER_YEAR)
        .filter(|periods| *periods <= i32::MAX as u32)
        .ok_or_else(|| EngineError::invalid("term_years", "is too large"))?;
    let monthly_rate = annual_rate_percent / 100.0 / MONTHS_PER_YEAR as f64;
    let payment = monthly_payment(principal, monthly_rate, periods);
    if !payment.is_finite() || payment < 0.0 {
        return Err(EngineError::ComputationInconsistency(format!(
            "monthly payment {payment} for principal {principal}, \
             rate {annual_rate_percent}%, {term_years} years"
        )));
    }

    let mut schedule = Vec::with_capacity(periods as usize);
    let mut balance = principal;
    let mut cumulative_principal = 0.0;
    let mut cumulative_interest = 0.0;

    for payment_index in 1..=periods {
        let interest_paid = balance * monthly_rate;
        let is_final = payment_index == periods;

        // Final period absorbs the rounding residue so the loan closes at exactly zero.
        let principal_paid = if is_final {
            balance
        } else {
            (payment - interest_paid).min(balance)
        };

        balance = if is_final { 0.0 } else { balance - principal_paid };
        cumulative_principal = if is_final {
            principal
        } else {
            cumulative_principal + principal_paid
        };
        cumulative_interest += interest_paid;

        schedule.push(AmortizationEntry {
            payment_index,
            payment: principal_paid + interest_paid,
            principal_paid,
            interest_paid,
            remaining_balance: balance,
            cumulative_principal,
            cumulative_interest,
        });
    }

    Ok(LoanResult {
        monthly_payment: payment,
        total_interest: cumulative_interest,
        total_cost: principal + cumulative_interest,
        schedule,
    })
}

fn monthly_payment(principal: f64, monthly_rate: f64, periods: u32) -> f64 {
    if monthly_rate == 0.0 {
        return principal / periods as f64;
    }
    // (1 + r)^n - 1 through ln_1p/exp_m1 so tiny rates do not cancel to zero.
    let growth_minus_one = (periods as f64 * monthly_rate.ln_1p()).exp_m1();
    principal * monthly_rate * (growth_minus_one + 1.0) / growth_minus_one
}
