use super::error::{EngineError, require_non_negative};
use super::types::{MICRO_BIC_ABATEMENT, TaxImpact, TaxRegime};

/// Annual tax due on rental income under `regime`.
///
/// The regime is taken as given: Micro-BIC revenue ceilings and the minimum
/// abatement are not checked, and a Reel deficit is floored at zero without
/// being carried forward to later years.
#[allow(clippy::too_many_arguments)]
pub fn compute_tax(
    regime: TaxRegime,
    annual_rental_income: f64,
    annual_deductible_expenses: f64,
    annual_loan_interest: f64,
    depreciation_allowance: f64,
    tax_bracket_percent: f64,
    social_charges_rate_percent: f64,
) -> Result<TaxImpact, EngineError> {
    require_non_negative("annual_rental_income", annual_rental_income)?;
    require_non_negative("annual_deductible_expenses", annual_deductible_expenses)?;
    require_non_negative("annual_loan_interest", annual_loan_interest)?;
    require_non_negative("depreciation_allowance", depreciation_allowance)?;
    require_percent("tax_bracket_percent", tax_bracket_percent)?;
    require_percent("social_charges_rate_percent", social_charges_rate_percent)?;

    let taxable_income = taxable_income(
        regime,
        annual_rental_income,
        annual_deductible_expenses,
        annual_loan_interest,
        depreciation_allowance,
    );
    Ok(tax_on(
        regime,
        taxable_income,
        tax_bracket_percent,
        social_charges_rate_percent,
    ))
}

/// Tax that would be due with no abatement or deduction at all.
pub(crate) fn undeducted_tax(
    annual_rental_income: f64,
    tax_bracket_percent: f64,
    social_charges_rate_percent: f64,
) -> f64 {
    annual_rental_income.max(0.0) * (tax_bracket_percent + social_charges_rate_percent) / 100.0
}

pub(crate) fn require_percent(field: &str, value: f64) -> Result<f64, EngineError> {
    require_non_negative(field, value)?;
    if value > 100.0 {
        return Err(EngineError::invalid(field, "must be between 0 and 100"));
    }
    Ok(value)
}

fn taxable_income(
    regime: TaxRegime,
    annual_rental_income: f64,
    annual_deductible_expenses: f64,
    annual_loan_interest: f64,
    depreciation_allowance: f64,
) -> f64 {
    if annual_rental_income == 0.0 {
        return 0.0;
    }
    match regime {
        TaxRegime::MicroBic => annual_rental_income * (1.0 - MICRO_BIC_ABATEMENT),
        TaxRegime::Reel => (annual_rental_income
            - annual_deductible_expenses
            - annual_loan_interest
            - depreciation_allowance)
            .max(0.0),
    }
}

fn tax_on(
    regime: TaxRegime,
    taxable_income: f64,
    tax_bracket_percent: f64,
    social_charges_rate_percent: f64,
) -> TaxImpact {
    let income_tax = taxable_income * tax_bracket_percent / 100.0;
    let social_charges = taxable_income * social_charges_rate_percent / 100.0;
    let total_tax = income_tax + social_charges;
    let effective_tax_rate = if taxable_income > 0.0 {
        total_tax / taxable_income * 100.0
    } else {
        0.0
    };

    TaxImpact {
        regime,
        taxable_income,
        income_tax,
        social_charges,
        total_tax,
        effective_tax_rate,
    }
}
