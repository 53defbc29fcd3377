use super::error::{EngineError, require_finite, require_non_negative};
use super::tax::{compute_tax, require_percent, undeducted_tax};
use super::types::{
    CapitalGainsProjection, DEFAULT_APPRECIATION_RATE_PERCENT, EquityYear, ExpenseBreakdown,
    ExpenseInputs, InvestmentParams, InvestmentResult, LoanResult, MONTHS_PER_YEAR,
    PurchaseCosts, ROI_RECONCILIATION_TOLERANCE, RoiBreakdown, TaxImpact, YearlyTaxEntry,
};

const MONTHS: f64 = MONTHS_PER_YEAR as f64;

pub fn evaluate(
    params: &InvestmentParams,
    loan: Option<&LoanResult>,
) -> Result<InvestmentResult, EngineError> {
    validate_params(params)?;
    if let Some(loan) = loan {
        if !loan.monthly_payment.is_finite() || loan.monthly_payment < 0.0 {
            return Err(EngineError::invalid(
                "loan_result.monthly_payment",
                "must be a finite number >= 0",
            ));
        }
    }

    let appreciation_rate_percent = params
        .appreciation_rate_percent
        .unwrap_or(DEFAULT_APPRECIATION_RATE_PERCENT);
    let purchase_costs = purchase_costs(params.purchase_price, params.notary_fees_rate_percent);
    let expense_breakdown = expense_breakdown(&params.expenses)?;

    let loan_payment = loan.map(|l| l.monthly_payment).unwrap_or(0.0);
    let monthly_cashflow =
        params.monthly_rental_income - expense_breakdown.total_monthly - loan_payment;
    let annual_cashflow = monthly_cashflow * MONTHS;

    let tax_impact = tax_for_year(params, &expense_breakdown, loan, 1)?;

    let after_tax_monthly_cashflow = monthly_cashflow - tax_impact.total_tax / MONTHS;
    let after_tax_annual_cashflow = after_tax_monthly_cashflow * MONTHS;

    let total_cost = purchase_costs.total_cost;
    let roi = annual_cashflow / total_cost * 100.0;
    let after_tax_roi = after_tax_annual_cashflow / total_cost * 100.0;
    let roi_breakdown = roi_breakdown(
        params,
        loan,
        &tax_impact,
        total_cost,
        appreciation_rate_percent,
        annual_cashflow,
        after_tax_roi,
    )?;

    let capital_gains = project_capital_gains(
        params.purchase_price,
        appreciation_rate_percent,
        params.holding_period_years,
    );
    let equity_projection = project_equity(
        params.purchase_price,
        appreciation_rate_percent,
        params.holding_period_years,
        loan,
    );

    let cash_on_cash_return = params
        .personal_deposit
        .filter(|deposit| *deposit > 0.0)
        .map(|deposit| after_tax_annual_cashflow / deposit * 100.0);

    let yearly_tax_data = match params.yearly_tax_horizon {
        Some(horizon) => Some(
            (1..=horizon)
                .map(|year| {
                    let loan_interest = loan.map(|l| l.interest_in_year(year)).unwrap_or(0.0);
                    tax_for_year(params, &expense_breakdown, loan, year).map(|tax| {
                        YearlyTaxEntry {
                            year,
                            loan_interest,
                            taxable_income: tax.taxable_income,
                            income_tax: tax.income_tax,
                            social_charges: tax.social_charges,
                            total_tax: tax.total_tax,
                            effective_tax_rate: tax.effective_tax_rate,
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
        None => None,
    };

    Ok(InvestmentResult {
        purchase_costs,
        monthly_cashflow,
        annual_cashflow,
        after_tax_monthly_cashflow,
        after_tax_annual_cashflow,
        roi,
        after_tax_roi,
        roi_breakdown,
        expense_breakdown,
        tax_impact,
        capital_gains,
        equity_projection,
        cash_on_cash_return,
        yearly_tax_data,
    })
}

pub fn purchase_costs(purchase_price: f64, notary_fees_rate_percent: f64) -> PurchaseCosts {
    let notary_fees = purchase_price * notary_fees_rate_percent / 100.0;
    PurchaseCosts {
        purchase_price,
        notary_fees,
        total_cost: purchase_price + notary_fees,
    }
}

/// Monthly view of the expenses. When any category is given the total is the
/// category sum and the caller's `total_monthly` is ignored.
pub fn expense_breakdown(expenses: &ExpenseInputs) -> Result<ExpenseBreakdown, EngineError> {
    let categories = [
        ("expenses.management_fees", expenses.management_fees),
        ("expenses.property_tax", expenses.property_tax_annual),
        ("expenses.insurance", expenses.insurance),
        ("expenses.maintenance", expenses.maintenance),
        ("expenses.condo_fees", expenses.condo_fees),
        ("expenses.other", expenses.other),
    ];
    for (field, value) in categories {
        if let Some(v) = value {
            require_non_negative(field, v)?;
        }
    }

    let has_categories = categories.iter().any(|(_, value)| value.is_some());
    let mut breakdown = ExpenseBreakdown {
        management_fees: expenses.management_fees.unwrap_or(0.0),
        property_tax: expenses.property_tax_annual.unwrap_or(0.0) / MONTHS,
        insurance: expenses.insurance.unwrap_or(0.0),
        maintenance: expenses.maintenance.unwrap_or(0.0),
        condo_fees: expenses.condo_fees.unwrap_or(0.0),
        other: expenses.other.unwrap_or(0.0),
        total_monthly: 0.0,
    };

    breakdown.total_monthly = if has_categories {
        breakdown.management_fees
            + breakdown.property_tax
            + breakdown.insurance
            + breakdown.maintenance
            + breakdown.condo_fees
            + breakdown.other
    } else {
        require_non_negative(
            "expenses.total_monthly",
            expenses.total_monthly.unwrap_or(0.0),
        )?
    };

    Ok(breakdown)
}

pub fn project_capital_gains(
    purchase_price: f64,
    appreciation_rate_percent: f64,
    years: u32,
) -> CapitalGainsProjection {
    let future_value = appreciated_value(purchase_price, appreciation_rate_percent, years);
    CapitalGainsProjection {
        years,
        future_value,
        capital_gains: future_value - purchase_price,
    }
}

fn project_equity(
    purchase_price: f64,
    appreciation_rate_percent: f64,
    years: u32,
    loan: Option<&LoanResult>,
) -> Vec<EquityYear> {
    (0..=years)
        .map(|year| {
            let property_value = appreciated_value(purchase_price, appreciation_rate_percent, year);
            let loan_balance = loan.map(|l| l.balance_after_year(year)).unwrap_or(0.0);
            EquityYear {
                year,
                property_value,
                loan_balance,
                equity: property_value - loan_balance,
            }
        })
        .collect()
}

fn appreciated_value(purchase_price: f64, appreciation_rate_percent: f64, years: u32) -> f64 {
    purchase_price * (1.0 + appreciation_rate_percent / 100.0).powi(years as i32)
}

fn tax_for_year(
    params: &InvestmentParams,
    expenses: &ExpenseBreakdown,
    loan: Option<&LoanResult>,
    year: u32,
) -> Result<TaxImpact, EngineError> {
    compute_tax(
        params.tax_regime,
        params.monthly_rental_income * MONTHS,
        expenses.total_monthly * MONTHS,
        loan.map(|l| l.interest_in_year(year)).unwrap_or(0.0),
        params.annual_depreciation,
        params.tax_bracket_percent,
        params.social_charges_rate_percent,
    )
}

/// Splits `after_tax_roi` into four parts. Paydown, appreciation and the tax
/// saving against an undeducted baseline are computed directly. The cash-flow
/// part is the pre-tax cash flow net of the baseline tax, less paydown and
/// appreciation, and is checked against the after-tax ROI computed by the caller.
fn roi_breakdown(
    params: &InvestmentParams,
    loan: Option<&LoanResult>,
    tax_impact: &TaxImpact,
    total_cost: f64,
    appreciation_rate_percent: f64,
    annual_cashflow: f64,
    after_tax_roi: f64,
) -> Result<RoiBreakdown, EngineError> {
    let first_year_principal = loan.map(|l| l.principal_in_year(1)).unwrap_or(0.0);
    let principal_paydown = first_year_principal / total_cost * 100.0;
    let appreciation =
        params.purchase_price * appreciation_rate_percent / 100.0 / total_cost * 100.0;

    let baseline_tax = undeducted_tax(
        params.monthly_rental_income * MONTHS,
        params.tax_bracket_percent,
        params.social_charges_rate_percent,
    );
    let tax_benefits = (baseline_tax - tax_impact.total_tax) / total_cost * 100.0;
    let cash_flow =
        (annual_cashflow - baseline_tax) / total_cost * 100.0 - principal_paydown - appreciation;

    let breakdown = RoiBreakdown {
        cash_flow,
        principal_paydown,
        appreciation,
        tax_benefits,
    };

    let drift = (breakdown.total() - after_tax_roi).abs();
    if drift.is_nan() || drift > ROI_RECONCILIATION_TOLERANCE {
        return Err(EngineError::ComputationInconsistency(format!(
            "ROI components sum to {} but after-tax ROI is {after_tax_roi}",
            breakdown.total()
        )));
    }
    Ok(breakdown)
}

fn validate_params(params: &InvestmentParams) -> Result<(), EngineError> {
    require_finite("purchase_price", params.purchase_price)?;
    if params.purchase_price <= 0.0 {
        return Err(EngineError::invalid("purchase_price", "must be > 0"));
    }
    require_non_negative("monthly_rental_income", params.monthly_rental_income)?;
    require_percent("notary_fees_rate_percent", params.notary_fees_rate_percent)?;
    require_percent("tax_bracket_percent", params.tax_bracket_percent)?;
    require_percent(
        "social_charges_rate_percent",
        params.social_charges_rate_percent,
    )?;
    require_non_negative("annual_depreciation", params.annual_depreciation)?;

    if let Some(rate) = params.appreciation_rate_percent {
        require_finite("appreciation_rate_percent", rate)?;
        if rate <= -100.0 {
            return Err(EngineError::invalid(
                "appreciation_rate_percent",
                "must be > -100",
            ));
        }
    }
    if let Some(deposit) = params.personal_deposit {
        require_non_negative("personal_deposit", deposit)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loan::amortize;
    use crate::core::types::TaxRegime;

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn sample_params() -> InvestmentParams {
        InvestmentParams {
            purchase_price: 200_000.0,
            notary_fees_rate_percent: 8.0,
            monthly_rental_income: 1_000.0,
            expenses: ExpenseInputs::default(),
            tax_regime: TaxRegime::Reel,
            tax_bracket_percent: 30.0,
            social_charges_rate_percent: 17.2,
            appreciation_rate_percent: None,
            annual_depreciation: 0.0,
            holding_period_years: 10,
            yearly_tax_horizon: None,
            personal_deposit: None,
        }
    }

    #[test]
    fn purchase_costs_add_notary_fees() {
        let costs = purchase_costs(200_000.0, 8.0);
        assert_approx_tol(costs.notary_fees, 16_000.0, 1e-9);
        assert_approx_tol(costs.total_cost, 216_000.0, 1e-9);
    }

    #[test]
    fn expense_breakdown_converts_annual_property_tax_and_recomputes_total() {
        let expenses = ExpenseInputs {
            management_fees: Some(60.0),
            property_tax_annual: Some(1_200.0),
            insurance: Some(15.0),
            maintenance: Some(25.0),
            condo_fees: Some(80.0),
            other: None,
            total_monthly: Some(9_999.0),
        };
        let breakdown = expense_breakdown(&expenses).unwrap();

        assert_approx_tol(breakdown.property_tax, 100.0, 1e-9);
        assert_eq!(breakdown.other, 0.0);
        assert_approx_tol(breakdown.total_monthly, 280.0, 1e-9);
    }

    #[test]
    fn expense_breakdown_falls_back_to_total_without_categories() {
        let expenses = ExpenseInputs {
            total_monthly: Some(150.0),
            ..ExpenseInputs::default()
        };
        assert_eq!(expense_breakdown(&expenses).unwrap().total_monthly, 150.0);
        assert_eq!(
            expense_breakdown(&ExpenseInputs::default()).unwrap().total_monthly,
            0.0
        );
    }

    #[test]
    fn negative_expense_is_rejected() {
        let expenses = ExpenseInputs {
            insurance: Some(-5.0),
            ..ExpenseInputs::default()
        };
        let err = expense_breakdown(&expenses).unwrap_err();
        assert!(
            matches!(err, EngineError::InvalidInput { ref field, .. } if field == "expenses.insurance")
        );
    }

    #[test]
    fn cashflow_without_loan_is_rent_minus_expenses() {
        let mut params = sample_params();
        params.tax_regime = TaxRegime::MicroBic;
        params.expenses = ExpenseInputs {
            total_monthly: Some(200.0),
            ..ExpenseInputs::default()
        };
        let result = evaluate(&params, None).unwrap();

        assert_approx_tol(result.monthly_cashflow, 800.0, 1e-9);
        assert_approx_tol(result.annual_cashflow, 9_600.0, 1e-9);
        assert_approx_tol(result.tax_impact.taxable_income, 6_000.0, 1e-9);
        assert_approx_tol(result.tax_impact.total_tax, 2_832.0, 1e-9);
        assert_approx_tol(result.after_tax_monthly_cashflow, 800.0 - 236.0, 1e-9);
        assert_approx_tol(result.roi, 9_600.0 / 216_000.0 * 100.0, 1e-9);
        assert_approx_tol(result.after_tax_roi, 6_768.0 / 216_000.0 * 100.0, 1e-9);
        assert_eq!(result.roi_breakdown.principal_paydown, 0.0);
        assert!(result.cash_on_cash_return.is_none());
        assert!(result.yearly_tax_data.is_none());
    }

    #[test]
    fn loan_payment_and_first_year_interest_flow_into_cashflow_and_tax() {
        let loan = amortize(180_000.0, 3.0, 20).unwrap();
        let result = evaluate(&sample_params(), Some(&loan)).unwrap();

        assert_approx_tol(result.monthly_cashflow, 1_000.0 - loan.monthly_payment, 1e-9);
        assert_approx_tol(
            result.tax_impact.taxable_income,
            12_000.0 - loan.interest_in_year(1),
            1e-9,
        );
        assert_approx_tol(result.tax_impact.taxable_income, 6_691.22, 0.01);
        assert_approx_tol(result.after_tax_roi, -1.4526, 0.001);
    }

    #[test]
    fn roi_breakdown_reconciles_with_after_tax_roi() {
        let loan = amortize(180_000.0, 3.0, 20).unwrap();
        let result = evaluate(&sample_params(), Some(&loan)).unwrap();
        let breakdown = &result.roi_breakdown;

        assert_approx_tol(breakdown.principal_paydown, 6_670.53 / 216_000.0 * 100.0, 1e-4);
        assert_approx_tol(breakdown.appreciation, 4_000.0 / 216_000.0 * 100.0, 1e-9);
        let baseline = 12_000.0 * 0.472;
        assert_approx_tol(
            breakdown.tax_benefits,
            (baseline - result.tax_impact.total_tax) / 216_000.0 * 100.0,
            1e-9,
        );
        assert!(breakdown.tax_benefits > 0.0);
        assert_approx_tol(breakdown.total(), result.after_tax_roi, 0.5);
    }

    #[test]
    fn roi_breakdown_rejects_after_tax_roi_that_does_not_reconcile() {
        let params = sample_params();
        let loan = amortize(180_000.0, 3.0, 20).unwrap();
        let result = evaluate(&params, Some(&loan)).unwrap();
        let check = |after_tax_roi: f64| {
            roi_breakdown(
                &params,
                Some(&loan),
                &result.tax_impact,
                216_000.0,
                2.0,
                result.annual_cashflow,
                after_tax_roi,
            )
        };

        assert_eq!(check(result.after_tax_roi).unwrap(), result.roi_breakdown);
        let err = check(result.after_tax_roi + 1.0).unwrap_err();
        assert!(matches!(err, EngineError::ComputationInconsistency(_)));
        assert!(check(f64::NAN).is_err());
    }

    #[test]
    fn tax_benefit_is_reported_relative_to_undeducted_baseline() {
        let mut params = sample_params();
        params.tax_regime = TaxRegime::MicroBic;
        let result = evaluate(&params, None).unwrap();

        // Half the rent is abated, so half the undeducted tax is saved.
        assert_approx_tol(
            result.roi_breakdown.tax_benefits,
            2_832.0 / 216_000.0 * 100.0,
            1e-9,
        );
    }

    #[test]
    fn appreciation_defaults_to_two_percent() {
        let mut params = sample_params();
        let default_rate = evaluate(&params, None).unwrap();
        params.appreciation_rate_percent = Some(2.0);
        let explicit_rate = evaluate(&params, None).unwrap();

        assert_eq!(default_rate, explicit_rate);
        assert_approx_tol(
            default_rate.capital_gains.future_value,
            200_000.0 * 1.02f64.powi(10),
            1e-6,
        );
        assert_eq!(default_rate.capital_gains.years, 10);
    }

    #[test]
    fn equity_projection_tracks_value_and_loan_balance() {
        let loan = amortize(180_000.0, 3.0, 20).unwrap();
        let mut params = sample_params();
        params.holding_period_years = 25;
        let result = evaluate(&params, Some(&loan)).unwrap();

        assert_eq!(result.equity_projection.len(), 26);
        let start = &result.equity_projection[0];
        assert_approx_tol(start.loan_balance, 180_000.0, 1e-6);
        assert_approx_tol(start.equity, 20_000.0, 1e-6);

        let first = &result.equity_projection[1];
        assert_approx_tol(first.property_value, 204_000.0, 1e-6);
        assert_approx_tol(first.loan_balance, loan.balance_after_year(1), 1e-9);

        assert_eq!(result.equity_projection[20].loan_balance, 0.0);
        assert_eq!(result.equity_projection[25].loan_balance, 0.0);
    }

    #[test]
    fn yearly_tax_data_uses_each_years_interest() {
        let loan = amortize(180_000.0, 3.0, 20).unwrap();
        let mut params = sample_params();
        params.yearly_tax_horizon = Some(loan.term_years());
        let result = evaluate(&params, Some(&loan)).unwrap();
        let years = result.yearly_tax_data.as_ref().unwrap();

        assert_eq!(years.len(), 20);
        assert_eq!(years[0].year, 1);
        assert_approx_tol(years[0].taxable_income, result.tax_impact.taxable_income, 1e-9);
        for window in years.windows(2) {
            assert!(window[1].loan_interest < window[0].loan_interest);
            assert!(window[1].taxable_income > window[0].taxable_income);
        }
        for entry in years {
            assert_approx_tol(
                entry.taxable_income,
                12_000.0 - loan.interest_in_year(entry.year),
                1e-9,
            );
        }
    }

    #[test]
    fn cash_on_cash_return_requires_positive_deposit() {
        let mut params = sample_params();
        params.personal_deposit = Some(0.0);
        assert!(evaluate(&params, None).unwrap().cash_on_cash_return.is_none());

        params.personal_deposit = Some(36_000.0);
        let result = evaluate(&params, None).unwrap();
        assert_approx_tol(
            result.cash_on_cash_return.unwrap(),
            result.after_tax_annual_cashflow / 36_000.0 * 100.0,
            1e-9,
        );
    }

    #[test]
    fn invalid_investment_inputs_are_rejected() {
        let mut params = sample_params();
        params.purchase_price = 0.0;
        assert!(evaluate(&params, None).is_err());

        let mut params = sample_params();
        params.monthly_rental_income = -1.0;
        let err = evaluate(&params, None).unwrap_err();
        assert!(
            matches!(err, EngineError::InvalidInput { ref field, .. } if field == "monthly_rental_income")
        );

        let mut bad_loan = amortize(180_000.0, 3.0, 20).unwrap();
        bad_loan.monthly_payment = -10.0;
        let err = evaluate(&sample_params(), Some(&bad_loan)).unwrap_err();
        assert!(
            matches!(err, EngineError::InvalidInput { ref field, .. } if field == "loan_result.monthly_payment")
        );
    }

    #[test]
    fn repeated_evaluation_is_byte_identical() {
        let loan = amortize(180_000.0, 3.0, 20).unwrap();
        let mut params = sample_params();
        params.yearly_tax_horizon = Some(20);

        let first = serde_json::to_string(&evaluate(&params, Some(&loan)).unwrap()).unwrap();
        let second = serde_json::to_string(&evaluate(&params, Some(&loan)).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
