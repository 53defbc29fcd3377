use serde::Serialize;

pub const MONTHS_PER_YEAR: u32 = 12;
pub const MICRO_BIC_ABATEMENT: f64 = 0.5;
pub const DEFAULT_APPRECIATION_RATE_PERCENT: f64 = 2.0;
pub const ROI_RECONCILIATION_TOLERANCE: f64 = 0.5;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRegime {
    /// Flat 50% abatement on gross rent, no itemized deductions.
    MicroBic,
    /// Actual expenses, loan interest and depreciation are deducted.
    Reel,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LoanTerms {
    pub principal: f64,
    pub annual_rate_percent: f64,
    pub term_years: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmortizationEntry {
    pub payment_index: u32,
    pub payment: f64,
    pub principal_paid: f64,
    pub interest_paid: f64,
    pub remaining_balance: f64,
    pub cumulative_principal: f64,
    pub cumulative_interest: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanResult {
    pub monthly_payment: f64,
    pub total_interest: f64,
    pub total_cost: f64,
    pub schedule: Vec<AmortizationEntry>,
}

impl LoanResult {
    pub(crate) fn empty() -> Self {
        Self {
            monthly_payment: 0.0,
            total_interest: 0.0,
            total_cost: 0.0,
            schedule: Vec::new(),
        }
    }

    pub fn principal(&self) -> f64 {
        self.schedule
            .first()
            .map(|first| first.remaining_balance + first.principal_paid)
            .unwrap_or(0.0)
    }

    pub fn term_years(&self) -> u32 {
        (self.schedule.len() as u32).div_ceil(MONTHS_PER_YEAR)
    }

    /// Sum of interest over the 12 periods of `year` (1-based).
    pub fn interest_in_year(&self, year: u32) -> f64 {
        self.year_rows(year).fold(0.0, |total, row| total + row.interest_paid)
    }

    pub fn principal_in_year(&self, year: u32) -> f64 {
        self.year_rows(year).fold(0.0, |total, row| total + row.principal_paid)
    }

    /// Outstanding balance after the last payment of `year`; year 0 is the original principal.
    pub fn balance_after_year(&self, year: u32) -> f64 {
        if year == 0 {
            return self.principal();
        }
        (year as usize)
            .checked_mul(MONTHS_PER_YEAR as usize)
            .and_then(|index| self.schedule.get(index - 1))
            .map(|row| row.remaining_balance)
            .unwrap_or(0.0)
    }

    fn year_rows(&self, year: u32) -> impl Iterator<Item = &AmortizationEntry> {
        let start = (year.saturating_sub(1) as usize).saturating_mul(MONTHS_PER_YEAR as usize);
        let take = if year == 0 { 0 } else { MONTHS_PER_YEAR as usize };
        self.schedule.iter().skip(start).take(take)
    }
}

/// Caller-side expense inputs. `property_tax` is annual; every other category is monthly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseInputs {
    pub management_fees: Option<f64>,
    pub property_tax_annual: Option<f64>,
    pub insurance: Option<f64>,
    pub maintenance: Option<f64>,
    pub condo_fees: Option<f64>,
    pub other: Option<f64>,
    pub total_monthly: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseBreakdown {
    pub management_fees: f64,
    pub property_tax: f64,
    pub insurance: f64,
    pub maintenance: f64,
    pub condo_fees: f64,
    pub other: f64,
    pub total_monthly: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxImpact {
    pub regime: TaxRegime,
    pub taxable_income: f64,
    pub income_tax: f64,
    pub social_charges: f64,
    pub total_tax: f64,
    pub effective_tax_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyTaxEntry {
    pub year: u32,
    pub loan_interest: f64,
    pub taxable_income: f64,
    pub income_tax: f64,
    pub social_charges: f64,
    pub total_tax: f64,
    pub effective_tax_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseCosts {
    pub purchase_price: f64,
    pub notary_fees: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiBreakdown {
    pub cash_flow: f64,
    pub principal_paydown: f64,
    pub appreciation: f64,
    pub tax_benefits: f64,
}

impl RoiBreakdown {
    pub fn total(&self) -> f64 {
        self.cash_flow + self.principal_paydown + self.appreciation + self.tax_benefits
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapitalGainsProjection {
    pub years: u32,
    pub future_value: f64,
    pub capital_gains: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityYear {
    pub year: u32,
    pub property_value: f64,
    pub loan_balance: f64,
    pub equity: f64,
}

#[derive(Debug, Clone)]
pub struct InvestmentParams {
    pub purchase_price: f64,
    pub notary_fees_rate_percent: f64,
    pub monthly_rental_income: f64,
    pub expenses: ExpenseInputs,
    pub tax_regime: TaxRegime,
    pub tax_bracket_percent: f64,
    pub social_charges_rate_percent: f64,
    pub appreciation_rate_percent: Option<f64>,
    pub annual_depreciation: f64,
    pub holding_period_years: u32,
    pub yearly_tax_horizon: Option<u32>,
    pub personal_deposit: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestmentResult {
    pub purchase_costs: PurchaseCosts,
    pub monthly_cashflow: f64,
    pub annual_cashflow: f64,
    pub after_tax_monthly_cashflow: f64,
    pub after_tax_annual_cashflow: f64,
    pub roi: f64,
    pub after_tax_roi: f64,
    pub roi_breakdown: RoiBreakdown,
    pub expense_breakdown: ExpenseBreakdown,
    pub tax_impact: TaxImpact,
    pub capital_gains: CapitalGainsProjection,
    pub equity_projection: Vec<EquityYear>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_on_cash_return: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yearly_tax_data: Option<Vec<YearlyTaxEntry>>,
}
