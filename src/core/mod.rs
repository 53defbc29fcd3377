mod error;
mod investment;
mod loan;
mod tax;
mod types;

pub use error::EngineError;
pub use investment::{evaluate, expense_breakdown, project_capital_gains, purchase_costs};
pub use loan::amortize;
pub use tax::compute_tax;
pub use types::{
    AmortizationEntry, CapitalGainsProjection, DEFAULT_APPRECIATION_RATE_PERCENT, EquityYear,
    ExpenseBreakdown, ExpenseInputs, InvestmentParams, InvestmentResult, LoanResult, LoanTerms,
    PurchaseCosts, RoiBreakdown, TaxImpact, TaxRegime, YearlyTaxEntry,
};
