use clap::{Args, ValueEnum};

use crate::core::TaxRegime;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliTaxRegime {
    MicroBic,
    Reel,
}

impl From<CliTaxRegime> for TaxRegime {
    fn from(value: CliTaxRegime) -> Self {
        match value {
            CliTaxRegime::MicroBic => TaxRegime::MicroBic,
            CliTaxRegime::Reel => TaxRegime::Reel,
        }
    }
}

/// Assumptions applied to every calculation unless the request overrides them.
#[derive(Args, Clone, Debug, PartialEq)]
pub struct Settings {
    #[arg(
        long,
        value_enum,
        default_value_t = CliTaxRegime::MicroBic,
        help = "Tax regime used when a request does not name one"
    )]
    pub tax_regime: CliTaxRegime,
    #[arg(
        long,
        default_value_t = 30.0,
        help = "Marginal income tax bracket in percent"
    )]
    pub tax_bracket_percent: f64,
    #[arg(
        long,
        default_value_t = 17.2,
        help = "Social charges on rental income in percent"
    )]
    pub social_charges_rate_percent: f64,
    #[arg(
        long,
        default_value_t = 8.0,
        help = "Notary fees as a percent of the purchase price"
    )]
    pub notary_fees_rate_percent: f64,
    #[arg(
        long,
        default_value_t = 2.0,
        help = "Annual property appreciation in percent"
    )]
    pub appreciation_rate_percent: f64,
    #[arg(
        long,
        default_value_t = 10,
        help = "Years used for capital gains and equity projections"
    )]
    pub holding_period_years: u32,
    #[arg(
        long,
        default_value_t = 50,
        help = "Longest loan term or horizon accepted from a request"
    )]
    pub max_term_years: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tax_regime: CliTaxRegime::MicroBic,
            tax_bracket_percent: 30.0,
            social_charges_rate_percent: 17.2,
            notary_fees_rate_percent: 8.0,
            appreciation_rate_percent: 2.0,
            holding_period_years: 10,
            max_term_years: 50,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        for (name, rate) in [
            ("--tax-bracket-percent", self.tax_bracket_percent),
            (
                "--social-charges-rate-percent",
                self.social_charges_rate_percent,
            ),
            ("--notary-fees-rate-percent", self.notary_fees_rate_percent),
        ] {
            if !(0.0..=100.0).contains(&rate) {
                return Err(format!("{name} must be between 0 and 100"));
            }
        }

        if !self.appreciation_rate_percent.is_finite() || self.appreciation_rate_percent <= -100.0
        {
            return Err("--appreciation-rate-percent must be > -100".to_string());
        }

        if self.max_term_years == 0 {
            return Err("--max-term-years must be > 0".to_string());
        }

        if self.holding_period_years == 0 || self.holding_period_years > self.max_term_years {
            return Err("--holding-period-years must be between 1 and --max-term-years".to_string());
        }

        Ok(())
    }
}
