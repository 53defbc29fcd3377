use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rental_yield::config::Settings;
use rental_yield::core::LoanTerms;

#[derive(Parser, Debug)]
#[command(
    name = "rental_yield",
    about = "Loan amortization, French rental tax and ROI calculator for buy-to-let purchases"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the calculate-loan and calculate-investment HTTP endpoints
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[command(flatten)]
        settings: Settings,
    },
    /// Print the amortization of a single loan as JSON
    Loan {
        #[arg(long)]
        principal: f64,
        #[arg(long, help = "Annual nominal rate in percent, e.g. 3.5")]
        rate: f64,
        #[arg(long)]
        years: i32,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Serve { port, settings } => {
            if let Err(e) = settings.validate() {
                eprintln!("Invalid configuration: {e}");
                std::process::exit(2);
            }
            if let Err(e) = rental_yield::api::run_http_server(port, settings).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Loan {
            principal,
            rate,
            years,
        } => {
            let terms = LoanTerms {
                principal,
                annual_rate_percent: rate,
                term_years: years,
            };
            match terms.amortize() {
                Ok(loan) => match serde_json::to_string_pretty(&loan) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("Serialization error: {e}");
                        std::process::exit(1);
                    }
                },
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
