//! Management commands for forecasts and fiscal calendars.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::{Datelike, Local};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use thiserror::Error;

use genie_crm::db::establish_connection_pool;
use genie_crm::domain::types::{
    CompanyId, FiscalYearId, ForecastTypeId, TypeConstraintError, UserId,
};
use genie_crm::dto::forecast::ForecastExportRow;
use genie_crm::models::config::AppConfig;
use genie_crm::repository::DieselRepository;
use genie_crm::services::ServiceError;
use genie_crm::services::currency::convert_company_currency;
use genie_crm::services::fiscal_year::{generate_fiscal_years, update_fiscal_years};
use genie_crm::services::forecast::{
    RecalculationFilter, generate_forecasts, generate_forecasts_for_user, list_forecasts,
    recalculate_forecasts,
};

#[derive(Parser, Debug)]
#[command(name = "genie-crm", about = "Forecast and fiscal calendar maintenance")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recompute stored forecasts from their opportunities.
    RecalculateForecasts {
        #[arg(long)]
        company_id: Option<i32>,
        #[arg(long)]
        user_id: Option<i32>,
        #[arg(long)]
        fiscal_year_id: Option<i32>,
        #[arg(long)]
        forecast_type_id: Option<i32>,
        /// Report differences without saving them.
        #[arg(long)]
        dry_run: bool,
    },
    /// Create missing forecasts of a fiscal year and refresh existing ones.
    GenerateForecasts {
        #[arg(long)]
        company_id: i32,
        /// Defaults to the current fiscal year.
        #[arg(long)]
        fiscal_year_id: Option<i32>,
        /// Only this user's forecasts.
        #[arg(long)]
        user_id: Option<i32>,
    },
    /// Generate consecutive fiscal years with their quarters and periods.
    GenerateFiscalYears {
        #[arg(long)]
        company_id: i32,
        /// Calendar year the first fiscal year starts in; defaults to this year.
        #[arg(long)]
        start_year: Option<i32>,
        #[arg(long, default_value_t = 2)]
        years: usize,
    },
    /// Move every company past its fiscal year end onto the next year.
    UpdateFiscalYear,
    /// Multiply every monetary value of a company by a conversion rate.
    ConvertCurrency {
        #[arg(long)]
        company_id: i32,
        #[arg(long)]
        rate: f64,
    },
    /// Write forecasts as CSV to a file or standard output.
    ExportForecasts {
        #[arg(long)]
        company_id: i32,
        #[arg(long)]
        fiscal_year_id: Option<i32>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("invalid argument: {0}")]
    Argument(#[from] TypeConstraintError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

fn export_forecasts(
    repo: &DieselRepository,
    company_id: CompanyId,
    fiscal_year_id: Option<FiscalYearId>,
    output: Option<PathBuf>,
) -> Result<usize, CliError> {
    let forecasts = list_forecasts(repo, company_id, fiscal_year_id, None)?;
    let sink: Box<dyn Write> = match output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };

    let mut writer = csv::Writer::from_writer(sink);
    for forecast in &forecasts {
        writer.serialize(ForecastExportRow::from(forecast))?;
    }
    writer.flush()?;
    Ok(forecasts.len())
}

fn run(command: Command, repo: &DieselRepository, config: &AppConfig) -> Result<(), CliError> {
    let batch_size = config.bulk_batch_size;
    let today = Local::now().date_naive();

    match command {
        Command::RecalculateForecasts {
            company_id,
            user_id,
            fiscal_year_id,
            forecast_type_id,
            dry_run,
        } => {
            let filter = RecalculationFilter {
                company_id: company_id.map(CompanyId::new).transpose()?,
                owner_id: user_id.map(UserId::new).transpose()?,
                fiscal_year_id: fiscal_year_id.map(FiscalYearId::new).transpose()?,
                forecast_type_id: forecast_type_id.map(ForecastTypeId::new).transpose()?,
            };
            let report = recalculate_forecasts(repo, &filter, dry_run, batch_size)?;
            if dry_run {
                println!("Dry run: no changes saved");
            }
            println!(
                "Processed {} forecasts, {} changed, {} errors",
                report.processed, report.changed, report.errors
            );
        }
        Command::GenerateForecasts {
            company_id,
            fiscal_year_id,
            user_id,
        } => {
            let company_id = CompanyId::new(company_id)?;
            let fiscal_year_id = fiscal_year_id.map(FiscalYearId::new).transpose()?;
            match user_id {
                Some(user_id) => {
                    let forecasts = generate_forecasts_for_user(
                        repo,
                        company_id,
                        UserId::new(user_id)?,
                        fiscal_year_id,
                    )?;
                    println!("Generated {} forecasts for user {user_id}", forecasts.len());
                }
                None => {
                    let outcome = generate_forecasts(repo, company_id, fiscal_year_id, batch_size)?;
                    println!(
                        "Created {} forecasts, updated {}",
                        outcome.created, outcome.updated
                    );
                }
            }
        }
        Command::GenerateFiscalYears {
            company_id,
            start_year,
            years,
        } => {
            let first_year = start_year.unwrap_or_else(|| today.year());
            let created =
                generate_fiscal_years(repo, CompanyId::new(company_id)?, first_year, years, today)?;
            for year in &created {
                println!("Created {} ({} - {})", year.name, year.start_date, year.end_date);
            }
            println!("{} fiscal years created", created.len());
        }
        Command::UpdateFiscalYear => {
            let report = update_fiscal_years(repo, today)?;
            for outcome in &report.outcomes {
                println!(
                    "Company {}: promoted {:?}, created {:?}",
                    outcome.company_id, outcome.promoted, outcome.created
                );
            }
            println!(
                "{} companies updated, {} without a current year, {} failed",
                report.outcomes.len(),
                report.skipped,
                report.failed
            );
        }
        Command::ConvertCurrency { company_id, rate } => {
            let outcome =
                convert_company_currency(repo, CompanyId::new(company_id)?, rate, batch_size)?;
            println!(
                "Converted {} opportunities and {} forecasts",
                outcome.opportunities, outcome.forecasts
            );
        }
        Command::ExportForecasts {
            company_id,
            fiscal_year_id,
            output,
        } => {
            let written = export_forecasts(
                repo,
                CompanyId::new(company_id)?,
                fiscal_year_id.map(FiscalYearId::new).transpose()?,
                output,
            )?;
            log::info!("Exported {written} forecasts");
        }
    }

    Ok(())
}

fn main() {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            log::error!("Error loading config: {err}");
            std::process::exit(1);
        }
    };

    let pool = match establish_connection_pool(&config.database_url) {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };
    let repo = DieselRepository::new(pool);

    if let Err(e) = run(cli.command, &repo, &config) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
