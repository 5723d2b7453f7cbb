use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

mod config;
mod db;
mod error;
mod models;
mod render;
mod report;
mod risk;
mod telemetry;
mod window;

use crate::config::AppConfig;
use crate::db::{DataStoreClient, EvaluationAggregator};
use crate::models::{ContractChoice, ReportRow};
use crate::window::DateWindow;

#[derive(Parser)]
#[command(name = "contract-radar")]
#[command(about = "Contract risk radar built from collaborator evaluations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the months that can be reported on, most recent first
    Months,
    /// Rank contracts by severity for a month
    Summary {
        #[command(flatten)]
        filters: Filters,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Show the individual evaluations of one contract
    Details {
        #[command(flatten)]
        filters: Filters,
        /// Contract to drill into; defaults to the most severe one
        #[arg(long)]
        contract: Option<i32>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Write a markdown report with the ranking and one contract's evaluations
    Report {
        #[command(flatten)]
        filters: Filters,
        #[arg(long)]
        contract: Option<i32>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Args)]
struct Filters {
    /// Month to report on (YYYY-MM); defaults to the current month
    #[arg(long, value_parser = window::parse_month)]
    month: Option<NaiveDate>,
    /// Collaborator averages below this score count as bad
    #[arg(long, default_value_t = risk::DEFAULT_THRESHOLD, value_parser = risk::parse_threshold)]
    threshold: f64,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let today = Local::now().date_naive();

    if let Commands::Months = cli.command {
        for month in window::month_options(today, window::SELECTABLE_MONTHS) {
            println!("{}  {}", month.format("%Y-%m"), render::month_label(month));
        }
        return Ok(());
    }

    let config = AppConfig::load().context("invalid configuration")?;
    telemetry::init(&config.telemetry)?;

    let client = DataStoreClient::connect(&config.database)
        .await
        .context("failed to connect to the evaluation store")?;
    let aggregator = EvaluationAggregator::new(client);

    match cli.command {
        Commands::Months => {}
        Commands::Summary { filters, format } => {
            let selection = Selection::resolve(&filters, today)?;
            let report = selection.ranked_contracts(&aggregator).await?;

            match format {
                OutputFormat::Table => print!("{}", render::summary_table(&report)),
                OutputFormat::Csv => render::write_summary_csv(&report, std::io::stdout())?,
                OutputFormat::Json => println!("{}", render::summary_json(&report)?),
            }
        }
        Commands::Details {
            filters,
            contract,
            format,
        } => {
            let selection = Selection::resolve(&filters, today)?;
            let report = selection.ranked_contracts(&aggregator).await?;
            let Some(choice) = choose_contract(&report, contract)? else {
                println!("{}", render::NO_CONTRACTS);
                return Ok(());
            };

            let details = aggregator
                .fetch_details(choice.contract_id, selection.window)
                .await?;

            match format {
                OutputFormat::Table => {
                    println!(
                        "Evaluations of {} in {}",
                        choice.label,
                        render::month_label(selection.month)
                    );
                    print!("{}", render::detail_table(&details));
                }
                OutputFormat::Csv => render::write_details_csv(&details, std::io::stdout())?,
                OutputFormat::Json => println!("{}", render::details_json(&details)?),
            }
        }
        Commands::Report {
            filters,
            contract,
            out,
        } => {
            let selection = Selection::resolve(&filters, today)?;
            let report = selection.ranked_contracts(&aggregator).await?;
            let choice = choose_contract(&report, contract)?;

            let details = match &choice {
                Some(choice) => {
                    aggregator
                        .fetch_details(choice.contract_id, selection.window)
                        .await?
                }
                None => Vec::new(),
            };

            let markdown = render::markdown_report(
                selection.month,
                selection.window,
                selection.threshold,
                &report,
                choice.as_ref().map(|choice| (choice, details.as_slice())),
            );
            std::fs::write(&out, markdown)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

/// Month and threshold after checking them against what the UI offers.
struct Selection {
    month: NaiveDate,
    window: DateWindow,
    threshold: f64,
}

impl Selection {
    fn resolve(filters: &Filters, today: NaiveDate) -> anyhow::Result<Self> {
        let options = window::month_options(today, window::SELECTABLE_MONTHS);
        let Some(month) = window::select_month(&options, filters.month) else {
            bail!(
                "month must be one of the last {} months (see `contract-radar months`)",
                window::SELECTABLE_MONTHS
            );
        };

        Ok(Self {
            month,
            window: DateWindow::for_month(month),
            threshold: filters.threshold,
        })
    }

    async fn ranked_contracts(
        &self,
        aggregator: &EvaluationAggregator,
    ) -> anyhow::Result<Vec<ReportRow>> {
        let summaries = aggregator.fetch_summary(self.window, self.threshold).await?;
        let report = report::build_report(summaries, self.threshold);
        info!(
            month = %self.month.format("%Y-%m"),
            threshold = self.threshold,
            contracts = report.len(),
            "built contract report"
        );
        Ok(report)
    }
}

/// Resolves the drill-down contract, defaulting to the top-ranked row.
fn choose_contract(
    report: &[ReportRow],
    requested: Option<i32>,
) -> anyhow::Result<Option<ContractChoice>> {
    let Some(contract_id) = requested.or_else(|| report::default_selection(report)) else {
        return Ok(None);
    };

    match report::contract_choices(report)
        .into_iter()
        .find(|choice| choice.contract_id == contract_id)
    {
        Some(choice) => Ok(Some(choice)),
        None => bail!("contract {contract_id} is not part of this month's report"),
    }
}
