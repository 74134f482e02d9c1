//! CLI commands for reports
//!
//! Provides commands for generating and exporting spending and trend reports.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Subcommand;

use super::parse_date;
use crate::config::Settings;
use crate::error::{SpendwiseError, SpendwiseResult};
use crate::models::{ReportPeriod, UserId};
use crate::reports::{SpendingReport, TrendsReport};
use crate::storage::Storage;

/// Report subcommands
#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Expense totals by category
    Spending {
        /// Start date (YYYY-MM-DD)
        #[arg(short, long, requires = "end", conflicts_with = "period")]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(short, long, requires = "start", conflicts_with = "period")]
        end: Option<String>,

        /// Month to report on (e.g., "2025-01"), defaults to the current month
        #[arg(short, long)]
        period: Option<String>,

        /// Export to CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show top N categories only
        #[arg(long)]
        top: Option<usize>,
    },

    /// Monthly income, expense and transfer totals
    Trends {
        /// Number of months to look back, defaults to the configured window
        #[arg(short, long)]
        months: Option<u32>,

        /// Export to CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Handle report commands
pub fn handle_report_command(
    storage: &Storage,
    settings: &Settings,
    user: UserId,
    cmd: ReportCommands,
) -> SpendwiseResult<()> {
    match cmd {
        ReportCommands::Spending {
            start,
            end,
            period,
            output,
            top,
        } => handle_spending_report(storage, settings, user, start, end, period, output, top),
        ReportCommands::Trends { months, output } => {
            handle_trends_report(storage, settings, user, months, output)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_spending_report(
    storage: &Storage,
    settings: &Settings,
    user: UserId,
    start: Option<String>,
    end: Option<String>,
    period: Option<String>,
    output: Option<PathBuf>,
    top: Option<usize>,
) -> SpendwiseResult<()> {
    let period = match (start, end, period) {
        (Some(start), Some(end), _) => {
            let start = parse_date("start", &start)?;
            let end = parse_date("end", &end)?;
            if end < start {
                return Err(SpendwiseError::invalid("end", "End date is before start date"));
            }
            ReportPeriod::custom(start, end)
        }
        (_, _, Some(period)) => ReportPeriod::parse(&period).map_err(|e| {
            SpendwiseError::invalid(
                "period",
                format!("Invalid period: {}. Use YYYY-MM (e.g., 2025-01)", e),
            )
        })?,
        _ => ReportPeriod::month_of(Utc::now().date_naive()),
    };

    let report = SpendingReport::generate(storage, user, period, settings.default_currency)?;

    if let Some(path) = output {
        report.export_csv(create_output(&path)?)?;
        println!("Spending report exported to: {}", path.display());
    } else if let Some(n) = top {
        println!(
            "Top {} Spending Categories: {} to {}\n",
            n,
            report.period.start_date(),
            report.period.end_date()
        );
        println!("{:<32} {:>12} {:>8}", "Category", "Amount", "%");
        println!("{}", "-".repeat(56));
        for line in report.top_categories(n) {
            println!(
                "{:<32} {:>12} {:>7.1}%",
                line.category,
                line.total.format(report.currency),
                line.percentage
            );
        }
        println!("\nTotal Spending: {}", report.total_spending.format(report.currency));
    } else {
        print!("{}", report.format_terminal());
    }

    Ok(())
}

fn handle_trends_report(
    storage: &Storage,
    settings: &Settings,
    user: UserId,
    months: Option<u32>,
    output: Option<PathBuf>,
) -> SpendwiseResult<()> {
    let months = months.unwrap_or(settings.trend_months);
    let report = TrendsReport::generate(storage, user, months, Utc::now(), settings.default_currency)?;

    if let Some(path) = output {
        report.export_csv(create_output(&path)?)?;
        println!("Trends report exported to: {}", path.display());
    } else {
        print!("{}", report.format_terminal());
    }

    Ok(())
}

fn create_output(path: &Path) -> SpendwiseResult<BufWriter<File>> {
    let file = File::create(path).map_err(|e| {
        SpendwiseError::Export(format!("Failed to create file {}: {}", path.display(), e))
    })?;
    Ok(BufWriter::new(file))
}
