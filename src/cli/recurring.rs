//! Recurring transaction CLI commands

use chrono::Utc;
use clap::Subcommand;

use super::parse_day_end;
use crate::config::Settings;
use crate::display::format_transaction_register;
use crate::error::SpendwiseResult;
use crate::models::UserId;
use crate::services::RecurringService;
use crate::storage::Storage;

/// Recurring subcommands
#[derive(Subcommand, Debug)]
pub enum RecurringCommands {
    /// List active recurring templates
    List,
    /// Book every occurrence that has come due
    Run {
        /// Generate occurrences due on or before this date (YYYY-MM-DD), defaults to now
        #[arg(long)]
        as_of: Option<String>,
    },
}

/// Handle a recurring command
pub fn handle_recurring_command(
    storage: &Storage,
    settings: &Settings,
    user: UserId,
    cmd: RecurringCommands,
) -> SpendwiseResult<()> {
    let service = RecurringService::new(storage);
    let date_format = settings.effective_date_format();

    match cmd {
        RecurringCommands::List => {
            let templates = service.templates(user)?;
            print!("{}", format_transaction_register(&templates, date_format));
        }

        RecurringCommands::Run { as_of } => {
            let as_of = match as_of {
                Some(date) => parse_day_end("as-of", &date)?,
                None => Utc::now(),
            };

            let run = service.generate_due(user, as_of)?;
            if run.generated.is_empty() {
                println!("Nothing due.");
            } else {
                print!("{}", format_transaction_register(&run.generated, date_format));
            }
            println!(
                "Templates advanced: {}, finished: {}",
                run.templates_advanced, run.templates_finished
            );
        }
    }

    Ok(())
}
