use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use spendwise::cli::{
    handle_recurring_command, handle_report_command, handle_transaction_command, resolve_user,
    RecurringCommands, ReportCommands, TransactionCommands, USER_ENV,
};
use spendwise::config::{paths::SpendwisePaths, settings::Settings};
use spendwise::models::Currency;
use spendwise::storage::Storage;

#[derive(Parser)]
#[command(
    name = "spendwise",
    author = "Kaylee Beyene",
    version,
    about = "Personal finance transaction store",
    long_about = "Spendwise records a user's income, expenses and transfers, keeps \
                  them deduplicated against bank-sync imports, and reports spending \
                  by category and month over month."
)]
struct Cli {
    /// Acting user ID
    #[arg(short, long, global = true, env = USER_ENV)]
    user: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Transaction management commands
    #[command(subcommand, alias = "txn")]
    Transaction(TransactionCommands),

    /// Spending and trend reports
    #[command(subcommand)]
    Report(ReportCommands),

    /// Recurring transaction templates
    #[command(subcommand)]
    Recurring(RecurringCommands),

    /// Initialize the data directory and default user
    Init {
        /// Default currency for new transactions
        #[arg(long)]
        currency: Option<String>,
    },

    /// Show the acting user's recent audit history
    History {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = SpendwisePaths::new()?;
    let mut settings = Settings::load_or_create(&paths)?;

    // Initialize storage
    let storage = Storage::new(paths.clone())?;
    storage.load_all()?;

    match cli.command {
        Some(Commands::Transaction(cmd)) => {
            let user = resolve_user(cli.user.as_deref(), &settings)?;
            handle_transaction_command(&storage, &settings, user, cmd)?;
        }
        Some(Commands::Report(cmd)) => {
            let user = resolve_user(cli.user.as_deref(), &settings)?;
            handle_report_command(&storage, &settings, user, cmd)?;
        }
        Some(Commands::Recurring(cmd)) => {
            let user = resolve_user(cli.user.as_deref(), &settings)?;
            handle_recurring_command(&storage, &settings, user, cmd)?;
        }
        Some(Commands::Init { currency }) => {
            println!("Initializing Spendwise at: {}", paths.base_dir().display());

            // Keep an existing default user unless one is given
            let user = match cli.user.as_deref() {
                Some(raw) => resolve_user(Some(raw), &settings)?,
                None => settings.default_user.unwrap_or_default(),
            };
            settings.default_user = Some(user);
            if let Some(code) = currency {
                settings.default_currency = code.parse::<Currency>().map_err(anyhow::Error::msg)?;
            }
            settings.save(&paths)?;

            println!("Initialization complete!");
            println!();
            println!("Default user:     {}", user.as_uuid());
            println!("Default currency: {}", settings.default_currency);
            println!();
            println!("Run 'spendwise transaction add --help' to record your first transaction.");
        }
        Some(Commands::History { limit }) => {
            let user = resolve_user(cli.user.as_deref(), &settings)?;
            let entries: Vec<_> = storage
                .audit()
                .read_all()?
                .into_iter()
                .filter(|entry| entry.owner == user)
                .collect();

            if entries.is_empty() {
                println!("No history recorded.");
            }
            for entry in &entries[entries.len().saturating_sub(limit)..] {
                println!("{}", entry.format_human_readable());
            }
        }
        Some(Commands::Config) => {
            println!("Spendwise Configuration");
            println!("=======================");
            println!("Base directory:    {}", paths.base_dir().display());
            println!("Transactions file: {}", paths.transactions_file().display());
            println!("Audit log:         {}", paths.audit_log().display());
            println!(
                "Initialized:       {}",
                if paths.is_initialized() { "yes" } else { "no (run 'spendwise init')" }
            );
            println!();
            println!("Settings:");
            println!("  Default currency: {}", settings.default_currency);
            println!("  Date format:      {}", settings.date_format);
            println!("  Category limit:   {}", settings.category_limit);
            println!("  Trend months:     {}", settings.trend_months);
            match settings.default_user {
                Some(user) => println!("  Default user:     {}", user.as_uuid()),
                None => println!("  Default user:     (not set)"),
            }
            println!();
            println!("Stored transactions: {}", storage.transactions.count()?);
            println!("Audit entries:       {}", storage.audit().entry_count()?);
        }
        None => {
            println!("Spendwise - personal finance transaction store");
            println!();
            println!("Run 'spendwise --help' for usage information.");
        }
    }

    Ok(())
}
