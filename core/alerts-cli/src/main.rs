//! expense-alerts: command-line front end for the expense notification cache.
//!
//! ## Subcommands
//!
//! - `login` / `logout`: session boundaries (store credential, clear namespace)
//! - `list`, `add`, `read`, `read-all`, `remove`, `clear`: notification store
//! - `check`: one detector tick against the configured API
//! - `watch`: poll until Ctrl-C

mod commands;
mod logging;

use alerts_core::{NotificationKind, StorageConfig};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "expense-alerts")]
#[command(about = "Expense approval and rejection alerts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a bearer token and start a session
    Login {
        #[arg(long)]
        token: String,
    },

    /// End the session, keeping notification history
    Logout,

    /// Show active notifications
    List {
        /// Include dismissed notifications
        #[arg(long)]
        all: bool,
    },

    /// Add a notification by hand
    Add {
        message: String,

        /// info, success or error
        #[arg(long, default_value = "info")]
        kind: NotificationKind,
    },

    /// Mark one notification as read
    Read { id: String },

    /// Mark every notification as read
    ReadAll,

    /// Dismiss a notification
    Remove { id: String },

    /// Dismiss every notification
    Clear,

    /// Run a single change-detection pass
    Check,

    /// Poll for changes until interrupted
    Watch,
}

fn main() {
    let storage = StorageConfig::default();
    let _logging_guard = logging::init(&storage.logs_dir());
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Login { token } => commands::login(&storage, &token),
        Commands::Logout => commands::logout(&storage),
        Commands::List { all } => commands::list(&storage, all),
        Commands::Add { message, kind } => commands::add(&storage, &message, kind),
        Commands::Read { id } => commands::read(&storage, &id),
        Commands::ReadAll => commands::read_all(&storage),
        Commands::Remove { id } => commands::remove(&storage, &id),
        Commands::Clear => commands::clear(&storage),
        Commands::Check => commands::check(&storage),
        Commands::Watch => commands::watch(&storage),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "expense-alerts failed");
        std::process::exit(1);
    }
}
