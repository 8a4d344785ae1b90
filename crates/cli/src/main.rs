//! Command line front end for the character sheet.
//!
//! Every subcommand opens the file-backed store under the data directory,
//! performs one operation and shuts the runtime down, so pending autosaves are
//! written before the process exits.

mod commands;
mod dirs;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use commands::{
    App, Award, Config, Delete, Export, History, Import, List, New, Power, Price, Set, Show,
    Specialty, Spend, Undo,
};
use sheet_runtime::RuntimeConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Vampire: The Masquerade character sheets
#[derive(Parser)]
#[command(name = "vtm-sheet")]
#[command(about = "Build and advance V5 characters with experience", long_about = None)]
#[command(version)]
struct Cli {
    /// Data directory (overrides SHEET_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Create a character
    New(New),

    /// List stored characters
    List(List),

    /// Print a character sheet
    Show(Show),

    /// Grant experience points
    Award(Award),

    /// Quote the price of raising a trait
    Price(Price),

    /// Buy a trait level with experience
    Spend(Spend),

    /// Buy a skill specialty
    Specialty(Specialty),

    /// Set a trait level without spending experience
    Set(Set),

    /// Acquire or release a discipline power
    Power(Power),

    /// Reverse a purchase and refund it
    Undo(Undo),

    /// Show the experience history
    History(History),

    /// Export a character document as JSON
    Export(Export),

    /// Import a character document
    Import(Import),

    /// Delete a character
    Delete(Delete),

    /// Show or change settings
    Config(Config),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = RuntimeConfig::from_env();
    if let Some(data_dir) = cli.data_dir {
        config = config.with_data_dir(data_dir);
    }

    setup_logging()?;

    let app = App::start(config).await?;
    let outcome = match cli.command {
        Command::New(cmd) => cmd.execute(&app).await,
        Command::List(cmd) => cmd.execute(&app).await,
        Command::Show(cmd) => cmd.execute(&app).await,
        Command::Award(cmd) => cmd.execute(&app).await,
        Command::Price(cmd) => cmd.execute(&app).await,
        Command::Spend(cmd) => cmd.execute(&app).await,
        Command::Specialty(cmd) => cmd.execute(&app).await,
        Command::Set(cmd) => cmd.execute(&app).await,
        Command::Power(cmd) => cmd.execute(&app).await,
        Command::Undo(cmd) => cmd.execute(&app).await,
        Command::History(cmd) => cmd.execute(&app).await,
        Command::Export(cmd) => cmd.execute(&app).await,
        Command::Import(cmd) => cmd.execute(&app).await,
        Command::Delete(cmd) => cmd.execute(&app).await,
        Command::Config(cmd) => cmd.execute(&app).await,
    };

    // Pending saves are written even when the command failed
    app.shutdown().await?;
    outcome
}

/// Setup logging to a file under the platform cache directory
fn setup_logging() -> Result<()> {
    let log_dir = dirs::log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, "sheet.log");
    let (non_blocking_file, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    // Terminal output belongs to the command; logs only go to the file
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    // Leak the guard to keep file writer alive
    std::mem::forget(_guard);

    tracing::info!("Log file: {}/sheet.log", log_dir.display());

    Ok(())
}
