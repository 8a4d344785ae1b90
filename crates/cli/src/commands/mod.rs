//! Subcommand implementations
//!
//! Each command is a clap `Parser` struct with an async `execute` that runs
//! against the shared [`App`].

mod character;
mod config;
mod edit;
mod purchase;
mod transfer;

pub use character::{Award, Delete, List, New, Show};
pub use config::Config;
pub use edit::{Power, Set};
pub use purchase::{History, Price, Specialty, Spend, Undo};
pub use transfer::{Export, Import};

use std::io::{self, Write};

use anyhow::{Context, Result};
use console::style;
use sheet_core::{
    AcquiredPower, CharacterId, ControllerError, SpendError, SpendRecord, TraitCategory,
    XpSummary,
};
use sheet_runtime::{
    CharacterSession, FileCharacterRepository, RuntimeConfig, RuntimeError, SettingsRepository,
    SheetRuntime,
};

/// Settings key holding the clan used by `new` when none is given.
pub const DEFAULT_CLAN_SETTING: &str = "default_clan";

/// Runtime plus the settings store of the same data directory.
pub struct App {
    pub runtime: SheetRuntime,
    pub config: RuntimeConfig,
    pub settings: FileCharacterRepository,
}

impl App {
    pub async fn start(config: RuntimeConfig) -> Result<Self> {
        let settings = FileCharacterRepository::new(&config.data_dir).with_context(|| {
            format!("Failed to open data directory: {}", config.data_dir.display())
        })?;
        let runtime = SheetRuntime::builder()
            .config(config.clone())
            .build()
            .await
            .context("Failed to start the sheet runtime")?;

        Ok(Self {
            runtime,
            config,
            settings,
        })
    }

    pub fn open(&self, id: &str) -> Result<CharacterSession> {
        Ok(self.runtime.open(&CharacterId(id.to_string()))?)
    }

    pub fn setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.settings.get_setting(key)?)
    }

    pub async fn shutdown(self) -> Result<()> {
        self.runtime.shutdown().await?;
        Ok(())
    }
}

/// clap value parser for trait categories.
pub fn parse_category(raw: &str) -> std::result::Result<TraitCategory, String> {
    TraitCategory::parse(raw).ok_or_else(|| {
        let names: Vec<String> = TraitCategory::ALL.iter().map(|c| c.to_string()).collect();
        format!("unknown category '{}' (expected one of: {})", raw, names.join(", "))
    })
}

/// Powers a rejected change would strip, if that is why it was rejected.
pub fn powers_at_risk(err: &RuntimeError) -> Option<&[AcquiredPower]> {
    match err {
        RuntimeError::Spend(SpendError::ConfirmationRequired { powers, .. })
        | RuntimeError::Spend(SpendError::Controller(ControllerError::PowersWillBeLost {
            powers,
            ..
        }))
        | RuntimeError::Controller(ControllerError::PowersWillBeLost { powers, .. }) => {
            Some(powers)
        }
        _ => None,
    }
}

/// Lists the powers at stake and asks to continue. `yes` skips the prompt.
pub fn confirm_power_loss(powers: &[AcquiredPower], yes: bool) -> Result<bool> {
    println!(
        "{} This change removes acquired powers:",
        style("!").yellow().bold()
    );
    for power in powers {
        println!(
            "  {} {} {}",
            style("→").cyan(),
            style(&power.name).bold(),
            style(format!("(level {})", power.unlock_level)).dim()
        );
    }
    if yes {
        return Ok(true);
    }
    confirm("Proceed? [y/N]")
}

/// Prompt user for confirmation
pub fn confirm(prompt: &str) -> Result<bool> {
    print!("{} ", style(prompt).yellow().bold());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

pub fn print_cancelled() {
    println!("{}", style("Cancelled").dim());
}

pub fn print_xp(xp: &XpSummary) {
    println!(
        "{} {} total, {} spent, {} available",
        style("XP").bold(),
        xp.total,
        xp.spent,
        style(xp.available).green().bold()
    );
}

pub fn describe_record(record: &SpendRecord) -> String {
    let target = match (&record.specialty_name, record.instance) {
        (Some(name), _) => format!("{} specialty '{}'", record.trait_key, name),
        (None, Some(instance)) => format!("{} {}", record.trait_key, instance),
        (None, None) => record.trait_key.clone(),
    };
    format!(
        "{} {} {} {}→{} for {} XP",
        style(record.id).cyan(),
        record.category,
        target,
        record.from_level,
        record.to_level,
        record.cost
    )
}
