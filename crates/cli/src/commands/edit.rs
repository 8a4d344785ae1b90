//! Free edits: levels, instances and discipline powers
//!
//! Nothing here touches experience. These are the corrections a storyteller
//! makes by hand; the level controller still enforces catalog ranges and asks
//! before a lowered discipline drops powers.

use anyhow::Result;
use clap::Parser;
use console::style;
use sheet_core::{Confirmation, InstanceId, LevelChange, TraitCategory};

use super::{App, confirm_power_loss, parse_category, powers_at_risk, print_cancelled};

/// Set a trait level without spending experience
#[derive(Parser, Debug)]
pub struct Set {
    /// Character id
    pub id: String,

    #[arg(value_parser = parse_category)]
    pub category: TraitCategory,

    /// Trait name or key
    pub key: String,

    /// New level (0 removes the trait or the instance)
    pub level: u8,

    /// Change this instance of a repeatable trait
    #[arg(long, conflicts_with = "add")]
    pub instance: Option<u32>,

    /// Add a new instance of a repeatable trait at LEVEL
    #[arg(long)]
    pub add: bool,

    /// Accept losing acquired powers without asking
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl Set {
    pub async fn execute(self, app: &App) -> Result<()> {
        let session = app.open(&self.id)?;

        let change = if self.add {
            session
                .add_instance(self.category, &self.key, self.level)
                .await?
        } else if let Some(instance) = self.instance.map(InstanceId) {
            if self.level == 0 {
                session
                    .remove_instance(self.category, &self.key, instance)
                    .await?
            } else {
                session
                    .set_instance_level(self.category, &self.key, instance, self.level)
                    .await?
            }
        } else {
            let attempt = session
                .set_level(self.category, &self.key, self.level, Confirmation::NotGiven)
                .await;
            match attempt {
                Ok(change) => change,
                Err(err) => {
                    let Some(powers) = powers_at_risk(&err) else {
                        return Err(err.into());
                    };
                    if !confirm_power_loss(powers, self.yes)? {
                        print_cancelled();
                        return Ok(());
                    }
                    session
                        .set_level(self.category, &self.key, self.level, Confirmation::Granted)
                        .await?
                }
            }
        };

        print_change(&change);
        Ok(())
    }
}

fn print_change(change: &LevelChange) {
    let instance = change
        .instance
        .map(|instance| format!(" {instance}"))
        .unwrap_or_default();
    println!(
        "{} {}{}: {} → {}",
        style("✓").green().bold(),
        change.trait_id,
        instance,
        change.from,
        change.to
    );
    for power in &change.powers_lost {
        println!("  {} lost {}", style("✗").red(), power.name);
    }
}

/// Acquire or release a discipline power
#[derive(Parser, Debug)]
pub struct Power {
    /// Character id
    pub id: String,

    /// Discipline name or key
    pub discipline: String,

    /// Power name
    pub power: String,

    /// Release the power instead of acquiring it
    #[arg(long)]
    pub remove: bool,
}

impl Power {
    pub async fn execute(self, app: &App) -> Result<()> {
        let session = app.open(&self.id)?;

        if self.remove {
            let released = session.release_power(&self.discipline, &self.power).await?;
            println!(
                "{} Released {} ({})",
                style("✓").green().bold(),
                style(&released.name).bold(),
                self.discipline
            );
        } else {
            let acquired = session.acquire_power(&self.discipline, &self.power).await?;
            println!(
                "{} Acquired {} ({} {})",
                style("✓").green().bold(),
                style(&acquired.name).bold(),
                self.discipline,
                acquired.unlock_level
            );
        }
        Ok(())
    }
}
