//! Experience purchases, quotes and refunds

use anyhow::{Result, anyhow};
use clap::Parser;
use console::style;
use sheet_core::{Confirmation, InstanceId, RecordId, TraitCategory};

use super::{
    App, confirm_power_loss, describe_record, parse_category, powers_at_risk, print_cancelled,
    print_xp,
};

/// Quote the price of raising a trait
#[derive(Parser, Debug)]
pub struct Price {
    /// Character id
    pub id: String,

    #[arg(value_parser = parse_category)]
    pub category: TraitCategory,

    /// Trait name or key
    pub key: String,

    /// Target level
    pub level: u8,
}

impl Price {
    pub async fn execute(self, app: &App) -> Result<()> {
        let session = app.open(&self.id)?;
        let cost = session.quote(self.category, &self.key, self.level).await?;
        let xp = session.xp().await;

        let verdict = if cost <= xp.available {
            style("affordable").green()
        } else {
            style("not enough XP").red()
        };
        println!(
            "{} {} to {}: {} XP ({}, {} available)",
            self.category, self.key, self.level, cost, verdict, xp.available
        );
        Ok(())
    }
}

/// Buy a trait level with experience
#[derive(Parser, Debug)]
pub struct Spend {
    /// Character id
    pub id: String,

    #[arg(value_parser = parse_category)]
    pub category: TraitCategory,

    /// Trait name or key
    pub key: String,

    /// Target level
    pub level: u8,

    /// Raise this instance of a repeatable trait instead of buying a new one
    #[arg(long)]
    pub instance: Option<u32>,

    /// Accept losing acquired powers without asking
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl Spend {
    pub async fn execute(self, app: &App) -> Result<()> {
        let session = app.open(&self.id)?;

        let outcome = match self.instance {
            Some(instance) => {
                session
                    .spend_instance(self.category, &self.key, InstanceId(instance), self.level)
                    .await
            }
            None => {
                session
                    .spend(self.category, &self.key, self.level, Confirmation::NotGiven)
                    .await
            }
        };

        let record = match outcome {
            Ok(record) => record,
            Err(err) => {
                let Some(powers) = powers_at_risk(&err) else {
                    return Err(err.into());
                };
                if !confirm_power_loss(powers, self.yes)? {
                    print_cancelled();
                    return Ok(());
                }
                session
                    .spend(self.category, &self.key, self.level, Confirmation::Granted)
                    .await?
            }
        };

        println!("{} {}", style("✓").green().bold(), describe_record(&record));
        print_xp(&session.xp().await);
        Ok(())
    }
}

/// Buy a skill specialty
#[derive(Parser, Debug)]
pub struct Specialty {
    /// Character id
    pub id: String,

    /// Skill name or key
    pub skill: String,

    /// Specialty name
    pub name: String,
}

impl Specialty {
    pub async fn execute(self, app: &App) -> Result<()> {
        let session = app.open(&self.id)?;
        let record = session.add_specialty(&self.skill, &self.name).await?;
        println!("{} {}", style("✓").green().bold(), describe_record(&record));
        print_xp(&session.xp().await);
        Ok(())
    }
}

/// Reverse a purchase and refund it
#[derive(Parser, Debug)]
pub struct Undo {
    /// Character id
    pub id: String,

    /// Record to undo, e.g. `3` or `#3` (defaults to the latest purchase)
    #[arg(value_parser = parse_record_id)]
    pub record: Option<RecordId>,

    /// Accept losing acquired powers without asking
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl Undo {
    pub async fn execute(self, app: &App) -> Result<()> {
        let session = app.open(&self.id)?;

        let record = match self.record {
            Some(record) => record,
            None => session
                .history()
                .await
                .last()
                .map(|record| record.id)
                .ok_or_else(|| anyhow!("Nothing to undo"))?,
        };

        let undone = match session.undo(record, Confirmation::NotGiven).await {
            Ok(undone) => undone,
            Err(err) => {
                let Some(powers) = powers_at_risk(&err) else {
                    return Err(err.into());
                };
                if !confirm_power_loss(powers, self.yes)? {
                    print_cancelled();
                    return Ok(());
                }
                session.undo(record, Confirmation::Granted).await?
            }
        };

        println!(
            "{} Refunded {}",
            style("✓").green().bold(),
            describe_record(&undone)
        );
        print_xp(&session.xp().await);
        Ok(())
    }
}

fn parse_record_id(raw: &str) -> std::result::Result<RecordId, String> {
    raw.trim()
        .trim_start_matches('#')
        .parse::<u64>()
        .map(RecordId)
        .map_err(|_| format!("'{raw}' is not a record id"))
}

/// Show the experience history
#[derive(Parser, Debug)]
pub struct History {
    /// Character id
    pub id: String,
}

impl History {
    pub async fn execute(self, app: &App) -> Result<()> {
        let session = app.open(&self.id)?;
        let history = session.history().await;

        if history.is_empty() {
            println!("{}", style("No purchases yet").dim());
        }
        for record in &history {
            println!("{}", describe_record(record));
            if !record.note.is_empty() {
                println!("    {}", style(&record.note).dim());
            }
        }
        print_xp(&session.xp().await);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_ids_accept_hash_prefix() {
        assert_eq!(parse_record_id("#7"), Ok(RecordId(7)));
        assert_eq!(parse_record_id(" 12 "), Ok(RecordId(12)));
        assert!(parse_record_id("latest").is_err());
    }
}
