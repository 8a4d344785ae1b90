//! Creating, listing, showing and deleting characters

use anyhow::Result;
use clap::Parser;
use console::style;
use sheet_core::{CharacterState, TraitCatalog, TraitCategory, TraitSlot, dots};

use super::{App, DEFAULT_CLAN_SETTING, confirm, print_cancelled, print_xp};

/// Create a character
#[derive(Parser, Debug)]
pub struct New {
    /// Character name
    pub name: String,

    /// Clan (defaults to the `default_clan` setting)
    #[arg(long)]
    pub clan: Option<String>,

    /// Starting experience
    #[arg(long, default_value_t = 0)]
    pub xp: u32,
}

impl New {
    pub async fn execute(self, app: &App) -> Result<()> {
        let clan = match self.clan {
            Some(clan) => Some(clan),
            None => app.setting(DEFAULT_CLAN_SETTING)?,
        };

        let session = app.runtime.create_character(&self.name, clan.as_deref())?;
        if self.xp > 0 {
            session.award_xp(self.xp).await?;
        }

        println!(
            "{} Created {} {}",
            style("✓").green().bold(),
            style(&self.name).bold(),
            style(format!("[{}]", session.id())).cyan()
        );
        if let Some(clan) = clan
            && app.runtime.catalog().clan(&clan).is_none()
        {
            println!(
                "  {}",
                style(format!("Clan '{clan}' is unknown; all disciplines are out-of-clan")).dim()
            );
        }
        Ok(())
    }
}

/// List stored characters
#[derive(Parser, Debug)]
pub struct List {}

impl List {
    pub async fn execute(self, app: &App) -> Result<()> {
        let ids = app.runtime.list()?;
        if ids.is_empty() {
            println!("{}", style("No characters yet - create one with `new`").dim());
            return Ok(());
        }

        for id in ids {
            let state = app.open(&id.0)?.snapshot().await;
            println!(
                "{}  {:<24} {:<12} {}",
                style(&id).cyan(),
                state.name(),
                state.clan().unwrap_or("-"),
                style(format!("{} XP free", state.xp().available())).dim()
            );
        }
        Ok(())
    }
}

/// Print a character sheet
#[derive(Parser, Debug)]
pub struct Show {
    /// Character id
    pub id: String,
}

impl Show {
    pub async fn execute(self, app: &App) -> Result<()> {
        let state = app.open(&self.id)?.snapshot().await;
        let catalog = app.runtime.catalog();

        println!(
            "{} {}",
            style(state.name()).bold(),
            style(format!("({})", state.clan().unwrap_or("no clan"))).dim()
        );
        print_xp(&state.xp().summary());

        for category in TraitCategory::ALL {
            if category == TraitCategory::Specialty {
                continue;
            }
            print_section(catalog, &state, category);
        }

        let specialties: Vec<_> = state.all_specialties().collect();
        if !specialties.is_empty() {
            println!();
            println!("{}", style("Specialties").yellow().bold());
            for (skill, names) in specialties {
                let skill = display_name(catalog, TraitCategory::Skill, skill);
                println!("  {:<20} {}", skill, names.join(", "));
            }
        }
        Ok(())
    }
}

fn print_section(catalog: &TraitCatalog, state: &CharacterState, category: TraitCategory) {
    let owned: Vec<_> = state.traits(category).collect();
    if owned.is_empty() {
        return;
    }

    println!();
    println!("{}", style(category).yellow().bold());
    for (key, slot) in owned {
        let name = display_name(catalog, category, key);
        match slot {
            TraitSlot::Level(level) => println!("  {:<20} {}", name, dots(*level)),
            TraitSlot::Instances(instances) => {
                for instance in instances {
                    println!(
                        "  {:<20} {} {}",
                        name,
                        dots(instance.level),
                        style(instance.id).dim()
                    );
                }
            }
        }

        if category == TraitCategory::Discipline {
            for power in state.powers(key) {
                println!(
                    "    {} {} {}",
                    style("·").dim(),
                    power.name,
                    style(format!("({})", power.unlock_level)).dim()
                );
            }
        }
    }
}

fn display_name(catalog: &TraitCatalog, category: TraitCategory, key: &str) -> String {
    catalog
        .entry(category, key)
        .map(|entry| entry.name.clone())
        .unwrap_or_else(|| key.to_string())
}

/// Grant experience points
#[derive(Parser, Debug)]
pub struct Award {
    /// Character id
    pub id: String,

    /// Experience to add
    pub amount: u32,
}

impl Award {
    pub async fn execute(self, app: &App) -> Result<()> {
        let session = app.open(&self.id)?;
        let xp = session.award_xp(self.amount).await?;
        println!("{} Awarded {} XP", style("✓").green().bold(), self.amount);
        print_xp(&xp);
        Ok(())
    }
}

/// Delete a character
#[derive(Parser, Debug)]
pub struct Delete {
    /// Character id
    pub id: String,

    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl Delete {
    pub async fn execute(self, app: &App) -> Result<()> {
        let session = app.open(&self.id)?;
        let name = session.snapshot().await.name().to_string();

        if !self.yes && !confirm(&format!("Delete {name}? [y/N]"))? {
            print_cancelled();
            return Ok(());
        }

        app.runtime.delete(session.id()).await?;
        println!("{} Deleted {}", style("✓").green().bold(), style(name).bold());
        Ok(())
    }
}
