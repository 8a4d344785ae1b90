//! Effective configuration and stored settings

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use sheet_runtime::SettingsRepository;

use super::App;

/// Show or change settings
#[derive(Parser, Debug)]
pub struct Config {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print one stored setting
    Get { key: String },

    /// Store a setting, e.g. `default_clan brujah`
    Set { key: String, value: String },
}

impl Config {
    pub async fn execute(self, app: &App) -> Result<()> {
        match self.action {
            None => {
                print_effective(app);
                Ok(())
            }
            Some(ConfigAction::Get { key }) => {
                match app.setting(&key)? {
                    Some(value) => println!("{value}"),
                    None => println!("{}", style(format!("'{key}' is not set")).dim()),
                }
                Ok(())
            }
            Some(ConfigAction::Set { key, value }) => {
                app.settings.set_setting(&key, &value)?;
                println!("{} {} = {}", style("✓").green().bold(), key, value);
                Ok(())
            }
        }
    }
}

fn print_effective(app: &App) {
    let label = |name: &str| style(format!("{name:<18}")).bold();

    println!("{} {}", label("data dir"), app.config.data_dir.display());
    println!(
        "{} {:?}",
        label("autosave debounce"),
        app.config.autosave_debounce
    );
    println!(
        "{} {}",
        label("undo policy"),
        app.runtime.sheet_config().undo_policy
    );
    println!(
        "{} {} traits, {} clans",
        label("catalog"),
        app.runtime.catalog().len(),
        app.runtime.catalog().clans().count()
    );
}
