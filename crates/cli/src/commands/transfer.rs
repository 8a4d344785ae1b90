//! JSON import and export of character documents

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use sheet_runtime::CharacterDocument;

use super::App;

/// Export a character document as JSON
#[derive(Parser, Debug)]
pub struct Export {
    /// Character id
    pub id: String,

    /// Output file (prints to stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl Export {
    pub async fn execute(self, app: &App) -> Result<()> {
        let session = app.open(&self.id)?;
        let json = session.document().await.to_json()?;

        match self.output {
            Some(path) => {
                std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!(
                    "{} Exported to {}",
                    style("✓").green().bold(),
                    style(path.display()).cyan()
                );
            }
            None => println!("{json}"),
        }
        Ok(())
    }
}

/// Import a character document
#[derive(Parser, Debug)]
pub struct Import {
    /// JSON document to read
    pub path: PathBuf,

    /// Overwrite the stored character with the same id
    #[arg(long)]
    pub replace: bool,
}

impl Import {
    pub async fn execute(self, app: &App) -> Result<()> {
        let json = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let document = CharacterDocument::from_json(&json)
            .with_context(|| format!("{} is not a character document", self.path.display()))?;

        let session = app.runtime.import(document, self.replace).await?;
        let state = session.snapshot().await;
        println!(
            "{} Imported {} {}",
            style("✓").green().bold(),
            style(state.name()).bold(),
            style(format!("[{}]", session.id())).cyan()
        );
        Ok(())
    }
}
