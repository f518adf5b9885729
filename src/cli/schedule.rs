use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use ftdesign::storage::{candidate, document};
use tracing::instrument;

#[derive(Debug, Parser)]
#[command(about = "Emit the task graph of a candidate as JSON")]
pub struct Schedule {
    /// The system document
    system: PathBuf,

    /// A candidate file selecting one scheme per module
    #[arg(long)]
    candidate: PathBuf,

    /// Write the task graph here instead of stdout
    #[arg(long, short)]
    out: Option<PathBuf>,
}

impl Schedule {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self) -> anyhow::Result<()> {
        let system = document::load(&self.system)
            .with_context(|| format!("failed to load {}", self.system.display()))?;
        let assignment = candidate::load(&self.candidate, &system)
            .with_context(|| format!("failed to load {}", self.candidate.display()))?;

        let schedule = assignment.schedule(&system);
        let json = serde_json::to_string_pretty(&schedule)?;

        match &self.out {
            Some(path) => std::fs::write(path, json + "\n")
                .with_context(|| format!("failed to write {}", path.display()))?,
            None => println!("{json}"),
        }
        Ok(())
    }
}
