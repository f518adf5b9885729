use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use ftdesign::storage::document;
use tracing::{info, instrument};

#[derive(Debug, Parser)]
#[command(about = "Load a system document and save it in canonical form")]
pub struct Normalize {
    /// The document to read
    input: PathBuf,

    /// Where to write the canonical document (may equal the input)
    output: PathBuf,
}

impl Normalize {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self) -> anyhow::Result<()> {
        let system = document::load(&self.input)
            .with_context(|| format!("failed to load {}", self.input.display()))?;
        document::save(&system, &self.output)
            .with_context(|| format!("failed to write {}", self.output.display()))?;
        info!(modules = system.len(), "normalized");
        println!("Wrote {}", self.output.display());
        Ok(())
    }
}
