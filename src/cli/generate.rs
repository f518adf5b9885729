use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use ftdesign::{GenerationParams, SystemGraph, storage::document};
use rand::{SeedableRng, rngs::StdRng};
use tracing::instrument;

#[derive(Debug, Parser)]
#[command(about = "Generate a random system document")]
pub struct Generate {
    /// Generation parameters (TOML); defaults are used if omitted
    #[arg(long, short)]
    params: Option<PathBuf>,

    /// Random seed
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Where to write the generated document
    #[arg(long, short)]
    out: PathBuf,

    /// Also write the effective parameters to this file
    #[arg(long, value_name = "FILE")]
    save_params: Option<PathBuf>,
}

impl Generate {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self) -> anyhow::Result<()> {
        let params = match &self.params {
            Some(path) => GenerationParams::load(path)?,
            None => GenerationParams::default(),
        };
        if params.schemes.is_empty() {
            anyhow::bail!("no schemes enabled in the generation parameters");
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let system = SystemGraph::generate(&params, &mut rng)?;
        document::save(&system, &self.out)
            .with_context(|| format!("failed to write {}", self.out.display()))?;

        if let Some(path) = &self.save_params {
            params.save(path)?;
        }

        println!(
            "Generated {} modules and {} links in {}",
            system.len(),
            system.links().len(),
            self.out.display()
        );
        Ok(())
    }
}
