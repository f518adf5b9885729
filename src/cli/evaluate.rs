use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use ftdesign::{
    Assignment, SystemEvaluation, SystemGraph,
    domain::evaluate_many,
    storage::{candidate, document},
};
use rand::{SeedableRng, rngs::StdRng};
use tracing::{info, instrument};

#[derive(Debug, Parser)]
#[command(about = "Evaluate a candidate, or a batch of random candidates")]
pub struct Evaluate {
    /// The system document
    system: PathBuf,

    /// A candidate file selecting one scheme per module
    #[arg(long, conflicts_with = "random")]
    candidate: Option<PathBuf>,

    /// Evaluate this many random candidates instead
    #[arg(long, value_name = "COUNT")]
    random: Option<usize>,

    /// Seed for random candidates
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Evaluate {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self) -> anyhow::Result<()> {
        let system = document::load(&self.system)
            .with_context(|| format!("failed to load {}", self.system.display()))?;

        let candidates = match &self.candidate {
            Some(path) => vec![
                candidate::load(path, &system)
                    .with_context(|| format!("failed to load {}", path.display()))?,
            ],
            None => {
                let mut rng = StdRng::seed_from_u64(self.seed);
                (0..self.random.unwrap_or(1))
                    .map(|_| Assignment::random(&system, &mut rng))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        info!(candidates = candidates.len(), "evaluating");

        let evaluations = evaluate_many(&system, &candidates);

        match self.output {
            OutputFormat::Json => Self::output_json(&system, &candidates, &evaluations)?,
            OutputFormat::Table => Self::output_table(&system, &candidates, &evaluations),
        }
        Ok(())
    }

    fn output_json(
        system: &SystemGraph,
        candidates: &[Assignment],
        evaluations: &[SystemEvaluation],
    ) -> anyhow::Result<()> {
        use serde_json::json;

        let results: Vec<_> = candidates
            .iter()
            .zip(evaluations)
            .map(|(candidate, evaluation)| {
                json!({
                    "candidate": candidate.schemes().iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "evaluation": evaluation,
                    "within_budget": evaluation.within_budget(system),
                })
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&results)?);
        Ok(())
    }

    fn output_table(
        system: &SystemGraph,
        candidates: &[Assignment],
        evaluations: &[SystemEvaluation],
    ) {
        for (index, (candidate, evaluation)) in candidates.iter().zip(evaluations).enumerate() {
            if index > 0 {
                println!();
            }
            println!("Candidate {index}");
            println!("{:<6} {:<8} {:<24} {:>8} {:>8}", "Module", "Scheme", "Reliability", "Cost", "Time");
            for (scheme, module) in candidate.schemes().iter().zip(&evaluation.modules) {
                println!(
                    "{:<6} {:<8} {:<24} {:>8} {:>8}",
                    module.module,
                    module.kind,
                    module.reliability.to_string(),
                    module.cost,
                    module.time
                );
                println!("       hw {:?} sw {:?}", scheme.hardware(), scheme.software());
            }
            println!("System reliability: {}", evaluation.reliability);
            println!("System cost:        {}", evaluation.cost);
            let verdict = if evaluation.within_budget(system) {
                "within budget"
            } else {
                "over budget"
            };
            println!("Budget:             {verdict}");
        }
    }
}
