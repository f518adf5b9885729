use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use ftdesign::{SystemGraph, storage::document};
use tracing::instrument;

#[derive(Debug, Parser)]
#[command(about = "Show catalog sizes, cost/time intervals and propagated times")]
pub struct Inspect {
    /// The system document
    system: PathBuf,

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

impl Inspect {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self) -> anyhow::Result<()> {
        let system = document::load(&self.system)
            .with_context(|| format!("failed to load {}", self.system.display()))?;

        match self.output {
            OutputFormat::Json => Self::output_json(&system)?,
            OutputFormat::Table => Self::output_table(&system),
        }
        Ok(())
    }

    fn output_json(system: &SystemGraph) -> anyhow::Result<()> {
        use serde_json::json;

        let modules: Vec<_> = system
            .modules()
            .iter()
            .map(|module| {
                let variants: serde_json::Map<String, serde_json::Value> = module
                    .schemes()
                    .iter()
                    .map(|&kind| (kind.to_string(), json!(module.variant_count(kind))))
                    .collect();
                json!({
                    "num": module.num(),
                    "hardware": module.hardware().len(),
                    "software": module.software().len(),
                    "variants": variants,
                    "design_space": module.total_variant_count(),
                    "cost": module.cost_interval(),
                    "time": module.time_interval(),
                    "propagated_time": [module.min_time(), module.max_time()],
                    "deadline": module.deadline,
                    "zone": module.zone,
                    "dependencies": module.dependencies(),
                })
            })
            .collect();

        let output = json!({
            "modules": modules,
            "links": system.links(),
            "cost": system.cost_interval(),
            "terminals": system.terminals(),
            "deadlines": system.deadlines(),
            "limit_cost": system.limit_cost(),
            "limit_rel": system.limit_rel(),
            "reconfiguration": system.mechanism(),
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_table(system: &SystemGraph) {
        println!(
            "{:<6} {:<4} {:<4} {:>12} {:>14} {:>12} {:>14} {:>9}  Dependencies",
            "Module", "HW", "SW", "Variants", "Cost", "Time", "Propagated", "Deadline"
        );
        for module in system.modules() {
            let (min_cost, max_cost) = module.cost_interval();
            let (min_time, max_time) = module.time_interval();
            let deadline = module
                .deadline
                .map_or_else(|| "-".to_string(), |deadline| deadline.to_string());
            let dependencies: Vec<_> = module.dependencies().iter().map(ToString::to_string).collect();
            println!(
                "{:<6} {:<4} {:<4} {:>12} {:>14} {:>12} {:>14} {:>9}  {}",
                module.num(),
                module.hardware().len(),
                module.software().len(),
                module.total_variant_count(),
                format!("{min_cost}..{max_cost}"),
                format!("{min_time}..{max_time}"),
                format!("{}..{}", module.min_time(), module.max_time()),
                deadline,
                dependencies.join(",")
            );
        }

        println!();
        let (min_cost, max_cost) = system.cost_interval();
        println!("Links:     {}", system.links().len());
        println!("Cost:      {min_cost}..{max_cost}");
        let terminals: Vec<_> = system.terminals().iter().map(ToString::to_string).collect();
        println!("Terminals: {}", terminals.join(","));
        if let Some(mechanism) = system.mechanism() {
            println!(
                "Reconfiguration: {} at cost {}",
                mechanism.reliability, mechanism.cost
            );
        }
    }
}
