mod evaluate;
mod generate;
mod inspect;
mod normalize;
mod schedule;

use clap::ArgAction;
use evaluate::Evaluate;
use generate::Generate;
use inspect::Inspect;
use normalize::Normalize;
use schedule::Schedule;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);
        self.command.run()
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Evaluate a candidate, or a batch of random candidates
    Evaluate(Evaluate),

    /// Emit the task graph of a candidate for a scheduler
    Schedule(Schedule),

    /// Show catalog sizes, cost/time intervals and propagated times
    Inspect(Inspect),

    /// Generate a random system document
    Generate(Generate),

    /// Load a system document and save it in canonical form
    ///
    /// Modules and variants are sorted by number and every time cell is
    /// written exactly once.
    Normalize(Normalize),
}

impl Command {
    fn run(self) -> anyhow::Result<()> {
        match self {
            Self::Evaluate(command) => command.run()?,
            Self::Schedule(command) => command.run()?,
            Self::Inspect(command) => command.run()?,
            Self::Generate(command) => command.run()?,
            Self::Normalize(command) => command.run()?,
        }
        Ok(())
    }
}
