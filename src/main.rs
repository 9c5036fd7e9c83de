//! narrative-search CLI: informed graph search for event narratives.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use narrative_search::config::SearchConfig;
use narrative_search::framework::{self, Framework};
use narrative_search::metrics::{self, GoldStandard};
use narrative_search::persist;

#[derive(Parser)]
#[command(
    name = "narrative-search",
    version,
    about = "Informed graph search for event narratives"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a search described by a TOML run file.
    Run {
        /// Path to the run file.
        #[arg(long)]
        config: PathBuf,

        /// Output folder (overrides `output` in the run file).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Iteration budget (overrides `iterations` in the run file).
        #[arg(long)]
        iterations: Option<usize>,

        /// Continue from the snapshot in this output folder.
        #[arg(long)]
        resume: Option<PathBuf>,
    },

    /// Validate a run file and load its static inputs without searching.
    Check {
        #[arg(long)]
        config: PathBuf,
    },

    /// Recompute per-iteration metrics of a finished run.
    Evaluate {
        /// Output folder of the run.
        #[arg(long)]
        run: PathBuf,

        /// Run file providing the `[gold]` section.
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            output,
            iterations,
            resume,
        } => {
            let mut config = SearchConfig::from_file(&config).into_diagnostic()?;
            if let Some(output) = output {
                config.output = Some(output);
            }
            if let Some(iterations) = iterations {
                config.iterations = iterations;
            }

            let mut fw = match resume {
                Some(folder) => {
                    let state = persist::load_state(&folder).into_diagnostic()?;
                    let source = match &config.source {
                        Some(source) => framework::open_source(source).into_diagnostic()?,
                        None => miette::bail!("the run file has no [source] section"),
                    };
                    Framework::resume(config, source, state).into_diagnostic()?
                }
                None => Framework::from_config(config).into_diagnostic()?,
            };
            let summary = fw.run().into_diagnostic()?;

            println!("Termination:    {}", summary.termination);
            println!("Iterations:     {}", summary.iterations);
            println!("Nodes expanded: {}", summary.nodes_expanded);
            println!("Subgraph:       {} triples", summary.subgraph_triples);
            if let Some(best) = summary.best {
                println!(
                    "Best F1:        {:.4} at iteration {} (precision {:.4}, recall {:.4})",
                    best.metrics.f1, best.iteration, best.metrics.precision, best.metrics.recall
                );
            }
            if let Some(output) = &fw.config().output {
                println!("Artifacts:      {}", output.display());
            }
        }

        Commands::Check { config } => {
            let config = SearchConfig::from_file(&config).into_diagnostic()?;
            if let Some(gold) = &config.gold {
                let gold = GoldStandard::load(gold).into_diagnostic()?;
                println!("Gold standard:  {} events", gold.len());
            }
            println!("Dataset:        {}", config.dataset.name);
            println!("Start:          {}", config.start);
            println!("Ranking:        {}", config.ranking);
            println!("Iterations:     {}", config.iterations);
            println!("Configuration is valid.");
        }

        Commands::Evaluate { run, config } => {
            let config = SearchConfig::from_file(&config).into_diagnostic()?;
            let Some(gold) = &config.gold else {
                miette::bail!("the run file has no [gold] section");
            };
            let gold = GoldStandard::load(gold).into_diagnostic()?;
            let state = persist::load_state(&run).into_diagnostic()?;
            let history = metrics::replay(&state, &gold);

            println!("{:>9}  {:>6}  {:>9}  {:>6}  {:>6}", "iteration", "found", "precision", "recall", "f1");
            for record in &history {
                println!(
                    "{:>9}  {:>6}  {:>9.4}  {:>6.4}  {:>6.4}",
                    record.iteration,
                    record.found,
                    record.metrics.precision,
                    record.metrics.recall,
                    record.metrics.f1
                );
            }
            if let Some(best) = metrics::best_iteration(&history) {
                println!("Best F1 at iteration {}", best.iteration);
            }
        }
    }

    Ok(())
}
