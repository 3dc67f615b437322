use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

use tetris_rl::{AppConfig, QNetwork, sequential::tensor::argmax};

/// Create, inspect and probe Q-network checkpoints.
#[derive(Debug, Parser)]
#[command(name = "qnet")]
struct Cli {
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count, help = "Increase verbosity level (default WARN, -v = INFO, -vv = DEBUG, -vvv = TRACE)")]
    verbose: u8,

    #[arg(long, global = true, default_value = "qnet.toml", help = "Path to TOML configuration file")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a freshly initialised network and save it
    Init {
        #[arg(long, help = "Checkpoint path (defaults to network.checkpoint from the config)")]
        out: Option<PathBuf>,
        #[arg(long)]
        input_size: Option<usize>,
        #[arg(long)]
        output_size: Option<usize>,
        #[arg(long, help = "Seed for weight initialisation (defaults to trainer.seed)")]
        seed: Option<u64>,
    },
    /// Print the architecture of a checkpoint
    Info { path: PathBuf },
    /// Score a state vector with a checkpoint
    Probe {
        path: PathBuf,
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        state: Vec<f32>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::filter::LevelFilter::from_level(level))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    match cli.command {
        Commands::Init { out, input_size, output_size, seed } => {
            let input_size = input_size.unwrap_or(config.network.input_size);
            let output_size = output_size.unwrap_or(config.network.output_size);
            if input_size == 0 || output_size == 0 {
                bail!("network sizes must be > 0");
            }
            let path = out.unwrap_or(config.network.checkpoint);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }

            let mut rng = match seed.or(config.trainer.seed) {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            let network = QNetwork::new(input_size, output_size, &mut rng);
            network.save(&path)?;
            println!("wrote {} ({} -> {}, {} parameters)", path.display(), input_size, output_size, network.parameter_count());
        }
        Commands::Info { path } => {
            let network = QNetwork::from_checkpoint(&path)?;
            info!(path = %path.display(), "inspecting checkpoint");
            println!("input size:  {}", network.input_size());
            println!("output size: {}", network.output_size());
            println!("parameters:  {}", network.parameter_count());
        }
        Commands::Probe { path, state } => {
            let network = QNetwork::from_checkpoint(&path)?;
            if state.len() != network.input_size() {
                bail!("state has {} values but the network expects {}", state.len(), network.input_size());
            }
            let scores = network.forward(&state);
            for (id, score) in scores.iter().enumerate() {
                println!("{id}: {score:.6}");
            }
            if let Some(best) = argmax(&scores) {
                println!("greedy action: {best}");
            }
        }
    }

    Ok(())
}
