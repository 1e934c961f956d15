//! `cvtl` command-line interface
//!
//! Trains and evaluates the transfer-learning pipeline, writes random
//! parameter files and renders the sub-space images of the seven inputs.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use cvtl::checkpoint;
use cvtl::config::{ExperimentConfig, MAX_Q_DEPTH};
use cvtl::context::ExecutionContext;
use cvtl::machine_learning::dataset::CoherentStateDataset;
use cvtl::machine_learning::quantum::TransferModel;
use cvtl::quantum::parameters::GateParameters;
use cvtl::training::{PhaseSummary, Trainer};

/// Quantum-to-classical transfer learning on a simulated photonic circuit
#[derive(Parser)]
#[command(name = "cvtl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the classifier head, test it and write a checkpoint
    Train {
        #[command(flatten)]
        experiment: ExperimentArgs,

        /// Gate parameter file (JSON array of 16 arrays)
        #[arg(short, long)]
        params: PathBuf,

        /// Checkpoint directory written after the test phase
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },

    /// Run only the test phase on a saved checkpoint
    Evaluate {
        #[command(flatten)]
        experiment: ExperimentArgs,

        /// Gate parameter file, unused when the checkpoint holds fine-tuned parameters
        #[arg(short, long)]
        params: Option<PathBuf>,

        /// Checkpoint directory to restore
        #[arg(long)]
        checkpoint: PathBuf,
    },

    /// Write a random gate parameter file
    InitParams {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Number of layers
        #[arg(long, default_value_t = MAX_Q_DEPTH)]
        depth: usize,

        /// Standard deviation of the parameters
        #[arg(long, default_value_t = 0.1)]
        std: f64,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the sub-space image of every noiseless input
    Images {
        #[command(flatten)]
        experiment: ExperimentArgs,

        /// Gate parameter file
        #[arg(short, long)]
        params: PathBuf,
    },
}

/// Configuration file plus per-option overrides
#[derive(Args)]
struct ExperimentArgs {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    cutoff: Option<usize>,

    #[arg(long)]
    im_dim: Option<usize>,

    #[arg(long)]
    q_depth: Option<usize>,

    #[arg(long)]
    c_depth: Option<usize>,

    /// Use the full cutoff block for features
    #[arg(long)]
    full_space: bool,

    /// Let the circuit parameters train as well
    #[arg(long)]
    fine_tune: bool,

    #[arg(long)]
    noise_scale: Option<f64>,

    #[arg(long)]
    num_epochs: Option<usize>,

    #[arg(long)]
    num_test_batches: Option<usize>,

    #[arg(long)]
    dump: Option<usize>,

    /// Learning rate
    #[arg(long)]
    step: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Evolve batch samples on one thread
    #[arg(long)]
    sequential: bool,
}

impl ExperimentArgs {
    fn load(&self) -> anyhow::Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::from_json_file(path)
                .with_context(|| format!("loading configuration {}", path.display()))?,
            None => ExperimentConfig::default(),
        };

        if let Some(v) = self.cutoff {
            config.cutoff = v;
        }
        if let Some(v) = self.im_dim {
            config.im_dim = v;
        }
        if let Some(v) = self.q_depth {
            config.q_depth = v;
        }
        if let Some(v) = self.c_depth {
            config.c_depth = v;
        }
        if self.full_space {
            config.sub_space = false;
        }
        if self.fine_tune {
            config.fine_tune = true;
        }
        if let Some(v) = self.noise_scale {
            config.noise_scale = v;
        }
        if let Some(v) = self.num_epochs {
            config.num_epochs = v;
        }
        if let Some(v) = self.num_test_batches {
            config.num_test_batches = v;
        }
        if let Some(v) = self.dump {
            config.dump = v;
        }
        if let Some(v) = self.step {
            config.step = v;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.sequential {
            config.parallel = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Train {
            experiment,
            params,
            checkpoint,
        } => train(&experiment, &params, checkpoint),
        Commands::Evaluate {
            experiment,
            params,
            checkpoint,
        } => evaluate(&experiment, params.as_deref(), &checkpoint),
        Commands::InitParams {
            output,
            depth,
            std,
            seed,
        } => init_params(&output, depth, std, seed),
        Commands::Images { experiment, params } => images(&experiment, &params),
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn load_params(path: &Path) -> anyhow::Result<GateParameters> {
    GateParameters::from_json_file(path).with_context(|| format!("loading gate parameters {}", path.display()))
}

fn print_phase(summary: &PhaseSummary) {
    for report in &summary.reports {
        println!("{}", report);
    }
    println!("{}", summary);
}

fn train(experiment: &ExperimentArgs, params: &Path, checkpoint_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let config = experiment.load()?;
    let params = load_params(params)?;
    let ctx = ExecutionContext::from_config(&config);

    let mut trainer = Trainer::new(config, &params, ctx)?;
    if let Some(dir) = checkpoint_dir {
        trainer = trainer.with_checkpoint_dir(dir);
    }

    let summary = trainer.run()?;
    print_phase(&summary.train);
    print_phase(&summary.test);
    println!(
        "final: train loss {:.4} accuracy {:.4}, test loss {:.4} accuracy {:.4} (seed {})",
        summary.train.mean_loss,
        summary.train.mean_accuracy,
        summary.test.mean_loss,
        summary.test.mean_accuracy,
        summary.seed
    );
    if let Some(dir) = summary.checkpoint {
        println!("checkpoint written to {}", dir.display());
    }
    Ok(())
}

fn evaluate(experiment: &ExperimentArgs, params: Option<&Path>, checkpoint_dir: &Path) -> anyhow::Result<()> {
    let mut config = experiment.load()?;
    let restored = checkpoint::load(checkpoint_dir)
        .with_context(|| format!("restoring checkpoint {}", checkpoint_dir.display()))?;
    let fallback = params.map(load_params).transpose()?;

    let model = restored
        .restore(&mut config, fallback, experiment.q_depth.is_some())
        .with_context(|| format!("rebuilding model from checkpoint {}", checkpoint_dir.display()))?;
    let ctx = ExecutionContext::from_config(&config);
    let mut trainer = Trainer::from_model(config, model, ctx)?;
    let summary = trainer.test_phase()?;
    print_phase(&summary);
    Ok(())
}

fn init_params(output: &Path, depth: usize, std: f64, seed: Option<u64>) -> anyhow::Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let params = GateParameters::random(depth, std, &mut rng)?;
    params.to_json_file(output)?;
    println!("wrote {} layers to {}", depth, output.display());
    Ok(())
}

const SHADES: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

fn images(experiment: &ExperimentArgs, params: &Path) -> anyhow::Result<()> {
    let config = experiment.load()?;
    let params = load_params(params)?;
    let mut ctx = ExecutionContext::from_config(&config);
    let model = TransferModel::new(&config, &params, &mut ctx)?;

    let dataset = CoherentStateDataset::new(config.alpha, 0.0)?;
    let batch = dataset.clean_batch();
    let features = model.features(&batch, ctx.parallel())?;

    for (label, image) in batch.labels.iter().zip(features.images.outer_iter()) {
        println!("class {}", label);
        let peak = image.iter().cloned().fold(0.0_f64, f64::max);
        for row in image.rows() {
            let line: String = row
                .iter()
                .map(|&p| {
                    let level = if peak > 0.0 { p / peak } else { 0.0 };
                    let index = (level * (SHADES.len() - 1) as f64).round() as usize;
                    SHADES[index.min(SHADES.len() - 1)]
                })
                .collect();
            println!("|{}|", line);
        }
    }
    Ok(())
}
