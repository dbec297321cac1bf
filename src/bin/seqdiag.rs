use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use seqtree::{PrepareMode, SequenceTree};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Prepares a sequence tree and exports its sequence diagram.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON description of the sequence tree
    sequence: PathBuf,
    /// Output directory, the datasets land in <OUTPUT>/seqdiag
    #[clap(short, long, default_value = "seq")]
    output: PathBuf,
    /// Log every preparation error
    #[clap(short, long)]
    verbose: bool,
    /// Receiver phase of phase locked ADCs in rad, overrides the description
    #[clap(long)]
    phase_lock: Option<f64>,
    /// Print the prepared tree
    #[clap(long)]
    info: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    Registry::default().with(filter).with(fmt_layer).init();
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut tree = SequenceTree::from_file(&args.sequence)?;
    if let Some(phase_lock) = args.phase_lock {
        let mut context = *tree.context();
        context.phase_lock = phase_lock;
        tree.set_context(context);
    }

    let mode = if args.verbose {
        PrepareMode::Verbose
    } else {
        PrepareMode::Strict
    };
    if let Err(failure) = tree.prepare(mode) {
        // verbose preparation already logged every error
        if !args.verbose {
            for err in &failure.errors {
                error!("{err}");
            }
        }
        return Err(failure.into());
    }
    info!(
        "prepared {}: duration = {} ms, {} time points, {} ADCs",
        tree.root().name(),
        tree.duration(),
        tree.num_tpois(),
        tree.num_adcs()
    );
    if args.info {
        print!("{}", tree.info());
    }

    tree.seq_diag_to_dir(&args.output)?;
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
