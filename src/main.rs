//! accirc - AC circuit analysis from a LISO-compatible netlist.
//!
//! # Usage
//!
//! ```bash
//! accirc circuit.liso
//! accirc circuit.liso --compare --liso-path /usr/local/bin/liso
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use accirc_core::config::Config;
use accirc_core::dsl::{self, AnalysisRequest};
use accirc_core::error::CircuitError;
use accirc_core::opamp::OpAmpLibrary;
use accirc_core::runner;
use accirc_core::{liso_output, DEFAULT_DIFFERENCE_TOLERANCE};

/// AC circuit simulation core driver.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the netlist file.
    #[arg(value_name = "NETLIST")]
    netlist: PathBuf,

    /// Optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Invoke the reference binary and print a diff against its output.
    #[arg(long)]
    compare: bool,

    /// Path to the reference binary (overrides config/LISO_PATH).
    #[arg(long)]
    liso_path: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            eprintln!("error: {e}");
            match e {
                CircuitError::Parse { .. } => ExitCode::from(1),
                CircuitError::SingularMatrix { .. } | CircuitError::Numeric { .. } => ExitCode::from(2),
                CircuitError::Runner { .. } => ExitCode::from(3),
                _ => ExitCode::from(1),
            }
        }
    }
}

fn run(args: Args) -> accirc_core::Result<()> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let source = std::fs::read_to_string(&args.netlist)?;
    let script = dsl::parse(&source)?;
    let library = OpAmpLibrary::builtin();
    let (circuit, freq_spec, request) = dsl::build(&script, &library)?;
    let frequencies = dsl::expand_frequencies(&freq_spec)?;

    let solution = match &request {
        AnalysisRequest::Transfer { sinks } => {
            accirc_core::solver::transfer::sweep(&circuit, &frequencies, sinks, true)?
        }
        AnalysisRequest::Noise { sink, .. } => accirc_core::solver::noise::sweep(
            &circuit,
            &frequencies,
            sink,
            false,
            &config.constants,
            true,
        )?,
    };

    println!("{}", solution.to_table());

    if args.compare {
        let liso_path = args
            .liso_path
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| config.liso_path())
            .ok_or_else(|| CircuitError::config("no reference binary path configured"))?;

        let output = runner::run(std::path::Path::new(&liso_path), &args.netlist, None)?;
        let (_header, reference) = liso_output::parse(&output.stdout)?;
        let diff = solution.difference(&reference, DEFAULT_DIFFERENCE_TOLERANCE, true, true);
        if diff.is_empty() {
            println!("reference comparison: no differences beyond tolerance");
        } else {
            for row in diff {
                println!(
                    "{} -> {} @ {} Hz: expected {}, got {}",
                    row.source, row.sink, row.frequency, row.expected, row.actual
                );
            }
        }
    }

    Ok(())
}
