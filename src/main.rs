//! # Main — CLI Entry Point
//!
//! Routes CLI subcommands to the solver. Handles shared concerns: `.env`
//! loading, structured logging, and the precision overrides applied on top of
//! a problem file's `[solver]` table.
//!
//! ## Subcommands
//!
//! - `solve`: full run, prints solutions (or the certificate with `--json`).
//! - `bound`: raw Baker bounds and both reductions, no sieve.
//! - `split-primes`: the split primes the sieve would use for a given bound.
//! - `verify`: re-checks a saved certificate against its problem file.
//!
//! ## Global Options
//!
//! - `--precision` / `SUNIT_PRECISION`: starting precision (bits, and digits
//!   for p-adic work).
//! - `--max-precision` / `SUNIT_MAX_PRECISION`: escalation ceiling.
//! - `--json`: machine-readable output on stdout.
//! - `--threads`: Rayon thread pool size (0 = all cores).

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "sunit", about = "Solve the S-unit equation x + y = 1 over a number field")]
struct Cli {
    /// Starting precision; overrides the problem file's [solver] table
    #[arg(long, global = true, env = "SUNIT_PRECISION")]
    precision: Option<u32>,

    /// Precision ceiling for escalation
    #[arg(long, global = true, env = "SUNIT_MAX_PRECISION")]
    max_precision: Option<u32>,

    /// Print JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// Number of rayon worker threads (defaults to all logical cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find every solution of x + y = 1 in S-units
    Solve {
        /// TOML problem file
        #[arg(long)]
        problem: PathBuf,
        /// Also write the certificate to this file
        #[arg(long)]
        certificate: Option<PathBuf>,
    },
    /// Compute the exponent bound M without sieving
    Bound {
        #[arg(long)]
        problem: PathBuf,
    },
    /// List split primes whose lcm(q - 1) covers 2M + 1
    SplitPrimes {
        #[arg(long)]
        problem: PathBuf,
        /// Exponent bound M
        #[arg(long)]
        bound: u64,
        /// Primes are searched below factor * M + 4
        #[arg(long)]
        factor: Option<u64>,
    },
    /// Re-check a certificate against its problem file
    Verify {
        #[arg(long)]
        problem: PathBuf,
        #[arg(long)]
        certificate: PathBuf,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // LOG_FORMAT=json for log collectors, human-readable otherwise; RUST_LOG filters
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    cli::configure_rayon(cli.threads);

    match &cli.command {
        Commands::Solve {
            problem,
            certificate,
        } => cli::run_solve(&cli, problem, certificate.as_deref()),
        Commands::Bound { problem } => cli::run_bound(&cli, problem),
        Commands::SplitPrimes {
            problem,
            bound,
            factor,
        } => cli::run_split_primes(&cli, problem, *bound, *factor),
        Commands::Verify {
            problem,
            certificate,
        } => cli::run_verify(&cli, problem, certificate),
    }
}
