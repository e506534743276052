//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim. Each subcommand
//! loads its problem file, applies the global precision overrides, runs the
//! matching library stage and prints either text or JSON.

use anyhow::{bail, Context, Result};
use std::path::Path;
use sunit::sieve::split_primes_large_lcm;
use sunit::{ProblemFile, SolveCertificate, Solver, SolverConfig, SUnitGroup};
use tracing::{info, warn};

use super::Cli;

// ── Problem Loading ─────────────────────────────────────────────

fn load(cli: &Cli, path: &Path) -> Result<(SUnitGroup, SolverConfig)> {
    let problem = ProblemFile::load(path)
        .with_context(|| format!("failed to load problem file {}", path.display()))?;
    let group = problem
        .build_group()
        .with_context(|| format!("invalid S-unit group in {}", path.display()))?;
    let mut config = problem.solver.clone();
    if let Some(p) = cli.precision {
        config.precision = p;
    }
    if let Some(p) = cli.max_precision {
        config.max_precision = p;
    }
    config.validate().context("invalid solver settings")?;
    info!(
        degree = group.field().degree(),
        primes = group.primes().len(),
        rank = group.rank(),
        precision = config.precision,
        "Problem loaded"
    );
    Ok((group, config))
}

// ── Solve ───────────────────────────────────────────────────────

pub fn run_solve(cli: &Cli, problem: &Path, certificate: Option<&Path>) -> Result<()> {
    let (group, config) = load(cli, problem)?;
    let cert = Solver::new(config)
        .solve(&group)
        .context("solver failed")?;

    if let Some(path) = certificate {
        let json = cert.to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write certificate {}", path.display()))?;
        info!(path = %path.display(), "Certificate written");
    }

    if cli.json {
        println!("{}", cert.to_json()?);
        return Ok(());
    }
    println!("Bound M = {}", cert.bounds.final_bound);
    println!("Split primes: {:?}", cert.split_primes);
    println!("{} solution(s):", cert.solutions.len());
    for s in &cert.solutions {
        println!(
            "  x = {}, y = {}   exponents {:?} / {:?}",
            s.x_display, s.y_display, s.exponents, s.complement
        );
    }
    Ok(())
}

// ── Bound ───────────────────────────────────────────────────────

pub fn run_bound(cli: &Cli, problem: &Path) -> Result<()> {
    let (group, config) = load(cli, problem)?;
    let fb = Solver::new(config)
        .bound(&group)
        .context("bound computation failed")?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&fb.trail)?);
        return Ok(());
    }
    let t = &fb.trail;
    println!("c1 = {:.6e}, c3 = {:.6e}", t.c1, t.c3);
    println!("K0 = {:.6e}", t.k0);
    for (i, k) in t.k1.iter().enumerate() {
        println!("K1(v{i}) = {k:.6e}");
    }
    println!("After p-adic reduction: {}", t.padic);
    println!("After archimedean reduction: {}", t.archimedean);
    println!("M = {}", t.final_bound);
    Ok(())
}

// ── Split Primes ────────────────────────────────────────────────

pub fn run_split_primes(cli: &Cli, problem: &Path, bound: u64, factor: Option<u64>) -> Result<()> {
    let (group, config) = load(cli, problem)?;
    let factor = factor.unwrap_or(config.split_prime_factor);
    if factor == 0 {
        bail!("--factor must be positive");
    }
    let primes = split_primes_large_lcm(&group, &bound.into(), factor)
        .with_context(|| format!("no split-prime set for M = {bound}"))?;
    if cli.json {
        println!("{}", serde_json::to_string(&primes)?);
    } else {
        let joined: Vec<String> = primes.iter().map(u64::to_string).collect();
        println!("{}", joined.join(" "));
    }
    Ok(())
}

// ── Verify ──────────────────────────────────────────────────────

pub fn run_verify(cli: &Cli, problem: &Path, certificate: &Path) -> Result<()> {
    let (group, _) = load(cli, problem)?;
    let text = std::fs::read_to_string(certificate)
        .with_context(|| format!("failed to read certificate {}", certificate.display()))?;
    let cert = SolveCertificate::from_json(&text).context("malformed certificate")?;
    if cert.rank != group.rank() || cert.torsion_order != group.zeta_order() {
        warn!(
            cert_rank = cert.rank,
            rank = group.rank(),
            "Certificate header differs from problem"
        );
    }
    cert.verify(&group).context("certificate rejected")?;
    if cli.json {
        println!("{}", serde_json::json!({ "verified": true, "solutions": cert.solutions.len() }));
    } else {
        println!("Certificate OK: {} solution(s)", cert.solutions.len());
    }
    Ok(())
}

// ── Rayon Configuration ─────────────────────────────────────────

/// Configure the rayon global thread pool (0 or unset = all cores).
pub fn configure_rayon(threads: Option<usize>) {
    let num_threads = threads.unwrap_or(0);
    if num_threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
        {
            warn!(error = %e, "Could not configure rayon thread pool");
        }
    }
}
