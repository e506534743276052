//! # Solver — Bound, Reduce, Sieve, Verify
//!
//! Orchestrates the pipeline for one S-unit group:
//!
//! 1. [`BoundEstimator`] gives the raw Baker bounds `K0` and `K1(v)`.
//! 2. [`PadicReducer`] and [`ArchimedeanReducer`] shrink them; the final
//!    bound is `M = max(p-adic, archimedean)`.
//! 3. [`split_primes_large_lcm`] picks split primes with `lcm(q − 1) ≥ 2M + 1`
//!    and [`PrimeSieveBuilder`] builds the pruned complement dictionaries.
//! 4. [`compatible_systems`] combines them; [`solutions_from_systems`] lifts,
//!    bounds and verifies; [`clean_sfs`] drops swapped duplicates.
//!
//! Rank 0 (only roots of unity) skips the bounds: every pair `ζ^i + ζ^j` is
//! checked directly.

use crate::archimedean::{ceil_float, ArchimedeanReducer};
use crate::bounds::BoundEstimator;
use crate::certificate::{BoundTrail, SolutionRecord, SolveCertificate};
use crate::config::SolverConfig;
use crate::error::Result;
use crate::padic::PadicReducer;
use crate::sieve::{split_primes_large_lcm, PrimeSieveBuilder};
use crate::systems::{clean_sfs, compatible_systems, solutions_from_systems, Solution};
use crate::unit_group::SUnitGroup;
use rug::Integer;
use tracing::info;

pub struct Solver {
    config: SolverConfig,
}

/// `M` together with the trail that produced it.
#[derive(Clone, Debug)]
pub struct FinalBound {
    pub bound: Integer,
    pub trail: BoundTrail,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        Solver { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Raw bounds followed by both reductions.
    pub fn bound(&self, group: &SUnitGroup) -> Result<FinalBound> {
        self.config.validate()?;
        if group.rank() == 0 {
            return Ok(FinalBound {
                bound: Integer::new(),
                trail: zero_trail(),
            });
        }
        let estimator = BoundEstimator::new(group, self.config.precision);
        let raw = estimator.initial_bound()?;
        info!(
            c1 = raw.c1.to_f64(),
            k0 = raw.k0.to_f64(),
            raw = raw.raw.to_f64(),
            "Initial exponent bound"
        );

        let k0 = ceil_float(&raw.k0, "K0")?;
        let padic = PadicReducer::new(group, &self.config).reduce(&k0)?;
        let archimedean = ArchimedeanReducer::new(group, &self.config).reduce()?;
        let bound = Integer::from(&padic).max(Integer::from(&archimedean));
        info!(padic = %padic, archimedean = %archimedean, bound = %bound, "Final exponent bound");

        let trail = BoundTrail {
            c1: raw.c1.to_f64(),
            c3: raw.c3.to_f64(),
            k0: raw.k0.to_f64(),
            k1: raw.k1.iter().map(|k| k.to_f64()).collect(),
            raw: raw.raw.to_f64(),
            padic: padic.to_string(),
            archimedean: archimedean.to_string(),
            final_bound: bound.to_string(),
        };
        Ok(FinalBound { bound, trail })
    }

    /// Every solution of `x + y = 1` in S-units, with the run's certificate.
    pub fn solve(&self, group: &SUnitGroup) -> Result<SolveCertificate> {
        let FinalBound { bound, trail } = self.bound(group)?;
        let mut cert = SolveCertificate::for_group(group, trail);
        let field = group.field();

        if group.rank() == 0 {
            let solutions = rank_zero_solutions(group)?;
            info!(solutions = solutions.len(), "Torsion-only group solved directly");
            cert.solutions = solutions
                .iter()
                .map(|s| SolutionRecord::from_solution(field, s))
                .collect();
            return Ok(cert);
        }

        let primes = split_primes_large_lcm(group, &bound, self.config.split_prime_factor)?;
        info!(primes = ?primes, "Split primes chosen");
        let sieve = PrimeSieveBuilder::new(group, &primes)?.build()?;
        let systems = compatible_systems(&sieve.primes, &sieve.dictionaries);
        info!(systems = systems.len(), "Compatible systems enumerated");
        let solutions = clean_sfs(solutions_from_systems(group, &bound, &systems, &sieve.primes)?);
        info!(solutions = solutions.len(), "Solutions verified");

        cert.split_primes = sieve.primes;
        cert.dictionaries = sieve.stats;
        cert.systems = systems.len();
        cert.solutions = solutions
            .iter()
            .map(|s| SolutionRecord::from_solution(field, s))
            .collect();
        Ok(cert)
    }

    /// Solutions only, as [`Solution`]s.
    pub fn solutions(&self, group: &SUnitGroup) -> Result<Vec<Solution>> {
        let cert = self.solve(group)?;
        let field = group.field();
        cert.solutions
            .iter()
            .map(|r| {
                Ok(Solution {
                    exponents: r.exponents.clone(),
                    complement: r.complement.clone(),
                    x: field.parse_element(&r.x)?,
                    y: field.parse_element(&r.y)?,
                })
            })
            .collect()
    }
}

fn zero_trail() -> BoundTrail {
    BoundTrail {
        c1: 0.0,
        c3: 0.0,
        k0: 0.0,
        k1: Vec::new(),
        raw: 0.0,
        padic: "0".into(),
        archimedean: "0".into(),
        final_bound: "0".into(),
    }
}

/// Pairs of roots of unity summing to one.
fn rank_zero_solutions(group: &SUnitGroup) -> Result<Vec<Solution>> {
    let one = group.field().one();
    let roots = group.roots_of_unity();
    let mut out = Vec::new();
    for (i, x) in roots.iter().enumerate() {
        for (j, y) in roots.iter().enumerate() {
            if x + y == one {
                out.push(Solution {
                    exponents: vec![i as i64],
                    complement: vec![j as i64],
                    x: x.clone(),
                    y: y.clone(),
                });
            }
        }
    }
    Ok(clean_sfs(out))
}

/// Solves with default settings, optionally at another starting precision.
pub fn solve_s_unit_equation(group: &SUnitGroup, precision: Option<u32>) -> Result<Vec<Solution>> {
    let config = precision.map_or_else(SolverConfig::default, SolverConfig::with_precision);
    Solver::new(config).solutions(group)
}
