//! # Certificate — Exportable Solve Records
//!
//! A [`SolveCertificate`] records everything needed to audit a run without
//! repeating it: the bound trail from the raw Baker bound to the final `M`,
//! the split primes and dictionary sizes of the sieve, and every solution
//! with its exponent vectors and exact coordinates.
//!
//! [`SolveCertificate::verify`] re-checks the cheap part against a group:
//! each `x`, `y` equals `exp` of its exponents, `x + y = 1` holds exactly, and
//! the free exponents respect the final bound. Integers that may exceed
//! machine words are stored as decimal strings; field elements as
//! power-basis coordinates (`"1/3"`).
//!
//! ## Serialization
//!
//! All types derive `serde::Serialize` and `serde::Deserialize`; the CLI
//! prints certificates with `serde_json`.

use crate::error::{Result, SolverError};
use crate::field::NumberField;
use crate::sieve::DictionaryStats;
use crate::systems::Solution;
use crate::unit_group::SUnitGroup;
use rug::Integer;
use serde::{Deserialize, Serialize};

/// Bounds in the order they were computed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BoundTrail {
    pub c1: f64,
    pub c3: f64,
    /// Non-archimedean Baker bound `K0`.
    pub k0: f64,
    /// Archimedean Baker bounds `K1(v)`, one per infinite place.
    pub k1: Vec<f64>,
    pub raw: f64,
    /// After p-adic reduction.
    pub padic: String,
    /// After archimedean reduction.
    pub archimedean: String,
    /// `M`, the bound the sieve enforces.
    pub final_bound: String,
}

/// One solution, `x = exp(exponents)`, `y = exp(complement)`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SolutionRecord {
    pub exponents: Vec<i64>,
    pub complement: Vec<i64>,
    pub x: Vec<String>,
    pub y: Vec<String>,
    pub x_display: String,
    pub y_display: String,
}

impl SolutionRecord {
    pub fn from_solution(field: &NumberField, s: &Solution) -> Self {
        SolutionRecord {
            exponents: s.exponents.clone(),
            complement: s.complement.clone(),
            x: s.x.coefficient_strings(),
            y: s.y.coefficient_strings(),
            x_display: field.display(&s.x),
            y_display: field.display(&s.y),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SolveCertificate {
    /// Defining polynomial coefficients, constant first.
    pub polynomial: Vec<String>,
    pub variable: String,
    /// Labels of the primes of `S`.
    pub primes: Vec<String>,
    pub rank: usize,
    pub torsion_order: u64,
    pub bounds: BoundTrail,
    pub split_primes: Vec<u64>,
    pub dictionaries: Vec<DictionaryStats>,
    pub systems: usize,
    pub solutions: Vec<SolutionRecord>,
}

impl SolveCertificate {
    /// Header fields for `group`; bounds and sieve data are filled in by the solver.
    pub fn for_group(group: &SUnitGroup, bounds: BoundTrail) -> Self {
        let field = group.field();
        SolveCertificate {
            polynomial: field.integer_coefficients().iter().map(Integer::to_string).collect(),
            variable: field.variable().to_string(),
            primes: group.primes().iter().map(|p| p.label(field)).collect(),
            rank: group.rank(),
            torsion_order: group.zeta_order(),
            bounds,
            split_primes: Vec::new(),
            dictionaries: Vec::new(),
            systems: 0,
            solutions: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| SolverError::Verification(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| SolverError::Config(e.to_string()))
    }

    /// Re-checks every recorded solution against `group`.
    pub fn verify(&self, group: &SUnitGroup) -> Result<()> {
        let field = group.field();
        let bound: Integer = self
            .bounds
            .final_bound
            .parse()
            .map_err(|_| SolverError::Verification(format!("bad bound {:?}", self.bounds.final_bound)))?;
        let one = field.one();
        for (i, record) in self.solutions.iter().enumerate() {
            let x = field.parse_element(&record.x)?;
            let y = field.parse_element(&record.y)?;
            if &x + &y != one {
                return Err(SolverError::Verification(format!("solution {i}: x + y != 1")));
            }
            if group.exp(&record.exponents)? != x || group.exp(&record.complement)? != y {
                return Err(SolverError::Verification(format!(
                    "solution {i}: exponents do not reproduce x, y"
                )));
            }
            let free = record.exponents.iter().skip(1).chain(record.complement.iter().skip(1));
            if free.map(|&a| Integer::from(a).abs()).any(|a| a > bound) {
                return Err(SolverError::Verification(format!(
                    "solution {i}: exponent exceeds bound {bound}"
                )));
            }
        }
        Ok(())
    }
}
