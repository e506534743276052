//! # Error — Solver Failure Modes
//!
//! Every fallible library routine returns [`Result`], whose error type names the
//! pipeline step that failed. Nothing is recovered silently: precision
//! escalation is the only retry, and once it reaches its ceiling it surfaces
//! here as [`SolverError::PrecisionExhausted`].

use thiserror::Error;

/// Errors raised while bounding, sieving, or verifying S-unit solutions.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The defining polynomial does not describe an absolute number field
    /// this crate can work with (not monic, degree 0, repeated roots...).
    #[error("invalid number field: {0}")]
    InvalidField(String),

    /// The supplied S-unit generators are inconsistent (wrong torsion order,
    /// support outside S, wrong field dimension).
    #[error("invalid S-unit generators: {0}")]
    InvalidGenerators(String),

    /// Primes above `p` could not be described by a local factor.
    #[error("unsupported prime above {p}: {reason}")]
    UnsupportedPrime { p: u64, reason: String },

    /// No size-t subset of places gave an invertible log-matrix, so `c1` is
    /// undefined.
    #[error("unit log-matrix is singular for every choice of places")]
    SingularUnitLattice,

    /// A lattice basis that must be invertible was singular.
    #[error("singular lattice basis in {0}")]
    SingularMatrix(&'static str),

    /// Division by, or logarithm of, zero.
    #[error("zero element where a unit was required")]
    ZeroElement,

    /// The p-adic logarithm needs an element of valuation 0 at the prime.
    #[error("element has valuation {valuation} at a prime above {p}, expected 0")]
    NonzeroValuation { p: u64, valuation: i64 },

    /// Precision escalation hit the configured ceiling.
    #[error("{step}: precision ceiling reached at {precision} (increase max precision)")]
    PrecisionExhausted { step: &'static str, precision: u32 },

    /// Too few completely split primes below the search limit.
    #[error("not enough split primes below {limit} to cover bound {bound} (increase bound)")]
    InsufficientSplitPrimes { bound: String, limit: u64 },

    /// A lifted candidate contradicted an invariant that the sieve guarantees.
    #[error("verification inconsistency: {0}")]
    Verification(String),

    /// Problem file or solver configuration could not be read.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SolverError>;
