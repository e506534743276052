//! # sunit — S-Unit Equation Solver
//!
//! Finds every solution of `x + y = 1` with `x`, `y` S-units of a number
//! field `K`. The pipeline follows the de Weger / Smart method:
//!
//! | Module | Role |
//! |--------|------|
//! | [`poly`], [`field`] | Exact arithmetic in `Q[x]/(f)` |
//! | [`places`] | Infinite places and primes of `K`, valuations |
//! | [`unit_group`] | The S-unit group from supplied generators |
//! | [`lll`] | Integer LLL and closest-vector lower bounds |
//! | [`bounds`] | Baker-type exponent bounds `K0`, `K1(v)` |
//! | [`padic`] | p-adic logarithms and p-adic bound reduction |
//! | [`archimedean`] | Real and complex bound reduction |
//! | [`sieve`] | Split primes and complement dictionaries |
//! | [`systems`] | Compatible systems, CRT lifting, verification |
//! | [`solver`] | The full run and its [`certificate`] |
//!
//! All numeric routines take an explicit precision; none reads global state.

pub mod archimedean;
pub mod bounds;
pub mod certificate;
pub mod config;
pub mod error;
pub mod field;
pub mod lll;
pub mod padic;
pub mod places;
pub mod poly;
pub mod sieve;
pub mod solver;
pub mod systems;
pub mod unit_group;

pub use certificate::SolveCertificate;
pub use config::{ProblemFile, SolverConfig};
pub use error::SolverError;
pub use field::{FieldElement, NumberField};
pub use solver::{solve_s_unit_equation, Solver};
pub use systems::Solution;
pub use unit_group::SUnitGroup;
