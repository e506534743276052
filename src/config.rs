//! TOML problem files and solver tuning.
//!
//! A problem file names the field, the supplied S-unit generators and the
//! primes of `S`; an optional `[solver]` table overrides the defaults.
//!
//! ```toml
//! [field]
//! polynomial = [1, 1, 1]          # constant term first: x^2 + x + 1
//! variable = "xi"
//!
//! [units]
//! torsion = ["1", "1"]            # 1 + xi, a primitive 6th root of unity
//! torsion_order = 6
//! fundamental = [["-1", "-2"]]
//!
//! [[primes]]
//! p = 3                           # every prime above 3
//!
//! [solver]
//! precision = 106
//! ```
//!
//! `[[primes]]` entries may carry `root = r` to pick the single split prime
//! `(p, θ − r)` instead of every prime above `p`.

use crate::error::{Result, SolverError};
use crate::field::NumberField;
use crate::places::{prime_above_root, primes_above, PrimeIdeal};
use crate::unit_group::SUnitGroup;
use rug::Integer;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ── Solver Tuning ───────────────────────────────────────────────

fn default_precision() -> u32 {
    106
}

fn default_max_precision() -> u32 {
    8192
}

fn default_max_attempts() -> u32 {
    15
}

fn default_improvement() -> f64 {
    0.01
}

fn default_split_prime_factor() -> u64 {
    4
}

fn default_variable() -> String {
    "x".to_string()
}

/// Precision schedule and iteration caps shared by every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Starting precision: bits for real/complex work, digits for p-adic work.
    #[serde(default = "default_precision")]
    pub precision: u32,
    /// Escalation stops with `PrecisionExhausted` beyond this.
    #[serde(default = "default_max_precision")]
    pub max_precision: u32,
    /// Archimedean reduction steps per place.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Relative change below which archimedean reduction stops.
    #[serde(default = "default_improvement")]
    pub improvement: f64,
    /// Split primes are searched below `factor·M + 4`.
    #[serde(default = "default_split_prime_factor")]
    pub split_prime_factor: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            precision: default_precision(),
            max_precision: default_max_precision(),
            max_attempts: default_max_attempts(),
            improvement: default_improvement(),
            split_prime_factor: default_split_prime_factor(),
        }
    }
}

impl SolverConfig {
    pub fn with_precision(precision: u32) -> Self {
        SolverConfig {
            precision,
            ..SolverConfig::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.precision < 16 {
            return Err(SolverError::Config(format!(
                "precision must be at least 16, got {}",
                self.precision
            )));
        }
        if self.max_precision < self.precision {
            return Err(SolverError::Config(format!(
                "max_precision {} is below precision {}",
                self.max_precision, self.precision
            )));
        }
        if !(self.improvement > 0.0 && self.improvement < 1.0) {
            return Err(SolverError::Config(format!(
                "improvement must lie in (0, 1), got {}",
                self.improvement
            )));
        }
        if self.split_prime_factor == 0 {
            return Err(SolverError::Config("split_prime_factor must be positive".into()));
        }
        Ok(())
    }
}

// ── Problem Files ───────────────────────────────────────────────

/// The `[field]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSection {
    /// Integer coefficients of the monic defining polynomial, constant first.
    pub polynomial: Vec<i64>,
    #[serde(default = "default_variable")]
    pub variable: String,
}

/// The `[units]` table: coordinates as rational strings (`"1/3"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitsSection {
    pub torsion: Vec<String>,
    pub torsion_order: u64,
    #[serde(default)]
    pub fundamental: Vec<Vec<String>>,
}

/// One `[[primes]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimeSection {
    pub p: u64,
    pub root: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemFile {
    pub field: FieldSection,
    pub units: UnitsSection,
    #[serde(default)]
    pub primes: Vec<PrimeSection>,
    #[serde(default)]
    pub solver: SolverConfig,
}

impl ProblemFile {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let problem: ProblemFile =
            toml::from_str(content).map_err(|e| SolverError::Config(e.to_string()))?;
        problem.solver.validate()?;
        Ok(problem)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SolverError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn number_field(&self) -> Result<NumberField> {
        let coeffs = self.field.polynomial.iter().map(|&c| Integer::from(c)).collect();
        NumberField::new(coeffs, &self.field.variable)
    }

    /// The primes of `S`, in file order, without repeats.
    pub fn primes(&self, field: &NumberField) -> Result<Vec<PrimeIdeal>> {
        let mut out: Vec<PrimeIdeal> = Vec::new();
        for entry in &self.primes {
            let found = match entry.root {
                Some(root) => vec![prime_above_root(field, entry.p, root)?],
                None => primes_above(field, entry.p)?,
            };
            for prime in found {
                if !out.contains(&prime) {
                    out.push(prime);
                }
            }
        }
        Ok(out)
    }

    pub fn build_group(&self) -> Result<SUnitGroup> {
        let field = self.number_field()?;
        let primes = self.primes(&field)?;
        let zeta = field.parse_element(&self.units.torsion)?;
        let units = self
            .units
            .fundamental
            .iter()
            .map(|u| field.parse_element(u))
            .collect::<Result<Vec<_>>>()?;
        SUnitGroup::new(field, primes, zeta, self.units.torsion_order, units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EISENSTEIN: &str = r#"
[field]
polynomial = [1, 1, 1]
variable = "xi"

[units]
torsion = ["1", "1"]
torsion_order = 6
fundamental = [["-1", "-2"]]

[[primes]]
p = 3
"#;

    #[test]
    fn defaults_match_documented_values() {
        let c = SolverConfig::default();
        assert_eq!(c.precision, 106);
        assert_eq!(c.max_precision, 8192);
        assert_eq!(c.max_attempts, 15);
        assert!((c.improvement - 0.01).abs() < 1e-12);
        assert_eq!(c.split_prime_factor, 4);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn parses_problem_and_builds_group() {
        let problem = ProblemFile::from_toml_str(EISENSTEIN).unwrap();
        assert_eq!(problem.solver, SolverConfig::default());
        let group = problem.build_group().unwrap();
        assert_eq!(group.rank(), 1);
        assert_eq!(group.primes().len(), 1);
        assert_eq!(group.field().variable(), "xi");
    }

    #[test]
    fn solver_overrides_are_read() {
        let text = format!("{EISENSTEIN}\n[solver]\nprecision = 200\nmax_precision = 400\n");
        let problem = ProblemFile::from_toml_str(&text).unwrap();
        assert_eq!(problem.solver.precision, 200);
        assert_eq!(problem.solver.max_precision, 400);
        assert_eq!(problem.solver.max_attempts, 15);
    }

    #[test]
    fn parse_errors_surface_as_config() {
        assert!(matches!(
            ProblemFile::from_toml_str("[field]\npolynomial = \"oops\""),
            Err(SolverError::Config(_))
        ));
        let text = format!("{EISENSTEIN}\n[solver]\nprecision = 200\nmax_precision = 100\n");
        assert!(matches!(
            ProblemFile::from_toml_str(&text),
            Err(SolverError::Config(_))
        ));
    }

    #[test]
    fn explicit_root_selects_one_split_prime() {
        let text = r#"
[field]
polynomial = [1, 1, 1]
variable = "xi"

[units]
torsion = ["1", "1"]
torsion_order = 6
fundamental = [["-1", "-2"], ["3", "1"]]

[[primes]]
p = 3

[[primes]]
p = 7
root = 2
"#;
        let problem = ProblemFile::from_toml_str(text).unwrap();
        let field = problem.number_field().unwrap();
        let primes = problem.primes(&field).unwrap();
        assert_eq!(primes.len(), 2);
        assert_eq!(primes[1].p(), 7);
    }

    #[test]
    fn missing_file_is_config_error() {
        let path = std::path::Path::new("/nonexistent/problem.toml");
        assert!(matches!(ProblemFile::load(path), Err(SolverError::Config(_))));
    }
}
