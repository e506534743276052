//! # Unit Group — Supplied S-Unit Generators
//!
//! The solver does not compute S-unit groups; the caller supplies generators
//! `ρ_0, ρ_1, …, ρ_t` where `ρ_0 = ζ` generates the roots of unity (order
//! `w0`) and `ρ_1..ρ_t` are fundamental S-units. Construction checks what can
//! be checked cheaply and exactly:
//!
//! - `ζ` has exact order `w0`, and `w0` is even (every field contains `−1`).
//! - `w0` is the full torsion order `w_K`: for every prime `ℓ` with
//!   `φ(ℓ·w0) | d`, the field is searched for a primitive `ℓ·w0`-th root of
//!   unity. A candidate is read off the complex embeddings, rounded to
//!   coordinates with denominator `|disc f|`, and confirmed exactly.
//! - The rank matches Dirichlet's S-unit theorem: `t = r1 + r2 − 1 + |S|`.
//! - Each fundamental unit is nonzero, its norm is `±` a product of primes
//!   below `S`, and it has valuation zero at every prime above those rational
//!   primes that is not itself in `S`.
//!
//! Multiplicative independence is not checked here; a dependent set shows up
//! later as a singular unit log-matrix.

use crate::error::{Result, SolverError};
use crate::field::{FieldElement, NumberField};
use crate::places::{self, PrimeIdeal};
use crate::sieve::{factor_u64, gcd, generate_primes};
use rug::float::Constant;
use rug::{Complex, Float, Integer, Rational};

/// Precision used only to count real and complex places during validation.
const SIGNATURE_PRECISION: u32 = 64;

/// Working bits for the root-of-unity search, before the discriminant and
/// degree allowances are added.
const TORSION_SEARCH_BITS: u32 = 256;

#[derive(Clone, Debug)]
pub struct SUnitGroup {
    field: NumberField,
    primes: Vec<PrimeIdeal>,
    zeta: FieldElement,
    zeta_order: u64,
    units: Vec<FieldElement>,
}

impl SUnitGroup {
    pub fn new(
        field: NumberField,
        primes: Vec<PrimeIdeal>,
        zeta: FieldElement,
        zeta_order: u64,
        units: Vec<FieldElement>,
    ) -> Result<Self> {
        let group = SUnitGroup {
            field,
            primes,
            zeta,
            zeta_order,
            units,
        };
        group.check_torsion()?;
        group.check_full_torsion()?;
        group.check_rank()?;
        for (i, unit) in group.units.iter().enumerate() {
            group.check_support(i, unit)?;
        }
        Ok(group)
    }

    fn check_torsion(&self) -> Result<()> {
        let w0 = self.zeta_order;
        if w0 < 2 || w0 % 2 == 1 {
            return Err(SolverError::InvalidGenerators(format!(
                "torsion order must be even and at least 2, got {w0}"
            )));
        }
        let exponent = i64::try_from(w0).map_err(|_| {
            SolverError::InvalidGenerators(format!("torsion order {w0} is too large"))
        })?;
        if !self.field.pow(&self.zeta, exponent)?.is_one() {
            return Err(SolverError::InvalidGenerators(format!(
                "torsion generator is not a {w0}-th root of unity"
            )));
        }
        for (ell, _) in factor_u64(w0) {
            if self.field.pow(&self.zeta, exponent / ell as i64)?.is_one() {
                return Err(SolverError::InvalidGenerators(format!(
                    "torsion generator has order dividing {}",
                    w0 / ell
                )));
            }
        }
        Ok(())
    }

    /// Rejects `ζ` when the field holds a root of unity of order `ℓ·w0`.
    fn check_full_torsion(&self) -> Result<()> {
        let d = self.field.degree() as u64;
        let w0 = self.zeta_order;
        for ell in generate_primes(d + 1) {
            let Some(n) = w0.checked_mul(ell) else {
                continue;
            };
            if d % totient(n) != 0 {
                continue;
            }
            if let Some(eta) = primitive_root_of_unity(&self.field, n)? {
                return Err(SolverError::InvalidGenerators(format!(
                    "torsion generator has order {w0}, but {} is a root of unity of order {n}",
                    self.field.display(&eta)
                )));
            }
        }
        Ok(())
    }

    fn check_rank(&self) -> Result<()> {
        let places = places::infinite_places(&self.field, SIGNATURE_PRECISION)?;
        let expected = places.len() - 1 + self.primes.len();
        if self.units.len() != expected {
            return Err(SolverError::InvalidGenerators(format!(
                "expected {expected} fundamental S-units ({} infinite places, {} primes), got {}",
                places.len(),
                self.primes.len(),
                self.units.len()
            )));
        }
        Ok(())
    }

    fn check_support(&self, index: usize, unit: &FieldElement) -> Result<()> {
        if unit.coeffs().len() != self.field.degree() {
            return Err(SolverError::InvalidGenerators(format!(
                "unit {index} has {} coordinates, field has degree {}",
                unit.coeffs().len(),
                self.field.degree()
            )));
        }
        if unit.is_zero() {
            return Err(SolverError::InvalidGenerators(format!("unit {index} is zero")));
        }
        let norm = self.field.norm(unit);
        let mut num = Integer::from(norm.numer().abs_ref());
        let mut den = norm.denom().clone();
        for p in self.primes_below() {
            let prime = Integer::from(p);
            num.remove_factor_mut(&prime);
            den.remove_factor_mut(&prime);
        }
        if num != 1 || den != 1 {
            return Err(SolverError::InvalidGenerators(format!(
                "norm of unit {index} ({norm}) has support outside S"
            )));
        }
        for p in self.primes_below() {
            // Shapes `primes_above` cannot describe are left unchecked.
            let Ok(above) = places::primes_above(&self.field, p) else {
                continue;
            };
            for prime in above.iter().filter(|q| !self.primes.contains(q)) {
                let v = prime.valuation(&self.field, unit)?;
                if v != 0 {
                    return Err(SolverError::InvalidGenerators(format!(
                        "unit {index} has valuation {v} at {}, which is not in S",
                        prime.label(&self.field)
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn field(&self) -> &NumberField {
        &self.field
    }

    pub fn primes(&self) -> &[PrimeIdeal] {
        &self.primes
    }

    /// Number of fundamental S-units `t`.
    pub fn rank(&self) -> usize {
        self.units.len()
    }

    pub fn zeta(&self) -> &FieldElement {
        &self.zeta
    }

    pub fn zeta_order(&self) -> u64 {
        self.zeta_order
    }

    pub fn fundamental_units(&self) -> &[FieldElement] {
        &self.units
    }

    /// `ρ_0 = ζ` followed by the fundamental units.
    pub fn gens(&self) -> Vec<FieldElement> {
        std::iter::once(self.zeta.clone())
            .chain(self.units.iter().cloned())
            .collect()
    }

    /// All roots of unity `ζ^k`, `0 ≤ k < w0`.
    pub fn roots_of_unity(&self) -> Vec<FieldElement> {
        let mut out = Vec::with_capacity(self.zeta_order as usize);
        let mut acc = self.field.one();
        for _ in 0..self.zeta_order {
            out.push(acc.clone());
            acc = self.field.mul(&acc, &self.zeta);
        }
        out
    }

    /// `∏ ρ_i^{a_i}`; `a_0` is read modulo `w0`.
    pub fn exp(&self, exponents: &[i64]) -> Result<FieldElement> {
        if exponents.len() != self.rank() + 1 {
            return Err(SolverError::InvalidGenerators(format!(
                "exponent vector has length {}, expected {}",
                exponents.len(),
                self.rank() + 1
            )));
        }
        let a0 = exponents[0].rem_euclid(self.zeta_order as i64);
        let mut acc = self.field.pow(&self.zeta, a0)?;
        for (unit, &a) in self.units.iter().zip(&exponents[1..]) {
            if a != 0 {
                acc = self.field.mul(&acc, &self.field.pow(unit, a)?);
            }
        }
        Ok(acc)
    }

    /// Distinct rational primes below `S`, ascending.
    pub fn primes_below(&self) -> Vec<u64> {
        let mut out: Vec<u64> = self.primes.iter().map(PrimeIdeal::p).collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

/// Euler's `φ(n)`.
fn totient(n: u64) -> u64 {
    factor_u64(n)
        .into_iter()
        .fold(n, |acc, (p, _)| acc / p * (p - 1))
}

/// A primitive `n`-th root of unity of `field`, if there is one.
///
/// Only totally complex fields can hold roots of unity beyond `±1`. The
/// embedding of one pair is fixed to `e^{2πi/n}`; every choice of exponents
/// coprime to `n` at the remaining pairs is tried.
pub fn primitive_root_of_unity(field: &NumberField, n: u64) -> Result<Option<FieldElement>> {
    let d = field.degree();
    if n <= 2 {
        return Ok(Some(field.from_integer(if n == 1 { 1 } else { -1 })));
    }
    let disc = Integer::from(field.discriminant().numer().abs_ref());
    let prec = TORSION_SEARCH_BITS + disc.significant_bits() + 16 * d as u32;
    let roots = places::complex_roots(field.polynomial(), prec)?;
    if roots.iter().any(|r| r.imag().is_zero()) {
        return Ok(None);
    }
    let pairs = d / 2;
    let exponents: Vec<u64> = (1..n).filter(|&k| gcd(k, n) == 1).collect();
    let vandermonde: Vec<Vec<Complex>> = roots
        .iter()
        .map(|r| {
            let mut row = Vec::with_capacity(d);
            let mut acc = Complex::with_val(prec, (1, 0));
            for _ in 0..d {
                row.push(acc.clone());
                acc *= r;
            }
            row
        })
        .collect();

    // Odometer over the exponents of pairs 1..pairs; pair 0 is fixed to 1.
    let mut choice = vec![0usize; pairs];
    loop {
        let mut targets = Vec::with_capacity(d);
        for (pair, &c) in choice.iter().enumerate() {
            let k = if pair == 0 { 1 } else { exponents[c] };
            let z = unit_circle_point(k, n, prec);
            targets.push(z.clone());
            targets.push(z.conj());
        }
        if let Some(coords) = solve_complex(&vandermonde, targets, prec) {
            if let Some(eta) = round_coordinates(field, &coords, &disc, prec)? {
                if is_primitive_root(field, &eta, n)? {
                    return Ok(Some(eta));
                }
            }
        }
        let Some(pos) = (1..pairs).find(|&i| choice[i] + 1 < exponents.len()) else {
            return Ok(None);
        };
        choice[pos] += 1;
        for c in &mut choice[1..pos] {
            *c = 0;
        }
    }
}

/// `e^{2πik/n}` at `prec` bits.
fn unit_circle_point(k: u64, n: u64, prec: u32) -> Complex {
    let angle = Float::with_val(prec, Constant::Pi) * 2u32 * Float::with_val(prec, k) / Float::with_val(prec, n);
    let (sin, cos) = angle.sin_cos(Float::new(prec));
    Complex::with_val(prec, (cos, sin))
}

/// Gaussian elimination with partial pivoting; `None` if a pivot vanishes.
fn solve_complex(matrix: &[Vec<Complex>], mut rhs: Vec<Complex>, prec: u32) -> Option<Vec<Complex>> {
    let n = matrix.len();
    let mut a = matrix.to_vec();
    let tiny = places::epsilon(prec, prec / 2);
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| {
            let ai = Float::with_val(prec, a[i][col].abs_ref());
            let aj = Float::with_val(prec, a[j][col].abs_ref());
            ai.partial_cmp(&aj).unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if Float::with_val(prec, a[pivot][col].abs_ref()) < tiny {
            return None;
        }
        a.swap(pivot, col);
        rhs.swap(pivot, col);
        for r in col + 1..n {
            let factor = Complex::with_val(prec, &a[r][col] / &a[col][col]);
            for c in col..n {
                let delta = Complex::with_val(prec, &factor * &a[col][c]);
                a[r][c] -= delta;
            }
            let delta = Complex::with_val(prec, &factor * &rhs[col]);
            rhs[r] -= delta;
        }
    }
    let mut x = vec![Complex::with_val(prec, (0, 0)); n];
    for row in (0..n).rev() {
        let mut acc = rhs[row].clone();
        for c in row + 1..n {
            acc -= Complex::with_val(prec, &a[row][c] * &x[c]);
        }
        x[row] = Complex::with_val(prec, &acc / &a[row][row]);
    }
    Some(x)
}

/// Rounds `coords · disc` to integers when every coordinate is within
/// `2^{−prec/4}` of such a value.
fn round_coordinates(
    field: &NumberField,
    coords: &[Complex],
    disc: &Integer,
    prec: u32,
) -> Result<Option<FieldElement>> {
    let tol = places::epsilon(prec, prec / 4);
    let scale = Float::with_val(prec, disc);
    let mut out = Vec::with_capacity(coords.len());
    for c in coords {
        if Float::with_val(prec, c.imag().abs_ref()) > tol {
            return Ok(None);
        }
        let scaled = Float::with_val(prec, c.real() * &scale);
        let Some(rounded) = scaled.to_integer() else {
            return Ok(None);
        };
        let err = Float::with_val(prec, &scaled - &rounded).abs();
        if err > tol {
            return Ok(None);
        }
        out.push(Rational::from((rounded, disc.clone())));
    }
    field.element(out).map(Some)
}

/// `η^n = 1` and `η^{n/p} ≠ 1` for every prime `p | n`, exactly.
fn is_primitive_root(field: &NumberField, eta: &FieldElement, n: u64) -> Result<bool> {
    let e = i64::try_from(n)
        .map_err(|_| SolverError::InvalidGenerators(format!("root of unity order {n} is too large")))?;
    if !field.pow(eta, e)?.is_one() {
        return Ok(false);
    }
    for (p, _) in factor_u64(n) {
        if field.pow(eta, e / p as i64)?.is_one() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Torsion generator of `Q`: `−1`, of order 2.
pub fn rational_torsion(field: &NumberField) -> (FieldElement, u64) {
    (field.from_rational(Rational::from(-1)), 2)
}
