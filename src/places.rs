//! # Places — Archimedean Embeddings and Prime Ideals
//!
//! Every absolute value the solver uses comes from here.
//!
//! ## Infinite places
//!
//! The complex roots of the defining polynomial are computed with the
//! Durand–Kerner iteration at `prec + 64` working bits, polished with two
//! Newton steps, then classified: a root whose imaginary part is below
//! `2^{−prec/2}` is real. Places are ordered deterministically (real roots
//! ascending, then one representative per conjugate pair, upper half plane,
//! ordered by real then imaginary part). Raising the precision of a place
//! recomputes all roots and picks the root nearest to the old one.
//!
//! ## Finite places
//!
//! A prime ideal is described by its rational prime `p`, ramification `e`,
//! residue degree `f` and a local factor `G` of `f` over `Q_p`:
//!
//! - **Linear**: a simple root `r` of `f` mod `p`, giving the degree-one prime
//!   `(p, θ − r)`; `G = x − R` with `R` the Hensel lift of `r`.
//! - **Unique**: `p` has a single prime above it (inert for `d ≤ 3`, or totally
//!   ramified when a shift of `f` is Eisenstein); `G = f` exactly.
//!
//! Valuations use local norms: `v_P(a) = v_p(A(R)) − v_p(den a)` for linear
//! primes and `v_P(a) = v_p(N(a)) / f` for unique primes. Other factorisation
//! shapes raise [`SolverError::UnsupportedPrime`].

use crate::error::{Result, SolverError};
use crate::field::{FieldElement, NumberField};
use crate::poly::{residue_mod, Poly};
use rug::ops::{Pow, RemRounding};
use rug::{Complex, Float, Integer, Rational};
use std::cmp::Ordering;
use std::fmt;

/// Extra working bits used while iterating towards the roots.
const GUARD_BITS: u32 = 64;

/// `2^{−bits}` at `prec` bits.
pub(crate) fn epsilon(prec: u32, bits: u32) -> Float {
    Float::with_val(prec, 2).pow(-(bits as i32))
}

/// All `d` complex roots of `poly`, real roots first (ascending), then each
/// conjugate pair as (upper, lower).
pub fn complex_roots(poly: &Poly, prec: u32) -> Result<Vec<Complex>> {
    let d = poly
        .degree()
        .filter(|&d| d > 0)
        .ok_or_else(|| SolverError::InvalidField("constant polynomial has no roots".into()))?;
    let wp = prec + GUARD_BITS;
    let lead = poly.leading().cloned().unwrap_or_else(|| Rational::from(1));
    let coeffs: Vec<Complex> = poly
        .coeffs()
        .iter()
        .map(|c| Complex::with_val(wp, (Rational::from(c / &lead), 0)))
        .collect();

    let mut roots = if d == 1 {
        vec![Complex::with_val(wp, -&coeffs[0])]
    } else {
        durand_kerner(&coeffs, wp, prec)?
    };
    for z in roots.iter_mut() {
        for _ in 0..2 {
            let (value, slope) = horner_with_derivative(&coeffs, z, wp);
            if slope.real().is_zero() && slope.imag().is_zero() {
                break;
            }
            *z -= Complex::with_val(wp, &value / &slope);
        }
    }

    let tol = epsilon(wp, prec / 2);
    let mut reals = Vec::new();
    let mut uppers = Vec::new();
    for z in roots {
        let scale = Float::with_val(wp, z.abs_ref()).max(&Float::with_val(wp, 1));
        let im = Float::with_val(wp, z.imag().abs_ref());
        if im <= Float::with_val(wp, &tol * &scale) {
            reals.push(Complex::with_val(prec, (z.real(), 0)));
        } else if z.imag().is_sign_positive() {
            uppers.push(Complex::with_val(prec, &z));
        }
    }
    if reals.len() + 2 * uppers.len() != d {
        return Err(SolverError::PrecisionExhausted {
            step: "root classification",
            precision: prec,
        });
    }
    reals.sort_by(|a, b| a.real().partial_cmp(b.real()).unwrap_or(Ordering::Equal));
    uppers.sort_by(|a, b| {
        a.real()
            .partial_cmp(b.real())
            .unwrap_or(Ordering::Equal)
            .then(a.imag().partial_cmp(b.imag()).unwrap_or(Ordering::Equal))
    });
    let mut out = reals;
    for z in uppers {
        let conj = Complex::with_val(prec, z.conj_ref());
        out.push(z);
        out.push(conj);
    }
    Ok(out)
}

fn horner_with_derivative(coeffs: &[Complex], z: &Complex, wp: u32) -> (Complex, Complex) {
    let mut value = Complex::with_val(wp, (0, 0));
    let mut slope = Complex::with_val(wp, (0, 0));
    for c in coeffs.iter().rev() {
        slope *= z;
        slope += &value;
        value *= z;
        value += c;
    }
    (value, slope)
}

fn durand_kerner(coeffs: &[Complex], wp: u32, prec: u32) -> Result<Vec<Complex>> {
    let d = coeffs.len() - 1;
    // Initial guesses (0.4 + 0.9i)^k scaled to the geometric mean of the roots.
    let c0 = Float::with_val(wp, coeffs[0].abs_ref());
    let radius = if c0 > 1 {
        Float::with_val(wp, c0.ln() / d as u32).exp()
    } else {
        Float::with_val(wp, 1)
    };
    let seed = Complex::with_val(wp, (0.4, 0.9));
    let mut z = Vec::with_capacity(d);
    let mut power = Complex::with_val(wp, (&radius, 0));
    for _ in 0..d {
        z.push(power.clone());
        power *= &seed;
    }

    let eps = epsilon(wp, prec + 8);
    let max_iterations = 200 + 20 * d + prec as usize;
    for _ in 0..max_iterations {
        let mut worst = Float::with_val(wp, 0);
        for i in 0..d {
            let (value, _) = horner_with_derivative(coeffs, &z[i], wp);
            let mut denom = Complex::with_val(wp, (1, 0));
            for (j, zj) in z.iter().enumerate() {
                if j != i {
                    denom *= Complex::with_val(wp, &z[i] - zj);
                }
            }
            if denom.real().is_zero() && denom.imag().is_zero() {
                // Coincident iterates: nudge apart.
                z[i] *= &seed;
                worst = Float::with_val(wp, 1);
                continue;
            }
            let delta = Complex::with_val(wp, &value / &denom);
            z[i] -= &delta;
            let scale = Float::with_val(wp, z[i].abs_ref()).max(&Float::with_val(wp, 1));
            let rel = Float::with_val(wp, delta.abs_ref()) / scale;
            if rel > worst {
                worst = rel;
            }
        }
        if worst < eps {
            return Ok(z);
        }
    }
    Err(SolverError::PrecisionExhausted {
        step: "root finding",
        precision: prec,
    })
}

/// A real embedding or a complex-conjugate pair of embeddings.
#[derive(Clone, Debug)]
pub struct InfinitePlace {
    index: usize,
    root: Complex,
    real: bool,
    prec: u32,
}

/// Infinite places of `field` at `prec` bits, in the canonical order.
pub fn infinite_places(field: &NumberField, prec: u32) -> Result<Vec<InfinitePlace>> {
    let roots = complex_roots(field.polynomial(), prec)?;
    let mut places = Vec::new();
    let mut i = 0;
    while i < roots.len() {
        let real = roots[i].imag().is_zero();
        places.push(InfinitePlace {
            index: places.len(),
            root: roots[i].clone(),
            real,
            prec,
        });
        i += if real { 1 } else { 2 };
    }
    Ok(places)
}

impl InfinitePlace {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_real(&self) -> bool {
        self.real
    }

    pub fn precision(&self) -> u32 {
        self.prec
    }

    pub fn root(&self) -> &Complex {
        &self.root
    }

    /// The same place recomputed at `prec` bits: the root nearest to this one.
    pub fn at_precision(&self, field: &NumberField, prec: u32) -> Result<InfinitePlace> {
        let candidates = infinite_places(field, prec)?;
        let mut best: Option<(Float, InfinitePlace)> = None;
        for cand in candidates {
            let diff = Complex::with_val(prec, cand.root() - &self.root);
            let dist = Float::with_val(prec, diff.abs_ref());
            if best.as_ref().map_or(true, |(d, _)| dist < *d) {
                best = Some((dist, cand));
            }
        }
        best.map(|(_, place)| place).ok_or(SolverError::PrecisionExhausted {
            step: "place identification",
            precision: prec,
        })
    }

    pub fn embed(&self, field: &NumberField, a: &FieldElement) -> Complex {
        field.embed(a, &self.root, self.prec)
    }

    /// Normalised absolute value: `|σ(a)|` (real) or `|σ(a)|²` (complex).
    pub fn abs_val(&self, field: &NumberField, a: &FieldElement) -> Float {
        let z = self.embed(field, a);
        if self.real {
            Float::with_val(self.prec, z.abs_ref())
        } else {
            Float::with_val(self.prec, z.norm_ref())
        }
    }
}

/// How the completion at a prime is presented.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocalKind {
    /// Degree-one prime `(p, θ − root)` above a simple root of `f` mod `p`.
    Linear { root: u64 },
    /// The only prime above `p`; the completion is `Q_p[x]/(f)`.
    Unique,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimeIdeal {
    p: u64,
    e: u32,
    f: u32,
    kind: LocalKind,
}

/// Rational-prime valuation of a nonzero rational.
pub fn rational_valuation(r: &Rational, p: u64) -> i64 {
    let prime = Integer::from(p);
    let mut num = r.numer().clone();
    let mut den = r.denom().clone();
    num.remove_factor_mut(&prime) as i64 - den.remove_factor_mut(&prime) as i64
}

/// All primes above `p`, when their shape is supported.
pub fn primes_above(field: &NumberField, p: u64) -> Result<Vec<PrimeIdeal>> {
    let d = field.degree();
    let f = field.polynomial();
    if d == 1 {
        return Ok(vec![PrimeIdeal {
            p,
            e: 1,
            f: 1,
            kind: LocalKind::Unique,
        }]);
    }
    let roots = f.roots_mod(p);
    let deriv = f.derivative();
    let simple: Vec<u64> = roots
        .iter()
        .copied()
        .filter(|&r| {
            deriv
                .eval_mod(&Integer::from(r), &Integer::from(p))
                .is_some_and(|v| v != 0)
        })
        .collect();
    if simple.len() == d {
        return Ok(simple
            .into_iter()
            .map(|root| PrimeIdeal {
                p,
                e: 1,
                f: 1,
                kind: LocalKind::Linear { root },
            })
            .collect());
    }
    if roots.is_empty() && d <= 3 {
        return Ok(vec![PrimeIdeal {
            p,
            e: 1,
            f: d as u32,
            kind: LocalKind::Unique,
        }]);
    }
    if let [c] = roots.as_slice() {
        if f.taylor_shift(&Integer::from(*c)).is_eisenstein(&Integer::from(p)) {
            return Ok(vec![PrimeIdeal {
                p,
                e: d as u32,
                f: 1,
                kind: LocalKind::Unique,
            }]);
        }
    }
    Err(SolverError::UnsupportedPrime {
        p,
        reason: format!(
            "{} simple root(s) of {} mod p and no inert/Eisenstein shape",
            simple.len(),
            d
        ),
    })
}

/// The degree-one prime `(p, θ − root)`.
pub fn prime_above_root(field: &NumberField, p: u64, root: u64) -> Result<PrimeIdeal> {
    let root = root % p;
    let f = field.polynomial();
    let is_simple = f
        .eval_mod(&Integer::from(root), &Integer::from(p))
        .is_some_and(|v| v == 0)
        && f.derivative()
            .eval_mod(&Integer::from(root), &Integer::from(p))
            .is_some_and(|v| v != 0);
    if !is_simple {
        return Err(SolverError::UnsupportedPrime {
            p,
            reason: format!("{root} is not a simple root of the defining polynomial mod p"),
        });
    }
    if field.degree() == 1 {
        return Ok(PrimeIdeal {
            p,
            e: 1,
            f: 1,
            kind: LocalKind::Unique,
        });
    }
    Ok(PrimeIdeal {
        p,
        e: 1,
        f: 1,
        kind: LocalKind::Linear { root },
    })
}

impl PrimeIdeal {
    pub fn p(&self) -> u64 {
        self.p
    }

    pub fn ramification(&self) -> u32 {
        self.e
    }

    pub fn residue_degree(&self) -> u32 {
        self.f
    }

    pub fn kind(&self) -> &LocalKind {
        &self.kind
    }

    /// Local factor `G` of `f` over `Q_p`, correct modulo `p^digits`.
    pub fn local_factor(&self, field: &NumberField, digits: u32) -> Result<Poly> {
        match self.kind {
            LocalKind::Unique => Ok(field.polynomial().clone()),
            LocalKind::Linear { root } => {
                let lifted = field
                    .polynomial()
                    .hensel_lift(root, self.p, digits)
                    .ok_or_else(|| SolverError::UnsupportedPrime {
                        p: self.p,
                        reason: format!("root {root} does not lift"),
                    })?;
                Ok(Poly::new(vec![Rational::from(-lifted), Rational::from(1)]))
            }
        }
    }

    /// `v_P(a)`; fails for `a = 0`.
    pub fn valuation(&self, field: &NumberField, a: &FieldElement) -> Result<i64> {
        if a.is_zero() {
            return Err(SolverError::ZeroElement);
        }
        match self.kind {
            LocalKind::Unique => {
                let v = rational_valuation(&field.norm(a), self.p);
                Ok(v / self.f as i64)
            }
            LocalKind::Linear { root } => {
                let den = a.denominator();
                let integral = a.as_poly().scale(&Rational::from(den.clone()));
                let norm = field.polynomial().resultant(&integral);
                let digits = rational_valuation(&norm, self.p).max(0) as u32 + 1;
                let lifted = field
                    .polynomial()
                    .hensel_lift(root, self.p, digits)
                    .ok_or_else(|| SolverError::UnsupportedPrime {
                        p: self.p,
                        reason: format!("root {root} does not lift"),
                    })?;
                let modulus = Integer::from(self.p).pow(digits);
                let value = integral.eval_mod(&lifted, &modulus).ok_or_else(|| {
                    SolverError::Verification("non-integral numerator".into())
                })?;
                let mut value = value.rem_euc(&modulus);
                let mut den = den;
                let prime = Integer::from(self.p);
                let num_v = if value == 0 {
                    digits as i64
                } else {
                    value.remove_factor_mut(&prime) as i64
                };
                Ok(num_v - den.remove_factor_mut(&prime) as i64)
            }
        }
    }

    /// Normalised absolute value `p^{−f·v_P(a)}`.
    pub fn abs_val(&self, field: &NumberField, a: &FieldElement, prec: u32) -> Result<Float> {
        let v = self.valuation(field, a)?;
        let exponent = -(self.f as i64) * v;
        Ok(Float::with_val(prec, self.p).pow(exponent as i32))
    }

    /// `log |a|_P = −f·v_P(a)·log p`.
    pub fn log_abs(&self, field: &NumberField, a: &FieldElement, prec: u32) -> Result<Float> {
        let v = self.valuation(field, a)?;
        let log_p = Float::with_val(prec, self.p).ln();
        Ok(log_p * (-(self.f as i64) * v) as i32)
    }

    pub fn label(&self, field: &NumberField) -> String {
        match self.kind {
            LocalKind::Linear { root } => {
                format!("({}, {} - {})", self.p, field.variable(), root)
            }
            LocalKind::Unique if self.e > 1 => format!("P{}^{}", self.p, self.e),
            LocalKind::Unique => format!("({})", self.p),
        }
    }
}

impl fmt::Display for PrimeIdeal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p={} e={} f={}", self.p, self.e, self.f)
    }
}

/// Reduction map `O_K → O_K/(q, θ − root) ≅ GF(q)` at a split prime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResidueMap {
    pub q: u64,
    pub root: u64,
}

impl ResidueMap {
    pub fn reduce(&self, a: &FieldElement) -> Result<u64> {
        let mut acc: u128 = 0;
        for c in a.coeffs().iter().rev() {
            let c = residue_mod(c, self.q).ok_or_else(|| {
                SolverError::Verification(format!("element is not integral at {}", self.q))
            })?;
            acc = (acc * self.root as u128 + c as u128) % self.q as u128;
        }
        Ok(acc as u64)
    }
}

#[cfg(test)]
mod tests {
    //! # Place Tests
    //!
    //! Root finding and place ordering at several precisions, re-identification
    //! of a place after raising precision, and prime decomposition shapes
    //! (split, inert, totally ramified, unsupported) with their valuations.

    use super::*;

    fn field(c: &[i64], var: &str) -> NumberField {
        NumberField::new(c.iter().map(|&x| Integer::from(x)).collect(), var).unwrap()
    }

    #[test]
    fn real_quadratic_roots_sorted() {
        let k = field(&[-2, 0, 1], "a");
        let places = infinite_places(&k, 106).unwrap();
        assert_eq!(places.len(), 2);
        assert!(places.iter().all(|p| p.is_real()));
        let r0 = places[0].root().real().to_f64();
        let r1 = places[1].root().real().to_f64();
        assert!((r0 + 2f64.sqrt()).abs() < 1e-14);
        assert!((r1 - 2f64.sqrt()).abs() < 1e-14);
    }

    #[test]
    fn cyclotomic_has_one_complex_place() {
        let k = field(&[1, 1, 1], "xi");
        let places = infinite_places(&k, 106).unwrap();
        assert_eq!(places.len(), 1);
        assert!(!places[0].is_real());
        let im = places[0].root().imag().to_f64();
        assert!((im - 3f64.sqrt() / 2.0).abs() < 1e-14);
        assert_eq!(complex_roots(k.polynomial(), 106).unwrap().len(), 2);
    }

    #[test]
    fn mixed_signature_cubic() {
        let k = field(&[-2, 0, 0, 1], "c");
        let places = infinite_places(&k, 128).unwrap();
        assert_eq!(places.len(), 2);
        assert!(places[0].is_real());
        assert!(!places[1].is_real());
        assert!((places[0].root().real().to_f64() - 2f64.cbrt()).abs() < 1e-14);
    }

    #[test]
    fn raising_precision_keeps_the_place() {
        let k = field(&[-2, 0, 1], "a");
        let places = infinite_places(&k, 64).unwrap();
        let hi = places[1].at_precision(&k, 256).unwrap();
        assert_eq!(hi.index(), 1);
        assert_eq!(hi.precision(), 256);
    }

    #[test]
    fn abs_val_squares_at_complex_places() {
        let k = field(&[1, 1, 1], "xi");
        let place = &infinite_places(&k, 106).unwrap()[0];
        let sqrt_m3 = k
            .element(vec![Rational::from(1), Rational::from(2)])
            .unwrap();
        assert!((place.abs_val(&k, &sqrt_m3).to_f64() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn ramified_prime_above_three() {
        let k = field(&[1, 1, 1], "xi");
        let primes = primes_above(&k, 3).unwrap();
        assert_eq!(primes.len(), 1);
        let p = &primes[0];
        assert_eq!((p.ramification(), p.residue_degree()), (2, 1));
        let sqrt_m3 = k
            .element(vec![Rational::from(1), Rational::from(2)])
            .unwrap();
        assert_eq!(p.valuation(&k, &sqrt_m3).unwrap(), 1);
        assert_eq!(p.valuation(&k, &k.from_integer(3)).unwrap(), 2);
        assert_eq!(
            p.valuation(&k, &k.from_rational(Rational::from((1, 9)))).unwrap(),
            -4
        );
    }

    #[test]
    fn inert_and_split_primes() {
        let k = field(&[1, 1, 1], "xi");
        let inert = primes_above(&k, 5).unwrap();
        assert_eq!(inert.len(), 1);
        assert_eq!(inert[0].residue_degree(), 2);
        let split = primes_above(&k, 7).unwrap();
        assert_eq!(split.len(), 2);
        // ξ - 2 lies in (7, ξ - 2) but not in (7, ξ - 4).
        let a = k
            .element(vec![Rational::from(-2), Rational::from(1)])
            .unwrap();
        let vals: Vec<i64> = split.iter().map(|p| p.valuation(&k, &a).unwrap()).collect();
        assert_eq!(vals, vec![1, 0]);
    }

    #[test]
    fn unsupported_shape_is_reported() {
        // x^2 - 5 mod 2 = (x+1)^2, and x^2 - 5 shifted by 1 is x^2 + 2x - 4,
        // not Eisenstein at 2.
        let k = field(&[-5, 0, 1], "s");
        assert!(matches!(
            primes_above(&k, 2),
            Err(SolverError::UnsupportedPrime { p: 2, .. })
        ));
    }

    #[test]
    fn rationals_have_unique_primes() {
        let q = NumberField::rationals();
        let p = &primes_above(&q, 2).unwrap()[0];
        assert_eq!(p.valuation(&q, &q.from_integer(12)).unwrap(), 2);
        let half = q.from_rational(Rational::from((1, 2)));
        assert!((p.abs_val(&q, &half, 64).unwrap().to_f64() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn residue_map_reduces_generators() {
        let k = field(&[1, 1, 1], "xi");
        let map = ResidueMap { q: 7, root: 2 };
        let rho0 = k
            .element(vec![Rational::from(1), Rational::from(1)])
            .unwrap();
        assert_eq!(map.reduce(&rho0).unwrap(), 3);
        let third = k.from_rational(Rational::from((1, 3)));
        assert_eq!(map.reduce(&third).unwrap(), 5);
    }
}
