//! # Archimedean Reduction — LLL at the Infinite Places
//!
//! Shrinks the huge Baker bound `K1(v)` at each infinite place by de Weger's
//! lattice method (Smart, Lemmas VI.1 and VI.2). One step takes a bound `B0`
//! and returns either a smaller bound or a request for more precision.
//!
//! ## Real places (Lemma VI.1)
//!
//! With `l_i = log|v(ρ_i)|` and a scale `C`, the lattice is the identity
//! with last row `round(C·l)`. If its shortest vector satisfies
//! `λ² ≥ T² + S` for `S = (n−1)B0²`, `T = (1 + nB0)/2`, then every solution
//! with exponents below `B0` actually has exponents below
//! `(log 2C − log(√(λ² − S) − T)) / c13`.
//!
//! ## Complex places (Lemma VI.2)
//!
//! The imaginary parts of the logs get an extra `2π` column for the branch
//! ambiguity, and `−log v(−ζ)` is the inhomogeneous target. When every
//! generator has `|v(ρ)| = 1` only the imaginary row is used; otherwise
//! both real and imaginary rows enter the lattice.
//!
//! ## Driver
//!
//! Per place: start at `K1(v)`, step until the bound moves by at most 1% or
//! 15 steps have run, never dropping below `⌈c11⌉`. A step that runs out of
//! precision doubles it, re-identifies the place at the new precision,
//! recomputes the constants and restarts.

use crate::bounds::{BoundEstimator, InfiniteConstants};
use crate::config::SolverConfig;
use crate::error::{Result, SolverError};
use crate::lll::{determinant, identity, minimal_vector, to_rational, transpose};
use crate::places::{self, InfinitePlace};
use crate::unit_group::SUnitGroup;
use rug::float::Constant;
use rug::{Complex, Float, Integer, Rational};
use tracing::{debug, info, warn};

/// Result of one reduction step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Bound(Integer),
    IncreasePrecision,
}

pub(crate) fn round_float(x: &Float, step: &'static str) -> Result<Integer> {
    Float::with_val(x.prec(), x.round_ref())
        .to_integer()
        .ok_or(SolverError::PrecisionExhausted {
            step,
            precision: x.prec(),
        })
}

pub(crate) fn ceil_float(x: &Float, step: &'static str) -> Result<Integer> {
    Float::with_val(x.prec(), x.ceil_ref())
        .to_integer()
        .ok_or(SolverError::PrecisionExhausted {
            step,
            precision: x.prec(),
        })
}

fn scaled(x: &Float, c: &Integer) -> Result<Integer> {
    round_float(&Float::with_val(x.prec(), x * c), "lattice scaling")
}

/// `(log 2C − log(√(l − S) − T)) / c13`, or `B0` when `√(l − S) ≤ T`.
fn lemma_bound(
    c: &Integer,
    l: &Rational,
    s: &Rational,
    t: &Float,
    c13: &Float,
    b0: &Integer,
    prec: u32,
) -> Result<Integer> {
    let root = Float::with_val(prec, Rational::from(l - s)).sqrt();
    let gap = root - t;
    if gap <= 0 {
        return Ok(b0.clone());
    }
    let two_c = Float::with_val(prec, Integer::from(c * 2u32)).ln();
    let value = (two_c - gap.ln()) / c13;
    round_float(&value, "lemma bound")
}

/// Lemma VI.1 at a real place.
pub fn reduction_step_real(
    group: &SUnitGroup,
    place: &InfinitePlace,
    b0: &Integer,
    c13: &Float,
) -> Result<StepOutcome> {
    let field = group.field();
    let prec = place.precision();
    let n = group.rank();
    let mut logs = Vec::with_capacity(n);
    for unit in group.fundamental_units() {
        let abs = place.abs_val(field, unit);
        let log = abs.ln();
        if log.is_zero() {
            return Ok(StepOutcome::IncreasePrecision);
        }
        logs.push(log);
    }

    let mut inv_max = Float::with_val(prec, 0);
    for l in &logs {
        inv_max = inv_max.max(&Float::with_val(prec, l.abs_ref()).recip());
    }
    let mut c = round_float(&(inv_max + 1u32), "lattice scale")?;
    if c.significant_bits() > prec {
        return Ok(StepOutcome::IncreasePrecision);
    }

    let s = Rational::from(Integer::from(b0.square_ref()) * (n as u32 - 1));
    let t = Rational::from((Integer::from(b0 * n as u32) + 1u32, Integer::from(2)));
    let threshold = Rational::from(t.square_ref()) + &s;
    let t_float = Float::with_val(prec, &t);

    loop {
        let mut row = logs
            .iter()
            .map(|x| scaled(x, &c))
            .collect::<Result<Vec<_>>>()?;
        if row[n - 1] == 0 {
            if let Some(k) = row.iter().position(|x| *x != 0) {
                row.swap(k, n - 1);
            }
        }
        let mut a = identity(n);
        a[n - 1] = row;
        if determinant(&to_rational(&a)) == 0 {
            c *= 2u32;
            if c.significant_bits() > prec {
                return Ok(StepOutcome::IncreasePrecision);
            }
            continue;
        }
        let l = minimal_vector(&transpose(&a), &vec![Integer::new(); n])?;
        if l < threshold {
            c *= 2u32;
            if c.significant_bits() > prec {
                return Ok(StepOutcome::IncreasePrecision);
            }
            continue;
        }
        let bound = lemma_bound(&c, &l, &s, &t_float, c13, b0, prec)?;
        return Ok(StepOutcome::Bound(bound));
    }
}

/// `||v(g)| − 1| ≤ 2^{−prec}` for every fundamental unit, at doubled precision.
fn units_on_circle(group: &SUnitGroup, place: &InfinitePlace) -> Result<bool> {
    let field = group.field();
    let prec = place.precision();
    let fine = place.at_precision(field, 2 * prec)?;
    let eps = places::epsilon(2 * prec, prec);
    for unit in group.fundamental_units() {
        let z = fine.embed(field, unit);
        let modulus = Float::with_val(2 * prec, z.abs_ref()) - 1u32;
        if modulus.abs() > eps {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Lemma VI.2 at a complex place.
pub fn reduction_step_complex(
    group: &SUnitGroup,
    place: &InfinitePlace,
    b0: &Integer,
    c13: &Float,
) -> Result<StepOutcome> {
    let field = group.field();
    let prec = place.precision();
    let n = group.rank();

    let mut log_real = Vec::with_capacity(n + 1);
    let mut log_imag = Vec::with_capacity(n + 1);
    for unit in group.fundamental_units() {
        let z = place.embed(field, unit);
        if z.real().is_zero() && z.imag().is_zero() {
            return Err(SolverError::ZeroElement);
        }
        let log = Complex::with_val(prec, z.ln_ref());
        let (re, im) = log.into_real_imag();
        log_real.push(re);
        log_imag.push(im);
    }
    log_real.push(Float::with_val(prec, 0));
    log_imag.push(Float::with_val(prec, Constant::Pi) * 2u32);
    let minus_zeta = -group.zeta();
    let a0 = Complex::with_val(prec, place.embed(field, &minus_zeta).ln_ref());
    let (a0_real, a0_imag) = a0.into_real_imag();

    if units_on_circle(group, place)? {
        return imaginary_only_step(&log_imag, &a0_imag, b0, c13, n, prec);
    }

    let Some(k) = log_real.iter().position(|x| !x.is_zero()) else {
        return Ok(StepOutcome::IncreasePrecision);
    };
    log_real.swap(k, n - 1);
    log_imag.swap(k, n - 1);

    let s = Rational::from(Integer::from(b0.square_ref()) * (n as u32 - 1));
    let numerator = Integer::from(b0 * (n as u32 + 1)) + 1u32;
    // T = ((n+1)B0 + 1)/√2, so T² is rational.
    let t_sq = Rational::from((Integer::from(numerator.square_ref()), Integer::from(2)));
    let threshold = Rational::from(&t_sq + &s);
    let t_float = Float::with_val(prec, &t_sq).sqrt();

    let mut c = Integer::from(1);
    loop {
        let mut a = identity(n + 1);
        a[n - 1] = log_real
            .iter()
            .map(|x| scaled(x, &c))
            .collect::<Result<Vec<_>>>()?;
        a[n] = log_imag
            .iter()
            .map(|x| scaled(x, &c))
            .collect::<Result<Vec<_>>>()?;
        if determinant(&to_rational(&a)) == 0 {
            c *= 2u32;
            if c.significant_bits() > prec {
                return Ok(StepOutcome::IncreasePrecision);
            }
            continue;
        }
        let at = transpose(&a);
        let mut y = vec![Integer::new(); n + 1];
        y[n] = -scaled(&a0_imag, &c)?;
        y[n - 1] = -scaled(&a0_real, &c)?;
        let l = minimal_vector(&at, &y)?;
        if l <= threshold {
            c *= 2u32;
            if c.significant_bits() > prec {
                return Ok(StepOutcome::IncreasePrecision);
            }
            continue;
        }
        let mut bound = lemma_bound(&c, &l, &s, &t_float, c13, b0, prec)?;
        if let Some((x0, x1)) = unimodular_candidate(&at, &y) {
            bound = bound.max(x0.abs()).max(x1.abs());
        }
        return Ok(StepOutcome::Bound(bound));
    }
}

/// When the trailing 2×2 block of `at` is unimodular, its preimage of
/// `−(y_{n−1}, y_n)` is a candidate exponent pair the lemma cannot exclude.
fn unimodular_candidate(at: &[Vec<Integer>], y: &[Integer]) -> Option<(Integer, Integer)> {
    let n = at.len().checked_sub(1).filter(|&n| n >= 1)?;
    let (m00, m01) = (&at[n - 1][n - 1], &at[n - 1][n]);
    let (m10, m11) = (&at[n][n - 1], &at[n][n]);
    let det = Integer::from(m00 * m11) - Integer::from(m01 * m10);
    if det != 1 && det != -1 {
        return None;
    }
    let b0 = Integer::from(-&y[n - 1]);
    let b1 = Integer::from(-&y[n]);
    let x0 = (Integer::from(m11 * &b0) - Integer::from(m01 * &b1)) * &det;
    let x1 = (Integer::from(m00 * &b1) - Integer::from(m10 * &b0)) * &det;
    Some((x0, x1))
}

fn imaginary_only_step(
    log_imag: &[Float],
    a0_imag: &Float,
    b0: &Integer,
    c13: &Float,
    n: usize,
    prec: u32,
) -> Result<StepOutcome> {
    let s = Rational::from(Integer::from(b0.square_ref()) * n as u32);
    let t = Rational::from((Integer::from(b0 * (n as u32 + 1)) + 1u32, Integer::from(2)));
    let threshold = Rational::from(t.square_ref()) + &s;
    let t_float = Float::with_val(prec, &t);

    let mut c = Integer::from(1);
    loop {
        let mut row = log_imag
            .iter()
            .map(|x| scaled(x, &c))
            .collect::<Result<Vec<_>>>()?;
        if row[n] == 0 {
            if let Some(k) = row.iter().position(|x| *x != 0) {
                row.swap(k, n);
            }
        }
        let mut a = identity(n + 1);
        a[n] = row;
        if determinant(&to_rational(&a)) == 0 {
            c *= 2u32;
            if c.significant_bits() > prec {
                return Ok(StepOutcome::IncreasePrecision);
            }
            continue;
        }
        let at = transpose(&a);
        let mut y = vec![Integer::new(); n + 1];
        y[n] = -scaled(a0_imag, &c)?;
        let l = minimal_vector(&at, &y)?;
        if l < threshold {
            c *= 2u32;
            if c.significant_bits() > prec {
                return Ok(StepOutcome::IncreasePrecision);
            }
            continue;
        }
        let mut bound = lemma_bound(&c, &l, &s, &t_float, c13, b0, prec)?;
        let pivot = &at[n][n];
        if y[n].is_divisible(pivot) {
            let quotient = Integer::from(y[n].div_exact_ref(pivot));
            bound = bound.max(quotient.abs());
        }
        return Ok(StepOutcome::Bound(bound));
    }
}

/// A place together with the constants valid at its current precision.
struct PlaceState {
    place: InfinitePlace,
    consts: InfiniteConstants,
}

pub struct ArchimedeanReducer<'a> {
    group: &'a SUnitGroup,
    config: &'a SolverConfig,
}

impl<'a> ArchimedeanReducer<'a> {
    pub fn new(group: &'a SUnitGroup, config: &'a SolverConfig) -> Self {
        ArchimedeanReducer { group, config }
    }

    fn place_state(&self, place: InfinitePlace) -> Result<PlaceState> {
        let est = BoundEstimator::new(self.group, place.precision());
        let c3 = est.c3(&est.c1()?);
        let consts = est.infinite_constants(&place, &c3)?;
        Ok(PlaceState { place, consts })
    }

    fn escalate(&self, state: &mut PlaceState) -> Result<()> {
        let current = state.place.precision();
        let prec = current.saturating_mul(2);
        if prec > self.config.max_precision {
            return Err(SolverError::PrecisionExhausted {
                step: "archimedean reduction",
                precision: current,
            });
        }
        warn!(place = state.place.index(), precision = prec, "Raising precision for archimedean reduction");
        let place = state.place.at_precision(self.group.field(), prec)?;
        *state = self.place_state(place)?;
        Ok(())
    }

    /// One reduction step, escalating precision until it produces a bound.
    /// The result is floored at `⌈c11⌉` (and zero).
    fn step(&self, state: &mut PlaceState, b0: &Integer) -> Result<Integer> {
        loop {
            let c13 = &state.consts.c13;
            let outcome = if state.place.is_real() {
                reduction_step_real(self.group, &state.place, b0, c13)?
            } else {
                reduction_step_complex(self.group, &state.place, b0, c13)?
            };
            match outcome {
                StepOutcome::Bound(b) => {
                    let floor = ceil_float(&state.consts.c11, "c11")?.max(Integer::new());
                    return Ok(b.max(floor));
                }
                StepOutcome::IncreasePrecision => self.escalate(state)?,
            }
        }
    }

    fn significant_change(&self, old: &Integer, new: &Integer) -> bool {
        let diff = Float::with_val(64, Integer::from(old - new).abs());
        diff > Float::with_val(64, old) * self.config.improvement
    }

    /// Reduced bound at one infinite place.
    pub fn reduce_place(&self, place: InfinitePlace) -> Result<Integer> {
        let mut state = self.place_state(place)?;
        let mut cx = ceil_float(&state.consts.k1, "K1")?;
        let mut new = loop {
            let start = state.place.precision();
            let b = self.step(&mut state, &cx)?;
            if state.place.precision() == start {
                break b;
            }
            // Escalation moved K1; restart from the recomputed value.
            cx = ceil_float(&state.consts.k1, "K1")?;
        };
        let mut attempts = 0;
        while attempts < self.config.max_attempts && self.significant_change(&cx, &new) {
            cx = cx.min(new);
            new = self.step(&mut state, &cx)?;
            debug!(place = state.place.index(), bound = %cx, next = %new, "Archimedean reduction step");
            attempts += 1;
        }
        Ok(cx.min(new))
    }

    /// `max_v` of the reduced bounds over all infinite places.
    pub fn reduce(&self) -> Result<Integer> {
        let mut bound = Integer::new();
        for place in places::infinite_places(self.group.field(), self.config.precision)? {
            let index = place.index();
            let real = place.is_real();
            let reduced = self.reduce_place(place)?;
            info!(place = index, real, bound = %reduced, "Archimedean bound reduced");
            bound = bound.max(reduced);
        }
        Ok(bound)
    }
}

#[cfg(test)]
mod tests {
    //! # Archimedean Reduction Tests
    //!
    //! Single steps at the real place of `Q` and the complex place of `Q(ζ3)`,
    //! and the driver: reduced bounds sit between `⌈c11⌉` and the raw `K1`.

    use super::*;
    use crate::field::NumberField;
    use crate::places::{primes_above, PrimeIdeal};
    use crate::unit_group::rational_torsion;
    use rug::ops::Pow;

    fn rational_group() -> SUnitGroup {
        let q = NumberField::rationals();
        let s: Vec<PrimeIdeal> = primes_above(&q, 2).unwrap();
        let (minus_one, w0) = rational_torsion(&q);
        SUnitGroup::new(q.clone(), s, minus_one, w0, vec![q.from_integer(2)]).unwrap()
    }

    fn eisenstein_group() -> SUnitGroup {
        let k = NumberField::new(vec![1.into(), 1.into(), 1.into()], "xi").unwrap();
        let s = primes_above(&k, 3).unwrap();
        let zeta = k.element(vec![Rational::from(1), Rational::from(1)]).unwrap();
        let unit = k.element(vec![Rational::from(-1), Rational::from(-2)]).unwrap();
        SUnitGroup::new(k, s, zeta, 6, vec![unit]).unwrap()
    }

    fn config() -> SolverConfig {
        SolverConfig::default()
    }

    #[test]
    fn rounding_helpers() {
        let x = Float::with_val(64, 2.5);
        assert_eq!(round_float(&x, "t").unwrap(), 3);
        assert_eq!(ceil_float(&Float::with_val(64, 2.0000001), "t").unwrap(), 3);
        assert_eq!(ceil_float(&Float::with_val(64, -0.5), "t").unwrap(), 0);
    }

    #[test]
    fn real_step_shrinks_a_large_bound() {
        let g = rational_group();
        let est = BoundEstimator::new(&g, 106);
        let c3 = est.c3(&est.c1().unwrap());
        let place = &est.infinite_places().unwrap()[0];
        let b0 = Integer::from(10).pow(6);
        match reduction_step_real(&g, place, &b0, &c3).unwrap() {
            StepOutcome::Bound(b) => assert!(b < b0),
            StepOutcome::IncreasePrecision => panic!("106 bits suffice for B0 = 10^6"),
        }
    }

    #[test]
    fn real_step_asks_for_precision_when_scale_overflows() {
        let g = rational_group();
        let est = BoundEstimator::new(&g, 32);
        let c3 = est.c3(&est.c1().unwrap());
        let place = &est.infinite_places().unwrap()[0];
        let b0 = Integer::from(10).pow(40);
        assert_eq!(
            reduction_step_real(&g, place, &b0, &c3).unwrap(),
            StepOutcome::IncreasePrecision
        );
    }

    #[test]
    fn complex_step_shrinks_a_large_bound() {
        let g = eisenstein_group();
        let est = BoundEstimator::new(&g, 106);
        let c3 = est.c3(&est.c1().unwrap());
        let place = &est.infinite_places().unwrap()[0];
        let c13 = Float::with_val(106, &c3 / 2u32);
        let b0 = Integer::from(10).pow(6);
        match reduction_step_complex(&g, place, &b0, &c13).unwrap() {
            StepOutcome::Bound(b) => assert!(b < b0),
            StepOutcome::IncreasePrecision => panic!("106 bits suffice for B0 = 10^6"),
        }
    }

    #[test]
    fn imaginary_only_step_keeps_the_exact_candidate() {
        // Arguments √2 and a period of 4 with target −12: every scale C is a
        // power of two, so 4C divides 12C and the candidate 3 must survive.
        let prec = 106;
        let log_imag = vec![Float::with_val(prec, 2).sqrt(), Float::with_val(prec, 4)];
        let a0_imag = Float::with_val(prec, -12);
        let b0 = Integer::from(1000);
        let c13 = Float::with_val(prec, 1);
        match imaginary_only_step(&log_imag, &a0_imag, &b0, &c13, 1, prec).unwrap() {
            StepOutcome::Bound(b) => {
                assert!(b >= 3);
                assert!(b < b0);
            }
            StepOutcome::IncreasePrecision => panic!("106 bits suffice for B0 = 1000"),
        }
    }

    #[test]
    fn imaginary_only_step_reduces_off_lattice_target() {
        let prec = 106;
        let two_pi = Float::with_val(prec, Constant::Pi) * 2u32;
        let log_imag = vec![Float::with_val(prec, 3).sqrt(), two_pi];
        let a0_imag = Float::with_val(prec, 5).sqrt();
        let b0 = Integer::from(10).pow(4);
        let c13 = Float::with_val(prec, 1);
        match imaginary_only_step(&log_imag, &a0_imag, &b0, &c13, 1, prec).unwrap() {
            StepOutcome::Bound(b) => assert!(b < b0),
            StepOutcome::IncreasePrecision => panic!("106 bits suffice for B0 = 10^4"),
        }
    }

    #[test]
    fn imaginary_only_step_asks_for_precision_when_scale_overflows() {
        let prec = 24;
        let log_imag = vec![Float::with_val(prec, 2).sqrt(), Float::with_val(prec, 4)];
        let a0_imag = Float::with_val(prec, 1);
        let b0 = Integer::from(10).pow(20);
        let c13 = Float::with_val(prec, 1);
        assert_eq!(
            imaginary_only_step(&log_imag, &a0_imag, &b0, &c13, 1, prec).unwrap(),
            StepOutcome::IncreasePrecision
        );
    }

    #[test]
    fn unimodular_block_yields_its_preimage() {
        // Trailing block [[2, 1], [1, 1]] has determinant 1 and maps (1, 1)
        // to (3, 2) = −(y_1, y_2).
        let at: Vec<Vec<Integer>> = [[1, 0, 0], [0, 2, 1], [0, 1, 1]]
            .iter()
            .map(|r| r.iter().map(|&x| Integer::from(x)).collect())
            .collect();
        let y = vec![Integer::new(), Integer::from(-3), Integer::from(-2)];
        assert_eq!(
            unimodular_candidate(&at, &y),
            Some((Integer::from(1), Integer::from(1)))
        );

        // Determinant −1 flips the signs through the inverse.
        let swapped: Vec<Vec<Integer>> = [[1, 0, 0], [0, 1, 1], [0, 2, 1]]
            .iter()
            .map(|r| r.iter().map(|&x| Integer::from(x)).collect())
            .collect();
        let (x0, x1) = unimodular_candidate(&swapped, &y).unwrap();
        assert_eq!(Integer::from(&x0 + &x1), 3);
        assert_eq!(Integer::from(&x0 * 2u32) + &x1, 2);
    }

    #[test]
    fn non_unimodular_block_gives_no_candidate() {
        let at: Vec<Vec<Integer>> = [[1, 0, 0], [0, 3, 0], [0, 0, 6]]
            .iter()
            .map(|r| r.iter().map(|&x| Integer::from(x)).collect())
            .collect();
        let y = vec![Integer::new(), Integer::from(-3), Integer::from(-6)];
        assert_eq!(unimodular_candidate(&at, &y), None);
    }

    #[test]
    fn real_field_reduces_at_both_places() {
        // Q(√5) has two real places and no finite primes in S.
        let k = NumberField::new(vec![(-1).into(), (-1).into(), 1.into()], "phi").unwrap();
        let (minus_one, w0) = rational_torsion(&k);
        let phi = k.generator();
        let g = SUnitGroup::new(k, Vec::new(), minus_one, w0, vec![phi]).unwrap();
        let cfg = config();
        let est = BoundEstimator::new(&g, cfg.precision);
        let raw = est.initial_bound().unwrap();
        assert_eq!(raw.k1.len(), 2);
        let reducer = ArchimedeanReducer::new(&g, &cfg);
        let places = est.infinite_places().unwrap();
        for (place, k1) in places.into_iter().zip(&raw.k1) {
            assert!(place.is_real());
            let reduced = reducer.reduce_place(place).unwrap();
            assert!(reduced < ceil_float(k1, "K1").unwrap());
        }
    }

    #[test]
    fn driver_lands_between_floor_and_raw() {
        for g in [rational_group(), eisenstein_group()] {
            let cfg = config();
            let est = BoundEstimator::new(&g, cfg.precision);
            let raw = est.initial_bound().unwrap();
            let reduced = ArchimedeanReducer::new(&g, &cfg).reduce().unwrap();
            assert!(reduced >= 3);
            let k1 = ceil_float(&raw.k1[0], "K1").unwrap();
            assert!(reduced < k1);
        }
    }

    #[test]
    fn precision_ceiling_is_enforced() {
        let g = rational_group();
        let cfg = SolverConfig {
            precision: 16,
            max_precision: 16,
            ..SolverConfig::default()
        };
        let result = ArchimedeanReducer::new(&g, &cfg).reduce();
        assert!(matches!(result, Err(SolverError::PrecisionExhausted { .. })));
    }
}
