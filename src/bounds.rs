//! # Bounds — Effective Baker-Type Exponent Bounds
//!
//! The first stage of the solver: a provably correct, but huge, bound on the
//! free exponents `|a_i|` (`i ≥ 1`) of any solution `x = ∏ ρ_i^{a_i}` of
//! `x + y = 1`.
//!
//! ## Archimedean branch
//!
//! Over every size-`t` subset `U` of the places (primes of `S` first, then the
//! infinite places) the `t × t` matrix `(log |u_i|_v)` of fundamental units is
//! formed; when `|det| > 10^{-10}` its inverse's max row sum updates `c1`.
//! Then `c3 = 0.9999999 / (c1·t)`, and for each infinite place `v`:
//!
//! | constant | real place            | complex place          |
//! |----------|-----------------------|------------------------|
//! | `c4`     | `max_ζ |ζ|_v`          | same                   |
//! | `c11`    | `log(4c4)/c3`         | `2·log(4√c4)/c3`       |
//! | `c12`    | `2c4`                 | `2√c4`                 |
//! | `c13`    | `c3`                  | `c3/2`                 |
//!
//! `c14 = C(t, d)·∏ h'(ρ_i)` with the Baker constant
//! `C(t, d) = 18·(t+2)!·(t+1)^{t+2}·(32d)^{t+3}·log(2(t+1)d)`,
//! `c15 = 2(log c12 + c14·log((t+1)c14/c13))/c13`, and `K1(v) = max(c11, c15)`.
//!
//! ## Non-archimedean branch
//!
//! For each `P ∈ S`, the unit `β_k` of least nonzero `|v_P|` is used to build
//! the valuation-zero ratios `μ_i = β_i^{n_k}·β_k^{−n_i}` and the twists `μ_0`.
//! Yu's p-adic linear-forms estimate (through the modified heights of the
//! `μ`s) gives `c8, c9`, and `K0 = max_P max(c10(P), c7(P))`.
//!
//! ## References
//!
//! - N.P. Smart, "Determining the small solutions to S-unit equations",
//!   Math. Comp. 68 (1999); TCDF paper, pp. 823–825.
//! - N.P. Smart, "The Algorithmic Resolution of Diophantine Equations" (1998),
//!   Appendix A (Theorems A.1 and A.2).

use crate::error::{Result, SolverError};
use crate::field::FieldElement;
use crate::lll::{determinant, inverse};
use crate::places::{self, InfinitePlace, PrimeIdeal};
use crate::unit_group::SUnitGroup;
use rug::float::Constant;
use rug::ops::Pow;
use rug::{Complex, Float, Integer, Rational};
use tracing::debug;

/// A place used as a column of the unit log-matrix.
#[derive(Clone, Copy, Debug)]
pub enum Place<'a> {
    Finite(&'a PrimeIdeal),
    Infinite(&'a InfinitePlace),
}

/// Constants attached to one infinite place.
#[derive(Clone, Debug)]
pub struct InfiniteConstants {
    pub c4: Float,
    pub c11: Float,
    pub c12: Float,
    pub c13: Float,
    pub c14: Float,
    pub c15: Float,
    pub k1: Float,
}

/// Valuation data of the fundamental units at one prime of `S`.
#[derive(Clone, Debug)]
pub struct LocalUnits {
    /// `v_P(β_i)` for each fundamental unit.
    pub valuations: Vec<i64>,
    /// Index of `β_k`, or `None` when every valuation is zero.
    pub k: Option<usize>,
    /// Valuation-zero ratios `μ_i`.
    pub mus: Vec<FieldElement>,
    /// Valuation-zero twists `μ_0`, without duplicates.
    pub mu0s: Vec<FieldElement>,
}

/// Constants attached to one prime of `S`.
#[derive(Clone, Debug)]
pub struct FiniteConstants {
    pub c5: Float,
    pub c6: Float,
    pub c7: Float,
    pub c8: Float,
    pub c9: Float,
    pub c10: Float,
    /// `D`: `d` or `2d`, depending on which small roots of unity `K` holds.
    pub big_d: u32,
}

/// Initial bound and the constants later stages reuse.
#[derive(Clone, Debug)]
pub struct RawBound {
    pub c1: Float,
    pub c3: Float,
    pub k0: Float,
    /// `K1(v)` per infinite place, in place order.
    pub k1: Vec<Float>,
    /// `max(K0, K1(v) …)`.
    pub raw: Float,
}

pub struct BoundEstimator<'a> {
    group: &'a SUnitGroup,
    prec: u32,
}

/// Index sets of size `k` from `0..n`, lexicographic.
pub(crate) fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    if k > n {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.clone());
        let Some(i) = (0..k).rev().find(|&i| idx[i] != i + n - k) else {
            return out;
        };
        idx[i] += 1;
        for j in i + 1..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

/// `Baker_C(t, d) = 18·(t+2)!·(t+1)^{t+2}·(32d)^{t+3}·log(2(t+1)d)`.
pub fn baker_c(t: usize, d: usize, prec: u32) -> Float {
    let t = t as u32;
    let d = d as u32;
    let fact = Integer::from(Integer::factorial(t + 2));
    let power = Integer::from(t + 1).pow(t + 2) * Integer::from(32 * d).pow(t + 3);
    let log = Float::with_val(prec, 2 * (t + 1) * d).ln();
    Float::with_val(prec, fact * power * 18u32) * log
}

fn to_rational(x: &Float) -> Result<Rational> {
    x.to_rational().ok_or(SolverError::PrecisionExhausted {
        step: "unit log-matrix",
        precision: x.prec(),
    })
}

impl<'a> BoundEstimator<'a> {
    pub fn new(group: &'a SUnitGroup, prec: u32) -> Self {
        BoundEstimator { group, prec }
    }

    pub fn precision(&self) -> u32 {
        self.prec
    }

    pub fn infinite_places(&self) -> Result<Vec<InfinitePlace>> {
        places::infinite_places(self.group.field(), self.prec)
    }

    /// `log |a|_v`, normalised (`|σ|²` at complex places, `p^{−f·v}` at primes).
    pub fn log_abs(&self, place: Place<'_>, a: &FieldElement) -> Result<Float> {
        let field = self.group.field();
        match place {
            Place::Finite(prime) => prime.log_abs(field, a, self.prec),
            Place::Infinite(v) => {
                let abs = v.abs_val(field, a);
                if abs.is_zero() {
                    return Err(SolverError::ZeroElement);
                }
                Ok(Float::with_val(self.prec, abs.ln_ref()))
            }
        }
    }

    /// `c1 = max ‖C_U^{−1}‖_∞` over invertible unit log-matrices.
    pub fn c1(&self) -> Result<Float> {
        let t = self.group.rank();
        if t == 0 {
            return Err(SolverError::SingularUnitLattice);
        }
        let infinite = self.infinite_places()?;
        let mut all: Vec<Place<'_>> = self.group.primes().iter().map(Place::Finite).collect();
        all.extend(infinite.iter().map(Place::Infinite));

        // Log-matrix rows for every unit against every place, computed once.
        let mut logs: Vec<Vec<Rational>> = Vec::with_capacity(t);
        for unit in self.group.fundamental_units() {
            let row = all
                .iter()
                .map(|&v| self.log_abs(v, unit).and_then(|x| to_rational(&x)))
                .collect::<Result<Vec<_>>>()?;
            logs.push(row);
        }

        let threshold = Rational::from((1, 10_000_000_000u64));
        let mut best: Option<Rational> = None;
        for subset in combinations(all.len(), t) {
            let m: Vec<Vec<Rational>> = logs
                .iter()
                .map(|row| subset.iter().map(|&j| row[j].clone()).collect())
                .collect();
            if determinant(&m).abs() <= threshold {
                continue;
            }
            let inv = inverse(&m)?;
            let norm = inv
                .iter()
                .map(|row| row.iter().fold(Rational::new(), |acc, x| acc + x.clone().abs()))
                .max()
                .unwrap_or_default();
            if best.as_ref().map_or(true, |b| norm > *b) {
                best = Some(norm);
            }
        }
        let c1 = best.ok_or(SolverError::SingularUnitLattice)?;
        Ok(Float::with_val(self.prec, &c1))
    }

    pub fn c3(&self, c1: &Float) -> Float {
        let t = self.group.rank() as u32;
        let num = Float::with_val(self.prec, Rational::from((9_999_999, 10_000_000)));
        num / Float::with_val(self.prec, c1 * t)
    }

    /// `max(h(α), 1/d, |Log σ(α)|/d)`.
    pub fn hprime(&self, a: &FieldElement, v: &InfinitePlace) -> Result<Float> {
        let field = self.group.field();
        let d = field.degree() as u32;
        let prec = v.precision();
        let h = field.height(a, prec)?;
        let z = v.embed(field, a);
        let log = Complex::with_val(prec, z.ln_ref());
        let size = Float::with_val(prec, log.abs_ref()) / d;
        let floor = Float::with_val(prec, 1) / d;
        Ok(h.max(&floor).max(&size))
    }

    /// `c4 … c15` and `K1(v)` at the place `v` (working at `v`'s precision).
    pub fn infinite_constants(&self, v: &InfinitePlace, c3: &Float) -> Result<InfiniteConstants> {
        let field = self.group.field();
        let prec = v.precision();
        let t = self.group.rank();
        let c3 = Float::with_val(prec, c3);

        let mut c4 = Float::with_val(prec, 0);
        for zeta in self.group.roots_of_unity() {
            c4 = c4.max(&v.abs_val(field, &zeta));
        }
        let (c11, c12, c13) = if v.is_real() {
            let c11 = Float::with_val(prec, &c4 * 4u32).ln() / &c3;
            (c11, Float::with_val(prec, &c4 * 2u32), c3.clone())
        } else {
            let root = Float::with_val(prec, c4.sqrt_ref());
            let c11 = Float::with_val(prec, &root * 4u32).ln() * 2u32 / &c3;
            (c11, root * 2u32, Float::with_val(prec, &c3 / 2u32))
        };

        let mut c14 = baker_c(t, field.degree(), prec);
        for g in self.group.gens() {
            c14 *= self.hprime(&g, v)?;
        }
        let inner = Float::with_val(prec, &c14 * (t as u32 + 1)) / &c13;
        let c15 = (Float::with_val(prec, c12.ln_ref()) + Float::with_val(prec, &c14 * inner.ln()))
            * 2u32
            / &c13;
        let k1 = Float::with_val(prec, &c11).max(&c15);
        Ok(InfiniteConstants {
            c4,
            c11,
            c12,
            c13,
            c14,
            c15,
            k1,
        })
    }

    /// `β_k`, the ratios `μ` and the twists `μ_0` at `prime`.
    pub fn local_units(&self, prime: &PrimeIdeal) -> Result<LocalUnits> {
        let field = self.group.field();
        let units = self.group.fundamental_units();
        let valuations = units
            .iter()
            .map(|u| prime.valuation(field, u))
            .collect::<Result<Vec<_>>>()?;

        let mut k: Option<usize> = None;
        for (i, &n) in valuations.iter().enumerate() {
            if n != 0 && k.map_or(true, |j| n.abs() < valuations[j].abs()) {
                k = Some(i);
            }
        }
        let roots = self.group.roots_of_unity();
        let Some(k) = k else {
            return Ok(LocalUnits {
                valuations,
                k: None,
                mus: units.to_vec(),
                mu0s: roots,
            });
        };

        let nk = valuations[k];
        let beta_k = &units[k];
        let mut mus = Vec::with_capacity(units.len() - 1);
        for (i, beta) in units.iter().enumerate() {
            if i != k {
                let mu = field.mul(&field.pow(beta, nk)?, &field.pow(beta_k, -valuations[i])?);
                mus.push(mu);
            }
        }

        // r ranges over the box [0, |n_k|)^{t−1}; σ = −Σ n_i r_i must divide by n_k.
        let others: Vec<usize> = (0..units.len()).filter(|&i| i != k).collect();
        let width = nk.unsigned_abs();
        let mut mu0s: Vec<FieldElement> = Vec::new();
        let mut r = vec![0u64; others.len()];
        loop {
            let sigma: i64 = -others
                .iter()
                .zip(&r)
                .map(|(&i, &ri)| valuations[i] * ri as i64)
                .sum::<i64>();
            if sigma % nk == 0 {
                let mut prod = field.pow(beta_k, sigma / nk)?;
                for (&i, &ri) in others.iter().zip(&r) {
                    if ri > 0 {
                        prod = field.mul(&prod, &field.pow(&units[i], ri as i64)?);
                    }
                }
                for zeta in &roots {
                    let candidate = field.mul(zeta, &prod);
                    if !mu0s.contains(&candidate) {
                        mu0s.push(candidate);
                    }
                }
            }
            let Some(pos) = (0..r.len()).rev().find(|&j| r[j] + 1 < width) else {
                break;
            };
            r[pos] += 1;
            for slot in r.iter_mut().skip(pos + 1) {
                *slot = 0;
            }
        }
        Ok(LocalUnits {
            valuations,
            k: Some(k),
            mus,
            mu0s,
        })
    }

    /// `D = d` when `K` holds `√−1` (p odd) or `√−3` (p = 2), else `2d`.
    pub fn local_degree_factor(&self, p: u64) -> u32 {
        let d = self.group.field().degree() as u32;
        let w0 = self.group.zeta_order();
        let holds = if p == 2 { w0 % 3 == 0 } else { w0 % 4 == 0 };
        if holds {
            d
        } else {
            2 * d
        }
    }

    /// `max(h(b), max_φ |Log φ(b)|/(2πD), f·log p/d)`.
    pub fn modified_height(
        &self,
        b: &FieldElement,
        prime: &PrimeIdeal,
        big_d: u32,
        infinite: &[InfinitePlace],
    ) -> Result<Float> {
        let field = self.group.field();
        let prec = self.prec;
        let mut best = field.height(b, prec)?;
        let two_pi_d = Float::with_val(prec, Constant::Pi) * (2 * big_d);
        for v in infinite {
            let z = v.embed(field, b);
            let log = Complex::with_val(prec, z.ln_ref());
            let size = Float::with_val(prec, log.abs_ref()) / &two_pi_d;
            best = best.max(&size);
        }
        let local = Float::with_val(prec, prime.p()).ln() * prime.residue_degree()
            / field.degree() as u32;
        Ok(best.max(&local))
    }

    /// `c5 … c10` at `prime`.
    pub fn finite_constants(
        &self,
        prime: &PrimeIdeal,
        local: &LocalUnits,
        c3: &Float,
    ) -> Result<FiniteConstants> {
        let field = self.group.field();
        let prec = self.prec;
        let infinite = self.infinite_places()?;
        let p = prime.p();
        let e = prime.ramification();
        let f = prime.residue_degree();
        let d = field.degree() as u32;
        let log_p = Float::with_val(prec, p).ln();
        let efl = Float::with_val(prec, &log_p * (e * f));

        let mut c4 = Float::with_val(prec, 0);
        for zeta in self.group.roots_of_unity() {
            c4 = c4.max(&prime.abs_val(field, &zeta, prec)?);
        }
        let log_c4 = Float::with_val(prec, c4.ln_ref());
        let c5 = Float::with_val(prec, c3 / &efl);
        let c6 = Float::with_val(prec, &log_c4 / &efl);
        let c7 = Float::with_val(prec, &log_c4 / c3);

        let big_d = self.local_degree_factor(p);
        let n = local.mus.len() as u32 + 1;
        let local_c2 = if p == 2 {
            Float::with_val(prec, 36u32).pow(n) * 197_142u32
        } else if p % 4 == 1 {
            Float::with_val(prec, 22.5f64).pow(n) * 35_009u32
        } else {
            Float::with_val(prec, 25u32).pow(n) * 30_760u32
        };

        let mut mus_prod = Float::with_val(prec, 1);
        let mut h_max = Float::with_val(prec, 0);
        for mu in &local.mus {
            let h = self.modified_height(mu, prime, big_d, &infinite)?;
            h_max = h_max.max(&h);
            mus_prod *= h;
        }
        let mut local_c3 = Float::with_val(prec, 0);
        for mu0 in &local.mu0s {
            let h = self.modified_height(mu0, prime, big_d, &infinite)?;
            h_max = h_max.max(&h);
            local_c3 = local_c3.max(&Float::with_val(prec, &mus_prod * &h));
        }

        let exponent = Float::with_val(prec, Rational::from((big_d * f, d)));
        let mut l_c3 = Float::with_val(prec, n + 1).pow(2 * n + 4);
        l_c3 *= Float::with_val(prec, p).pow(&exponent);
        l_c3 *= Float::with_val(prec, &log_p * f).pow(-(n as i32) - 1);
        l_c3 *= Float::with_val(prec, big_d).pow(n + 2);
        l_c3 *= local_c3;

        let spread = Float::with_val(prec, (n + 1) * (n + 1) * big_d * big_d) * &h_max;
        let local_c4 = if p == 2 {
            (spread * (3u32 * 1024)).ln()
        } else {
            (spread * 2048u32).ln()
        };
        let local_c5 = Float::with_val(prec, big_d).ln() * 2u32;

        let c8 = Float::with_val(prec, &local_c2 * &l_c3) * &local_c4;
        let c9 = Float::with_val(prec, &c8 * &local_c5);

        let e_c5 = Float::with_val(prec, &c5 * e);
        let ratio = Float::with_val(prec, &c8 / &e_c5).ln();
        let c10 = (Float::with_val(prec, &c6 * e) + &c9 + Float::with_val(prec, &c8 * &ratio))
            * 2u32
            / &e_c5;

        Ok(FiniteConstants {
            c5,
            c6,
            c7,
            c8,
            c9,
            c10,
            big_d,
        })
    }

    /// `K0 = max_P max(c10, c7)`; zero when `S` is empty.
    pub fn k0(&self, c3: &Float) -> Result<Float> {
        let mut k0 = Float::with_val(self.prec, 0);
        for prime in self.group.primes() {
            let local = self.local_units(prime)?;
            let consts = self.finite_constants(prime, &local, c3)?;
            debug!(prime = %prime, c10 = consts.c10.to_f64(), c7 = consts.c7.to_f64(), "Finite-place constants");
            k0 = k0.max(&consts.c10).max(&consts.c7);
        }
        Ok(k0)
    }

    /// Raw bound `max(K0, K1(v) …)` with the constants it was built from.
    pub fn initial_bound(&self) -> Result<RawBound> {
        let c1 = self.c1()?;
        let c3 = self.c3(&c1);
        let k0 = self.k0(&c3)?;
        let mut k1 = Vec::new();
        let mut raw = k0.clone();
        for v in self.infinite_places()? {
            let consts = self.infinite_constants(&v, &c3)?;
            debug!(place = v.index(), real = v.is_real(), k1 = consts.k1.to_f64(), "Infinite-place constants");
            raw = raw.max(&consts.k1);
            k1.push(consts.k1);
        }
        Ok(RawBound { c1, c3, k0, k1, raw })
    }
}

#[cfg(test)]
mod tests {
    //! # Bound Estimator Tests
    //!
    //! Hand-checkable constants over `Q` with `S = {2}` (`c1 = 1/log 2`,
    //! `c11 = log 4 / c3`), the Baker constant, subset enumeration, and the
    //! local unit data (`β_k`, `μ`, `μ_0`) over `Q` and `Q(ζ3)`.

    use super::*;
    use crate::field::NumberField;
    use crate::places::primes_above;
    use crate::unit_group::rational_torsion;

    const PREC: u32 = 106;

    fn rational_group(units: &[i64], primes: &[u64]) -> SUnitGroup {
        let q = NumberField::rationals();
        let s: Vec<PrimeIdeal> = primes
            .iter()
            .flat_map(|&p| primes_above(&q, p).unwrap())
            .collect();
        let (minus_one, w0) = rational_torsion(&q);
        let units = units.iter().map(|&u| q.from_integer(u)).collect();
        SUnitGroup::new(q, s, minus_one, w0, units).unwrap()
    }

    fn eisenstein_group() -> SUnitGroup {
        let k = NumberField::new(vec![1.into(), 1.into(), 1.into()], "xi").unwrap();
        let s = primes_above(&k, 3).unwrap();
        let zeta = k.element(vec![Rational::from(1), Rational::from(1)]).unwrap();
        let unit = k.element(vec![Rational::from(-1), Rational::from(-2)]).unwrap();
        SUnitGroup::new(k, s, zeta, 6, vec![unit]).unwrap()
    }

    fn close(a: &Float, b: f64, tol: f64) -> bool {
        (a.to_f64() - b).abs() <= tol * b.abs().max(1.0)
    }

    #[test]
    fn combinations_are_lexicographic() {
        assert_eq!(
            combinations(4, 2),
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
        assert_eq!(combinations(3, 0), vec![Vec::<usize>::new()]);
        assert!(combinations(2, 3).is_empty());
    }

    #[test]
    fn baker_constant_matches_formula() {
        // 18 · 3! · 2^3 · 64^4 · log 8
        let expected = 18.0 * 6.0 * 8.0 * 64f64.powi(4) * 8f64.ln();
        assert!(close(&baker_c(1, 2, PREC), expected, 1e-12));
    }

    #[test]
    fn rational_c1_and_c3() {
        let g = rational_group(&[2], &[2]);
        let est = BoundEstimator::new(&g, PREC);
        let c1 = est.c1().unwrap();
        assert!(close(&c1, 1.0 / 2f64.ln(), 1e-12));
        let c3 = est.c3(&c1);
        assert!(close(&c3, 0.9999999 * 2f64.ln(), 1e-12));
    }

    #[test]
    fn rational_infinite_constants() {
        let g = rational_group(&[2], &[2]);
        let est = BoundEstimator::new(&g, PREC);
        let c3 = est.c3(&est.c1().unwrap());
        let v = &est.infinite_places().unwrap()[0];
        let consts = est.infinite_constants(v, &c3).unwrap();
        assert!(close(&consts.c4, 1.0, 1e-20));
        assert!(close(&consts.c11, 4f64.ln() / c3.to_f64(), 1e-12));
        assert!(close(&consts.c12, 2.0, 1e-20));
        assert!(consts.k1 >= consts.c11);
        assert!(consts.k1 >= consts.c15);
    }

    #[test]
    fn complex_place_uses_halved_c13() {
        let g = eisenstein_group();
        let est = BoundEstimator::new(&g, PREC);
        let c3 = est.c3(&est.c1().unwrap());
        let v = &est.infinite_places().unwrap()[0];
        assert!(!v.is_real());
        let consts = est.infinite_constants(v, &c3).unwrap();
        assert!(close(&consts.c13, c3.to_f64() / 2.0, 1e-12));
        assert!(close(&consts.c11, 2.0 * 4f64.ln() / c3.to_f64(), 1e-12));
    }

    #[test]
    fn local_units_single_generator() {
        let g = rational_group(&[2], &[2]);
        let est = BoundEstimator::new(&g, PREC);
        let local = est.local_units(&g.primes()[0]).unwrap();
        assert_eq!(local.valuations, vec![1]);
        assert_eq!(local.k, Some(0));
        assert!(local.mus.is_empty());
        assert_eq!(local.mu0s.len(), 2);
    }

    #[test]
    fn local_units_cancel_valuation() {
        // S = {2, 3}, units 6 and 2: at 2 both have valuation 1.
        let g = rational_group(&[6, 2], &[2, 3]);
        let est = BoundEstimator::new(&g, PREC);
        let field = g.field();
        for prime in g.primes() {
            let local = est.local_units(prime).unwrap();
            for mu in local.mus.iter().chain(&local.mu0s) {
                assert_eq!(prime.valuation(field, mu).unwrap(), 0);
            }
        }
    }

    #[test]
    fn eisenstein_k0_is_finite_and_positive() {
        let g = eisenstein_group();
        let est = BoundEstimator::new(&g, PREC);
        let raw = est.initial_bound().unwrap();
        assert!(raw.raw.is_finite());
        assert!(raw.raw >= raw.k0);
        assert_eq!(raw.k1.len(), 1);
        assert_eq!(est.local_degree_factor(2), 2);
        assert_eq!(est.local_degree_factor(3), 4);
    }

    #[test]
    fn dependent_units_are_singular() {
        let q = NumberField::rationals();
        let s = primes_above(&q, 2).unwrap();
        let (minus_one, w0) = rational_torsion(&q);
        // Rank check passes, but −1 has log 0 at every place.
        let g = SUnitGroup::new(q.clone(), s, minus_one, w0, vec![q.from_integer(-1)]).unwrap();
        let est = BoundEstimator::new(&g, PREC);
        assert!(matches!(est.c1(), Err(SolverError::SingularUnitLattice)));
    }
}
