//! # p-adic Reduction — LLL at the Primes of S
//!
//! Shrinks the non-archimedean bound `K0` one prime `P ∈ S` at a time
//! (Smart, §VI.4.2). A solution with a large exponent makes
//! `Σ a_i log_p(μ_i) + log_p(μ_0)` extremely `P`-adically small; the
//! lattice
//!
//! ```text
//!     [ I_n        0      ]
//!     [ Bᵀ mod p^u  p^u·I_m ]
//! ```
//!
//! built from the scaled logs `B` then rules out every exponent vector of
//! norm at most `B0` once its distance to `−(b0 mod p^u)` exceeds `√n·B0`.
//!
//! ## Completion
//!
//! All p-adic work happens in `K_P = Q_p[x]/G`, where `G` is the local factor
//! of the defining polynomial (linear at split primes, the whole polynomial
//! at the only prime above an inert or totally ramified `p`). Elements are
//! integer coordinate vectors of length `e·f`, reduced modulo `p^N`.
//!
//! ## Logarithm
//!
//! `log_p(a)` raises `a` to the least `order | p^f − 1` that lands in
//! `1 + P`, then to `p^t` until `v_P(γ − 1) > e`, sums
//! `−Σ (1 − γ)^i / i` and divides by `order·p^t`.

use crate::bounds::BoundEstimator;
use crate::config::SolverConfig;
use crate::error::{Result, SolverError};
use crate::field::{FieldElement, NumberField};
use crate::lll::minimal_vector;
use crate::places::{rational_valuation, LocalKind, PrimeIdeal};
use crate::sieve::divisors;
use crate::unit_group::SUnitGroup;
use rug::ops::{Pow, RemRounding};
use rug::{Float, Integer, Rational};
use tracing::{debug, info, warn};

/// Digits of headroom kept above the requested p-adic precision.
const GUARD_DIGITS: u32 = 16;

/// `Q_p[x]/G` truncated at `p^digits`.
pub struct Completion<'a> {
    field: &'a NumberField,
    prime: &'a PrimeIdeal,
    digits: u32,
    modulus: Integer,
    factor: Vec<Integer>,
}

fn unsupported(p: u64, reason: &str) -> SolverError {
    SolverError::UnsupportedPrime {
        p,
        reason: reason.to_string(),
    }
}

/// Residue of a `p`-integral rational modulo `modulus`.
fn residue(c: &Rational, modulus: &Integer, p: u64) -> Result<Integer> {
    let inv = Integer::from(c.denom())
        .invert(modulus)
        .map_err(|_| unsupported(p, "coordinate is not p-integral"))?;
    Ok((Integer::from(c.numer() * inv)).rem_euc(modulus))
}

/// `x mod G` with coefficients reduced modulo `modulus`; `G` is monic.
fn reduce_mod_factor(mut x: Vec<Integer>, factor: &[Integer], modulus: &Integer) -> Vec<Integer> {
    let m = factor.len() - 1;
    for i in (m..x.len()).rev() {
        let lead = std::mem::take(&mut x[i]);
        if lead != 0 {
            for j in 0..m {
                x[i - m + j] -= Integer::from(&lead * &factor[j]);
            }
        }
    }
    x.truncate(m);
    x.resize(m, Integer::new());
    for c in x.iter_mut() {
        *c = Integer::from((&*c).rem_euc(modulus));
    }
    x
}

impl<'a> Completion<'a> {
    pub fn new(field: &'a NumberField, prime: &'a PrimeIdeal, digits: u32) -> Result<Self> {
        let modulus = Integer::from(prime.p()).pow(digits);
        let factor = Self::factor_at(field, prime, digits)?;
        Ok(Completion {
            field,
            prime,
            digits,
            modulus,
            factor,
        })
    }

    fn factor_at(field: &NumberField, prime: &PrimeIdeal, digits: u32) -> Result<Vec<Integer>> {
        let modulus = Integer::from(prime.p()).pow(digits);
        prime
            .local_factor(field, digits)?
            .coeffs()
            .iter()
            .map(|c| residue(c, &modulus, prime.p()))
            .collect()
    }

    /// `e·f`, the number of coordinates.
    pub fn degree(&self) -> usize {
        self.factor.len() - 1
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    pub fn one(&self) -> Vec<Integer> {
        let mut out = vec![Integer::new(); self.degree()];
        out[0] = Integer::from(1);
        out
    }

    pub fn mul(&self, a: &[Integer], b: &[Integer]) -> Vec<Integer> {
        let mut prod = vec![Integer::new(); a.len() + b.len() - 1];
        for (i, x) in a.iter().enumerate() {
            if *x == 0 {
                continue;
            }
            for (j, y) in b.iter().enumerate() {
                prod[i + j] += Integer::from(x * y);
            }
        }
        reduce_mod_factor(prod, &self.factor, &self.modulus)
    }

    pub fn pow(&self, a: &[Integer], mut e: u64) -> Vec<Integer> {
        let mut base = a.to_vec();
        let mut acc = self.one();
        while e > 0 {
            if e & 1 == 1 {
                acc = self.mul(&acc, &base);
            }
            base = self.mul(&base, &base);
            e >>= 1;
        }
        acc
    }

    /// `1 − a`.
    fn one_minus(&self, a: &[Integer]) -> Vec<Integer> {
        a.iter()
            .enumerate()
            .map(|(i, c)| {
                let v = if i == 0 { Integer::from(1 - c) } else { Integer::from(-c) };
                v.rem_euc(&self.modulus)
            })
            .collect()
    }

    /// Image of a field element whose `P`-valuation is zero.
    pub fn embed(&self, a: &FieldElement) -> Result<Vec<Integer>> {
        let p = self.prime.p();
        let mut den = a.denominator();
        let unit_den = den.clone();
        let k = den.remove_factor_mut(&Integer::from(p));
        let pk = Integer::from(p).pow(k);
        let wide = Integer::from(&self.modulus * &pk);
        let factor = if k == 0 {
            self.factor.clone()
        } else {
            Self::factor_at(self.field, self.prime, self.digits + k)?
        };
        let clear = Rational::from(unit_den);
        let numer: Vec<Integer> = a
            .coeffs()
            .iter()
            .map(|c| Integer::from(Rational::from(c * &clear).numer()))
            .collect();
        let reduced = reduce_mod_factor(numer, &factor, &wide);
        let inv = den
            .invert(&self.modulus)
            .map_err(|_| unsupported(p, "denominator is not invertible"))?;
        let mut out = Vec::with_capacity(reduced.len());
        for c in reduced {
            if !c.is_divisible(&pk) {
                return Err(unsupported(p, "element is not integral in the local basis"));
            }
            let c = Integer::from(c.div_exact_ref(&pk)) * &inv;
            out.push(c.rem_euc(&self.modulus));
        }
        Ok(out)
    }

    /// `v_P(x)`, or `digits·e` when `x ≡ 0` at working precision.
    pub fn valuation(&self, x: &[Integer]) -> Result<i64> {
        if x.iter().all(|c| *c == 0) {
            return Ok(i64::from(self.digits) * i64::from(self.prime.ramification()));
        }
        match self.prime.kind() {
            LocalKind::Linear { .. } => {
                let mut c = x[0].clone();
                Ok(i64::from(c.remove_factor_mut(&Integer::from(self.prime.p()))))
            }
            LocalKind::Unique => {
                let coeffs = x.iter().map(|c| Rational::from(c.clone())).collect();
                let el = self.field.element(coeffs)?;
                self.prime.valuation(self.field, &el)
            }
        }
    }
}

/// `c mod p^digits` keeping the `p`-adic unit part: `p^v·(u mod p^{digits−v})`.
fn reduce_coordinate(c: &Rational, p: u64, digits: u32) -> Result<Rational> {
    if *c == 0 {
        return Ok(Rational::new());
    }
    let v = rational_valuation(c, p);
    let shift = Rational::from(Integer::from(p).pow(v.unsigned_abs() as u32));
    let unit = if v >= 0 {
        Rational::from(c / &shift)
    } else {
        Rational::from(c * &shift)
    };
    if v >= i64::from(digits) {
        return Ok(Rational::new());
    }
    let width = (i64::from(digits) - v) as u32;
    let r = residue(&unit, &Integer::from(p).pow(width), p)?;
    Ok(if v >= 0 {
        Rational::from(r) * shift
    } else {
        Rational::from(r) / shift
    })
}

/// `log_p(a)` at `P`, as `e·f` rational coordinates correct modulo `p^prec`.
pub fn log_p(field: &NumberField, prime: &PrimeIdeal, a: &FieldElement, prec: u32) -> Result<Vec<Rational>> {
    if a.is_zero() {
        return Err(SolverError::ZeroElement);
    }
    let v = prime.valuation(field, a)?;
    if v != 0 {
        return Err(SolverError::NonzeroValuation {
            p: prime.p(),
            valuation: v,
        });
    }
    let p = prime.p();
    let e = i64::from(prime.ramification());
    let q = p.pow(prime.residue_degree()) - 1;

    let mut guard = GUARD_DIGITS;
    loop {
        let kp = Completion::new(field, prime, prec + guard)?;
        let x = kp.embed(a)?;

        let mut order = q;
        for d in divisors(q) {
            if kp.valuation(&kp.one_minus(&kp.pow(&x, d)))? > 0 {
                order = d;
                break;
            }
        }
        let mut gamma = kp.pow(&x, order);
        let mut t = 0u32;
        while kp.valuation(&kp.one_minus(&gamma))? <= e {
            gamma = kp.pow(&gamma, p);
            t += 1;
        }
        let working = prec + t;
        let ln_p = (p as f64).ln();
        let w = ((working as f64).ln() / ln_p).floor() as u32;
        if working + w >= kp.digits() {
            guard = t + w + GUARD_DIGITS;
            continue;
        }

        let delta = kp.one_minus(&gamma);
        let m = kp.valuation(&delta)? as f64 / e as f64;
        let mut terms: u64 = 1;
        while (terms as f64) * m < (terms as f64).ln() / ln_p + working as f64 {
            terms += 1;
        }

        let mut beta = vec![Rational::new(); kp.degree()];
        let mut power = delta.clone();
        for i in 1..=terms {
            for (b, c) in beta.iter_mut().zip(&power) {
                *b -= Rational::from((c.clone(), Integer::from(i)));
            }
            power = kp.mul(&power, &delta);
        }
        let scale = Rational::from(Integer::from(order) * Integer::from(p).pow(t));
        return beta
            .iter()
            .map(|b| reduce_coordinate(&Rational::from(b / &scale), p, working))
            .collect();
    }
}

/// Result of one p-adic reduction step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PadicStep {
    Bound(Integer),
    IncreasePrecision,
}

fn min_valuation<'b>(coords: impl IntoIterator<Item = &'b Rational>, p: u64) -> Option<i64> {
    coords
        .into_iter()
        .filter(|c| **c != 0)
        .map(|c| rational_valuation(c, p))
        .min()
}

fn floor_float(x: &Float) -> Result<Integer> {
    Float::with_val(x.prec(), x.floor_ref())
        .to_integer()
        .ok_or(SolverError::PrecisionExhausted {
            step: "p-adic bound",
            precision: x.prec(),
        })
}

/// One reduction step at `(P, μ_0)` with the logs of the `μ`s precomputed.
#[allow(clippy::too_many_arguments)]
pub fn reduction_step_padic(
    field: &NumberField,
    prime: &PrimeIdeal,
    b0: &Integer,
    mus_log: &[Vec<Rational>],
    mu0: &FieldElement,
    c3: &Float,
    prec: u32,
) -> Result<PadicStep> {
    let p = prime.p();
    let f = prime.residue_degree();
    let e = prime.ramification();
    let fprec = c3.prec();
    let log_p_real = Float::with_val(fprec, p).ln();
    let c5 = Float::with_val(fprec, c3 / Float::with_val(fprec, &log_p_real * (e * f)));

    if mus_log.is_empty() {
        if mu0.is_one() {
            return Ok(PadicStep::Bound(Integer::new()));
        }
        let shifted = mu0 - &field.one();
        let v = prime.valuation(field, &shifted)?;
        let value = Float::with_val(fprec, &log_p_real * f) * v / c3;
        let value = value.max(&Float::with_val(fprec, 0));
        return Ok(PadicStep::Bound(floor_float(&value)?));
    }

    let mu0_log = log_p(field, prime, mu0, prec)?;
    let n = mus_log.len();
    let m = mu0_log.len();
    let Some(mut c8) = min_valuation(mus_log.iter().flatten(), p) else {
        return Ok(PadicStep::IncreasePrecision);
    };
    let ordp_disc = rational_valuation(&field.discriminant(), p);
    let low = crate::archimedean::round_float(&Float::with_val(fprec, c5.recip_ref()), "p-adic low bound")?;
    let half_disc = Rational::from((ordp_disc, 2i64));

    let bound_at = |numerator: Rational| -> Result<Integer> {
        let value = Float::with_val(fprec, &numerator) / &c5;
        Ok(floor_float(&value)?.max(low.clone()))
    };

    if let Some(v) = min_valuation(&mu0_log, p) {
        if v < c8 {
            return Ok(PadicStep::Bound(bound_at(Rational::from(c8) + &half_disc)?));
        }
        c8 = c8.min(v);
    }
    let lambda = Rational::from(Integer::from(p).pow(c8.unsigned_abs() as u32));
    let scale = |x: &Rational| -> Rational {
        if c8 >= 0 {
            Rational::from(x / &lambda)
        } else {
            Rational::from(x * &lambda)
        }
    };
    let scaled: Vec<Vec<Rational>> = mus_log
        .iter()
        .map(|row| row.iter().map(&scale).collect())
        .collect();
    let b0_log: Vec<Rational> = mu0_log.iter().map(&scale).collect();
    let c9 = Rational::from(c8) + &half_disc;

    let threshold = Rational::from(Integer::from(b0.square_ref()) * n as u32);
    let limit = f64::from(prec) * std::f64::consts::LN_2 / (p as f64).ln();
    let mut u: u32 = 1;
    loop {
        if f64::from(u) > limit {
            return Ok(PadicStep::IncreasePrecision);
        }
        let pu = Integer::from(p).pow(u);
        let dim = n + m;
        let mut a = vec![vec![Integer::new(); dim]; dim];
        for (i, row) in a.iter_mut().enumerate().take(n) {
            row[i] = Integer::from(1);
        }
        for j in 0..m {
            for (i, log) in scaled.iter().enumerate() {
                a[n + j][i] = residue(&log[j], &pu, p)?;
            }
            a[n + j][n + j] = pu.clone();
        }
        let mut y = vec![Integer::new(); dim];
        for j in 0..m {
            y[n + j] = -residue(&b0_log[j], &pu, p)?;
        }
        let l = minimal_vector(&crate::lll::transpose(&a), &y)?;
        if l > threshold {
            return Ok(PadicStep::Bound(bound_at(Rational::from(u) + &c9)?));
        }
        u += 1;
    }
}

pub struct PadicReducer<'a> {
    group: &'a SUnitGroup,
    config: &'a SolverConfig,
}

impl<'a> PadicReducer<'a> {
    pub fn new(group: &'a SUnitGroup, config: &'a SolverConfig) -> Self {
        PadicReducer { group, config }
    }

    fn c3_at(&self, prec: u32) -> Result<Float> {
        let est = BoundEstimator::new(self.group, prec);
        Ok(est.c3(&est.c1()?))
    }

    fn logs(&self, prime: &PrimeIdeal, mus: &[FieldElement], prec: u32) -> Result<Vec<Vec<Rational>>> {
        mus.iter()
            .map(|mu| log_p(self.group.field(), prime, mu, prec))
            .collect()
    }

    /// Reduced bound at one prime of `S`, starting every `μ_0` from `k0`.
    pub fn reduce_prime(&self, prime: &PrimeIdeal, k0: &Integer) -> Result<Integer> {
        let field = self.group.field();
        let local = BoundEstimator::new(self.group, self.config.precision).local_units(prime)?;
        let mut prec = self.config.precision;
        let mut c3 = self.c3_at(prec)?;
        let mut mus_log = self.logs(prime, &local.mus, prec)?;

        let mut best = Integer::new();
        for mu0 in &local.mu0s {
            let mut old = k0.clone();
            loop {
                let step = reduction_step_padic(field, prime, &old, &mus_log, mu0, &c3, prec)?;
                let new = match step {
                    PadicStep::Bound(b) => b,
                    PadicStep::IncreasePrecision => {
                        let next = prec.saturating_mul(2);
                        if next > self.config.max_precision {
                            return Err(SolverError::PrecisionExhausted {
                                step: "p-adic reduction",
                                precision: prec,
                            });
                        }
                        warn!(prime = %prime, precision = next, "Raising precision for p-adic reduction");
                        prec = next;
                        c3 = self.c3_at(prec)?;
                        mus_log = self.logs(prime, &local.mus, prec)?;
                        continue;
                    }
                };
                debug!(prime = %prime, bound = %old, next = %new, "p-adic reduction step");
                if new >= old {
                    break;
                }
                old = new;
            }
            best = best.max(old);
        }
        Ok(best)
    }

    /// `max_P` of the reduced bounds; zero when `S` is empty.
    pub fn reduce(&self, k0: &Integer) -> Result<Integer> {
        let mut bound = Integer::new();
        for prime in self.group.primes() {
            let reduced = self.reduce_prime(prime, k0)?;
            info!(prime = %prime, bound = %reduced, "p-adic bound reduced");
            bound = bound.max(reduced);
        }
        Ok(bound)
    }
}
