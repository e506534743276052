//! # Poly — Dense Univariate Polynomials over Q
//!
//! Exact polynomial arithmetic backing the number-field layer. Coefficients are
//! `rug::Rational`, stored lowest degree first with trailing zeros trimmed, so
//! the zero polynomial is the empty vector and `degree()` is `None` for it.
//!
//! Besides the ring operations this module provides the few polynomial
//! algorithms the solver needs:
//!
//! - **Resultant** by the Euclidean recurrence
//!   `Res(f, g) = (−1)^{mn} · lc(g)^{m−k} · Res(g, f mod g)`, which gives norms
//!   (`N(a(θ)) = Res(f, a)` for monic `f`) and the discriminant.
//! - **Inverse modulo** a polynomial via the extended Euclidean algorithm.
//! - **Roots modulo q** by exhaustive evaluation (q is small in practice: it is
//!   an auxiliary sieve prime or a prime below `S`).
//! - **Hensel lifting** of a simple root modulo `p` to a root modulo `p^k`.
//! - **Eisenstein** criterion, used to recognise totally ramified primes.

use rug::ops::{Pow, RemRounding};
use rug::{Integer, Rational};
use std::ops::{Add, Mul, Neg, Sub};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Poly {
    coeffs: Vec<Rational>,
}

impl Poly {
    pub fn new(mut coeffs: Vec<Rational>) -> Self {
        while coeffs.last().is_some_and(|c| *c == 0) {
            coeffs.pop();
        }
        Poly { coeffs }
    }

    pub fn from_integers(coeffs: &[Integer]) -> Self {
        Poly::new(coeffs.iter().map(|c| Rational::from(c.clone())).collect())
    }

    pub fn zero() -> Self {
        Poly { coeffs: Vec::new() }
    }

    pub fn constant(c: Rational) -> Self {
        Poly::new(vec![c])
    }

    /// The monomial `x`.
    pub fn x() -> Self {
        Poly::new(vec![Rational::new(), Rational::from(1)])
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    pub fn degree(&self) -> Option<usize> {
        self.coeffs.len().checked_sub(1)
    }

    pub fn coeffs(&self) -> &[Rational] {
        &self.coeffs
    }

    /// Coefficient of `x^i` (zero beyond the degree).
    pub fn coeff(&self, i: usize) -> Rational {
        self.coeffs.get(i).cloned().unwrap_or_default()
    }

    pub fn leading(&self) -> Option<&Rational> {
        self.coeffs.last()
    }

    pub fn is_monic(&self) -> bool {
        self.leading().is_some_and(|c| *c == 1)
    }

    /// True when every coefficient is an integer.
    pub fn is_integral(&self) -> bool {
        self.coeffs.iter().all(|c| *c.denom() == 1)
    }

    pub fn scale(&self, c: &Rational) -> Poly {
        Poly::new(
            self.coeffs
                .iter()
                .map(|a| Rational::from(a * c))
                .collect(),
        )
    }

    pub fn derivative(&self) -> Poly {
        Poly::new(
            self.coeffs
                .iter()
                .enumerate()
                .skip(1)
                .map(|(i, c)| Rational::from(c * Rational::from(i as u64)))
                .collect(),
        )
    }

    pub fn eval(&self, x: &Rational) -> Rational {
        let mut acc = Rational::new();
        for c in self.coeffs.iter().rev() {
            acc *= x;
            acc += c;
        }
        acc
    }

    /// Euclidean division. Returns `None` for a zero divisor.
    pub fn div_rem(&self, divisor: &Poly) -> Option<(Poly, Poly)> {
        let dd = divisor.degree()?;
        let lead = divisor.leading()?.clone();
        let mut rem = self.coeffs.clone();
        if rem.len() <= dd {
            return Some((Poly::zero(), self.clone()));
        }
        let mut quot = vec![Rational::new(); rem.len() - dd];
        for shift in (0..quot.len()).rev() {
            let top = Rational::from(&rem[shift + dd] / &lead);
            if top == 0 {
                continue;
            }
            for (i, c) in divisor.coeffs.iter().enumerate() {
                rem[shift + i] -= Rational::from(&top * c);
            }
            quot[shift] = top;
        }
        rem.truncate(dd);
        Some((Poly::new(quot), Poly::new(rem)))
    }

    pub fn rem(&self, divisor: &Poly) -> Option<Poly> {
        self.div_rem(divisor).map(|(_, r)| r)
    }

    /// Inverse of `self` in `Q[x]/(modulus)`, if `gcd(self, modulus) = 1`.
    pub fn inverse_mod(&self, modulus: &Poly) -> Option<Poly> {
        // Invariant: s_i * self ≡ r_i (mod modulus).
        let mut r0 = modulus.clone();
        let mut r1 = self.rem(modulus)?;
        let mut s0 = Poly::zero();
        let mut s1 = Poly::constant(Rational::from(1));
        while !r1.is_zero() {
            let (q, r) = r0.div_rem(&r1)?;
            let s = &s0 - &(&q * &s1);
            r0 = std::mem::replace(&mut r1, r);
            s0 = std::mem::replace(&mut s1, s);
        }
        if r0.degree() != Some(0) {
            return None;
        }
        let inv_lead = Rational::from(1) / r0.leading()?.clone();
        s0.scale(&inv_lead).rem(modulus)
    }

    /// Resultant `Res(self, other)`.
    pub fn resultant(&self, other: &Poly) -> Rational {
        let (mut f, mut g) = (self.clone(), other.clone());
        let mut acc = Rational::from(1);
        loop {
            let (m, n) = match (f.degree(), g.degree()) {
                (Some(m), Some(n)) => (m, n),
                _ => return Rational::new(),
            };
            if n == 0 {
                let lead = g.coeff(0);
                return acc * pow_rational(&lead, m);
            }
            let r = match f.rem(&g) {
                Some(r) => r,
                None => return Rational::new(),
            };
            let k = match r.degree() {
                Some(k) => k,
                None => return Rational::new(),
            };
            if (m * n) % 2 == 1 {
                acc = -acc;
            }
            let lead = g.coeff(n);
            acc *= pow_rational(&lead, m - k);
            f = g;
            g = r;
        }
    }

    /// Discriminant of a monic polynomial.
    pub fn discriminant(&self) -> Rational {
        let n = self.degree().unwrap_or(0);
        let res = self.resultant(&self.derivative());
        if (n * n.saturating_sub(1) / 2) % 2 == 1 {
            -res
        } else {
            res
        }
    }

    /// `self(x + c)`.
    pub fn taylor_shift(&self, c: &Integer) -> Poly {
        let shift = Poly::new(vec![Rational::from(c.clone()), Rational::from(1)]);
        let mut acc = Poly::zero();
        for coeff in self.coeffs.iter().rev() {
            acc = &(&acc * &shift) + &Poly::constant(coeff.clone());
        }
        acc
    }

    /// Scale to a primitive integer polynomial (positive leading coefficient).
    pub fn primitive_integer(&self) -> Vec<Integer> {
        let mut denom = Integer::from(1);
        for c in &self.coeffs {
            denom.lcm_mut(c.denom());
        }
        let mut ints: Vec<Integer> = self
            .coeffs
            .iter()
            .map(|c| Integer::from(c.numer() * Integer::from(&denom / c.denom())))
            .collect();
        let mut content = Integer::new();
        for c in &ints {
            content.gcd_mut(c);
        }
        if content == 0 {
            return ints;
        }
        if ints.last().is_some_and(|c| *c < 0) {
            content = -content;
        }
        for c in &mut ints {
            *c = Integer::from(&*c / &content);
        }
        ints
    }

    /// Value at `x` reduced modulo `m`, for integral polynomials.
    pub fn eval_mod(&self, x: &Integer, m: &Integer) -> Option<Integer> {
        let mut acc = Integer::new();
        for c in self.coeffs.iter().rev() {
            if *c.denom() != 1 {
                return None;
            }
            acc = Integer::from(&acc * x) + c.numer();
            acc = acc.rem_euc(m);
        }
        Some(acc)
    }

    /// All roots in `[0, q)` of this integral polynomial modulo the prime `q`.
    pub fn roots_mod(&self, q: u64) -> Vec<u64> {
        let reduced: Option<Vec<u64>> = self.coeffs.iter().map(|c| residue_mod(c, q)).collect();
        let reduced = match reduced {
            Some(r) => r,
            None => return Vec::new(),
        };
        if reduced.iter().all(|&c| c == 0) {
            return Vec::new();
        }
        (0..q)
            .filter(|&r| {
                let mut acc: u128 = 0;
                for &c in reduced.iter().rev() {
                    acc = (acc * r as u128 + c as u128) % q as u128;
                }
                acc == 0
            })
            .collect()
    }

    /// Lift a simple root `r` modulo `p` to a root modulo `p^k` by Newton
    /// iteration. Returns `None` if `r` is not a simple root.
    pub fn hensel_lift(&self, r: u64, p: u64, k: u32) -> Option<Integer> {
        let modulus = Integer::from(p).pow(k.max(1));
        let p_int = Integer::from(p);
        let deriv = self.derivative();
        let mut root = Integer::from(r);
        if self.eval_mod(&root, &p_int)? != 0 || deriv.eval_mod(&root, &p_int)? == 0 {
            return None;
        }
        let mut precision = 1u32;
        while precision < k {
            precision = precision.saturating_mul(2);
            let value = self.eval_mod(&root, &modulus)?;
            let slope = deriv.eval_mod(&root, &modulus)?.invert(&modulus).ok()?;
            root = (root - value * slope).rem_euc(&modulus);
        }
        Some(root)
    }

    /// Eisenstein criterion at `p` for a monic integral polynomial.
    pub fn is_eisenstein(&self, p: &Integer) -> bool {
        let n = match self.degree() {
            Some(n) if n > 0 => n,
            _ => return false,
        };
        if !self.is_monic() || !self.is_integral() {
            return false;
        }
        let p2 = Integer::from(p * p);
        self.coeffs[..n].iter().all(|c| c.numer().is_divisible(p))
            && !self.coeffs[0].numer().is_divisible(&p2)
    }
}

fn pow_rational(base: &Rational, exp: usize) -> Rational {
    let mut acc = Rational::from(1);
    for _ in 0..exp {
        acc *= base;
    }
    acc
}

/// Image of a rational number in `Z/qZ`, or `None` when `q` divides the
/// denominator.
pub fn residue_mod(c: &Rational, q: u64) -> Option<u64> {
    let modulus = Integer::from(q);
    let num = c.numer().clone().rem_euc(&modulus);
    let den = c.denom().clone().rem_euc(&modulus);
    let inv = den.invert(&modulus).ok()?;
    Integer::from(num * inv).rem_euc(&modulus).to_u64()
}

impl Add for &Poly {
    type Output = Poly;
    fn add(self, other: &Poly) -> Poly {
        let n = self.coeffs.len().max(other.coeffs.len());
        Poly::new(
            (0..n)
                .map(|i| self.coeff(i) + other.coeff(i))
                .collect(),
        )
    }
}

impl Sub for &Poly {
    type Output = Poly;
    fn sub(self, other: &Poly) -> Poly {
        let n = self.coeffs.len().max(other.coeffs.len());
        Poly::new(
            (0..n)
                .map(|i| self.coeff(i) - other.coeff(i))
                .collect(),
        )
    }
}

impl Mul for &Poly {
    type Output = Poly;
    fn mul(self, other: &Poly) -> Poly {
        if self.is_zero() || other.is_zero() {
            return Poly::zero();
        }
        let mut out = vec![Rational::new(); self.coeffs.len() + other.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            if *a == 0 {
                continue;
            }
            for (j, b) in other.coeffs.iter().enumerate() {
                out[i + j] += Rational::from(a * b);
            }
        }
        Poly::new(out)
    }
}

impl Neg for &Poly {
    type Output = Poly;
    fn neg(self) -> Poly {
        Poly::new(self.coeffs.iter().map(|c| Rational::from(-c)).collect())
    }
}

#[cfg(test)]
mod tests {
    //! # Polynomial Arithmetic Tests
    //!
    //! Exercises the exact Q[x] operations the number-field layer depends on:
    //! division, modular inverses, resultants and discriminants, root finding
    //! modulo small primes, Hensel lifting, and the Eisenstein criterion.

    use super::*;

    fn int_poly(c: &[i64]) -> Poly {
        Poly::new(c.iter().map(|&x| Rational::from(x)).collect())
    }

    #[test]
    fn trims_trailing_zeros() {
        let p = int_poly(&[1, 2, 0, 0]);
        assert_eq!(p.degree(), Some(1));
        assert!(int_poly(&[0, 0]).is_zero());
    }

    #[test]
    fn div_rem_reconstructs_dividend() {
        let f = int_poly(&[-1, 0, 0, 1]);
        let g = int_poly(&[1, 1]);
        let (q, r) = f.div_rem(&g).unwrap();
        assert_eq!(&(&q * &g) + &r, f);
        assert!(r.degree().unwrap_or(0) < 1);
        assert!(f.div_rem(&Poly::zero()).is_none());
    }

    #[test]
    fn inverse_mod_cyclotomic() {
        // In Q[x]/(x^2+x+1), x^{-1} = -x - 1.
        let f = int_poly(&[1, 1, 1]);
        let inv = Poly::x().inverse_mod(&f).unwrap();
        assert_eq!(inv, int_poly(&[-1, -1]));
    }

    #[test]
    fn inverse_mod_fails_on_common_factor() {
        let f = int_poly(&[-1, 0, 1]);
        assert!(int_poly(&[-1, 1]).inverse_mod(&f).is_none());
    }

    #[test]
    fn discriminants_of_known_fields() {
        assert_eq!(int_poly(&[1, 1, 1]).discriminant(), -3);
        assert_eq!(int_poly(&[-2, 0, 1]).discriminant(), 8);
        assert_eq!(int_poly(&[1, 0, 1]).discriminant(), -4);
        // x^3 - 2 has discriminant -108.
        assert_eq!(int_poly(&[-2, 0, 0, 1]).discriminant(), -108);
    }

    #[test]
    fn resultant_is_norm() {
        // N(2ξ + 1) in Q(ζ3) is 3.
        let f = int_poly(&[1, 1, 1]);
        assert_eq!(f.resultant(&int_poly(&[1, 2])), 3);
    }

    #[test]
    fn roots_mod_splitting_prime() {
        assert_eq!(int_poly(&[1, 1, 1]).roots_mod(7), vec![2, 4]);
        assert!(int_poly(&[1, 1, 1]).roots_mod(5).is_empty());
        assert_eq!(int_poly(&[1, 1, 1]).roots_mod(3), vec![1]);
    }

    #[test]
    fn hensel_lift_is_root_mod_prime_power() {
        let f = int_poly(&[1, 1, 1]);
        let root = f.hensel_lift(2, 7, 10).unwrap();
        let m = Integer::from(7).pow(10);
        assert_eq!(f.eval_mod(&root, &m).unwrap(), 0);
        assert!(f.hensel_lift(1, 3, 4).is_none());
    }

    #[test]
    fn eisenstein_after_shift() {
        let f = int_poly(&[1, 1, 1]);
        assert!(!f.is_eisenstein(&Integer::from(3)));
        assert!(f.taylor_shift(&Integer::from(1)).is_eisenstein(&Integer::from(3)));
    }

    #[test]
    fn residue_mod_handles_denominators() {
        let third = Rational::from((1, 3));
        assert_eq!(residue_mod(&third, 7), Some(5));
        assert_eq!(residue_mod(&third, 3), None);
        assert_eq!(residue_mod(&Rational::from(-1), 7), Some(6));
    }

    #[test]
    fn primitive_integer_clears_denominators() {
        let p = Poly::new(vec![Rational::from((1, 3)), Rational::from((2, 3))]);
        assert_eq!(
            p.primitive_integer(),
            vec![Integer::from(1), Integer::from(2)]
        );
    }
}
