//! # Field — Absolute Number Fields and Exact Elements
//!
//! `K = Q[x]/(f)` for a monic, integral, squarefree defining polynomial `f` of
//! degree `d`. Elements are stored as `d` rational coordinates in the power
//! basis `1, θ, …, θ^{d−1}` (θ the class of `x`), so equality is exact and
//! elements can be used as ordered map keys.
//!
//! ## Operations
//!
//! - Ring operations, inverses via the extended Euclidean algorithm in `Q[x]`,
//!   integer powers by square-and-multiply.
//! - Norm `N(a(θ)) = Res(f, a)`.
//! - Characteristic polynomial by Faddeev–LeVerrier on the multiplication
//!   matrix.
//! - Absolute logarithmic Weil height
//!   `h(α) = (log|a_lead| + Σ_σ log max(1, |σ(α)|)) / d`, where `a_lead` is
//!   the leading coefficient of the primitive integral characteristic
//!   polynomial and σ runs over all `d` complex embeddings.
//!
//! Irreducibility of `f` is the caller's responsibility; squarefreeness is
//! checked (a zero discriminant is rejected).

use crate::error::{Result, SolverError};
use crate::places;
use crate::poly::Poly;
use rug::{Complex, Float, Integer, Rational};
use std::ops::{Add, Neg, Sub};

#[derive(Clone, Debug)]
pub struct NumberField {
    poly: Poly,
    int_poly: Vec<Integer>,
    variable: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldElement {
    coeffs: Vec<Rational>,
}

impl NumberField {
    /// Build `Q[x]/(f)` from integer coefficients, lowest degree first.
    pub fn new(coeffs: Vec<Integer>, variable: &str) -> Result<Self> {
        let poly = Poly::from_integers(&coeffs);
        let degree = poly
            .degree()
            .filter(|&d| d > 0)
            .ok_or_else(|| SolverError::InvalidField("polynomial must have degree >= 1".into()))?;
        if !poly.is_monic() {
            return Err(SolverError::InvalidField(
                "defining polynomial must be monic".into(),
            ));
        }
        if poly.discriminant() == 0 {
            return Err(SolverError::InvalidField(
                "defining polynomial has repeated roots".into(),
            ));
        }
        if variable.is_empty() || !variable.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(SolverError::InvalidField(format!(
                "bad generator name {variable:?}"
            )));
        }
        let mut int_poly = coeffs;
        int_poly.truncate(degree + 1);
        Ok(NumberField {
            poly,
            int_poly,
            variable: variable.to_string(),
        })
    }

    /// The rational field, presented as `Q[x]/(x)`.
    pub fn rationals() -> Self {
        NumberField {
            poly: Poly::x(),
            int_poly: vec![Integer::new(), Integer::from(1)],
            variable: "x".to_string(),
        }
    }

    pub fn degree(&self) -> usize {
        self.int_poly.len() - 1
    }

    pub fn polynomial(&self) -> &Poly {
        &self.poly
    }

    pub fn integer_coefficients(&self) -> &[Integer] {
        &self.int_poly
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn discriminant(&self) -> Rational {
        self.poly.discriminant()
    }

    pub fn element(&self, coeffs: Vec<Rational>) -> Result<FieldElement> {
        if coeffs.len() > self.degree() {
            return Err(SolverError::InvalidGenerators(format!(
                "element has {} coordinates, field degree is {}",
                coeffs.len(),
                self.degree()
            )));
        }
        Ok(self.pad(coeffs))
    }

    /// Parse coordinates written as rational strings (`"1/3"`, `"-2"`).
    pub fn parse_element(&self, coeffs: &[String]) -> Result<FieldElement> {
        let parsed = coeffs
            .iter()
            .map(|s| {
                s.trim()
                    .parse::<Rational>()
                    .map_err(|e| SolverError::Config(format!("bad coefficient {s:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        self.element(parsed)
    }

    fn pad(&self, mut coeffs: Vec<Rational>) -> FieldElement {
        coeffs.resize(self.degree(), Rational::new());
        FieldElement { coeffs }
    }

    fn from_poly(&self, p: &Poly) -> FieldElement {
        let reduced = p.rem(&self.poly).unwrap_or_else(Poly::zero);
        self.pad(reduced.coeffs().to_vec())
    }

    pub fn zero(&self) -> FieldElement {
        self.pad(Vec::new())
    }

    pub fn one(&self) -> FieldElement {
        self.from_integer(1)
    }

    pub fn from_integer(&self, n: i64) -> FieldElement {
        self.pad(vec![Rational::from(n)])
    }

    pub fn from_rational(&self, r: Rational) -> FieldElement {
        self.pad(vec![r])
    }

    /// The generator θ (for `d = 1` this is the root of `f`, a rational).
    pub fn generator(&self) -> FieldElement {
        self.from_poly(&Poly::x())
    }

    pub fn mul(&self, a: &FieldElement, b: &FieldElement) -> FieldElement {
        self.from_poly(&(&a.as_poly() * &b.as_poly()))
    }

    pub fn inv(&self, a: &FieldElement) -> Result<FieldElement> {
        if a.is_zero() {
            return Err(SolverError::ZeroElement);
        }
        let inv = a.as_poly().inverse_mod(&self.poly).ok_or_else(|| {
            SolverError::InvalidField("element not invertible: polynomial is reducible".into())
        })?;
        Ok(self.from_poly(&inv))
    }

    pub fn div(&self, a: &FieldElement, b: &FieldElement) -> Result<FieldElement> {
        Ok(self.mul(a, &self.inv(b)?))
    }

    /// `a^e` for any integer `e` (negative exponents need `a ≠ 0`).
    pub fn pow(&self, a: &FieldElement, e: i64) -> Result<FieldElement> {
        let mut base = if e < 0 { self.inv(a)? } else { a.clone() };
        let mut exp = e.unsigned_abs();
        let mut acc = self.one();
        while exp > 0 {
            if exp & 1 == 1 {
                acc = self.mul(&acc, &base);
            }
            exp >>= 1;
            if exp > 0 {
                base = self.mul(&base, &base);
            }
        }
        Ok(acc)
    }

    pub fn norm(&self, a: &FieldElement) -> Rational {
        self.poly.resultant(&a.as_poly())
    }

    /// Matrix of multiplication by `a`; column `j` holds `a·θ^j`.
    pub fn mult_matrix(&self, a: &FieldElement) -> Vec<Vec<Rational>> {
        let d = self.degree();
        let mut columns = Vec::with_capacity(d);
        let mut col = a.coeffs.clone();
        for _ in 0..d {
            let next = self.times_generator(&col);
            columns.push(col);
            col = next;
        }
        (0..d)
            .map(|i| (0..d).map(|j| columns[j][i].clone()).collect())
            .collect()
    }

    fn times_generator(&self, col: &[Rational]) -> Vec<Rational> {
        let d = self.degree();
        let top = col[d - 1].clone();
        let mut next = vec![Rational::new(); d];
        for i in 1..d {
            next[i] = col[i - 1].clone();
        }
        for (i, slot) in next.iter_mut().enumerate() {
            *slot -= Rational::from(&top * &self.poly.coeff(i));
        }
        next
    }

    /// Characteristic polynomial `det(x·I − M_a)` (monic, degree `d`).
    pub fn charpoly(&self, a: &FieldElement) -> Poly {
        let d = self.degree();
        let m = self.mult_matrix(a);
        let mut coeffs = vec![Rational::new(); d + 1];
        coeffs[d] = Rational::from(1);
        let mut acc = vec![vec![Rational::new(); d]; d];
        for k in 1..=d {
            // acc ← M·acc + c_{d−k+1}·I
            let mut next = mat_mul(&m, &acc);
            for (i, row) in next.iter_mut().enumerate() {
                row[i] += &coeffs[d - k + 1];
            }
            let trace = mat_mul(&m, &next)
                .iter()
                .enumerate()
                .fold(Rational::new(), |t, (i, row)| t + &row[i]);
            coeffs[d - k] = -trace / Rational::from(k as u64);
            acc = next;
        }
        Poly::new(coeffs)
    }

    /// Value of `a` at a complex root of `f`.
    pub fn embed(&self, a: &FieldElement, root: &Complex, prec: u32) -> Complex {
        let mut acc = Complex::with_val(prec, (0, 0));
        for c in a.coeffs.iter().rev() {
            acc *= root;
            acc += Complex::with_val(prec, (c, 0));
        }
        acc
    }

    /// Absolute logarithmic Weil height at `prec` bits.
    pub fn height(&self, a: &FieldElement, prec: u32) -> Result<Float> {
        let charpoly = self.charpoly(a).primitive_integer();
        let lead = charpoly
            .last()
            .cloned()
            .unwrap_or_else(|| Integer::from(1))
            .abs();
        let mut sum = Float::with_val(prec, &lead).ln();
        for root in places::complex_roots(&self.poly, prec)? {
            let value = self.embed(a, &root, prec);
            let modulus = Float::with_val(prec, value.abs_ref());
            if modulus > 1 {
                sum += modulus.ln();
            }
        }
        Ok(sum / self.degree() as u32)
    }

    /// Human-readable form, highest power first (`-1/3*xi + 2/3`).
    pub fn display(&self, a: &FieldElement) -> String {
        let mut out = String::new();
        for (i, c) in a.coeffs.iter().enumerate().rev() {
            if *c == 0 {
                continue;
            }
            let negative = *c < 0;
            let magnitude = Rational::from(c.abs_ref());
            if out.is_empty() {
                if negative {
                    out.push('-');
                }
            } else {
                out.push_str(if negative { " - " } else { " + " });
            }
            let monomial = match i {
                0 => String::new(),
                1 => self.variable.clone(),
                _ => format!("{}^{}", self.variable, i),
            };
            if monomial.is_empty() {
                out.push_str(&magnitude.to_string());
            } else if magnitude == 1 {
                out.push_str(&monomial);
            } else {
                out.push_str(&format!("{magnitude}*{monomial}"));
            }
        }
        if out.is_empty() {
            out.push('0');
        }
        out
    }
}

fn mat_mul(a: &[Vec<Rational>], b: &[Vec<Rational>]) -> Vec<Vec<Rational>> {
    let n = a.len();
    let mut out = vec![vec![Rational::new(); n]; n];
    for i in 0..n {
        for k in 0..n {
            if a[i][k] == 0 {
                continue;
            }
            for j in 0..n {
                out[i][j] += Rational::from(&a[i][k] * &b[k][j]);
            }
        }
    }
    out
}

impl FieldElement {
    pub fn coeffs(&self) -> &[Rational] {
        &self.coeffs
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|c| *c == 0)
    }

    pub fn is_one(&self) -> bool {
        self.coeffs
            .iter()
            .enumerate()
            .all(|(i, c)| if i == 0 { *c == 1 } else { *c == 0 })
    }

    pub fn as_poly(&self) -> Poly {
        Poly::new(self.coeffs.clone())
    }

    /// Least common multiple of the coordinate denominators.
    pub fn denominator(&self) -> Integer {
        let mut den = Integer::from(1);
        for c in &self.coeffs {
            den.lcm_mut(c.denom());
        }
        den
    }

    /// Coordinates as strings, the form used in problem files and certificates.
    pub fn coefficient_strings(&self) -> Vec<String> {
        self.coeffs.iter().map(|c| c.to_string()).collect()
    }
}

impl Add for &FieldElement {
    type Output = FieldElement;
    fn add(self, other: &FieldElement) -> FieldElement {
        FieldElement {
            coeffs: self
                .coeffs
                .iter()
                .zip(&other.coeffs)
                .map(|(a, b)| Rational::from(a + b))
                .collect(),
        }
    }
}

impl Sub for &FieldElement {
    type Output = FieldElement;
    fn sub(self, other: &FieldElement) -> FieldElement {
        FieldElement {
            coeffs: self
                .coeffs
                .iter()
                .zip(&other.coeffs)
                .map(|(a, b)| Rational::from(a - b))
                .collect(),
        }
    }
}

impl Neg for &FieldElement {
    type Output = FieldElement;
    fn neg(self) -> FieldElement {
        FieldElement {
            coeffs: self.coeffs.iter().map(|c| Rational::from(-c)).collect(),
        }
    }
}
