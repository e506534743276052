//! # LLL — Exact Lattice Reduction and Certified Lattice Bounds
//!
//! Integer lattice bases are reduced with the Lenstra–Lenstra–Lovász algorithm
//! (δ = 3/4) over exact rational Gram–Schmidt data. Both reduction modules
//! only need two facts about the reduced basis `b_1, …, b_n`:
//!
//! 1. `|b_1|² ≤ 2^{n−1} · λ_1(L)²`, so `|b_1|² / 2^{n−1}` is a certified lower
//!    bound for the squared length of every nonzero lattice vector.
//! 2. For a target `y ∉ L`, write `y = Σ s_i b_i` and let `i₀` be the largest
//!    index with `s_{i₀} ∉ Z`. Then every lattice point `x` satisfies
//!    `|y − x|² ≥ ‖s_{i₀}‖² · |b_1|² / 2^{n−1}`, where `‖·‖` is the distance
//!    to the nearest integer.
//!
//! [`minimal_vector`] returns the relevant bound. Bases here have at most a
//! dozen rows, so Gram–Schmidt data is recomputed from scratch after each swap.
//!
//! ## References
//!
//! - A.K. Lenstra, H.W. Lenstra, L. Lovász, "Factoring polynomials with
//!   rational coefficients", Math. Ann. 261 (1982).
//! - B.M.M. de Weger, "Algorithms for Diophantine Equations", CWI Tract 65
//!   (1989), Lemma 3.5.

use crate::error::{Result, SolverError};
use rug::{Integer, Rational};

pub type IntMatrix = Vec<Vec<Integer>>;
pub type RatMatrix = Vec<Vec<Rational>>;

/// Nearest integer, ties away from zero.
pub fn round_rational(r: &Rational) -> Integer {
    let den = Integer::from(r.denom() * 2);
    let num = Integer::from(r.numer() * 2);
    if *r >= 0 {
        Integer::from(&(num + r.denom()) / &den)
    } else {
        -Integer::from(&(Integer::from(r.denom()) - num) / &den)
    }
}

pub fn to_rational(m: &[Vec<Integer>]) -> RatMatrix {
    m.iter()
        .map(|row| row.iter().map(|x| Rational::from(x.clone())).collect())
        .collect()
}

pub fn transpose<T: Clone>(m: &[Vec<T>]) -> Vec<Vec<T>> {
    let cols = m.first().map_or(0, |r| r.len());
    (0..cols)
        .map(|j| m.iter().map(|row| row[j].clone()).collect())
        .collect()
}

pub fn identity(n: usize) -> IntMatrix {
    (0..n)
        .map(|i| {
            (0..n)
                .map(|j| Integer::from(u32::from(i == j)))
                .collect()
        })
        .collect()
}

/// Determinant by rational Gaussian elimination.
pub fn determinant(m: &[Vec<Rational>]) -> Rational {
    let n = m.len();
    let mut a = m.to_vec();
    let mut det = Rational::from(1);
    for col in 0..n {
        let Some(pivot) = (col..n).find(|&r| a[r][col] != 0) else {
            return Rational::new();
        };
        if pivot != col {
            a.swap(pivot, col);
            det = -det;
        }
        det *= &a[col][col];
        for r in col + 1..n {
            if a[r][col] == 0 {
                continue;
            }
            let factor = Rational::from(&a[r][col] / &a[col][col]);
            for c in col..n {
                let delta = Rational::from(&factor * &a[col][c]);
                a[r][c] -= delta;
            }
        }
    }
    det
}

/// Inverse by Gauss–Jordan elimination.
pub fn inverse(m: &[Vec<Rational>]) -> Result<RatMatrix> {
    let n = m.len();
    let mut a = m.to_vec();
    let mut inv: RatMatrix = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| Rational::from(u32::from(i == j)))
                .collect()
        })
        .collect();
    for col in 0..n {
        let pivot = (col..n)
            .find(|&r| a[r][col] != 0)
            .ok_or(SolverError::SingularMatrix("matrix inverse"))?;
        a.swap(pivot, col);
        inv.swap(pivot, col);
        let scale = Rational::from(1) / a[col][col].clone();
        for c in 0..n {
            a[col][c] *= &scale;
            inv[col][c] *= &scale;
        }
        for r in 0..n {
            if r == col || a[r][col] == 0 {
                continue;
            }
            let factor = a[r][col].clone();
            for c in 0..n {
                let da = Rational::from(&factor * &a[col][c]);
                a[r][c] -= da;
                let di = Rational::from(&factor * &inv[col][c]);
                inv[r][c] -= di;
            }
        }
    }
    Ok(inv)
}

fn dot(a: &[Rational], b: &[Rational]) -> Rational {
    a.iter()
        .zip(b)
        .fold(Rational::new(), |acc, (x, y)| acc + Rational::from(x * y))
}

/// Gram–Schmidt coefficients `μ` and squared norms `|b*_i|²`.
fn gram_schmidt(basis: &[Vec<Integer>]) -> Result<(RatMatrix, Vec<Rational>)> {
    let n = basis.len();
    let rows = to_rational(basis);
    let mut star: RatMatrix = Vec::with_capacity(n);
    let mut mu = vec![vec![Rational::new(); n]; n];
    let mut norms: Vec<Rational> = Vec::with_capacity(n);
    for i in 0..n {
        let mut v = rows[i].clone();
        for j in 0..i {
            mu[i][j] = dot(&rows[i], &star[j]) / norms[j].clone();
            for (c, s) in v.iter_mut().zip(&star[j]) {
                *c -= Rational::from(&mu[i][j] * s);
            }
        }
        let norm = dot(&v, &v);
        if norm == 0 {
            return Err(SolverError::SingularMatrix("LLL basis"));
        }
        norms.push(norm);
        star.push(v);
    }
    Ok((mu, norms))
}

/// LLL-reduce the rows of `basis` (δ = 3/4). Rows must be independent.
pub fn lll_reduce(basis: &[Vec<Integer>]) -> Result<IntMatrix> {
    let n = basis.len();
    let mut b = basis.to_vec();
    if n < 2 {
        return Ok(b);
    }
    let delta = Rational::from((3, 4));
    let (mut mu, mut norms) = gram_schmidt(&b)?;
    let mut k = 1;
    while k < n {
        for j in (0..k).rev() {
            let q = round_rational(&mu[k][j]);
            if q == 0 {
                continue;
            }
            let (head, tail) = b.split_at_mut(k);
            for (x, y) in tail[0].iter_mut().zip(&head[j]) {
                *x -= Integer::from(&q * y);
            }
            let qr = Rational::from(q);
            for i in 0..j {
                let d = Rational::from(&qr * &mu[j][i]);
                mu[k][i] -= d;
            }
            mu[k][j] -= &qr;
        }
        let mu_sq = Rational::from(mu[k][k - 1].square_ref());
        let bound = Rational::from(&delta - &mu_sq) * &norms[k - 1];
        if norms[k] >= bound {
            k += 1;
        } else {
            b.swap(k, k - 1);
            (mu, norms) = gram_schmidt(&b)?;
            k = (k - 1).max(1);
        }
    }
    Ok(b)
}

/// Certified lower bound on the squared distance from `target` to the
/// lattice spanned by the rows of `basis` (zero target: on the squared length
/// of the shortest nonzero vector).
pub fn minimal_vector(basis: &[Vec<Integer>], target: &[Integer]) -> Result<Rational> {
    let n = target.len();
    if n == 0 || basis.len() != n || basis.iter().any(|r| r.len() != n) {
        return Err(SolverError::SingularMatrix("minimal_vector dimensions"));
    }
    if determinant(&to_rational(basis)) == 0 {
        return Err(SolverError::SingularMatrix("minimal_vector"));
    }
    let reduced = lll_reduce(basis)?;
    let inv = inverse(&to_rational(&reduced))?;

    let mut sigma: Option<Rational> = None;
    for j in 0..n {
        let s = target
            .iter()
            .enumerate()
            .fold(Rational::new(), |acc, (i, y)| {
                acc + Rational::from(y.clone()) * &inv[i][j]
            });
        let frac = Rational::from(&s - Rational::from(round_rational(&s))).abs();
        if frac != 0 {
            sigma = Some(frac);
        }
    }

    let b1_sq = reduced[0]
        .iter()
        .fold(Integer::new(), |acc, x| acc + Integer::from(x.square_ref()));
    let scale = Rational::from(Integer::from(1) << (n as u32 - 1));
    let base = Rational::from(b1_sq) / scale;
    Ok(match sigma {
        Some(s) => base * Rational::from(s.square_ref()),
        None => base,
    })
}
