//! # Systems — Cross-Prime Combination, Lifting and Verification
//!
//! A *compatible system* picks one `(exponent vector, complement)` pair from
//! every complement dictionary such that all chosen vectors could be
//! reductions of one integer vector: coordinate 0 equal everywhere, the other
//! coordinates congruent modulo `gcd(q_i − 1, q_j − 1)` for every pair of
//! primes. Both slots of the pair are checked.
//!
//! Because `lcm(q − 1) ≥ 2M + 1`, each system lifts by CRT to exactly one
//! integer vector with free coordinates in `(−L/2, L/2]`. Lifts outside the
//! bound `M` are discarded; survivors are evaluated exactly and kept when
//! `x + y = 1`. `(x, y)` and `(y, x)` are reported once.

use crate::error::{Result, SolverError};
use crate::field::FieldElement;
use crate::sieve::{compatible_vectors_check, CompDict, ExpVec};
use crate::unit_group::SUnitGroup;
use rayon::prelude::*;
use rug::ops::RemRounding;
use rug::Integer;
use std::collections::BTreeMap;
use tracing::debug;

/// One `(exponent vector, complement)` pair per split prime, in prime order.
pub type CompatibleSystem = Vec<(ExpVec, ExpVec)>;

/// A verified solution `x + y = 1` with `x = exp(exponents)`,
/// `y = exp(complement)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    pub exponents: Vec<i64>,
    pub complement: Vec<i64>,
    pub x: FieldElement,
    pub y: FieldElement,
}

impl Solution {
    pub fn swapped(&self) -> Solution {
        Solution {
            exponents: self.complement.clone(),
            complement: self.exponents.clone(),
            x: self.y.clone(),
            y: self.x.clone(),
        }
    }
}

fn fits(entry: &(ExpVec, ExpVec), other: &(ExpVec, ExpVec), m0: u64, m1: u64) -> bool {
    compatible_vectors_check(&entry.0, &other.0, m0, m1)
        && compatible_vectors_check(&entry.1, &other.1, m0, m1)
}

/// Every compatible system across `primes`, by depth-first extension.
pub fn compatible_systems(primes: &[u64], comps: &BTreeMap<u64, CompDict>) -> Vec<CompatibleSystem> {
    let mut out = Vec::new();
    if primes.is_empty() {
        return out;
    }
    let pairs: Vec<Vec<(ExpVec, ExpVec)>> = primes
        .iter()
        .map(|q| {
            comps
                .get(q)
                .map(|comp| {
                    comp.iter()
                        .flat_map(|(ev, cvs)| cvs.iter().map(move |cv| (ev.clone(), cv.clone())))
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect();

    let mut stack: Vec<CompatibleSystem> = pairs[0].iter().rev().map(|p| vec![p.clone()]).collect();
    while let Some(partial) = stack.pop() {
        let depth = partial.len();
        if depth == primes.len() {
            out.push(partial);
            continue;
        }
        let m1 = primes[depth] - 1;
        for candidate in pairs[depth].iter().rev() {
            let ok = partial
                .iter()
                .zip(primes)
                .all(|(entry, &p)| fits(candidate, entry, m1, p - 1));
            if ok {
                let mut next = partial.clone();
                next.push(candidate.clone());
                stack.push(next);
            }
        }
    }
    out
}

/// Combines `x ≡ r1 (mod m1)` and `x ≡ r2 (mod m2)` for arbitrary moduli.
fn crt_pair(r1: &Integer, m1: &Integer, r2: &Integer, m2: &Integer) -> Option<(Integer, Integer)> {
    let g = Integer::from(m1.gcd_ref(m2));
    let diff = Integer::from(r2 - r1);
    if !diff.is_divisible(&g) {
        return None;
    }
    let lcm = Integer::from(m1 / &g) * m2;
    let m1g = Integer::from(m1 / &g);
    let m2g = Integer::from(m2 / &g);
    let k = if m2g == 1 {
        Integer::new()
    } else {
        let inv = m1g.invert(&m2g).ok()?;
        (Integer::from(diff.div_exact_ref(&g)) * inv).rem_euc(&m2g)
    };
    let x = (Integer::from(m1 * &k) + r1).rem_euc(&lcm);
    Some((x, lcm))
}

/// Lifts one slot of a system: coordinate 0 copied, the rest by CRT into
/// `(−L/2, L/2]`.
fn lift_slot(vectors: &[&ExpVec], moduli: &[u64]) -> Result<Vec<Integer>> {
    let first = vectors
        .first()
        .ok_or_else(|| SolverError::Verification("empty compatible system".into()))?;
    let mut out = vec![Integer::from(first[0])];
    for i in 1..first.len() {
        let mut acc = (Integer::new(), Integer::from(1));
        for (v, &m) in vectors.iter().zip(moduli) {
            acc = crt_pair(&acc.0, &acc.1, &Integer::from(v[i]), &Integer::from(m))
                .ok_or_else(|| SolverError::Verification("incompatible residues in system".into()))?;
        }
        let (mut x, l) = acc;
        if Integer::from(&x * 2u32) > l {
            x -= &l;
        }
        out.push(x);
    }
    Ok(out)
}

/// Integer exponent vectors `(A, B)` reproducing every residue of the system.
pub fn compatible_system_lift(system: &CompatibleSystem, primes: &[u64]) -> Result<(Vec<Integer>, Vec<Integer>)> {
    if system.len() != primes.len() {
        return Err(SolverError::Verification(format!(
            "system has {} entries for {} primes",
            system.len(),
            primes.len()
        )));
    }
    let moduli: Vec<u64> = primes.iter().map(|q| q - 1).collect();
    let exps: Vec<&ExpVec> = system.iter().map(|(e, _)| e).collect();
    let comps: Vec<&ExpVec> = system.iter().map(|(_, c)| c).collect();
    Ok((lift_slot(&exps, &moduli)?, lift_slot(&comps, &moduli)?))
}

fn bounded(v: &[Integer], bound: &Integer) -> Option<Vec<i64>> {
    if v.iter().skip(1).any(|x| Integer::from(x.abs_ref()) > *bound) {
        return None;
    }
    v.iter().map(Integer::to_i64).collect()
}

enum Lifted {
    OutOfBound,
    Rejected,
    Verified(Solution),
}

fn lift_and_check(
    group: &SUnitGroup,
    one: &FieldElement,
    bound: &Integer,
    system: &CompatibleSystem,
    primes: &[u64],
) -> Result<Lifted> {
    let (a, b) = compatible_system_lift(system, primes)?;
    let (Some(exponents), Some(complement)) = (bounded(&a, bound), bounded(&b, bound)) else {
        return Ok(Lifted::OutOfBound);
    };
    let x = group.exp(&exponents)?;
    let y = group.exp(&complement)?;
    if &x + &y != *one {
        return Ok(Lifted::Rejected);
    }
    Ok(Lifted::Verified(Solution {
        exponents,
        complement,
        x,
        y,
    }))
}

/// Lifts every system, keeps those within `bound` that satisfy `x + y = 1`.
/// Systems are checked on the rayon pool; output keeps system order.
pub fn solutions_from_systems(
    group: &SUnitGroup,
    bound: &Integer,
    systems: &[CompatibleSystem],
    primes: &[u64],
) -> Result<Vec<Solution>> {
    let one = group.field().one();
    let lifted = systems
        .par_iter()
        .map(|system| lift_and_check(group, &one, bound, system, primes))
        .collect::<Result<Vec<_>>>()?;
    let mut out = Vec::new();
    let mut out_of_bound = 0usize;
    for l in lifted {
        match l {
            Lifted::OutOfBound => out_of_bound += 1,
            Lifted::Rejected => {}
            Lifted::Verified(s) => out.push(s),
        }
    }
    debug!(systems = systems.len(), out_of_bound, verified = out.len(), "Systems lifted");
    Ok(out)
}

/// Drops repeats and swapped duplicates, keeping first occurrences.
pub fn clean_sfs(solutions: Vec<Solution>) -> Vec<Solution> {
    let mut out: Vec<Solution> = Vec::new();
    for s in solutions {
        let swapped = s.swapped();
        let seen = out.iter().any(|k| {
            (k.exponents == s.exponents && k.complement == s.complement)
                || (k.exponents == swapped.exponents && k.complement == swapped.complement)
        });
        if !seen {
            out.push(s);
        }
    }
    out
}
