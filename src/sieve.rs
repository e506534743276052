//! # Sieve — Split Primes and Complement Dictionaries
//!
//! Enumerates S-unit exponent vectors modulo auxiliary primes. For a rational
//! prime `q` that splits completely in `K` (the defining polynomial has `d`
//! distinct roots `r_1..r_d` mod `q`), each prime `(q, θ − r_i)` gives a
//! reduction map `O_K → GF(q)`. An exponent vector `a = (a_0, …, a_t)`, read
//! modulo `(w0, q−1, …, q−1)`, maps to its *residue-field vector*
//! `(ε_1(a), …, ε_d(a))` with `ε_i(a) = ∏ ρ_j(r_i)^{a_j} mod q`.
//!
//! If `x + y = 1` with S-units `x, y`, then at every prime above `q` the
//! residues satisfy `ε(x) + ε(y) ≡ 1`, and neither residue is `0` (S-units are
//! `q`-units) nor `1` (the other would vanish). Writing residues in
//! `{2, …, q−1}`, the complement of `r` is `q + 1 − r`. The **complement
//! dictionary** `comp[q]` maps each surviving exponent vector to the exponent
//! vectors whose residue-field vector is its complement.
//!
//! ## Pipeline
//!
//! 1. [`split_primes_large_lcm`] picks primes until `lcm(q − 1) ≥ 2M + 1`, so
//!    that a compatible system of residues lifts to at most one integer vector
//!    with entries bounded by `M`.
//! 2. [`sieve_ordering`] orders the `d` residue maps by the product of the
//!    multiplicative orders of the generator images.
//! 3. The first prime enumerates the whole box; later primes enumerate only
//!    vectors compatible with the first prime's surviving keys.
//! 4. [`construct_rfv_to_ev`] inverts the map coordinate by coordinate,
//!    discarding any prefix whose complement prefix has no representative.
//! 5. [`cross_filter`] prunes every pair of dictionaries against each other
//!    until neither changes.
//!
//! Modular helpers (`generate_primes`, `pow_mod`, `multiplicative_order`,
//! `factor_u64`) work on machine words; residues never exceed `u64`. Per-prime
//! residue data and residue-field vectors are computed on the rayon pool.
//!
//! ## References
//!
//! - N.P. Smart, "The Algorithmic Resolution of Diophantine Equations",
//!   LMS Student Texts 41 (1998), Chapter VI.
//! - A. Alvarado, A. Koutsianas, B. Malmskog, C. Rasmussen, C. Vincent,
//!   M. West, "A robust implementation for solving the S-unit equation and
//!   several applications", arXiv:1903.00977 (2019).

use crate::error::{Result, SolverError};
use crate::places::ResidueMap;
use crate::unit_group::SUnitGroup;
use rayon::prelude::*;
use rug::Integer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Exponent vector reduced into a sieve box: coordinate 0 modulo `w0`, the
/// rest modulo `q − 1`.
pub type ExpVec = Vec<u64>;

/// `comp[q]`: exponent vector → complementary exponent vectors.
pub type CompDict = BTreeMap<ExpVec, Vec<ExpVec>>;

// ── Prime Generation and Modular Arithmetic ─────────────────────

/// All primes `≤ limit` by an odd-only sieve of Eratosthenes.
pub fn generate_primes(limit: u64) -> Vec<u64> {
    if limit < 2 {
        return Vec::new();
    }
    // Index i stands for the odd number 2i + 1.
    let half = (limit as usize - 1) / 2 + 1;
    let mut composite = vec![false; half];
    let mut primes = vec![2];
    let mut i = 1;
    while i < half {
        if !composite[i] {
            let p = 2 * i + 1;
            primes.push(p as u64);
            let mut m = p * p / 2;
            while m < half {
                composite[m] = true;
                m += p;
            }
        }
        i += 1;
    }
    primes
}

/// `base^exp mod modulus` with u128 intermediates.
pub fn pow_mod(base: u64, mut exp: u64, modulus: u64) -> u64 {
    if modulus == 1 {
        return 0;
    }
    let m = modulus as u128;
    let mut b = base as u128 % m;
    let mut acc: u128 = 1;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc * b % m;
        }
        b = b * b % m;
        exp >>= 1;
    }
    acc as u64
}

pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Trial-division factorisation into `(prime, exponent)` pairs.
pub fn factor_u64(mut n: u64) -> Vec<(u64, u32)> {
    let mut factors = Vec::new();
    let mut d = 2u64;
    while d.saturating_mul(d) <= n {
        if n % d == 0 {
            let mut e = 0;
            while n % d == 0 {
                n /= d;
                e += 1;
            }
            factors.push((d, e));
        }
        d += if d == 2 { 1 } else { 2 };
    }
    if n > 1 {
        factors.push((n, 1));
    }
    factors
}

/// All positive divisors of `n`, ascending.
pub fn divisors(n: u64) -> Vec<u64> {
    let mut out = vec![1u64];
    for (p, e) in factor_u64(n) {
        let len = out.len();
        let mut pk = 1u64;
        for _ in 0..e {
            pk *= p;
            for i in 0..len {
                out.push(out[i] * pk);
            }
        }
    }
    out.sort_unstable();
    out
}

/// Multiplicative order of `base` modulo the prime `p` (`base ≢ 0`).
pub fn multiplicative_order(base: u64, p: u64) -> u64 {
    let mut order = p - 1;
    for (ell, _) in factor_u64(p - 1) {
        while order % ell == 0 && pow_mod(base, order / ell, p) == 1 {
            order /= ell;
        }
    }
    order
}

// ── Split Primes ────────────────────────────────────────────────

/// Rational primes below `bound` over which the defining polynomial has `d`
/// distinct roots. Primes below `S` are not excluded here.
pub fn completely_split_primes(group: &SUnitGroup, bound: u64) -> Vec<u64> {
    let field = group.field();
    let d = field.degree();
    generate_primes(bound.saturating_sub(1))
        .into_iter()
        .filter(|&q| field.polynomial().roots_mod(q).len() == d)
        .collect()
}

/// Split primes, none below `S`, whose `lcm(q − 1)` reaches `2·bound + 1`.
///
/// The search runs over primes below `factor·bound + 4` and always keeps at
/// least one prime, so a zero bound still sieves the torsion solutions.
pub fn split_primes_large_lcm(group: &SUnitGroup, bound: &Integer, factor: u64) -> Result<Vec<u64>> {
    let limit = bound
        .to_u64()
        .and_then(|m| m.checked_mul(factor))
        .and_then(|m| m.checked_add(4))
        .ok_or_else(|| SolverError::InsufficientSplitPrimes {
            bound: bound.to_string(),
            limit: u64::MAX,
        })?;
    let below_s = group.primes_below();
    let target = Integer::from(bound * 2u32) + 1u32;
    let mut chosen = Vec::new();
    let mut l = Integer::from(1);
    for q in completely_split_primes(group, limit) {
        if l >= target && !chosen.is_empty() {
            break;
        }
        if below_s.contains(&q) {
            continue;
        }
        l.lcm_mut(&Integer::from(q - 1));
        chosen.push(q);
    }
    if l < target || chosen.is_empty() {
        return Err(SolverError::InsufficientSplitPrimes {
            bound: bound.to_string(),
            limit,
        });
    }
    Ok(chosen)
}

/// Residue data of the generators at one split prime.
#[derive(Clone, Debug)]
pub struct PrimeData {
    pub q: u64,
    /// Reduction maps, one per prime above `q`, in sieve order.
    pub maps: Vec<ResidueMap>,
    /// `images[i][j]`: generator `ρ_j` reduced by `maps[i]`.
    pub images: Vec<Vec<u64>>,
    /// `orders[i]`: product of the multiplicative orders of `images[i]`.
    pub orders: Vec<u128>,
}

impl PrimeData {
    /// Residue-field vector of `a`.
    pub fn residue_vector(&self, a: &[u64]) -> Vec<u64> {
        self.images
            .iter()
            .map(|row| {
                row.iter().zip(a).fold(1u64, |acc, (&g, &e)| {
                    ((acc as u128 * pow_mod(g, e, self.q) as u128) % self.q as u128) as u64
                })
            })
            .collect()
    }
}

/// The `d` primes above the split prime `q`, ordered by ascending product of
/// generator-image orders (ties by root).
pub fn sieve_ordering(group: &SUnitGroup, q: u64) -> Result<PrimeData> {
    let field = group.field();
    let d = field.degree();
    if group.primes_below().contains(&q) {
        return Err(SolverError::UnsupportedPrime {
            p: q,
            reason: "a prime of S lies above this sieve prime".into(),
        });
    }
    let roots = field.polynomial().roots_mod(q);
    if roots.len() != d {
        return Err(SolverError::UnsupportedPrime {
            p: q,
            reason: format!("not completely split ({} of {d} roots)", roots.len()),
        });
    }
    let gens = group.gens();
    let mut rows = Vec::with_capacity(d);
    for root in roots {
        let map = ResidueMap { q, root };
        let mut images = Vec::with_capacity(gens.len());
        for g in &gens {
            let r = map.reduce(g)?;
            if r == 0 {
                return Err(SolverError::Verification(format!(
                    "generator vanishes modulo a prime above {q}"
                )));
            }
            images.push(r);
        }
        let order = images
            .iter()
            .fold(1u128, |acc, &g| acc.saturating_mul(multiplicative_order(g, q) as u128));
        rows.push((order, map, images));
    }
    rows.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.root.cmp(&b.1.root)));
    let mut data = PrimeData {
        q,
        maps: Vec::with_capacity(d),
        images: Vec::with_capacity(d),
        orders: Vec::with_capacity(d),
    };
    for (order, map, images) in rows {
        data.orders.push(order);
        data.maps.push(map);
        data.images.push(images);
    }
    Ok(data)
}

// ── Lifts and Compatibility ─────────────────────────────────────

/// Integers `x ≡ r (mod m)` with `|x| ≤ bound`: nonnegative lifts ascending,
/// then negative lifts descending.
pub fn bounded_integer_lifts(r: i64, m: i64, bound: i64) -> Vec<i64> {
    let r0 = r.rem_euclid(m);
    let mut lifts = Vec::new();
    let mut up = r0;
    while up <= bound {
        lifts.push(up);
        up += m;
    }
    let mut down = r0 - m;
    while down >= -bound {
        lifts.push(down);
        down -= m;
    }
    lifts
}

/// Integer vectors agreeing with `v` exactly in coordinate 0 and modulo `m`
/// elsewhere, with those coordinates bounded by `bound`.
pub fn bounded_vector_lifts(v: &[i64], m: i64, bound: i64) -> Vec<Vec<i64>> {
    let Some((&first, rest)) = v.split_first() else {
        return vec![Vec::new()];
    };
    let mut out = vec![vec![first]];
    for &entry in rest {
        let lifts = bounded_integer_lifts(entry, m, bound);
        out = out
            .into_iter()
            .flat_map(|prefix| {
                lifts.iter().map(move |&x| {
                    let mut next = prefix.clone();
                    next.push(x);
                    next
                })
            })
            .collect();
    }
    out
}

/// Classes `b mod m1` for which `x ≡ a (mod m0)`, `x ≡ b (mod m1)` is solvable.
pub fn compatible_classes(a: u64, m0: u64, m1: u64) -> Vec<u64> {
    let g = gcd(m0, m1);
    let a0 = a % g;
    (0..m1 / g).map(|k| a0 + k * g).collect()
}

/// Exponent vectors modulo `m1` compatible with `a` modulo `m0`.
pub fn compatible_vectors(a: &[u64], m0: u64, m1: u64) -> Vec<ExpVec> {
    let Some((&first, rest)) = a.split_first() else {
        return vec![Vec::new()];
    };
    let mut out = vec![vec![first]];
    for &entry in rest {
        let classes = compatible_classes(entry, m0, m1);
        out = out
            .into_iter()
            .flat_map(|prefix| {
                classes.iter().map(move |&b| {
                    let mut next = prefix.clone();
                    next.push(b);
                    next
                })
            })
            .collect();
    }
    out
}

/// Whether `a0 mod m0` and `a1 mod m1` lift to a common integer vector.
pub fn compatible_vectors_check(a0: &[u64], a1: &[u64], m0: u64, m1: u64) -> bool {
    if a0.len() != a1.len() || a0.first() != a1.first() {
        return false;
    }
    let g = gcd(m0, m1);
    a0.iter()
        .zip(a1)
        .skip(1)
        .all(|(&x, &y)| x % g == y % g)
}

// ── Dictionaries ────────────────────────────────────────────────

fn complement(prefix: &[u64], q: u64) -> Vec<u64> {
    prefix.iter().map(|&r| q + 1 - r).collect()
}

/// Residue-field vector → exponent vectors, keeping only vectors whose every
/// prefix has a represented complement prefix.
pub fn construct_rfv_to_ev(
    ev_to_rfv: &BTreeMap<ExpVec, Vec<u64>>,
    q: u64,
    d: usize,
) -> BTreeMap<Vec<u64>, Vec<ExpVec>> {
    let mut buckets: BTreeMap<Vec<u64>, Vec<&ExpVec>> = BTreeMap::new();
    for (ev, rfv) in ev_to_rfv {
        buckets.entry(vec![rfv[0]]).or_default().push(ev);
    }
    for len in 1..=d {
        if len > 1 {
            let mut refined: BTreeMap<Vec<u64>, Vec<&ExpVec>> = BTreeMap::new();
            for (prefix, evs) in buckets {
                for ev in evs {
                    let mut key = prefix.clone();
                    key.push(ev_to_rfv[ev][len - 1]);
                    refined.entry(key).or_default().push(ev);
                }
            }
            buckets = refined;
        }
        let dead: Vec<Vec<u64>> = buckets
            .keys()
            .filter(|prefix| !buckets.contains_key(&complement(prefix, q)))
            .cloned()
            .collect();
        for prefix in dead {
            buckets.remove(&prefix);
        }
        debug!(q, prefix_len = len, keys = buckets.len(), "Refined residue-vector buckets");
    }
    buckets
        .into_iter()
        .map(|(rfv, evs)| (rfv, evs.into_iter().cloned().collect()))
        .collect()
}

/// `comp[q]` from the inverted map. Vectors without complements are omitted.
pub fn construct_comp_exp_vec(rfv_to_ev: &BTreeMap<Vec<u64>, Vec<ExpVec>>, q: u64) -> CompDict {
    let mut comp = CompDict::new();
    for (rfv, evs) in rfv_to_ev {
        let Some(partners) = rfv_to_ev.get(&complement(rfv, q)) else {
            continue;
        };
        if partners.is_empty() {
            continue;
        }
        for ev in evs {
            comp.insert(ev.clone(), partners.clone());
        }
    }
    comp
}

/// True when `ev ∈ comp[p]` has no compatible key in `comp[q]` whose
/// complements are compatible with one of `ev`'s complements.
pub fn drop_vector(ev: &[u64], p: u64, q: u64, comp_p: &CompDict, comp_q: &CompDict) -> bool {
    let Some(ev_complements) = comp_p.get(ev) else {
        return true;
    };
    for candidate in compatible_vectors(ev, p - 1, q - 1) {
        let Some(candidate_complements) = comp_q.get(&candidate) else {
            continue;
        };
        for ev_comp in ev_complements {
            if compatible_vectors(ev_comp, p - 1, q - 1)
                .iter()
                .any(|cv| candidate_complements.contains(cv))
            {
                return false;
            }
        }
    }
    true
}

/// Remove `dead` keys, strip them from complement lists, and drop keys left
/// without complements. Returns the number of keys removed.
fn sweep(dict: &mut CompDict, dead: &BTreeSet<ExpVec>) -> usize {
    let before = dict.len();
    if dead.is_empty() {
        return 0;
    }
    dict.retain(|ev, _| !dead.contains(ev));
    for partners in dict.values_mut() {
        partners.retain(|w| !dead.contains(w));
    }
    // Cascade: a key whose complements all vanished is itself dead.
    loop {
        let empty: BTreeSet<ExpVec> = dict
            .iter()
            .filter(|(_, partners)| partners.is_empty())
            .map(|(ev, _)| ev.clone())
            .collect();
        if empty.is_empty() {
            break;
        }
        dict.retain(|ev, _| !empty.contains(ev));
        for partners in dict.values_mut() {
            partners.retain(|w| !empty.contains(w));
        }
    }
    before - dict.len()
}

/// Prune `comp[p]` against `comp[q]` and back until neither changes.
pub fn cross_filter(p: u64, q: u64, comps: &mut BTreeMap<u64, CompDict>) -> usize {
    let mut removed = 0;
    loop {
        let mut changed = 0;
        for (a, b) in [(p, q), (q, p)] {
            let (Some(dict_a), Some(dict_b)) = (comps.get(&a), comps.get(&b)) else {
                return removed;
            };
            let dead: BTreeSet<ExpVec> = dict_a
                .keys()
                .filter(|ev| drop_vector(ev, a, b, dict_a, dict_b))
                .cloned()
                .collect();
            if let Some(dict_a) = comps.get_mut(&a) {
                changed += sweep(dict_a, &dead);
            }
        }
        removed += changed;
        if changed == 0 {
            return removed;
        }
    }
}

/// Per-prime sizes recorded while the dictionaries are built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DictionaryStats {
    pub q: u64,
    pub enumerated: usize,
    pub after_cleaning: usize,
    pub keys_built: usize,
    pub keys_final: usize,
}

/// Final complement dictionaries plus their construction statistics.
#[derive(Clone, Debug)]
pub struct SieveOutput {
    pub primes: Vec<u64>,
    pub dictionaries: BTreeMap<u64, CompDict>,
    pub stats: Vec<DictionaryStats>,
}

/// Builds `comp[q]` for every chosen split prime.
pub struct PrimeSieveBuilder<'a> {
    group: &'a SUnitGroup,
    data: Vec<PrimeData>,
}

impl<'a> PrimeSieveBuilder<'a> {
    pub fn new(group: &'a SUnitGroup, primes: &[u64]) -> Result<Self> {
        let data = primes
            .par_iter()
            .map(|&q| sieve_ordering(group, q))
            .collect::<Result<Vec<_>>>()?;
        Ok(PrimeSieveBuilder { group, data })
    }

    /// Every vector of the box `[0, w0) × [0, q−1)^t`.
    fn full_box(&self, q: u64) -> Vec<ExpVec> {
        let w0 = self.group.zeta_order();
        let t = self.group.rank();
        let mut out = Vec::new();
        let mut current = vec![0u64; t + 1];
        loop {
            out.push(current.clone());
            let mut i = t + 1;
            loop {
                if i == 0 {
                    return out;
                }
                i -= 1;
                let modulus = if i == 0 { w0 } else { q - 1 };
                current[i] += 1;
                if current[i] < modulus {
                    break;
                }
                current[i] = 0;
            }
        }
    }

    pub fn build(&self) -> Result<SieveOutput> {
        let d = self.group.field().degree();
        let mut comps: BTreeMap<u64, CompDict> = BTreeMap::new();
        let mut stats: Vec<DictionaryStats> = Vec::new();
        let Some(first) = self.data.first() else {
            return Err(SolverError::InsufficientSplitPrimes {
                bound: "0".into(),
                limit: 0,
            });
        };
        let q0 = first.q;

        for data in &self.data {
            let q = data.q;
            let candidates: Vec<ExpVec> = if q == q0 {
                self.full_box(q)
            } else {
                let mut set = BTreeSet::new();
                if let Some(base) = comps.get(&q0) {
                    for ev in base.keys() {
                        set.extend(compatible_vectors(ev, q0 - 1, q - 1));
                    }
                }
                set.into_iter().collect()
            };
            let enumerated = candidates.len();
            let ev_to_rfv: BTreeMap<ExpVec, Vec<u64>> = candidates
                .into_par_iter()
                .map(|ev| {
                    let rfv = data.residue_vector(&ev);
                    (ev, rfv)
                })
                .filter(|(_, rfv)| !rfv.contains(&1))
                .collect();
            let after_cleaning = ev_to_rfv.len();
            debug!(q, enumerated, after_cleaning, "Residue-field vectors computed");

            let rfv_to_ev = construct_rfv_to_ev(&ev_to_rfv, q, d);
            let comp = construct_comp_exp_vec(&rfv_to_ev, q);
            let keys_built = comp.len();
            debug!(q, keys = keys_built, "Complement dictionary built");
            comps.insert(q, comp);
            stats.push(DictionaryStats {
                q,
                enumerated,
                after_cleaning,
                keys_built,
                keys_final: 0,
            });

            let earlier: Vec<u64> = comps.keys().copied().filter(|&p| p != q).collect();
            for p in earlier {
                let before_p = comps.get(&p).map_or(0, BTreeMap::len);
                let before_q = comps.get(&q).map_or(0, BTreeMap::len);
                let removed = cross_filter(p, q, &mut comps);
                debug!(
                    p,
                    q,
                    removed,
                    size_p = before_p,
                    size_q = before_q,
                    "Cross-filtered dictionaries"
                );
            }
        }

        for entry in stats.iter_mut() {
            entry.keys_final = comps.get(&entry.q).map_or(0, BTreeMap::len);
        }
        Ok(SieveOutput {
            primes: self.data.iter().map(|d| d.q).collect(),
            dictionaries: comps,
            stats,
        })
    }
}
