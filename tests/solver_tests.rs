//! End-to-end solver tests.
//!
//! Each test builds an S-unit group from known generators, runs the whole
//! pipeline (bounds, reduction, sieve, verification) and compares the
//! solution set against the classical answer.
//!
//! # How to run
//!
//! ```bash
//! cargo test --release --test solver_tests
//! ```

use rug::Rational;
use sunit::places::{prime_above_root, primes_above};
use sunit::unit_group::rational_torsion;
use sunit::{solve_s_unit_equation, FieldElement, NumberField, Solution, Solver, SolverConfig, SUnitGroup};

fn rationals_with(primes: &[u64], units: &[i64]) -> SUnitGroup {
    let q = NumberField::rationals();
    let mut s = Vec::new();
    for &p in primes {
        s.extend(primes_above(&q, p).unwrap());
    }
    let (minus_one, w0) = rational_torsion(&q);
    let gens = units.iter().map(|&u| q.from_integer(u)).collect();
    SUnitGroup::new(q, s, minus_one, w0, gens).unwrap()
}

/// `Q(ξ)`, `ξ² + ξ + 1 = 0`, with `S` the prime above 3.
fn eisenstein() -> SUnitGroup {
    let k = NumberField::new(vec![1.into(), 1.into(), 1.into()], "xi").unwrap();
    let s = primes_above(&k, 3).unwrap();
    let zeta = k.element(vec![Rational::from(1), Rational::from(1)]).unwrap();
    let sqrt_minus_3 = k.element(vec![Rational::from(-1), Rational::from(-2)]).unwrap();
    SUnitGroup::new(k, s, zeta, 6, vec![sqrt_minus_3]).unwrap()
}

/// `Q(φ)`, `φ² = φ + 1`, with `S` empty: units `−1` and `φ`.
fn golden() -> SUnitGroup {
    let k = NumberField::new(vec![(-1).into(), (-1).into(), 1.into()], "phi").unwrap();
    let (minus_one, w0) = rational_torsion(&k);
    let phi = k.generator();
    SUnitGroup::new(k, Vec::new(), minus_one, w0, vec![phi]).unwrap()
}

/// `Q(ξ)` with `S` = the prime above 3 and the split prime `(7, ξ − 2)`.
fn eisenstein_with_seven() -> SUnitGroup {
    let k = NumberField::new(vec![1.into(), 1.into(), 1.into()], "xi").unwrap();
    let mut s = primes_above(&k, 3).unwrap();
    s.push(prime_above_root(&k, 7, 2).unwrap());
    let zeta = k.element(vec![Rational::from(1), Rational::from(1)]).unwrap();
    let sqrt_minus_3 = k.element(vec![Rational::from(-1), Rational::from(-2)]).unwrap();
    // 2 − ξ has norm 7 and vanishes at ξ = 2 mod 7.
    let seven = k.element(vec![Rational::from(2), Rational::from(-1)]).unwrap();
    SUnitGroup::new(k, s, zeta, 6, vec![sqrt_minus_3, seven]).unwrap()
}

fn element(field: &NumberField, coords: &[(i32, u32)]) -> FieldElement {
    field
        .element(coords.iter().map(|&(n, d)| Rational::from((n, d))).collect())
        .unwrap()
}

/// Solutions as sorted unordered pairs, for order-free comparison.
fn classes(solutions: &[Solution]) -> Vec<(FieldElement, FieldElement)> {
    let mut out: Vec<_> = solutions
        .iter()
        .map(|s| {
            if s.x <= s.y {
                (s.x.clone(), s.y.clone())
            } else {
                (s.y.clone(), s.x.clone())
            }
        })
        .collect();
    out.sort();
    out
}

fn expected(pairs: Vec<(FieldElement, FieldElement)>) -> Vec<(FieldElement, FieldElement)> {
    let mut out: Vec<_> = pairs
        .into_iter()
        .map(|(x, y)| if x <= y { (x, y) } else { (y, x) })
        .collect();
    out.sort();
    out
}

#[test]
fn rationals_with_two() {
    let g = rationals_with(&[2], &[2]);
    let q = g.field().clone();
    let sols = solve_s_unit_equation(&g, None).unwrap();
    let want = expected(vec![
        (q.from_integer(2), q.from_integer(-1)),
        (element(&q, &[(1, 2)]), element(&q, &[(1, 2)])),
    ]);
    assert_eq!(classes(&sols), want);
}

#[test]
fn eisenstein_field_has_four_classes() {
    let g = eisenstein();
    let k = g.field().clone();
    let sols = solve_s_unit_equation(&g, None).unwrap();
    let want = expected(vec![
        (element(&k, &[(2, 1), (1, 1)]), element(&k, &[(-1, 1), (-1, 1)])),
        (element(&k, &[(2, 3), (1, 3)]), element(&k, &[(1, 3), (-1, 3)])),
        (element(&k, &[(0, 1), (-1, 1)]), element(&k, &[(1, 1), (1, 1)])),
        (element(&k, &[(1, 1), (-1, 1)]), element(&k, &[(0, 1), (1, 1)])),
    ]);
    assert_eq!(classes(&sols), want);
}

#[test]
fn every_solution_reproduces_from_exponents() {
    let g = eisenstein();
    let one = g.field().one();
    for s in solve_s_unit_equation(&g, None).unwrap() {
        assert_eq!(g.exp(&s.exponents).unwrap(), s.x);
        assert_eq!(g.exp(&s.complement).unwrap(), s.y);
        assert_eq!(&s.x + &s.y, one);
    }
}

#[test]
fn certificate_verifies_and_roundtrips() {
    let g = rationals_with(&[2], &[2]);
    let cert = Solver::new(SolverConfig::default()).solve(&g).unwrap();
    assert_eq!(cert.solutions.len(), 2);
    assert!(!cert.split_primes.is_empty());
    assert_eq!(cert.dictionaries.len(), cert.split_primes.len());
    assert!(cert.systems >= cert.solutions.len());
    cert.verify(&g).unwrap();

    let back = sunit::SolveCertificate::from_json(&cert.to_json().unwrap()).unwrap();
    assert_eq!(back, cert);
}

#[test]
fn rationals_with_two_and_three_contain_classics() {
    let g = rationals_with(&[2, 3], &[2, 3]);
    let q = g.field().clone();
    let sols = solve_s_unit_equation(&g, None).unwrap();
    let found = classes(&sols);
    for (a, b) in [
        (q.from_integer(3), q.from_integer(-2)),
        (q.from_integer(4), q.from_integer(-3)),
        (q.from_integer(9), q.from_integer(-8)),
        (element(&q, &[(1, 4)]), element(&q, &[(3, 4)])),
        (element(&q, &[(9, 8)]), element(&q, &[(-1, 8)])),
    ] {
        let pair = if a <= b { (a, b) } else { (b, a) };
        assert!(found.contains(&pair), "missing {pair:?}");
    }
    let one = q.one();
    assert!(sols.iter().all(|s| &s.x + &s.y == one));
}

#[test]
fn higher_starting_precision_gives_same_answer() {
    let g = eisenstein();
    let base = classes(&solve_s_unit_equation(&g, None).unwrap());
    let high = classes(&solve_s_unit_equation(&g, Some(256)).unwrap());
    assert_eq!(base, high);
}

#[test]
fn golden_ratio_field_has_the_exceptional_units() {
    let g = golden();
    let k = g.field().clone();
    let sols = solve_s_unit_equation(&g, None).unwrap();
    let want = expected(vec![
        (element(&k, &[(0, 1), (1, 1)]), element(&k, &[(1, 1), (-1, 1)])),
        (element(&k, &[(-1, 1), (1, 1)]), element(&k, &[(2, 1), (-1, 1)])),
        (element(&k, &[(0, 1), (-1, 1)]), element(&k, &[(1, 1), (1, 1)])),
    ]);
    assert_eq!(classes(&sols), want);
    for s in &sols {
        assert_eq!(g.exp(&s.exponents).unwrap(), s.x);
        assert_eq!(g.exp(&s.complement).unwrap(), s.y);
    }
}

#[test]
fn split_prime_in_s_keeps_smaller_solutions() {
    let small = classes(&solve_s_unit_equation(&eisenstein(), None).unwrap());
    let g = eisenstein_with_seven();
    let k = g.field().clone();
    let sols = solve_s_unit_equation(&g, None).unwrap();
    let found = classes(&sols);
    for pair in &small {
        assert!(found.contains(pair), "missing {pair:?}");
    }
    let (a, b) = (element(&k, &[(2, 1), (-1, 1)]), element(&k, &[(-1, 1), (1, 1)]));
    let pair = if a <= b { (a, b) } else { (b, a) };
    assert!(found.contains(&pair), "missing {pair:?}");
    assert!(found.len() > small.len());

    let one = k.one();
    for s in &sols {
        assert_eq!(&s.x + &s.y, one);
        assert_eq!(g.exp(&s.exponents).unwrap(), s.x);
    }
}
