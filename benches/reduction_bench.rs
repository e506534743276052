use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rug::Integer;
use sunit::bounds::BoundEstimator;
use sunit::field::NumberField;
use sunit::lll::{lll_reduce, minimal_vector};
use sunit::places::primes_above;
use sunit::unit_group::rational_torsion;
use sunit::{SUnitGroup, Solver, SolverConfig};

fn rationals_two_three() -> SUnitGroup {
    let q = NumberField::rationals();
    let mut s = primes_above(&q, 2).unwrap();
    s.extend(primes_above(&q, 3).unwrap());
    let (minus_one, w0) = rational_torsion(&q);
    SUnitGroup::new(q.clone(), s, minus_one, w0, vec![q.from_integer(2), q.from_integer(3)]).unwrap()
}

fn lattice() -> Vec<Vec<Integer>> {
    [
        [1i64, 0, 0, 0],
        [0, 1, 0, 0],
        [0, 0, 1, 0],
        [1_000_003, 2_718_281, 3_141_592, 10_000_000_019],
    ]
    .iter()
    .map(|r| r.iter().map(|&x| Integer::from(x)).collect())
    .collect()
}

fn bench_lll_4x4(c: &mut Criterion) {
    let basis = lattice();
    c.bench_function("lll_reduce(4x4 knapsack)", |b| {
        b.iter(|| lll_reduce(black_box(&basis)).unwrap());
    });
}

fn bench_minimal_vector(c: &mut Criterion) {
    let basis = lattice();
    let target = vec![Integer::new(), Integer::new(), Integer::new(), Integer::from(12_345_678)];
    c.bench_function("minimal_vector(4x4, target)", |b| {
        b.iter(|| minimal_vector(black_box(&basis), black_box(&target)).unwrap());
    });
}

fn bench_initial_bound(c: &mut Criterion) {
    let group = rationals_two_three();
    c.bench_function("initial_bound(Q, S={2,3})", |b| {
        b.iter(|| BoundEstimator::new(&group, 106).initial_bound().unwrap());
    });
}

fn bench_reduced_bound(c: &mut Criterion) {
    let group = rationals_two_three();
    let solver = Solver::new(SolverConfig::default());
    c.bench_function("Solver::bound(Q, S={2,3})", |b| {
        b.iter(|| solver.bound(black_box(&group)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_lll_4x4,
    bench_minimal_vector,
    bench_initial_bound,
    bench_reduced_bound,
);
criterion_main!(benches);
