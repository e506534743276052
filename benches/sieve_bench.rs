use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rug::{Integer, Rational};
use sunit::field::NumberField;
use sunit::places::primes_above;
use sunit::sieve::{self, PrimeSieveBuilder};
use sunit::SUnitGroup;

fn eisenstein() -> SUnitGroup {
    let k = NumberField::new(vec![1.into(), 1.into(), 1.into()], "xi").unwrap();
    let s = primes_above(&k, 3).unwrap();
    let zeta = k.element(vec![Rational::from(1), Rational::from(1)]).unwrap();
    let unit = k.element(vec![Rational::from(-1), Rational::from(-2)]).unwrap();
    SUnitGroup::new(k, s, zeta, 6, vec![unit]).unwrap()
}

fn bench_generate_primes_1m(c: &mut Criterion) {
    c.bench_function("generate_primes(1_000_000)", |b| {
        b.iter(|| sieve::generate_primes(black_box(1_000_000)));
    });
}

fn bench_compatible_vectors(c: &mut Criterion) {
    c.bench_function("compatible_vectors(len 4, 36, 60)", |b| {
        b.iter(|| sieve::compatible_vectors(black_box(&[1, 5, 17, 29]), black_box(36), black_box(60)));
    });
}

fn bench_split_primes(c: &mut Criterion) {
    let group = eisenstein();
    let bound = Integer::from(500);
    c.bench_function("split_primes_large_lcm(Q(zeta3), M=500)", |b| {
        b.iter(|| sieve::split_primes_large_lcm(&group, black_box(&bound), 4).unwrap());
    });
}

fn bench_dictionaries(c: &mut Criterion) {
    let group = eisenstein();
    let primes = sieve::split_primes_large_lcm(&group, &Integer::from(40), 4).unwrap();
    c.bench_function("PrimeSieveBuilder::build(Q(zeta3), M=40)", |b| {
        b.iter(|| PrimeSieveBuilder::new(&group, black_box(&primes)).unwrap().build().unwrap());
    });
}

criterion_group!(
    benches,
    bench_generate_primes_1m,
    bench_compatible_vectors,
    bench_split_primes,
    bench_dictionaries,
);
criterion_main!(benches);
