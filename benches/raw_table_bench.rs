use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::Duration;
use token_hashmap::raw_table::RawTable;
use token_hashmap::{F64Bits, Hashed};

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn bench_string_keys(c: &mut Criterion) {
    c.bench_function("raw_table::insert_string_keys_50k", |b| {
        b.iter_batched(
            || RawTable::<String, u64>::with_strategy(Hashed::default()),
            |mut t| {
                for (i, x) in lcg(17).take(50_000).enumerate() {
                    t.insert(format!("k{:016x}", x), i as u64).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_presized_vs_grown(c: &mut Criterion) {
    c.bench_function("raw_table::insert_presized_100k", |b| {
        b.iter_batched(
            || RawTable::<u64, u64>::with_capacity_and_strategy(100_000, Hashed::default()).unwrap(),
            |mut t| {
                for x in lcg(19).take(100_000) {
                    t.insert(x, x).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_f64_keys(c: &mut Criterion) {
    c.bench_function("raw_table::f64_bits_find_10k", |b| {
        let mut t: RawTable<f64, (), F64Bits> = RawTable::with_strategy(F64Bits);
        let keys: Vec<f64> = lcg(23).take(10_000).map(|x| x as f64 / 3.0).collect();
        for k in &keys {
            t.insert(*k, ()).unwrap();
        }
        b.iter(|| {
            for k in &keys {
                black_box(t.find(k).unwrap());
            }
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_string_keys, bench_presized_vs_grown, bench_f64_keys
}
criterion_main!(benches);
