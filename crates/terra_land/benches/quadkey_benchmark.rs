//! Benchmark for the quadkey codec.
//!
//! Run with: cargo bench --package terra_land --bench quadkey_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use terra_land::quadkey::encode_into;
use terra_land::{decode, encode, QuadCode, TileAddress};

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("quadkey_encode");
    group.throughput(Throughput::Elements(1));

    group.bench_function("encode_zoom_17", |b| {
        let mut x = 0u64;
        b.iter(|| {
            x = (x + 7919) & ((1 << 17) - 1);
            black_box(encode(17, black_box(x), black_box(x ^ 0x5555)))
        });
    });

    group.bench_function("encode_into_reused_zoom_17", |b| {
        let mut key = String::with_capacity(64);
        let mut x = 0u64;
        b.iter(|| {
            x = (x + 7919) & ((1 << 17) - 1);
            encode_into(&mut key, 17, black_box(x), black_box(x ^ 0x5555));
            black_box(key.len())
        });
    });

    group.finish();
}

fn benchmark_decode(c: &mut Criterion) {
    let keys: Vec<String> = (0..1024u64).map(|i| encode(17, i * 97, i * 31)).collect();

    c.bench_function("decode_zoom_17", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % keys.len();
            black_box(decode(black_box(&keys[i])))
        });
    });
}

fn benchmark_quad_code(c: &mut Criterion) {
    let deep = TileAddress::new(17, 90_001, 12_345).unwrap().code();
    let ancestor = deep.ancestor_at(9).unwrap();

    c.bench_function("quad_code_from_address", |b| {
        b.iter(|| black_box(TileAddress::new(17, black_box(90_001), black_box(12_345)).map(TileAddress::code)));
    });

    c.bench_function("quad_code_ancestor_test", |b| {
        b.iter(|| black_box(black_box(ancestor).is_ancestor_of(black_box(deep))));
    });

    c.bench_function("quad_code_walk_to_root", |b| {
        b.iter(|| {
            let mut code = black_box(deep);
            while let Some(parent) = code.parent() {
                code = parent;
            }
            black_box(code == QuadCode::ROOT)
        });
    });
}

criterion_group!(benches, benchmark_encode, benchmark_decode, benchmark_quad_code);
criterion_main!(benches);
