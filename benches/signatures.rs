//! Benchmarks for signature parsing and encoding.
//!
//! Exercises the blob codec on representative shapes: simple and generic
//! method signatures, field signatures over arrays and modifiers, and local
//! variable signatures.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use cilforge::metadata::signatures::{
    encode_method_signature, parse_field_signature, parse_local_var_signature,
    parse_method_signature, SignatureMethod, TypeSignature,
};

fn bench_parse_method_signatures(c: &mut Criterion) {
    // instance Dictionary<List<int>, string[]> M<T>(ref T, List<int>[])
    let complex: &[u8] = &[
        0x30, 0x01, 0x02, 0x15, 0x12, 0x2A, 0x02, 0x15, 0x12, 0x49, 0x01, 0x08, 0x1D, 0x0E, 0x10,
        0x1E, 0x00, 0x1D, 0x15, 0x12, 0x42, 0x01, 0x08,
    ];
    let simple: &[u8] = &[0x20, 0x01, 0x0E, 0x08];

    let mut group = c.benchmark_group("parse_method_signature");
    group.throughput(Throughput::Bytes(simple.len() as u64));
    group.bench_function("simple", |b| {
        b.iter(|| parse_method_signature(black_box(simple)).unwrap());
    });
    group.throughput(Throughput::Bytes(complex.len() as u64));
    group.bench_function("generic_nested", |b| {
        b.iter(|| parse_method_signature(black_box(complex)).unwrap());
    });
    group.finish();
}

fn bench_parse_field_signatures(c: &mut Criterion) {
    let array_field: &[u8] = &[0x06, 0x1D, 0x0E];
    let modified_field: &[u8] = &[0x06, 0x1F, 0x49, 0x08];

    let mut group = c.benchmark_group("parse_field_signature");
    group.bench_function("szarray", |b| {
        b.iter(|| parse_field_signature(black_box(array_field)).unwrap());
    });
    group.bench_function("modreq", |b| {
        b.iter(|| parse_field_signature(black_box(modified_field)).unwrap());
    });
    group.finish();
}

fn bench_parse_locals(c: &mut Criterion) {
    // 4 slots: ref int, pinned object, typedref, string
    let locals: &[u8] = &[0x07, 0x04, 0x10, 0x08, 0x45, 0x1C, 0x16, 0x0E];

    c.bench_function("parse_local_var_signature", |b| {
        b.iter(|| parse_local_var_signature(black_box(locals)).unwrap());
    });
}

fn bench_encode_method_signature(c: &mut Criterion) {
    let signature = SignatureMethod::new(TypeSignature::Void)
        .with_param(TypeSignature::I4)
        .with_param(TypeSignature::String)
        .with_param(TypeSignature::R8)
        .instance();

    c.bench_function("encode_method_signature", |b| {
        b.iter(|| encode_method_signature(black_box(&signature)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_parse_method_signatures,
    bench_parse_field_signatures,
    bench_parse_locals,
    bench_encode_method_signature
);
criterion_main!(benches);
