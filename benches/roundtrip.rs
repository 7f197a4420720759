//! Benchmarks for the full build / write / read cycle on synthetic graphs.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use cilforge::metadata::signatures::{SignatureField, SignatureMethod, TypeSignature};
use cilforge::{CilAssembly, CilView};

fn build_assembly(type_count: u32) -> Vec<u8> {
    let mut asm = CilAssembly::new("bench.dll");

    for index in 0..type_count {
        let ty = asm
            .add_type("Bench", &format!("Type{index}"), 0x0010_0001)
            .unwrap();
        asm.add_field(ty, "value", 0x0001, SignatureField::new(TypeSignature::I4))
            .unwrap();
        let method = asm
            .add_method(
                ty,
                "Get",
                0x0086,
                0,
                SignatureMethod::new(TypeSignature::I4).instance(),
            )
            .unwrap();
        asm.add_param(method, 0, "", 0).unwrap();
    }

    asm.finalize().unwrap();
    asm.write().unwrap()
}

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_and_write");
    for type_count in [10u32, 100, 1_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(type_count),
            &type_count,
            |b, &count| {
                b.iter(|| build_assembly(black_box(count)));
            },
        );
    }
    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let image = build_assembly(1_000);

    let mut group = c.benchmark_group("read_and_resolve");
    group.throughput(Throughput::Bytes(image.len() as u64));
    group.bench_function("1000_types", |b| {
        b.iter(|| CilView::read(black_box(&image)).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_write, bench_read);
criterion_main!(benches);
