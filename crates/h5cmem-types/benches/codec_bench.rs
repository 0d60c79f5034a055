//! Encode and decode throughput for fixed-layout and variable-length records.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use h5cmem_derive::H5Type;
use h5cmem_types::{Decoder, Encoder, H5Type};

const N: usize = 10_000;

#[derive(H5Type, Clone)]
#[repr(C)]
struct Sample {
    id: u32,
    value: f64,
    flags: [u8; 3],
}

#[derive(H5Type, Clone)]
#[repr(C)]
struct Track {
    id: u32,
    points: Vec<f32>,
    label: String,
}

fn make_samples() -> Vec<Sample> {
    (0..N)
        .map(|i| Sample {
            id: i as u32,
            value: i as f64 * 0.5,
            flags: [1, 2, 3],
        })
        .collect()
}

fn make_tracks() -> Vec<Track> {
    (0..N)
        .map(|i| Track {
            id: i as u32,
            points: vec![i as f32; 8],
            label: format!("track-{i}"),
        })
        .collect()
}

fn bench_fixed(c: &mut Criterion) {
    let samples = make_samples();
    let mut group = c.benchmark_group("fixed_records");
    group.throughput(Throughput::Bytes((N * Sample::SIZE) as u64));
    group.bench_function("encode", |b| {
        b.iter(|| Encoder::from_records(black_box(&samples)).unwrap())
    });
    let enc = Encoder::from_records(&samples).unwrap();
    group.bench_function("decode", |b| {
        b.iter(|| {
            let mut out = samples.clone();
            // SAFETY: fixed-layout records embed no pointers.
            let mut dec = unsafe { Decoder::new(black_box(enc.buf())) };
            dec.decode_slice(&mut out, N).unwrap();
            out
        })
    });
    group.finish();
}

fn bench_vlen(c: &mut Criterion) {
    let tracks = make_tracks();
    let mut group = c.benchmark_group("vlen_records");
    group.throughput(Throughput::Elements(N as u64));
    group.bench_function("encode", |b| {
        b.iter(|| Encoder::from_records(black_box(&tracks)).unwrap())
    });
    let enc = Encoder::from_records(&tracks).unwrap();
    group.bench_function("decode", |b| {
        b.iter(|| {
            let mut out = tracks.clone();
            // SAFETY: enc owns every block the buffer points at.
            let mut dec = unsafe { Decoder::new(black_box(enc.buf())) };
            dec.decode_slice(&mut out, N).unwrap();
            out
        })
    });
    group.finish();
}

criterion_group!(benches, bench_fixed, bench_vlen);
criterion_main!(benches);
