use criterion::{criterion_group, criterion_main, Criterion};
use twiss_core::{Lattice, RefPts};
use twiss_lattice::{coupled_fodo_ring, fodo_ring, FodoParams};
use twiss_linopt::{linopt, LinoptOpts};

fn bench_linopt(c: &mut Criterion) {
    let params = FodoParams::default();
    let ring = fodo_ring(&params).expect("fodo ring");
    let coupled = coupled_fodo_ring(&params, 0.05).expect("coupled ring");
    let refpts = RefPts::all(ring.segment_count());
    let coupled_refpts = RefPts::all(coupled.segment_count());
    let chrom = LinoptOpts {
        get_chrom: true,
        ..LinoptOpts::default()
    };

    c.bench_function("linopt_fodo_all_points", |b| {
        b.iter(|| {
            let _ = linopt(&ring, &refpts, &LinoptOpts::default()).expect("linopt");
        });
    });
    c.bench_function("linopt_coupled_with_chromaticity", |b| {
        b.iter(|| {
            let _ = linopt(&coupled, &coupled_refpts, &chrom).expect("linopt");
        });
    });
}

criterion_group!(benches, bench_linopt);
criterion_main!(benches);
