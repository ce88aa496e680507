use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;
use ndarray::Array2;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use sr_energy::mismatch;
use sr_energy::EndArray;
use sr_energy::EndType;
use sr_energy::ThermoParams;

fn random_ends(rng: &mut StdRng, rows: usize, len: usize) -> EndArray {
    let seqs = Array2::from_shape_fn((rows, len), |_| rng.random_range(0..4u8));
    EndArray::new(seqs, EndType::Td).unwrap()
}

pub fn mismatch_scans(c: &mut Criterion) {
    let mut group = c.benchmark_group("Mismatch");

    let params = ThermoParams::bundled().unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    let a = random_ends(&mut rng, 1, 8);
    let b = random_ends(&mut rng, 2000, 8);

    group.bench_function("Loop scan, 1 vs 2000 ends.", |bch| {
        bch.iter(|| mismatch::loop_mismatch(&params, &a, &b, 0.0).unwrap());
    });
    group.bench_function("Dangle scan (rows), 1 vs 2000 ends.", |bch| {
        bch.iter(|| mismatch::dangle_mismatch(&params, &a, &b, 0.0).unwrap());
    });
    group.bench_function("Dangle scan (columns), 1 vs 2000 ends.", |bch| {
        bch.iter(|| mismatch::dangle_mismatch_columnwise(&params, &a, &b, 0.0).unwrap());
    });
}

criterion_group!(benches, mismatch_scans);
criterion_main!(benches);
