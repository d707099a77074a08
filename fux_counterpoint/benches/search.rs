// Criterion benchmarks for the counterpoint search.
//
// One single-voice piece per species over the same Dorian cantus, plus a
// two-voice first-species piece. Run with `cargo bench -p fux_counterpoint`.

use criterion::{Criterion, criterion_group, criterion_main};
use fux_counterpoint::{CounterpointRequest, Mode, PenaltyWeights, SearchConfig, Species, compose};
use fux_prng::SeededRng;
use std::hint::black_box;

const CANTUS: [i32; 11] = [50, 53, 52, 50, 55, 53, 57, 55, 53, 52, 50];

fn request(species: Species, start_pitches: &[i32]) -> CounterpointRequest {
    CounterpointRequest {
        mode: Mode::Dorian,
        species,
        cantus: CANTUS.to_vec(),
        start_pitches: start_pitches.to_vec(),
    }
}

fn bench_species(c: &mut Criterion) {
    let weights = PenaltyWeights::default();
    let config = SearchConfig::default();
    let mut group = c.benchmark_group("single_voice");
    group.sample_size(10);
    for species in Species::ALL {
        let req = request(species, &[57]);
        group.bench_function(format!("species_{}", species.number()), |b| {
            b.iter(|| {
                let mut rng = SeededRng::new(7);
                black_box(compose(black_box(&req), &weights, &config, &mut rng))
            })
        });
    }
    group.finish();
}

fn bench_two_voices(c: &mut Criterion) {
    let weights = PenaltyWeights::default();
    let config = SearchConfig::default();
    let req = request(Species::First, &[45, 62]);
    let mut group = c.benchmark_group("two_voices");
    group.sample_size(10);
    group.bench_function("species_1", |b| {
        b.iter(|| black_box(compose(&req, &weights, &config, &mut SeededRng::new(7))))
    });
    group.finish();
}

criterion_group!(benches, bench_species, bench_two_voices);
criterion_main!(benches);
