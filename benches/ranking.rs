//! Benchmarks for path ranking over large occurrence tables.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};

use narrative_search::config::RankingStrategy;
use narrative_search::graph::Direction;
use narrative_search::ranker::{OccurrenceTable, PathKey, Ranker, Tier};

fn table(paths: usize) -> OccurrenceTable {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    (0..paths)
        .map(|i| {
            let tier = match i % 10 {
                0 => Tier::Focus,
                1..=3 => Tier::Reserved,
                _ => Tier::Other,
            };
            let direction = if i % 2 == 0 {
                Direction::Ingoing
            } else {
                Direction::Outgoing
            };
            let key = PathKey::PredicateObject {
                tier,
                direction,
                predicate: format!("http://dbpedia.org/ontology/p{}", i % 97),
                endpoint: format!("http://dbpedia.org/resource/N{i}"),
            };
            (key, rng.gen_range(1..500))
        })
        .collect()
}

fn bench_select_best(c: &mut Criterion) {
    let occurrences = table(100_000);
    for strategy in [
        RankingStrategy::PredObjectFreq,
        RankingStrategy::InversePredObjectFreq,
        RankingStrategy::EntropyPredObjectFreq,
    ] {
        let ranker = Ranker::new(strategy, 5, 400);
        c.bench_function(&format!("select_best_100k_{strategy}"), |bench| {
            bench.iter(|| black_box(ranker.select_best(black_box(&occurrences))))
        });
    }
}

fn bench_increment(c: &mut Criterion) {
    let keys: Vec<PathKey> = (0..10_000)
        .map(|i| PathKey::Predicate {
            tier: Tier::Other,
            predicate: format!("http://dbpedia.org/ontology/p{}", i % 211),
        })
        .collect();

    c.bench_function("increment_10k", |bench| {
        bench.iter(|| {
            let mut occurrences = OccurrenceTable::new();
            for key in &keys {
                occurrences.increment(key.clone());
            }
            black_box(occurrences)
        })
    });
}

criterion_group!(benches, bench_select_best, bench_increment);
criterion_main!(benches);
