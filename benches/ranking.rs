//! Benchmarks for the similarity ranking path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use legal_qa_engine::matching::{sequence_ratio, SimilarityRanker};
use legal_qa_engine::QaPair;

fn synthetic_corpus(size: usize) -> Vec<QaPair> {
    (1..=size as u64)
        .map(|id| QaPair {
            id,
            question: format!(
                "What is the procedure for filing case number {} before the district court?",
                id
            ),
            answer: format!("Procedure details for case {}.", id),
            category: "legal_basics".to_string(),
            created_at: None,
        })
        .collect()
}

fn bench_sequence_ratio(c: &mut Criterion) {
    let a = "what is the procedure for filing an anticipatory bail application";
    let b = "how do i file an application for anticipatory bail before the sessions court";

    c.bench_function("sequence_ratio_medium", |bencher| {
        bencher.iter(|| sequence_ratio(black_box(a), black_box(b)))
    });
}

fn bench_rank(c: &mut Criterion) {
    let ranker = SimilarityRanker::new().unwrap();
    let corpus = synthetic_corpus(500);

    c.bench_function("rank_500_records", |bencher| {
        bencher.iter(|| {
            ranker
                .rank(
                    black_box("what is the procedure for filing a case"),
                    black_box(&corpus),
                    0.5,
                )
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_sequence_ratio, bench_rank);
criterion_main!(benches);
