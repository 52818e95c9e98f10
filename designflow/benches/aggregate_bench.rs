//! Benchmarks for artifact aggregation and rendering.

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use designflow::artifact::{aggregate, render};
use designflow::context::OutputFormat;
use designflow::core::{Phase, PhaseResultSet, QaValidation, UnitPayload, UnitResult};
use std::sync::Arc;

fn phase_sets(units: usize) -> [Arc<PhaseResultSet>; 3] {
    let mut analysis = PhaseResultSet::new(Phase::Analysis);
    for i in 0..units {
        let name = format!("unit_{i}");
        analysis.insert(if i % 4 == 0 {
            UnitResult::failed(name, "bench", "boom")
        } else {
            UnitResult::completed_empty(name, "bench")
        });
    }

    let mut synthesis = PhaseResultSet::new(Phase::Synthesis);
    synthesis.insert(UnitResult::completed_empty("design_architect", "bench"));

    let mut validation = PhaseResultSet::new(Phase::Validation);
    let qa = QaValidation {
        confidence_scores: (0..units).map(|i| (format!("unit_{i}"), 0.75)).collect(),
        ..Default::default()
    };
    validation.insert(UnitResult::completed(
        "qa_validator",
        "bench",
        UnitPayload::QaValidation(qa),
    ));

    [Arc::new(analysis), Arc::new(synthesis), Arc::new(validation)]
}

fn aggregate_benchmark(c: &mut Criterion) {
    let [analysis, synthesis, validation] = phase_sets(64);

    c.bench_function("aggregate_64_units", |b| {
        b.iter(|| {
            black_box(aggregate(
                "bench",
                analysis.clone(),
                synthesis.clone(),
                validation.clone(),
                Utc::now(),
            ))
        });
    });

    let artifact = aggregate("bench", analysis, synthesis, validation, Utc::now());
    c.bench_function("render_markdown_64_units", |b| {
        b.iter(|| black_box(render(&artifact, OutputFormat::Markdown, true)));
    });
    c.bench_function("content_fingerprint_64_units", |b| {
        b.iter(|| black_box(artifact.content_fingerprint()));
    });
}

criterion_group!(benches, aggregate_benchmark);
criterion_main!(benches);
