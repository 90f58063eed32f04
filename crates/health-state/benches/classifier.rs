//! Benchmarks for the classification hot path.

use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use health_state::{HealthAnalyzer, HealthState, History, Observation, Sample, StateClassifier};

fn start() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

fn full_sleep_history() -> History {
    let mut history = History::with_default_capacity();
    for i in 0..1000 {
        history.push(Sample::new(
            start() + Duration::seconds(i * 15),
            20.0,
            HealthState::NormalSleep,
        ));
    }
    history
}

fn benchmark_classify(c: &mut Criterion) {
    let classifier = StateClassifier::default();
    let history = full_sleep_history();
    let now = start() + Duration::seconds(15_000);

    c.bench_function("classify_reclined_full_history", |b| {
        b.iter(|| classifier.classify(black_box(20.0), 0.0, black_box(&history), now))
    });

    c.bench_function("classify_upright_full_history", |b| {
        b.iter(|| classifier.classify(black_box(85.0), 0.0, black_box(&history), now))
    });
}

fn benchmark_analyze(c: &mut Criterion) {
    let analyzer = HealthAnalyzer::default();
    let mut tick = 0i64;

    c.bench_function("analyze_single_subject", |b| {
        b.iter(|| {
            tick += 1;
            let obs = Observation::new("bench", 30.0, start() + Duration::seconds(tick));
            analyzer.analyze(black_box(&obs))
        })
    });
}

criterion_group!(benches, benchmark_classify, benchmark_analyze);
criterion_main!(benches);
