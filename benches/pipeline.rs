//! Benchmarks for the analysis pipeline.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tascore::prelude::*;

/// Deterministic random walk of daily bars
fn generate_bars(n: usize) -> Vec<PricePoint> {
  let mut bars = Vec::with_capacity(n);
  let mut price: f64 = 100.0;

  for i in 0..n {
    let change = ((i * 7 + 13) % 100) as f64 / 2500.0 - 0.02; // Deterministic "random"
    let wick = 0.002 + ((i * 3) % 10) as f64 / 1000.0;

    let o = price;
    let c = price * (1.0 + change);
    let h = o.max(c) * (1.0 + wick);
    let l = o.min(c) * (1.0 - wick);
    let volume = 1_000_000 + ((i * 37) % 50) as u64 * 40_000;

    bars.push(PricePoint::new(i as i64 * 86_400_000, o, h, l, c, volume));
    price = c;
  }

  bars
}

fn bench_indicators(c: &mut Criterion) {
  let bars = generate_bars(1000);
  let periods = IndicatorPeriods::default();

  c.bench_function("indicator_bundle_1000_bars", |b| {
    b.iter(|| black_box(IndicatorBundle::compute(black_box(&bars), &periods)))
  });
}

fn bench_evaluate(c: &mut Criterion) {
  let bars = generate_bars(1000);
  let config = AnalyzerConfig::default();
  let bundle = IndicatorBundle::compute(&bars, &config.periods);
  let engine = ScoringEngine::new(&config);

  c.bench_function("evaluate_last_bar", |b| {
    b.iter(|| black_box(engine.evaluate(black_box(&bars), black_box(&bundle))))
  });
}

fn bench_support_resistance(c: &mut Criterion) {
  let bars = generate_bars(1000);

  c.bench_function("support_resistance_120", |b| {
    b.iter(|| black_box(find_support_resistance(black_box(&bars), 120)))
  });
}

fn bench_replay_scaling(c: &mut Criterion) {
  let config = AnalyzerConfig::default();
  let scanner = HistoricalSignalScanner::new(&config);

  let mut group = c.benchmark_group("replay");

  for size in [250, 500, 1000, 5000].iter() {
    let bars = generate_bars(*size);
    let bundle = IndicatorBundle::compute(&bars, &config.periods);

    group.bench_with_input(BenchmarkId::new("scan", size), size, |b, _| {
      b.iter(|| black_box(scanner.scan(black_box(&bars), black_box(&bundle))))
    });
  }

  group.finish();
}

fn bench_full_analysis(c: &mut Criterion) {
  let bars = generate_bars(500);
  let analyzer = Analyzer::default();

  c.bench_function("analyze_500_bars", |b| {
    b.iter(|| {
      let _ = black_box(analyzer.analyze("BENCH", black_box(&bars)));
    })
  });
}

fn bench_batch(c: &mut Criterion) {
  let bars1 = generate_bars(500);
  let bars2 = generate_bars(600);
  let bars3 = generate_bars(700);
  let bars4 = generate_bars(800);

  let analyzer = Analyzer::default();

  let instruments: Vec<(&str, &[PricePoint])> =
    vec![("SYM1", &bars1), ("SYM2", &bars2), ("SYM3", &bars3), ("SYM4", &bars4)];

  c.bench_function("batch_4_instruments", |b| {
    b.iter(|| black_box(analyze_batch(black_box(&analyzer), black_box(instruments.clone()))))
  });
}

criterion_group!(
  benches,
  bench_indicators,
  bench_evaluate,
  bench_support_resistance,
  bench_replay_scaling,
  bench_full_analysis,
  bench_batch,
);

criterion_main!(benches);
