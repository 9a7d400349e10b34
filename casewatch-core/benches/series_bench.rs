//! Criterion benchmarks for Casewatch hot paths.
//!
//! Benchmarks:
//! 1. County normalization (group + sort of a full unordered row set)
//! 2. National summarization over ragged state axes
//! 3. Rolling-window new events on long series

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use casewatch_core::aggregate::rolling_new_events;
use casewatch_core::data::{normalize_counties, normalize_states, summarize, CaseRow};
use casewatch_core::domain::RegionKey;
use chrono::NaiveDate;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_dates(n: usize) -> Vec<NaiveDate> {
    let base = NaiveDate::from_ymd_opt(2020, 1, 21).unwrap();
    (0..n)
        .map(|i| base + chrono::Duration::days(i as i64))
        .collect()
}

/// `regions × days` rows, interleaved by date like the upstream files.
fn make_county_rows(regions: usize, days: usize) -> Vec<CaseRow> {
    let dates = make_dates(days);
    let mut rows = Vec::with_capacity(regions * days);
    for (d, &date) in dates.iter().enumerate() {
        for r in 0..regions {
            let cases = (d as u64 + 1) * (r as u64 % 17 + 1);
            rows.push(CaseRow {
                date,
                key: RegionKey::county(format!("County {r}"), format!("State {}", r % 50)),
                cases,
                deaths: cases / 40,
            });
        }
    }
    rows
}

/// State rows where every third state skips every fifth day.
fn make_ragged_state_rows(states: usize, days: usize) -> Vec<CaseRow> {
    let dates = make_dates(days);
    let mut rows = Vec::new();
    for s in 0..states {
        for (d, &date) in dates.iter().enumerate() {
            if s % 3 == 0 && d % 5 == 4 {
                continue;
            }
            let cases = (d as u64 + 1) * 100;
            rows.push(CaseRow {
                date,
                key: RegionKey::state(format!("State {s}")),
                cases,
                deaths: cases / 30,
            });
        }
    }
    rows
}

// ── 1. Normalization ─────────────────────────────────────────────────

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_counties");
    for &regions in &[500usize, 3000] {
        let rows = make_county_rows(regions, 120);
        group.bench_with_input(BenchmarkId::from_parameter(regions), &rows, |b, rows| {
            b.iter(|| normalize_counties(black_box(rows.clone())))
        });
    }
    group.finish();
}

// ── 2. Summarization ─────────────────────────────────────────────────

fn bench_summarize(c: &mut Criterion) {
    let states = normalize_states(make_ragged_state_rows(55, 365));
    c.bench_function("summarize_55_states_365_days", |b| {
        b.iter(|| summarize(black_box(&states)))
    });
}

// ── 3. Rolling window ────────────────────────────────────────────────

fn bench_rolling(c: &mut Criterion) {
    let mut group = c.benchmark_group("rolling_new_events");
    let dates = make_dates(1000);
    let counts: Vec<f64> = (0..1000).map(|i| (i * i) as f64).collect();
    for &window in &[1usize, 7, 30] {
        group.bench_with_input(BenchmarkId::from_parameter(window), &window, |b, &w| {
            b.iter(|| rolling_new_events(black_box(&counts), black_box(&dates), w))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_normalize, bench_summarize, bench_rolling);
criterion_main!(benches);
