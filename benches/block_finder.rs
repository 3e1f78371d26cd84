//! Block finder and suggestion ranking benchmarks
//!
//! Venue sizes roughly match a small hall (200 seats) and an arena sector
//! (5000 seats). Run with: `cargo bench`

#![allow(clippy::expect_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use seat_picker::models::{Seat, SeatStatus, SeatType, TentativeSelection};
use seat_picker::services::{BlockFinder, SuggestionRanker};

/// Зал `rows x columns`; каждое третье место занято, VIP только в первых рядах.
fn venue(rows: usize, columns: i32) -> Vec<Seat> {
    let mut seats = Vec::with_capacity(rows * columns as usize);
    for r in 0..rows {
        let row = format!("R{r:03}");
        for c in 1..=columns {
            let id = (r as i64) * 1000 + i64::from(c);
            seats.push(Seat {
                seat_id: id,
                code: format!("{row}-{c}"),
                row: row.clone(),
                column: c,
                status: if id % 3 == 0 {
                    SeatStatus::Booked
                } else {
                    SeatStatus::Available
                },
                seat_type: if r < rows / 4 {
                    SeatType::Vip
                } else {
                    SeatType::Standard
                },
                area_id: 1,
            });
        }
    }
    seats
}

fn bench_find_block(c: &mut Criterion) {
    let finder = BlockFinder::new(10);
    let mut group = c.benchmark_group("find_block");

    for (rows, columns) in [(10usize, 20i32), (100, 50)] {
        let seats = venue(rows, columns);
        group.throughput(Throughput::Elements(seats.len() as u64));

        // два подряд найдутся в первом же ряду
        group.bench_with_input(BenchmarkId::new("pair", seats.len()), &seats, |b, seats| {
            b.iter(|| finder.find_block(black_box(seats), "Standard", 2));
        });
        // четыре подряд не найдутся нигде: полный проход и сортировка от центра
        group.bench_with_input(BenchmarkId::new("scattered", seats.len()), &seats, |b, seats| {
            b.iter(|| finder.find_block(black_box(seats), "Standard", 4));
        });
    }
    group.finish();
}

fn bench_suggestions(c: &mut Criterion) {
    let ranker = SuggestionRanker::new(10, 5);
    let seats = venue(100, 50);
    let selection: TentativeSelection = seats
        .iter()
        .filter(|s| s.status == SeatStatus::Available)
        .take(4)
        .map(Into::into)
        .collect();

    c.bench_function("suggest_5000", |b| {
        b.iter(|| ranker.suggest(black_box(&seats), "VIP", black_box(&selection)));
    });
}

criterion_group!(benches, bench_find_block, bench_suggestions);
criterion_main!(benches);
