//! Подбор блока мест для быстрого выбора.
//!
//! Сначала ищется непрерывный блок в одном ряду (ряды по возрастанию,
//! самое левое окно). Если такого нет, берутся места ближе всего к центру,
//! начиная с первых рядов, и результат помечается как "разбросанный".

use std::collections::BTreeMap;

use crate::models::Seat;

use super::catalog::eligible;

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub seats: Vec<Seat>,
    pub scattered: bool,
}

impl Block {
    /// Нашлось ли столько мест, сколько просили.
    pub fn is_complete(&self, count: usize) -> bool {
        self.seats.len() >= count
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BlockFinder {
    center_column: i32,
}

impl BlockFinder {
    pub fn new(center_column: i32) -> Self {
        Self { center_column }
    }

    pub fn find_block(&self, catalog: &[Seat], category_name: &str, count: usize) -> Block {
        if count == 0 {
            return Block {
                seats: Vec::new(),
                scattered: false,
            };
        }

        let mut rows: BTreeMap<&str, Vec<&Seat>> = BTreeMap::new();
        for seat in eligible(catalog, category_name) {
            rows.entry(seat.row.as_str()).or_default().push(seat);
        }

        for row in rows.values_mut() {
            row.sort_by_key(|s| s.column);
            if let Some(window) = row.windows(count).find(|w| is_run(w)) {
                return Block {
                    seats: window.iter().map(|s| (*s).clone()).collect(),
                    scattered: false,
                };
            }
        }

        // Непрерывного блока нет - берем ближайшие к центру
        let mut nearest: Vec<&Seat> = rows.into_values().flatten().collect();
        sort_front_center(&mut nearest, self.center_column);
        Block {
            seats: nearest.into_iter().take(count).cloned().collect(),
            scattered: true,
        }
    }
}

fn is_run(window: &[&Seat]) -> bool {
    window
        .windows(2)
        .all(|p| i64::from(p[1].column) - i64::from(p[0].column) == 1)
}

/// Порядок "первые ряды, ближе к центру". Номер колонки разрешает ничьи.
pub(crate) fn sort_front_center(seats: &mut [&Seat], center_column: i32) {
    seats.sort_by(|a, b| {
        a.row
            .cmp(&b.row)
            .then_with(|| {
                let da = (i64::from(a.column) - i64::from(center_column)).unsigned_abs();
                let db = (i64::from(b.column) - i64::from(center_column)).unsigned_abs();
                da.cmp(&db)
            })
            .then_with(|| a.column.cmp(&b.column))
    });
}
