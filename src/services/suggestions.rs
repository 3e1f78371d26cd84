use crate::models::{Seat, TentativeSelection};

use super::block_finder::sort_front_center;
use super::catalog::eligible;

/// Короткий список "лучших" мест (первые ряды, ближе к центру) для подсказки.
/// Только совет: сам контроллер подсказки никогда не применяет.
#[derive(Debug, Clone, Copy)]
pub struct SuggestionRanker {
    center_column: i32,
    limit: usize,
}

impl SuggestionRanker {
    pub fn new(center_column: i32, limit: usize) -> Self {
        Self { center_column, limit }
    }

    pub fn suggest(&self, catalog: &[Seat], category_name: &str, exclude: &TentativeSelection) -> Vec<Seat> {
        let mut candidates: Vec<&Seat> = eligible(catalog, category_name)
            .filter(|s| !exclude.contains(s.seat_id))
            .collect();
        sort_front_center(&mut candidates, self.center_column);
        candidates.into_iter().take(self.limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SelectedSeat, SeatStatus, SeatType};

    fn seat(id: i64, row: &str, column: i32, seat_type: SeatType) -> Seat {
        Seat {
            seat_id: id,
            code: format!("{row}{column}"),
            row: row.into(),
            column,
            status: SeatStatus::Available,
            seat_type,
            area_id: 7,
        }
    }

    #[test]
    fn ranks_front_rows_then_center() {
        let catalog = vec![
            seat(1, "B", 10, SeatType::Vip),
            seat(2, "A", 2, SeatType::Vip),
            seat(3, "A", 11, SeatType::Vip),
            seat(4, "A", 9, SeatType::Vip),
            seat(5, "A", 10, SeatType::Standard),
        ];
        let ranked = SuggestionRanker::new(10, 5).suggest(&catalog, "VIP", &TentativeSelection::new());
        let codes: Vec<&str> = ranked.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["A9", "A11", "A2", "B10"]);
    }

    #[test]
    fn excludes_selected_and_caps_length() {
        let catalog: Vec<Seat> = (1..=12).map(|c| seat(c as i64, "C", c, SeatType::Vip)).collect();
        let exclude: TentativeSelection = [SelectedSeat::from(&catalog[9])].into_iter().collect();
        let ranked = SuggestionRanker::new(10, 5).suggest(&catalog, "VIP", &exclude);
        assert_eq!(ranked.len(), 5);
        assert!(ranked.iter().all(|s| s.seat_id != 10));
        assert_eq!(ranked[0].code, "C9");
    }
}
