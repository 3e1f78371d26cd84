use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::seat::{Seat, SeatPosition, SeatType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    #[default]
    None,
    Fast,
    Manual,
}

/// Место в клиентской (предварительной) выборке.
///
/// Статуса здесь нет намеренно: в момент добавления место было `AVAILABLE`,
/// актуальный статус знает только сервер.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedSeat {
    pub seat_id: i64,
    pub code: String,
    pub row: String,
    pub column: i32,
    pub seat_type: SeatType,
}

impl From<&Seat> for SelectedSeat {
    fn from(seat: &Seat) -> Self {
        Self {
            seat_id: seat.seat_id,
            code: seat.code.clone(),
            row: seat.row.clone(),
            column: seat.column,
            seat_type: seat.seat_type.clone(),
        }
    }
}

impl SeatPosition for SelectedSeat {
    fn row(&self) -> &str {
        &self.row
    }

    fn column(&self) -> i32 {
        self.column
    }
}

/// Упорядоченный набор выбранных мест, уникальный по `seat_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TentativeSelection {
    seats: Vec<SelectedSeat>,
}

impl TentativeSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn contains(&self, seat_id: i64) -> bool {
        self.seats.iter().any(|s| s.seat_id == seat_id)
    }

    /// Returns `false` when the seat is already part of the selection.
    pub fn insert(&mut self, seat: SelectedSeat) -> bool {
        if self.contains(seat.seat_id) {
            return false;
        }
        self.seats.push(seat);
        true
    }

    pub fn remove(&mut self, seat_id: i64) -> Option<SelectedSeat> {
        let index = self.seats.iter().position(|s| s.seat_id == seat_id)?;
        Some(self.seats.remove(index))
    }

    pub fn seats(&self) -> &[SelectedSeat] {
        &self.seats
    }

    pub fn seat_ids(&self) -> Vec<i64> {
        self.seats.iter().map(|s| s.seat_id).collect()
    }
}

impl FromIterator<SelectedSeat> for TentativeSelection {
    fn from_iter<I: IntoIterator<Item = SelectedSeat>>(iter: I) -> Self {
        let mut selection = TentativeSelection::new();
        for seat in iter {
            selection.insert(seat);
        }
        selection
    }
}

/// Больше билетов в одну выборку взять нельзя при любых настройках.
pub const MAX_REQUESTED_COUNT: u32 = 10;

/// Состояние подбора мест, которое видит UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    pub mode: SelectionMode,
    pub requested_count: u32,
    pub selected_seats: TentativeSelection,
    pub suggested_seats: Vec<Seat>,
    pub scattered: bool,
    pub reservation_expiry: Option<DateTime<Utc>>,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            mode: SelectionMode::None,
            requested_count: 1,
            selected_seats: TentativeSelection::new(),
            suggested_seats: Vec::new(),
            scattered: false,
            reservation_expiry: None,
        }
    }
}

/// Данные, которые передаются во внешний процесс оплаты.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub event_id: i64,
    pub category_ticket_id: i64,
    pub seat_ids: Vec<i64>,
    pub total_amount: f64,
}

/// Сумма заказа в копейках/центах: `0.1 * 3` превращается в `0.3`, а не `0.30000000000000004`.
pub fn order_total(unit_price: f64, count: usize) -> f64 {
    (unit_price * count as f64 * 100.0).round() / 100.0
}

/// Тело `POST seats/temporary-reserve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryReserveRequest {
    pub event_id: i64,
    pub seat_ids: Vec<i64>,
    /// Seconds.
    pub reservation_duration: u64,
}
