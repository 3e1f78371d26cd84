//! Типизированные исходы ошибок подбора мест.
//!
//! Ни одна из этих ошибок не "пролетает" через контроллер как паника:
//! контроллер возвращает их UI как отдельные исходы (`PickerOutcome`).

use serde::Serialize;
use thiserror::Error;

use crate::models::{Seat, SeatStatus, SeatType};
use crate::picker::PickerPhase;

/// Локальные, не фатальные ошибки ввода. Показываются рядом с полем/местом.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidationError {
    #[error("choose fast or manual selection first")]
    ModeNotChosen,
    #[error("seat {seat_id} is not part of the loaded catalog")]
    UnknownSeat { seat_id: i64 },
    #[error("seat {code} is {seat_type}, which does not match ticket category {category}")]
    CategoryMismatch {
        code: String,
        seat_type: SeatType,
        category: String,
    },
    #[error("seat {code} is {status} and cannot be selected")]
    SeatUnavailable { code: String, status: SeatStatus },
    #[error("already selected {requested} seat(s); deselect one first")]
    SelectionFull { requested: u32 },
    #[error("only {found} of {requested} seat(s) could be found")]
    Underfilled { found: usize, requested: u32 },
    #[error("there is no active seat hold to check out")]
    NoActiveHold,
    #[error("checkout is already in progress")]
    CheckoutInFlight,
    #[error("{action} is not allowed while {phase:?}")]
    NotAllowed {
        action: &'static str,
        phase: PickerPhase,
    },
}

/// Ошибки обращения к backend API с местами.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeatApiError {
    #[error("seat service temporarily unavailable (circuit breaker open)")]
    CircuitOpen,
    #[error("seat service request failed: {0}")]
    Transport(String),
    #[error("seat service responded with status {0}")]
    Status(u16),
    #[error("seat service returned an unreadable payload: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for SeatApiError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            SeatApiError::Status(status.as_u16())
        } else if e.is_decode() {
            SeatApiError::Decode(e.to_string())
        } else {
            SeatApiError::Transport(e.to_string())
        }
    }
}

/// Не удалось загрузить каталог мест. Можно повторить; выборку не портит.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to load seats: {0}")]
pub struct CatalogFetchError(#[from] pub SeatApiError);

/// Места, которые успел занять кто-то другой, пока держалась выборка.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("seats no longer available: {}", codes(.lost))]
pub struct ConflictError {
    pub lost: Vec<Seat>,
}

fn codes(seats: &[Seat]) -> String {
    seats
        .iter()
        .map(|s| s.code.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
