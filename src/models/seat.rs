use serde::{Deserialize, Serialize};
use std::fmt;

/// Статус места, как его отдает backend. Выбирать можно только `Available`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Hold,
    Booked,
    Reserved,
    Occupied,
    CheckedIn,
    Pending,
    // Любое неизвестное значение считаем недоступным
    #[serde(other)]
    Unknown,
}

impl SeatStatus {
    pub fn is_selectable(self) -> bool {
        self == SeatStatus::Available
    }
}

impl fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SeatStatus::Available => "AVAILABLE",
            SeatStatus::Hold => "HOLD",
            SeatStatus::Booked => "BOOKED",
            SeatStatus::Reserved => "RESERVED",
            SeatStatus::Occupied => "OCCUPIED",
            SeatStatus::CheckedIn => "CHECKED_IN",
            SeatStatus::Pending => "PENDING",
            SeatStatus::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// Тип места. Набор расширяемый, поэтому неизвестные типы сохраняются как есть.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SeatType {
    Vip,
    Standard,
    Other(String),
}

impl SeatType {
    pub fn as_str(&self) -> &str {
        match self {
            SeatType::Vip => "VIP",
            SeatType::Standard => "STANDARD",
            SeatType::Other(label) => label,
        }
    }
}

impl From<String> for SeatType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "VIP" => SeatType::Vip,
            "STANDARD" => SeatType::Standard,
            _ => SeatType::Other(value.trim().to_string()),
        }
    }
}

impl From<SeatType> for String {
    fn from(value: SeatType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SeatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Позиция места в зале: ряд и номер колонки.
pub trait SeatPosition {
    fn row(&self) -> &str;
    fn column(&self) -> i32;
}

/// Место в том виде, в каком его видит сервер (авторитетный источник статуса).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    pub seat_id: i64,
    pub code: String,
    pub row: String,
    pub column: i32,
    pub status: SeatStatus,
    pub seat_type: SeatType,
    pub area_id: i64,
}

impl SeatPosition for Seat {
    fn row(&self) -> &str {
        &self.row
    }

    fn column(&self) -> i32 {
        self.column
    }
}

/// Ответ `GET seats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatPage {
    pub seats: Vec<Seat>,
    #[serde(default)]
    pub total: i64,
}
