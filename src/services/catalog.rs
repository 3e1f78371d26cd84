use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::SeatApiError;
use crate::models::{category_admits, Seat, SeatPage, SeatType, TemporaryReserveRequest, TicketCategory};

/// Область каталога: событие, зона зала и (необязательно) тип мест.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogScope {
    pub event_id: i64,
    pub area_id: i64,
    pub seat_type: Option<SeatType>,
}

impl CatalogScope {
    pub fn for_category(event_id: i64, area_id: i64, category: &TicketCategory) -> Self {
        Self {
            event_id,
            area_id,
            seat_type: category.seat_type_hint(),
        }
    }
}

/// Источник авторитетного статуса мест (backend API).
#[async_trait]
pub trait SeatSource: Send + Sync {
    async fn fetch_seats(&self, scope: &CatalogScope) -> Result<SeatPage, SeatApiError>;

    /// Серверное удержание мест. Необязательное улучшение: ошибка здесь
    /// не должна ломать клиентскую бронь.
    async fn temporary_reserve(&self, request: &TemporaryReserveRequest) -> Result<(), SeatApiError>;
}

/// Последний полученный с сервера снимок мест для области.
#[derive(Debug, Clone)]
pub struct SeatCatalog {
    seats: Vec<Seat>,
    total: i64,
    fetched_at: DateTime<Utc>,
}

impl SeatCatalog {
    pub fn new(page: SeatPage, fetched_at: DateTime<Utc>) -> Self {
        Self {
            total: page.total,
            seats: page.seats,
            fetched_at,
        }
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn seat(&self, seat_id: i64) -> Option<&Seat> {
        self.seats.iter().find(|s| s.seat_id == seat_id)
    }
}

/// Места, которые можно предложить покупателю категории: свободные и подходящего типа.
pub fn eligible<'a>(seats: &'a [Seat], category_name: &'a str) -> impl Iterator<Item = &'a Seat> + 'a {
    seats
        .iter()
        .filter(move |s| s.status.is_selectable() && category_admits(category_name, &s.seat_type))
}
