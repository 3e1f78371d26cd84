use serde::{Deserialize, Serialize};
use validator::Validate;

use super::seat::SeatType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TicketCategory {
    #[validate(range(min = 1))]
    pub category_id: i64,
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(range(min = 0.0))]
    pub unit_price: f64,
    #[serde(default)]
    pub max_quantity: i32,
    #[serde(default)]
    pub status: Option<String>,
}

impl TicketCategory {
    pub fn admits(&self, seat_type: &SeatType) -> bool {
        category_admits(&self.name, seat_type)
    }

    /// Тип мест для фильтра `seatType` в запросе к backend, если его можно
    /// вывести из названия категории.
    pub fn seat_type_hint(&self) -> Option<SeatType> {
        let name = self.name.to_uppercase();
        if name.contains(SeatType::Vip.as_str()) {
            Some(SeatType::Vip)
        } else if name.contains(SeatType::Standard.as_str()) {
            Some(SeatType::Standard)
        } else {
            None
        }
    }

    /// Лимит билетов в одном заказе по категории; `None` если лимита нет.
    pub fn quantity_limit(&self) -> Option<u32> {
        u32::try_from(self.max_quantity).ok().filter(|limit| *limit > 0)
    }
}

// Название категории должно содержать тип места ("VIP Ticket" -> VIP), без учета регистра.
// Место без типа не подходит ни одной категории.
pub fn category_admits(category_name: &str, seat_type: &SeatType) -> bool {
    let label = seat_type.as_str().trim();
    !label.is_empty() && category_name.to_uppercase().contains(&label.to_uppercase())
}
