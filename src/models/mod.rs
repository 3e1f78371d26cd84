pub mod seat;
pub mod selection;
pub mod ticket_category;

pub use seat::{Seat, SeatPage, SeatPosition, SeatStatus, SeatType};
pub use selection::{
    order_total, CheckoutRequest, SelectedSeat, SelectionMode, SelectionState,
    TemporaryReserveRequest, TentativeSelection, MAX_REQUESTED_COUNT,
};
pub use ticket_category::{category_admits, TicketCategory};
