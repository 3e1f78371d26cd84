use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ConflictError, ValidationError};
use crate::models::{CheckoutRequest, SelectedSeat, SelectionMode};

/// Дискретные типизированные исходы, которые контроллер отдает UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PickerOutcome {
    CatalogLoading,
    CatalogReady { seats: usize },
    /// Retryable; the selection is left untouched.
    CatalogFailed { message: String },
    ModeChosen { mode: SelectionMode },
    QuantitySet { requested: u32, clamped: bool },
    SelectionStarted { mode: SelectionMode },
    SeatAdded { seat: SelectedSeat },
    SeatRemoved { seat: SelectedSeat },
    Rejected { error: ValidationError },
    /// Notice for a click on a seat someone else is paying for.
    SeatPending { code: String },
    Underfilled { found: usize, requested: u32 },
    Reserved { expiry: DateTime<Utc>, scattered: bool },
    ScatteredNotice,
    HoldReleased,
    Countdown { remaining: u64 },
    Expired,
    CheckoutStarted,
    Conflict { error: ConflictError },
    HandedOff { checkout: CheckoutRequest },
    Reset,
}

impl From<ValidationError> for PickerOutcome {
    fn from(error: ValidationError) -> Self {
        PickerOutcome::Rejected { error }
    }
}
