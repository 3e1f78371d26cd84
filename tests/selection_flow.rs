//! Integration tests for the selection controller
//!
//! Drives `SelectionController` against an in-memory venue with tokio time
//! paused, so hold countdowns run instantly and deterministically.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use seat_picker::clock::Clock;
use seat_picker::config::PickerConfig;
use seat_picker::error::SeatApiError;
use seat_picker::models::{
    Seat, SeatPage, SeatStatus, SeatType, SelectionMode, TemporaryReserveRequest, TicketCategory,
};
use seat_picker::picker::{PickerAction, PickerOutcome, PickerPhase, SelectionController};
use seat_picker::services::{CatalogScope, SeatSource};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

/// Зал в памяти: статусы мест можно менять по ходу теста.
#[derive(Default)]
struct FakeVenue {
    seats: Mutex<Vec<Seat>>,
    fail_fetches: AtomicBool,
    fetches: AtomicUsize,
    reserves: Mutex<Vec<TemporaryReserveRequest>>,
}

impl FakeVenue {
    fn with_seats(seats: Vec<Seat>) -> Arc<Self> {
        Arc::new(Self {
            seats: Mutex::new(seats),
            ..Self::default()
        })
    }

    fn set_status(&self, seat_id: i64, status: SeatStatus) {
        let mut seats = self.seats.lock().unwrap();
        if let Some(seat) = seats.iter_mut().find(|s| s.seat_id == seat_id) {
            seat.status = status;
        }
    }
}

#[async_trait]
impl SeatSource for FakeVenue {
    async fn fetch_seats(&self, _scope: &CatalogScope) -> Result<SeatPage, SeatApiError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(SeatApiError::Status(503));
        }
        let seats = self.seats.lock().unwrap().clone();
        Ok(SeatPage {
            total: seats.len() as i64,
            seats,
        })
    }

    async fn temporary_reserve(&self, request: &TemporaryReserveRequest) -> Result<(), SeatApiError> {
        self.reserves.lock().unwrap().push(request.clone());
        // эндпоинт может отсутствовать: клиентская бронь от этого не зависит
        Err(SeatApiError::Status(404))
    }
}

/// Часы, идущие вместе с (приостановленным) временем tokio.
struct PausedClock {
    base: DateTime<Utc>,
    start: tokio::time::Instant,
}

impl PausedClock {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            base: Utc.with_ymd_and_hms(2026, 5, 1, 19, 0, 0).single().unwrap(),
            start: tokio::time::Instant::now(),
        })
    }
}

impl Clock for PausedClock {
    fn now(&self) -> DateTime<Utc> {
        self.base + chrono::Duration::from_std(self.start.elapsed()).unwrap()
    }
}

fn seat(id: i64, row: &str, column: i32, status: SeatStatus) -> Seat {
    Seat {
        seat_id: id,
        code: format!("{row}{column}"),
        row: row.into(),
        column,
        status,
        seat_type: SeatType::Vip,
        area_id: 3,
    }
}

fn row_a() -> Vec<Seat> {
    (1..=10).map(|c| seat(c as i64, "A", c, SeatStatus::Available)).collect()
}

fn vip() -> TicketCategory {
    TicketCategory {
        category_id: 42,
        name: "VIP".into(),
        unit_price: 150.0,
        max_quantity: 0,
        status: None,
    }
}

fn controller(venue: &Arc<FakeVenue>) -> SelectionController {
    SelectionController::new(
        venue.clone(),
        PausedClock::new(),
        9,
        3,
        vip(),
        PickerConfig::default(),
    )
}

/// Контроллер с уже загруженным каталогом.
async fn opened(venue: &Arc<FakeVenue>) -> SelectionController {
    let mut picker = controller(venue);
    assert_eq!(picker.open(), vec![PickerOutcome::CatalogLoading]);
    let outcomes = picker.pump().await;
    assert_eq!(outcomes, vec![PickerOutcome::CatalogReady { seats: 10 }]);
    picker
}

fn codes(picker: &SelectionController) -> Vec<String> {
    picker
        .machine()
        .state()
        .selected_seats
        .seats()
        .iter()
        .map(|s| s.code.clone())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn fast_pick_holds_contiguous_block() {
    let venue = FakeVenue::with_seats(row_a());
    let mut picker = opened(&venue).await;

    picker.dispatch(PickerAction::ChooseMode(SelectionMode::Fast));
    let outcomes = picker.dispatch(PickerAction::SetQuantity(3));

    assert_eq!(picker.phase(), PickerPhase::ReservedPendingCheckout);
    assert_eq!(codes(&picker), vec!["A1", "A2", "A3"]);
    assert!(!picker.machine().state().scattered);
    assert!(outcomes.iter().any(|o| matches!(o, PickerOutcome::Reserved { scattered: false, .. })));
    assert!(picker.has_live_timer());

    // серверное удержание запрошено, его сбой бронь не снимает
    tokio::time::sleep(Duration::from_millis(10)).await;
    let reserves = venue.reserves.lock().unwrap().clone();
    assert_eq!(reserves.len(), 1);
    assert_eq!(reserves[0].seat_ids, vec![1, 2, 3]);
    assert_eq!(reserves[0].reservation_duration, 300);
    assert_eq!(picker.phase(), PickerPhase::ReservedPendingCheckout);
}

#[tokio::test(start_paused = true)]
async fn fast_pick_without_block_is_scattered() {
    let venue = FakeVenue::with_seats(vec![
        seat(1, "A", 1, SeatStatus::Available),
        seat(2, "A", 2, SeatStatus::Booked),
        seat(3, "A", 3, SeatStatus::Available),
        seat(4, "A", 4, SeatStatus::Booked),
        seat(5, "A", 5, SeatStatus::Available),
        seat(6, "A", 6, SeatStatus::Booked),
        seat(7, "A", 7, SeatStatus::Booked),
        seat(8, "A", 8, SeatStatus::Booked),
        seat(9, "A", 9, SeatStatus::Booked),
        seat(10, "A", 10, SeatStatus::Booked),
    ]);
    let mut picker = opened(&venue).await;

    picker.dispatch(PickerAction::ChooseMode(SelectionMode::Fast));
    let outcomes = picker.dispatch(PickerAction::SetQuantity(2));

    assert_eq!(codes(&picker), vec!["A5", "A3"]);
    assert!(picker.machine().state().scattered);
    assert!(outcomes.contains(&PickerOutcome::ScatteredNotice));
    assert_eq!(picker.phase(), PickerPhase::ReservedPendingCheckout);

    let snapshot = picker.snapshot();
    assert!(snapshot.scattered_notice);
    picker.dispatch(PickerAction::DismissScatteredNotice);
    assert!(!picker.snapshot().scattered_notice);
}

#[tokio::test(start_paused = true)]
async fn hold_expires_after_five_minutes() {
    let venue = FakeVenue::with_seats(row_a());
    let mut picker = opened(&venue).await;
    picker.dispatch(PickerAction::ChooseMode(SelectionMode::Fast));
    picker.dispatch(PickerAction::SetQuantity(2));

    let mut last_remaining = u64::MAX;
    let mut ticks = 0;
    loop {
        let outcomes = picker.pump().await;
        ticks += 1;
        match outcomes.as_slice() {
            [PickerOutcome::Countdown { remaining }] => {
                assert!(*remaining < last_remaining);
                last_remaining = *remaining;
            }
            [PickerOutcome::Expired] => break,
            other => panic!("unexpected outcomes during countdown: {other:?}"),
        }
        assert!(ticks <= 300, "hold did not expire in time");
    }

    assert_eq!(ticks, 300);
    assert_eq!(last_remaining, 1);
    assert_eq!(picker.phase(), PickerPhase::Expired);
    assert!(picker.machine().state().selected_seats.is_empty());
    assert_eq!(picker.machine().state().reservation_expiry, None);
    assert!(!picker.has_live_timer());

    // больше тиков нет, Expired не повторяется
    let quiet = tokio::time::timeout(Duration::from_secs(5), picker.pump()).await;
    assert!(quiet.is_err());
}

#[tokio::test(start_paused = true)]
async fn checkout_conflict_keeps_remaining_seats() {
    let venue = FakeVenue::with_seats(row_a());
    let mut picker = opened(&venue).await;
    picker.dispatch(PickerAction::ChooseMode(SelectionMode::Fast));
    picker.dispatch(PickerAction::SetQuantity(2));
    assert_eq!(codes(&picker), vec!["A1", "A2"]);

    // A2 купили в другой сессии
    venue.set_status(2, SeatStatus::Booked);
    assert_eq!(
        picker.dispatch(PickerAction::Checkout),
        vec![PickerOutcome::CheckoutStarted]
    );
    let outcomes = picker.pump().await;

    let Some(PickerOutcome::Conflict { error }) = outcomes.last() else {
        panic!("expected conflict, got {outcomes:?}");
    };
    assert_eq!(error.lost.len(), 1);
    assert_eq!(error.lost[0].code, "A2");
    assert_eq!(error.lost[0].status, SeatStatus::Booked);
    assert_eq!(picker.phase(), PickerPhase::Selecting);
    assert_eq!(codes(&picker), vec!["A1"]);
    assert!(!picker.has_live_timer());

    // пользователь добирает место вручную
    let outcomes = picker.dispatch(PickerAction::ToggleSeat(3));
    assert!(outcomes.iter().any(|o| matches!(o, PickerOutcome::Reserved { .. })));
    assert_eq!(codes(&picker), vec!["A1", "A3"]);
}

#[tokio::test(start_paused = true)]
async fn clean_checkout_hands_off_totals() {
    let venue = FakeVenue::with_seats(row_a());
    let mut picker = opened(&venue).await;
    picker.dispatch(PickerAction::ChooseMode(SelectionMode::Fast));
    picker.dispatch(PickerAction::SetQuantity(3));
    picker.dispatch(PickerAction::Checkout);

    let outcomes = picker.pump().await;
    let Some(PickerOutcome::HandedOff { checkout }) = outcomes.first() else {
        panic!("expected hand-off, got {outcomes:?}");
    };
    assert_eq!(checkout.event_id, 9);
    assert_eq!(checkout.category_ticket_id, 42);
    assert_eq!(checkout.seat_ids, vec![1, 2, 3]);
    assert!((checkout.total_amount - 450.0).abs() < f64::EPSILON);
    assert_eq!(picker.phase(), PickerPhase::HandedOff);
    assert!(!picker.has_live_timer());
}

#[tokio::test(start_paused = true)]
async fn reconciliation_after_reset_is_ignored() {
    let venue = FakeVenue::with_seats(row_a());
    let mut picker = opened(&venue).await;
    picker.dispatch(PickerAction::ChooseMode(SelectionMode::Fast));
    picker.dispatch(PickerAction::SetQuantity(2));
    picker.dispatch(PickerAction::Checkout);
    picker.dispatch(PickerAction::Reset);

    let outcomes = picker.pump().await;
    assert!(outcomes.is_empty());
    assert_eq!(picker.phase(), PickerPhase::Idle);
    assert!(picker.machine().state().selected_seats.is_empty());
}

#[tokio::test(start_paused = true)]
async fn catalog_failure_can_be_retried() {
    let venue = FakeVenue::with_seats(row_a());
    venue.fail_fetches.store(true, Ordering::SeqCst);
    let mut picker = controller(&venue);
    picker.open();

    let outcomes = picker.pump().await;
    assert!(matches!(outcomes.as_slice(), [PickerOutcome::CatalogFailed { .. }]));
    picker.dispatch(PickerAction::ChooseMode(SelectionMode::Manual));
    assert!(matches!(
        picker.pump().await.as_slice(),
        [PickerOutcome::CatalogFailed { .. }]
    ));

    venue.fail_fetches.store(false, Ordering::SeqCst);
    assert_eq!(
        picker.dispatch(PickerAction::RetryCatalog),
        vec![PickerOutcome::CatalogLoading]
    );
    assert_eq!(picker.pump().await, vec![PickerOutcome::CatalogReady { seats: 10 }]);
    assert_eq!(venue.fetches.load(Ordering::SeqCst), 3);

    picker.dispatch(PickerAction::SetQuantity(1));
    assert_eq!(picker.phase(), PickerPhase::Selecting);
}

#[tokio::test(start_paused = true)]
async fn manual_selection_stops_at_requested_count() {
    let mut seats = row_a();
    seats[4].status = SeatStatus::Pending;
    let venue = FakeVenue::with_seats(seats);
    let mut picker = opened(&venue).await;
    picker.dispatch(PickerAction::ChooseMode(SelectionMode::Manual));
    picker.dispatch(PickerAction::SetQuantity(2));

    let outcomes = picker.dispatch(PickerAction::ToggleSeat(5));
    assert_eq!(outcomes[0], PickerOutcome::SeatPending { code: "A5".into() });
    assert!(codes(&picker).is_empty());

    picker.dispatch(PickerAction::ToggleSeat(6));
    picker.dispatch(PickerAction::ToggleSeat(8));
    assert_eq!(picker.phase(), PickerPhase::ReservedPendingCheckout);
    assert!(picker.machine().state().scattered);

    let outcomes = picker.dispatch(PickerAction::ToggleSeat(9));
    assert!(matches!(outcomes.as_slice(), [PickerOutcome::Rejected { .. }]));
    assert_eq!(codes(&picker), vec!["A6", "A8"]);
}

#[tokio::test(start_paused = true)]
async fn spawned_picker_reports_async_outcomes() {
    let venue = FakeVenue::with_seats(row_a());
    let (handle, opened) = controller(&venue).spawn();
    assert_eq!(opened, vec![PickerOutcome::CatalogLoading]);

    handle.dispatch(PickerAction::ChooseMode(SelectionMode::Fast)).await.unwrap();
    handle.dispatch(PickerAction::SetQuantity(2)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.phase, PickerPhase::ReservedPendingCheckout);
    assert_eq!(snapshot.remaining_seconds, Some(299));
    assert!(snapshot.notices.contains(&PickerOutcome::CatalogReady { seats: 10 }));

    tokio::time::sleep(Duration::from_secs(301)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.phase, PickerPhase::Expired);
    assert!(snapshot.notices.contains(&PickerOutcome::Expired));
    assert!(!snapshot
        .notices
        .iter()
        .any(|n| matches!(n, PickerOutcome::Countdown { .. })));

    handle.close().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(handle.is_closed());
    assert!(handle.snapshot().await.is_err());
}
