//! Машина состояний подбора мест.
//!
//! `SelectionMachine::reduce` - чистая функция перехода: принимает действие и
//! текущее время, меняет состояние и возвращает эффекты (сетевые запросы,
//! запуск/остановка таймера) и исходы для UI. Эффекты исполняет
//! `SelectionController`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::PickerConfig;
use crate::error::{CatalogFetchError, ConflictError, ValidationError};
use crate::models::{
    order_total, CheckoutRequest, SelectedSeat, SelectionMode, SelectionState,
    TemporaryReserveRequest, TentativeSelection, TicketCategory, MAX_REQUESTED_COUNT,
};
use crate::services::{
    is_adjacent, BlockFinder, CatalogScope, HoldTick, Reconciliation, ReservationSession,
    SeatCatalog, SuggestionRanker,
};

use super::outcome::PickerOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PickerPhase {
    Idle,
    ModeChosen,
    QuantityChosen,
    Selecting,
    ReservedPendingCheckout,
    Expired,
    HandedOff,
}

#[derive(Debug, Clone)]
pub enum PickerAction {
    ChooseMode(SelectionMode),
    /// Out-of-range values are clamped.
    SetQuantity(i64),
    ToggleSeat(i64),
    Checkout,
    ChangeCategory(TicketCategory),
    DismissScatteredNotice,
    RetryCatalog,
    Reset,
    CatalogLoaded {
        request: u64,
        result: Result<SeatCatalog, CatalogFetchError>,
    },
    Reconciled {
        generation: u64,
        result: Result<Reconciliation, CatalogFetchError>,
    },
    Tick,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchCatalog { request: u64, scope: CatalogScope },
    StartHold { expiry: DateTime<Utc> },
    CancelHold,
    TemporaryReserve(TemporaryReserveRequest),
    Reconcile {
        generation: u64,
        scope: CatalogScope,
        selection: TentativeSelection,
    },
}

#[derive(Debug, Default)]
pub struct Step {
    pub effects: Vec<Effect>,
    pub outcomes: Vec<PickerOutcome>,
}

impl Step {
    fn reject(error: ValidationError) -> Self {
        Step {
            effects: Vec::new(),
            outcomes: vec![error.into()],
        }
    }
}

#[derive(Debug, Clone)]
enum CatalogSlot {
    Loading,
    Ready(SeatCatalog),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CatalogStatus {
    Loading,
    Ready,
    Failed,
}

/// Снимок для UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickerSnapshot {
    pub phase: PickerPhase,
    pub category: TicketCategory,
    pub selection: SelectionState,
    pub catalog: CatalogStatus,
    pub catalog_seats: usize,
    /// Сколько мест в области по данным сервера.
    pub catalog_total: i64,
    pub catalog_fetched_at: Option<DateTime<Utc>>,
    pub remaining_seconds: Option<u64>,
    pub scattered_notice: bool,
    pub notices: Vec<PickerOutcome>,
}

pub struct SelectionMachine {
    phase: PickerPhase,
    state: SelectionState,
    event_id: i64,
    area_id: i64,
    category: TicketCategory,
    catalog: CatalogSlot,
    hold: Option<ReservationSession>,
    /// Номер последнего запроса каталога; более старые ответы отбрасываются.
    catalog_request: u64,
    /// Поколение выборки; меняется при каждой новой выборке (режим, категория, сброс).
    generation: u64,
    checkout_in_flight: bool,
    scattered_notice: bool,
    block_finder: BlockFinder,
    ranker: SuggestionRanker,
    settings: PickerConfig,
}

impl SelectionMachine {
    pub fn new(event_id: i64, area_id: i64, category: TicketCategory, settings: PickerConfig) -> Self {
        Self {
            phase: PickerPhase::Idle,
            state: SelectionState::default(),
            event_id,
            area_id,
            category,
            catalog: CatalogSlot::Loading,
            hold: None,
            catalog_request: 0,
            generation: 0,
            checkout_in_flight: false,
            scattered_notice: false,
            block_finder: BlockFinder::new(settings.center_column),
            ranker: SuggestionRanker::new(settings.center_column, settings.suggestion_limit),
            settings,
        }
    }

    /// Открытие picker'а: первая загрузка каталога.
    pub fn open(&mut self) -> Step {
        let mut step = Step::default();
        self.fetch_catalog(&mut step);
        step
    }

    pub fn phase(&self) -> PickerPhase {
        self.phase
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn scope(&self) -> CatalogScope {
        CatalogScope::for_category(self.event_id, self.area_id, &self.category)
    }

    pub fn catalog(&self) -> Option<&SeatCatalog> {
        match &self.catalog {
            CatalogSlot::Ready(catalog) => Some(catalog),
            _ => None,
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> PickerSnapshot {
        let status = match &self.catalog {
            CatalogSlot::Loading => CatalogStatus::Loading,
            CatalogSlot::Ready(_) => CatalogStatus::Ready,
            CatalogSlot::Failed => CatalogStatus::Failed,
        };
        let ready = self.catalog();
        PickerSnapshot {
            phase: self.phase,
            category: self.category.clone(),
            selection: self.state.clone(),
            catalog: status,
            catalog_seats: ready.map_or(0, SeatCatalog::len),
            catalog_total: ready.map_or(0, SeatCatalog::total),
            catalog_fetched_at: ready.map(SeatCatalog::fetched_at),
            remaining_seconds: self.hold.as_ref().map(|h| h.remaining_secs(now)),
            scattered_notice: self.scattered_notice,
            notices: Vec::new(),
        }
    }

    pub fn reduce(&mut self, action: PickerAction, now: DateTime<Utc>) -> Step {
        match action {
            PickerAction::ChooseMode(mode) => self.choose_mode(mode),
            PickerAction::SetQuantity(count) => self.set_quantity(count, now),
            PickerAction::ToggleSeat(seat_id) => self.toggle_seat(seat_id, now),
            PickerAction::Checkout => self.checkout(),
            PickerAction::ChangeCategory(category) => self.change_category(category),
            PickerAction::DismissScatteredNotice => {
                self.scattered_notice = false;
                Step::default()
            }
            PickerAction::RetryCatalog => self.retry_catalog(),
            PickerAction::Reset => {
                let mut step = Step::default();
                self.reset(&mut step);
                step.outcomes.push(PickerOutcome::Reset);
                step
            }
            PickerAction::CatalogLoaded { request, result } => self.catalog_loaded(request, result, now),
            PickerAction::Reconciled { generation, result } => self.reconciled(generation, result, now),
            PickerAction::Tick => self.tick(now),
        }
    }

    // --- Переходы ---

    fn choose_mode(&mut self, mode: SelectionMode) -> Step {
        if mode == SelectionMode::None {
            return Step::reject(ValidationError::ModeNotChosen);
        }
        if self.phase == PickerPhase::HandedOff {
            return Step::reject(self.not_allowed("choose mode"));
        }

        let mut step = Step::default();
        let switching = self.state.mode != SelectionMode::None || self.phase == PickerPhase::Expired;
        self.start_new_selection(&mut step);
        self.state.mode = mode;
        self.phase = PickerPhase::ModeChosen;
        info!(mode = ?mode, "Selection mode chosen");
        step.outcomes.push(PickerOutcome::ModeChosen { mode });

        // смена режима - повод перечитать каталог
        if switching || matches!(self.catalog, CatalogSlot::Failed) {
            self.fetch_catalog(&mut step);
        }
        step
    }

    fn set_quantity(&mut self, count: i64, now: DateTime<Utc>) -> Step {
        match self.phase {
            PickerPhase::Idle | PickerPhase::Expired => {
                return Step::reject(ValidationError::ModeNotChosen)
            }
            PickerPhase::HandedOff => return Step::reject(self.not_allowed("set quantity")),
            _ => {}
        }
        if self.checkout_in_flight {
            return Step::reject(ValidationError::CheckoutInFlight);
        }

        let mut step = Step::default();
        if matches!(
            self.phase,
            PickerPhase::Selecting | PickerPhase::ReservedPendingCheckout
        ) {
            // новое количество - новая выборка в том же режиме
            let mode = self.state.mode;
            self.start_new_selection(&mut step);
            self.state.mode = mode;
        }

        let max = self.max_quantity();
        let requested = count.clamp(1, i64::from(max)) as u32;
        self.state.requested_count = requested;
        self.phase = PickerPhase::QuantityChosen;
        step.outcomes.push(PickerOutcome::QuantitySet {
            requested,
            clamped: i64::from(requested) != count,
        });

        match self.catalog {
            CatalogSlot::Ready(_) => self.enter_selecting(now, &mut step),
            CatalogSlot::Loading => {}
            CatalogSlot::Failed => self.fetch_catalog(&mut step),
        }
        step
    }

    fn enter_selecting(&mut self, now: DateTime<Utc>, step: &mut Step) {
        let CatalogSlot::Ready(catalog) = &self.catalog else {
            return;
        };

        self.phase = PickerPhase::Selecting;
        step.outcomes.push(PickerOutcome::SelectionStarted {
            mode: self.state.mode,
        });

        if self.state.mode == SelectionMode::Fast {
            let requested = self.state.requested_count;
            let block =
                self.block_finder
                    .find_block(catalog.seats(), &self.category.name, requested as usize);
            self.state.selected_seats = block.seats.iter().map(SelectedSeat::from).collect();
            self.state.scattered = block.scattered;
            info!(
                requested,
                found = block.seats.len(),
                scattered = block.scattered,
                "Fast pick block found"
            );

            if block.is_complete(requested as usize) {
                self.confirm(now, step);
            } else {
                step.outcomes.push(PickerOutcome::Underfilled {
                    found: block.seats.len(),
                    requested,
                });
            }
        }
        self.refresh_suggestions();
    }

    fn toggle_seat(&mut self, seat_id: i64, now: DateTime<Utc>) -> Step {
        if !matches!(
            self.phase,
            PickerPhase::Selecting | PickerPhase::ReservedPendingCheckout
        ) {
            return Step::reject(self.not_allowed("toggle seat"));
        }
        if self.checkout_in_flight {
            return Step::reject(ValidationError::CheckoutInFlight);
        }

        let mut step = Step::default();
        if let Some(seat) = self.state.selected_seats.remove(seat_id) {
            if self.release_hold(&mut step) {
                self.phase = PickerPhase::Selecting;
                step.outcomes.push(PickerOutcome::HoldReleased);
            }
            self.state.scattered = !is_adjacent(self.state.selected_seats.seats());
            step.outcomes.push(PickerOutcome::SeatRemoved { seat });
            self.refresh_suggestions();
            return step;
        }

        let Some(seat) = self.catalog().and_then(|c| c.seat(seat_id)) else {
            return Step::reject(ValidationError::UnknownSeat { seat_id });
        };
        if !self.category.admits(&seat.seat_type) {
            return Step::reject(ValidationError::CategoryMismatch {
                code: seat.code.clone(),
                seat_type: seat.seat_type.clone(),
                category: self.category.name.clone(),
            });
        }
        if !seat.status.is_selectable() {
            let mut step = Step::default();
            if seat.status == crate::models::SeatStatus::Pending {
                step.outcomes.push(PickerOutcome::SeatPending {
                    code: seat.code.clone(),
                });
            }
            step.outcomes.push(
                ValidationError::SeatUnavailable {
                    code: seat.code.clone(),
                    status: seat.status,
                }
                .into(),
            );
            return step;
        }
        let requested = self.state.requested_count;
        if self.state.selected_seats.len() >= requested as usize {
            return Step::reject(ValidationError::SelectionFull { requested });
        }

        let seat = SelectedSeat::from(seat);
        self.state.selected_seats.insert(seat.clone());
        self.state.scattered = !is_adjacent(self.state.selected_seats.seats());
        step.outcomes.push(PickerOutcome::SeatAdded { seat });

        if self.state.selected_seats.len() == requested as usize {
            self.confirm(now, &mut step);
        }
        self.refresh_suggestions();
        step
    }

    fn confirm(&mut self, now: DateTime<Utc>, step: &mut Step) {
        let hold = Duration::from_secs(self.settings.hold_duration_seconds);
        let session = ReservationSession::start(now, hold);
        let expiry = session.expiry();

        self.hold = Some(session);
        self.state.reservation_expiry = Some(expiry);
        self.phase = PickerPhase::ReservedPendingCheckout;
        info!(
            seats = self.state.selected_seats.len(),
            %expiry,
            scattered = self.state.scattered,
            "Selection reserved"
        );

        step.effects.push(Effect::StartHold { expiry });
        step.effects.push(Effect::TemporaryReserve(TemporaryReserveRequest {
            event_id: self.event_id,
            seat_ids: self.state.selected_seats.seat_ids(),
            reservation_duration: self.settings.hold_duration_seconds,
        }));
        step.outcomes.push(PickerOutcome::Reserved {
            expiry,
            scattered: self.state.scattered,
        });
        if self.state.scattered {
            self.scattered_notice = true;
            step.outcomes.push(PickerOutcome::ScatteredNotice);
        }
    }

    fn tick(&mut self, now: DateTime<Utc>) -> Step {
        let mut step = Step::default();
        let Some(hold) = self.hold.as_mut() else {
            debug!("Tick without an active hold ignored");
            return step;
        };

        match hold.tick(now) {
            HoldTick::Remaining(remaining) => {
                step.outcomes.push(PickerOutcome::Countdown { remaining });
            }
            HoldTick::Expired => {
                info!("Seat hold expired");
                self.reset(&mut step);
                self.phase = PickerPhase::Expired;
                step.outcomes.push(PickerOutcome::Expired);
            }
            HoldTick::Finished => {}
        }
        step
    }

    fn checkout(&mut self) -> Step {
        if self.checkout_in_flight {
            return Step::reject(ValidationError::CheckoutInFlight);
        }
        if self.phase != PickerPhase::ReservedPendingCheckout {
            let found = self.state.selected_seats.len();
            let requested = self.state.requested_count;
            let error = if self.phase == PickerPhase::Selecting && found < requested as usize {
                ValidationError::Underfilled { found, requested }
            } else {
                ValidationError::NoActiveHold
            };
            return Step::reject(error);
        }

        self.checkout_in_flight = true;
        Step {
            effects: vec![Effect::Reconcile {
                generation: self.generation,
                scope: self.scope(),
                selection: self.state.selected_seats.clone(),
            }],
            outcomes: vec![PickerOutcome::CheckoutStarted],
        }
    }

    fn reconciled(
        &mut self,
        generation: u64,
        result: Result<Reconciliation, CatalogFetchError>,
        now: DateTime<Utc>,
    ) -> Step {
        let mut step = Step::default();
        if generation != self.generation
            || !self.checkout_in_flight
            || self.phase != PickerPhase::ReservedPendingCheckout
        {
            debug!(generation, current = self.generation, "Stale reconciliation discarded");
            return step;
        }
        self.checkout_in_flight = false;

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                step.outcomes.push(PickerOutcome::CatalogFailed {
                    message: e.to_string(),
                });
                return step;
            }
        };

        self.catalog = CatalogSlot::Ready(SeatCatalog::new(
            crate::models::SeatPage {
                seats: report.latest_seats,
                total: report.total,
            },
            now,
        ));

        if report.available {
            let checkout = CheckoutRequest {
                event_id: self.event_id,
                category_ticket_id: self.category.category_id,
                seat_ids: self.state.selected_seats.seat_ids(),
                total_amount: order_total(self.category.unit_price, self.state.selected_seats.len()),
            };
            info!(
                event_id = checkout.event_id,
                seats = checkout.seat_ids.len(),
                total = checkout.total_amount,
                "Selection handed off to checkout"
            );
            self.reset(&mut step);
            self.phase = PickerPhase::HandedOff;
            step.outcomes.push(PickerOutcome::HandedOff { checkout });
            return step;
        }

        // Конфликт: убираем занятые места, замену не подставляем
        for seat in &report.conflicts {
            self.state.selected_seats.remove(seat.seat_id);
        }
        self.release_hold(&mut step);
        self.phase = PickerPhase::Selecting;
        self.scattered_notice = false;
        self.state.scattered = !is_adjacent(self.state.selected_seats.seats());
        info!(
            lost = report.conflicts.len(),
            kept = self.state.selected_seats.len(),
            "Selection conflicts with server state"
        );
        step.outcomes.push(PickerOutcome::Conflict {
            error: ConflictError {
                lost: report.conflicts,
            },
        });
        self.refresh_suggestions();
        step
    }

    fn catalog_loaded(
        &mut self,
        request: u64,
        result: Result<SeatCatalog, CatalogFetchError>,
        now: DateTime<Utc>,
    ) -> Step {
        let mut step = Step::default();
        if request != self.catalog_request {
            debug!(request, current = self.catalog_request, "Stale catalog response discarded");
            return step;
        }

        match result {
            Ok(catalog) => {
                step.outcomes.push(PickerOutcome::CatalogReady {
                    seats: catalog.len(),
                });
                self.catalog = CatalogSlot::Ready(catalog);
                if self.phase == PickerPhase::QuantityChosen {
                    self.enter_selecting(now, &mut step);
                } else {
                    self.refresh_suggestions();
                }
            }
            Err(e) => {
                self.catalog = CatalogSlot::Failed;
                step.outcomes.push(PickerOutcome::CatalogFailed {
                    message: e.to_string(),
                });
            }
        }
        step
    }

    fn change_category(&mut self, category: TicketCategory) -> Step {
        let mut step = Step::default();
        self.reset(&mut step);
        info!(category = %category.name, "Ticket category changed");
        self.category = category;
        step.outcomes.push(PickerOutcome::Reset);
        self.fetch_catalog(&mut step);
        step
    }

    fn retry_catalog(&mut self) -> Step {
        let mut step = Step::default();
        if !matches!(self.catalog, CatalogSlot::Loading) {
            self.fetch_catalog(&mut step);
        }
        step
    }

    // --- Вспомогательные ---

    fn reset(&mut self, step: &mut Step) {
        self.release_hold(step);
        self.generation += 1;
        self.state = SelectionState::default();
        self.phase = PickerPhase::Idle;
        self.checkout_in_flight = false;
        self.scattered_notice = false;
    }

    fn start_new_selection(&mut self, step: &mut Step) {
        let requested = self.state.requested_count;
        self.reset(step);
        self.state.requested_count = requested;
    }

    /// Снимает бронь, если она есть. Возвращает `true`, если бронь была.
    fn release_hold(&mut self, step: &mut Step) -> bool {
        self.state.reservation_expiry = None;
        if self.hold.take().is_some() {
            step.effects.push(Effect::CancelHold);
            true
        } else {
            false
        }
    }

    fn fetch_catalog(&mut self, step: &mut Step) {
        self.catalog_request += 1;
        self.catalog = CatalogSlot::Loading;
        step.effects.push(Effect::FetchCatalog {
            request: self.catalog_request,
            scope: self.scope(),
        });
        step.outcomes.push(PickerOutcome::CatalogLoading);
    }

    fn refresh_suggestions(&mut self) {
        let active = matches!(
            self.phase,
            PickerPhase::Selecting | PickerPhase::ReservedPendingCheckout
        );
        self.state.suggested_seats = match (&self.catalog, active) {
            (CatalogSlot::Ready(catalog), true) => {
                self.ranker
                    .suggest(catalog.seats(), &self.category.name, &self.state.selected_seats)
            }
            _ => Vec::new(),
        };
    }

    fn max_quantity(&self) -> u32 {
        let global = self
            .settings
            .max_tickets_per_order
            .clamp(1, MAX_REQUESTED_COUNT);
        self.category
            .quantity_limit()
            .map_or(global, |limit| limit.min(global))
    }

    fn not_allowed(&self, action: &'static str) -> ValidationError {
        ValidationError::NotAllowed {
            action,
            phase: self.phase,
        }
    }
}
