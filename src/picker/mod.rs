//! SelectionController: единственная точка, через которую UI меняет выборку.
//!
//! Контроллер владеет машиной состояний и исполняет ее эффекты. Сетевые
//! запросы запускаются отдельными задачами, их результаты возвращаются в
//! контроллер как действия и применяются по одному (кооперативная модель
//! одного потока). Таймер обратного отсчета у контроллера всегда один.

pub mod outcome;
pub mod registry;
pub mod state;

pub use outcome::PickerOutcome;
pub use registry::PickerRegistry;
pub use state::{CatalogStatus, Effect, PickerAction, PickerPhase, PickerSnapshot, SelectionMachine, Step};

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::PickerConfig;
use crate::error::CatalogFetchError;
use crate::models::TicketCategory;
use crate::services::{ConflictReconciler, CountdownTimer, SeatCatalog, SeatSource};

/// Сколько асинхронных уведомлений держим до того, как UI их заберет.
const MAX_QUEUED_NOTICES: usize = 64;

pub struct SelectionController {
    machine: SelectionMachine,
    source: Arc<dyn SeatSource>,
    clock: Arc<dyn Clock>,
    countdown: Option<CountdownTimer>,
    tick_period: Duration,
    loopback_tx: mpsc::UnboundedSender<PickerAction>,
    loopback_rx: mpsc::UnboundedReceiver<PickerAction>,
    notices: VecDeque<PickerOutcome>,
}

impl SelectionController {
    pub fn new(
        source: Arc<dyn SeatSource>,
        clock: Arc<dyn Clock>,
        event_id: i64,
        area_id: i64,
        category: TicketCategory,
        settings: PickerConfig,
    ) -> Self {
        let (loopback_tx, loopback_rx) = mpsc::unbounded_channel();
        let tick_period = Duration::from_millis(settings.countdown_tick_millis.max(1));
        Self {
            machine: SelectionMachine::new(event_id, area_id, category, settings),
            source,
            clock,
            countdown: None,
            tick_period,
            loopback_tx,
            loopback_rx,
            notices: VecDeque::new(),
        }
    }

    /// Запускает первую загрузку каталога.
    pub fn open(&mut self) -> Vec<PickerOutcome> {
        let step = self.machine.open();
        self.apply(step)
    }

    pub fn phase(&self) -> PickerPhase {
        self.machine.phase()
    }

    pub fn machine(&self) -> &SelectionMachine {
        &self.machine
    }

    pub fn has_live_timer(&self) -> bool {
        self.countdown.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn snapshot(&mut self) -> PickerSnapshot {
        let mut snapshot = self.machine.snapshot(self.clock.now());
        snapshot.notices = self.notices.drain(..).collect();
        snapshot
    }

    pub fn dispatch(&mut self, action: PickerAction) -> Vec<PickerOutcome> {
        let step = self.machine.reduce(action, self.clock.now());
        self.apply(step)
    }

    /// Ждет следующего асинхронного события (ответ сети, тик) и применяет его.
    pub async fn pump(&mut self) -> Vec<PickerOutcome> {
        match self.loopback_rx.recv().await {
            Some(action) => self.dispatch(action),
            // отправитель хранится в самом контроллере
            None => Vec::new(),
        }
    }

    fn apply(&mut self, step: Step) -> Vec<PickerOutcome> {
        for effect in step.effects {
            self.execute(effect);
        }
        step.outcomes
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::FetchCatalog { request, scope } => {
                let source = self.source.clone();
                let clock = self.clock.clone();
                let loopback = self.loopback_tx.clone();
                tokio::spawn(async move {
                    let result = source
                        .fetch_seats(&scope)
                        .await
                        .map(|page| SeatCatalog::new(page, clock.now()))
                        .map_err(CatalogFetchError::from);
                    let _ = loopback.send(PickerAction::CatalogLoaded { request, result });
                });
            }
            Effect::StartHold { expiry } => {
                info!(%expiry, "Starting hold countdown");
                // старый таймер (если был) останавливается при замене
                self.countdown = Some(CountdownTimer::start(
                    self.tick_period,
                    self.loopback_tx.clone(),
                    || PickerAction::Tick,
                ));
            }
            Effect::CancelHold => {
                if let Some(timer) = self.countdown.take() {
                    timer.cancel();
                }
            }
            Effect::TemporaryReserve(request) => {
                let source = self.source.clone();
                tokio::spawn(async move {
                    if let Err(e) = source.temporary_reserve(&request).await {
                        warn!(
                            event_id = request.event_id,
                            "Server-side temporary reserve failed, keeping client hold: {}", e
                        );
                    }
                });
            }
            Effect::Reconcile {
                generation,
                scope,
                selection,
            } => {
                let reconciler = ConflictReconciler::new(self.source.clone());
                let loopback = self.loopback_tx.clone();
                tokio::spawn(async move {
                    let result = reconciler.reconcile(&selection, &scope).await;
                    let _ = loopback.send(PickerAction::Reconciled { generation, result });
                });
            }
        }
    }

    fn queue_notices(&mut self, outcomes: Vec<PickerOutcome>) {
        for outcome in outcomes {
            if matches!(outcome, PickerOutcome::Countdown { .. }) {
                continue;
            }
            if self.notices.len() == MAX_QUEUED_NOTICES {
                self.notices.pop_front();
            }
            self.notices.push_back(outcome);
        }
    }

    /// Запускает контроллер в собственной задаче и возвращает дескриптор.
    pub fn spawn(mut self) -> (PickerHandle, Vec<PickerOutcome>) {
        let (tx, rx) = mpsc::channel(32);
        let opened = self.open();
        tokio::spawn(self.run(rx));
        (PickerHandle { tx }, opened)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<PickerCommand>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(PickerCommand::Dispatch { action, reply }) => {
                        let outcomes = self.dispatch(action);
                        let _ = reply.send(outcomes);
                    }
                    Some(PickerCommand::Snapshot { reply }) => {
                        let _ = reply.send(self.snapshot());
                    }
                    Some(PickerCommand::Close) | None => break,
                },
                Some(action) = self.loopback_rx.recv() => {
                    let outcomes = self.dispatch(action);
                    self.queue_notices(outcomes);
                }
            }
        }

        let step = self.machine.reduce(PickerAction::Reset, self.clock.now());
        self.apply(step);
        info!("Picker closed");
    }
}

enum PickerCommand {
    Dispatch {
        action: PickerAction,
        reply: oneshot::Sender<Vec<PickerOutcome>>,
    },
    Snapshot {
        reply: oneshot::Sender<PickerSnapshot>,
    },
    Close,
}

#[derive(Debug, thiserror::Error)]
#[error("picker is closed")]
pub struct PickerClosed;

/// Дескриптор работающего контроллера.
#[derive(Clone)]
pub struct PickerHandle {
    tx: mpsc::Sender<PickerCommand>,
}

impl PickerHandle {
    pub async fn dispatch(&self, action: PickerAction) -> Result<Vec<PickerOutcome>, PickerClosed> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PickerCommand::Dispatch { action, reply })
            .await
            .map_err(|_| PickerClosed)?;
        rx.await.map_err(|_| PickerClosed)
    }

    pub async fn snapshot(&self) -> Result<PickerSnapshot, PickerClosed> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PickerCommand::Snapshot { reply })
            .await
            .map_err(|_| PickerClosed)?;
        rx.await.map_err(|_| PickerClosed)
    }

    pub async fn close(&self) {
        let _ = self.tx.send(PickerCommand::Close).await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
