//! reservation.rs
//!
//! Клиентское удержание выбранных мест на фиксированное время.
//!
//! 1.  **ReservationSession**: срок действия брони и расчет оставшегося времени.
//!     Истечение срабатывает ровно один раз.
//! 2.  **CountdownTimer**: фоновая задача, которая раз в период шлет тик
//!     владельцу. Отменяется явно или при drop, поэтому таймер не "утекает".

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Результат очередного тика обратного отсчета.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldTick {
    /// Бронь еще действует, осталось столько секунд.
    Remaining(u64),
    /// Срок вышел только что. Возвращается один раз.
    Expired,
    /// Бронь уже истекла ранее, повторно не срабатывает.
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationSession {
    expiry: DateTime<Utc>,
    expired: bool,
}

impl ReservationSession {
    pub fn start(now: DateTime<Utc>, hold: Duration) -> Self {
        let hold = ChronoDuration::from_std(hold).unwrap_or(ChronoDuration::MAX);
        Self {
            expiry: now.checked_add_signed(hold).unwrap_or(DateTime::<Utc>::MAX_UTC),
            expired: false,
        }
    }

    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// `max(0, floor((expiry - now) / 1s))`
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.expiry - now).num_milliseconds().max(0);
        (millis / 1000) as u64
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> HoldTick {
        if self.expired {
            return HoldTick::Finished;
        }
        match self.remaining_secs(now) {
            0 => {
                self.expired = true;
                HoldTick::Expired
            }
            remaining => HoldTick::Remaining(remaining),
        }
    }
}

/// Периодический тик, отменяемый через drop.
#[derive(Debug)]
pub struct CountdownTimer {
    handle: JoinHandle<()>,
}

impl CountdownTimer {
    /// Первый тик приходит через `period`, а не сразу.
    pub fn start<T, F>(period: Duration, sink: mpsc::UnboundedSender<T>, mut make_tick: F) -> Self
    where
        T: Send + 'static,
        F: FnMut() -> T + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if sink.send(make_tick()).is_err() {
                    debug!("Countdown receiver dropped, stopping timer");
                    break;
                }
            }
        });
        Self { handle }
    }

    pub fn cancel(self) {
        // остановка происходит в Drop
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 19, 0, 0).single().unwrap()
    }

    #[test]
    fn remaining_counts_down_and_floors() {
        let session = ReservationSession::start(t0(), Duration::from_secs(300));
        assert_eq!(session.expiry(), t0() + ChronoDuration::seconds(300));
        assert_eq!(session.remaining_secs(t0()), 300);
        assert_eq!(session.remaining_secs(t0() + ChronoDuration::milliseconds(1500)), 298);
        assert_eq!(session.remaining_secs(t0() + ChronoDuration::seconds(400)), 0);
    }

    #[test]
    fn remaining_is_non_increasing() {
        let session = ReservationSession::start(t0(), Duration::from_secs(30));
        let mut last = u64::MAX;
        for ms in (0..40_000).step_by(250) {
            let now = t0() + ChronoDuration::milliseconds(ms);
            let remaining = session.remaining_secs(now);
            assert!(remaining <= last);
            last = remaining;
        }
    }

    #[test]
    fn expiry_fires_once() {
        let mut session = ReservationSession::start(t0(), Duration::from_secs(2));
        assert_eq!(session.tick(t0() + ChronoDuration::seconds(1)), HoldTick::Remaining(1));
        assert_eq!(session.tick(t0() + ChronoDuration::seconds(2)), HoldTick::Expired);
        assert_eq!(session.tick(t0() + ChronoDuration::seconds(3)), HoldTick::Finished);
        assert!(session.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_ticks_every_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut n = 0u32;
        let _timer = CountdownTimer::start(Duration::from_secs(1), tx, move || {
            n += 1;
            n
        });
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_timer_stops_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timer = CountdownTimer::start(Duration::from_secs(1), tx, || ());
        assert_eq!(rx.recv().await, Some(()));
        timer.cancel();
        // задача прервана - отправитель уничтожен, канал закрывается
        assert_eq!(rx.recv().await, None);
    }
}
