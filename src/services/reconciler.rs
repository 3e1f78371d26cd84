use std::sync::Arc;
use tracing::{info, warn};

use crate::error::CatalogFetchError;
use crate::models::{Seat, TentativeSelection};

use super::catalog::{CatalogScope, SeatSource};

/// Итог сверки предварительной выборки с сервером.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub available: bool,
    /// Актуальные записи выбранных мест, которые больше не `AVAILABLE`.
    pub conflicts: Vec<Seat>,
    pub latest_seats: Vec<Seat>,
    pub total: i64,
}

/// Перед оплатой заново читает авторитетный список мест и сравнивает его с выборкой.
#[derive(Clone)]
pub struct ConflictReconciler {
    source: Arc<dyn SeatSource>,
}

impl ConflictReconciler {
    pub fn new(source: Arc<dyn SeatSource>) -> Self {
        Self { source }
    }

    pub async fn reconcile(
        &self,
        selection: &TentativeSelection,
        scope: &CatalogScope,
    ) -> Result<Reconciliation, CatalogFetchError> {
        let page = self.source.fetch_seats(scope).await.map_err(|e| {
            warn!(event_id = scope.event_id, area_id = scope.area_id, "Reconciliation fetch failed: {}", e);
            CatalogFetchError::from(e)
        })?;

        let report = diff(selection, page.seats, page.total);
        info!(
            event_id = scope.event_id,
            area_id = scope.area_id,
            selected = selection.len(),
            conflicts = report.conflicts.len(),
            "Selection reconciled"
        );
        Ok(report)
    }
}

/// `conflicts = selection ∩ {s ∈ latest : s.status != AVAILABLE}`
pub fn diff(selection: &TentativeSelection, latest_seats: Vec<Seat>, total: i64) -> Reconciliation {
    let conflicts: Vec<Seat> = latest_seats
        .iter()
        .filter(|s| !s.status.is_selectable() && selection.contains(s.seat_id))
        .cloned()
        .collect();

    Reconciliation {
        available: conflicts.is_empty(),
        conflicts,
        latest_seats,
        total,
    }
}
