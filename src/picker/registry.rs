use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use super::PickerHandle;

struct Entry {
    handle: PickerHandle,
    last_seen: Instant,
}

/// Открытые picker'ы по идентификатору.
#[derive(Clone, Default)]
pub struct PickerRegistry {
    pickers: Arc<RwLock<HashMap<Uuid, Entry>>>,
}

impl PickerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, handle: PickerHandle) -> Uuid {
        let id = Uuid::new_v4();
        let entry = Entry {
            handle,
            last_seen: Instant::now(),
        };
        self.pickers.write().await.insert(id, entry);
        id
    }

    /// Любое обращение к picker'у продлевает ему жизнь.
    pub async fn get(&self, id: &Uuid) -> Option<PickerHandle> {
        let mut pickers = self.pickers.write().await;
        let entry = pickers.get_mut(id)?;
        entry.last_seen = Instant::now();
        Some(entry.handle.clone())
    }

    /// Убирает picker из реестра и останавливает его (бронь и таймер снимаются).
    pub async fn close(&self, id: &Uuid) -> bool {
        let entry = self.pickers.write().await.remove(id);
        match entry {
            Some(entry) => {
                entry.handle.close().await;
                true
            }
            None => false,
        }
    }

    /// Удаляет записи, чьи контроллеры уже завершились, и закрывает брошенные:
    /// те, к которым не обращались дольше `idle_timeout`.
    pub async fn prune_closed(&self, idle_timeout: Duration) -> usize {
        let now = Instant::now();
        let (stopped, abandoned) = {
            let mut pickers = self.pickers.write().await;
            let before = pickers.len();
            pickers.retain(|_, entry| !entry.handle.is_closed());
            let stopped = before - pickers.len();

            let idle: Vec<Uuid> = pickers
                .iter()
                .filter(|(_, entry)| now.duration_since(entry.last_seen) > idle_timeout)
                .map(|(id, _)| *id)
                .collect();
            let abandoned: Vec<PickerHandle> = idle
                .iter()
                .filter_map(|id| pickers.remove(id))
                .map(|entry| entry.handle)
                .collect();
            (stopped, abandoned)
        };

        // закрываем уже без блокировки: контроллер может ответить не сразу
        for handle in &abandoned {
            handle.close().await;
        }

        let pruned = stopped + abandoned.len();
        if pruned > 0 {
            info!(
                "Pruned {} pickers ({} stopped, {} idle)",
                pruned,
                stopped,
                abandoned.len()
            );
        }
        pruned
    }

    pub async fn len(&self) -> usize {
        self.pickers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pickers.read().await.is_empty()
    }
}
