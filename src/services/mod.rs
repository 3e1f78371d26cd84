pub mod adjacency;
pub mod block_finder;
pub mod catalog;
pub mod circuit_breaker;
pub mod reconciler;
pub mod reservation;
pub mod suggestions;

pub use adjacency::is_adjacent;
pub use block_finder::{Block, BlockFinder};
pub use catalog::{CatalogScope, SeatCatalog, SeatSource};
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use reconciler::{ConflictReconciler, Reconciliation};
pub use reservation::{CountdownTimer, HoldTick, ReservationSession};
pub use suggestions::SuggestionRanker;
