pub mod clock;
pub mod config;
pub mod controllers;
pub mod error;
pub mod middleware;
pub mod models;
pub mod picker;
pub mod seat_client;
pub mod services;

use std::sync::Arc;

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub seat_client: seat_client::SeatApiClient,
    pub pickers: picker::PickerRegistry,
    pub clock: Arc<dyn clock::Clock>,
}

impl AppState {
    pub fn new(config: config::Config) -> Result<Arc<Self>, reqwest::Error> {
        let seat_client =
            seat_client::SeatApiClient::from_config(&config.seat_api, &config.circuit_breaker)?;
        Ok(Self::with_parts(config, seat_client, Arc::new(clock::SystemClock)))
    }

    pub fn with_parts(
        config: config::Config,
        seat_client: seat_client::SeatApiClient,
        clock: Arc<dyn clock::Clock>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            seat_client,
            pickers: picker::PickerRegistry::new(),
            clock,
        })
    }
}
