//! Клиент backend API с местами.
//!
//! Все сетевые вызовы проходят через `CircuitBreaker`. Токен пользователя
//! передается явно через `AuthSession`, глобального состояния нет.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::{CircuitBreakerConfig, SeatApiConfig};
use crate::error::SeatApiError;
use crate::middleware::AuthSession;
use crate::models::{SeatPage, TemporaryReserveRequest};
use crate::services::{CatalogScope, CircuitBreaker, CircuitState, SeatSource};

#[derive(Clone)]
pub struct SeatApiClient {
    http_client: reqwest::Client,
    base_url: String,
    auth: AuthSession,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl SeatApiClient {
    pub fn from_config(
        config: &SeatApiConfig,
        breaker: &CircuitBreakerConfig,
    ) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth: AuthSession::anonymous(),
            circuit_breaker: Arc::new(CircuitBreaker::new(
                breaker.failure_threshold,
                breaker.timeout_seconds,
            )),
        })
    }

    /// Тот же клиент (общий пул соединений и выключатель), но с токеном пользователя.
    pub fn with_auth(&self, auth: AuthSession) -> Self {
        Self {
            auth,
            ..self.clone()
        }
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.get_state()
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .http_client
            .request(method, format!("{}/{}", self.base_url, path));
        match self.auth.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Выполняет запрос, пропуская его через Circuit Breaker.
    async fn execute_with_circuit_breaker<F, T>(&self, operation: F) -> Result<T, SeatApiError>
    where
        F: std::future::Future<Output = Result<T, reqwest::Error>>,
    {
        if !self.circuit_breaker.can_execute() {
            warn!("Circuit breaker is OPEN - blocking seat service request");
            return Err(SeatApiError::CircuitOpen);
        }

        match operation.await {
            Ok(result) => {
                self.circuit_breaker.record_success();
                Ok(result)
            }
            Err(e) => {
                error!("Seat service request failed: {:?}", e);
                self.circuit_breaker.record_failure();
                Err(SeatApiError::from(e))
            }
        }
    }

    /// `GET seats?areaId&eventId[&seatType]`
    pub async fn fetch_seats(&self, scope: &CatalogScope) -> Result<SeatPage, SeatApiError> {
        let mut query = vec![
            ("areaId", scope.area_id.to_string()),
            ("eventId", scope.event_id.to_string()),
        ];
        if let Some(seat_type) = &scope.seat_type {
            query.push(("seatType", seat_type.to_string()));
        }

        let operation = async {
            self.request(reqwest::Method::GET, "seats")
                .query(&query)
                .send()
                .await?
                .error_for_status()?
                .json::<SeatPage>()
                .await
        };

        let page = self.execute_with_circuit_breaker(operation).await?;
        info!(
            event_id = scope.event_id,
            area_id = scope.area_id,
            seats = page.seats.len(),
            "Seat catalog fetched"
        );
        Ok(page)
    }

    /// `POST seats/temporary-reserve`
    ///
    /// Эндпоинт может отсутствовать, поэтому его сбои не учитываются
    /// выключателем и не блокируют загрузку каталога.
    pub async fn temporary_reserve(&self, request: &TemporaryReserveRequest) -> Result<(), SeatApiError> {
        if self.circuit_breaker.get_state() == CircuitState::Open {
            return Err(SeatApiError::CircuitOpen);
        }

        self.request(reqwest::Method::POST, "seats/temporary-reserve")
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        info!(
            event_id = request.event_id,
            seats = request.seat_ids.len(),
            duration = request.reservation_duration,
            "Seats temporarily reserved on server"
        );
        Ok(())
    }
}

#[async_trait]
impl SeatSource for SeatApiClient {
    async fn fetch_seats(&self, scope: &CatalogScope) -> Result<SeatPage, SeatApiError> {
        SeatApiClient::fetch_seats(self, scope).await
    }

    async fn temporary_reserve(&self, request: &TemporaryReserveRequest) -> Result<(), SeatApiError> {
        SeatApiClient::temporary_reserve(self, request).await
    }
}
