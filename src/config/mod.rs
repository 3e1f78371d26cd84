use serde::Deserialize;
use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::models::MAX_REQUESTED_COUNT;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub seat_api: SeatApiConfig,
    pub picker: PickerConfig,
    pub circuit_breaker: CircuitBreakerConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    pub prune_interval_seconds: u64,
    /// Через сколько секунд без обращений picker считается брошенным.
    pub picker_idle_timeout_seconds: u64,
}

// Настройки backend API с местами
#[derive(Debug, Clone, Deserialize)]
pub struct SeatApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

/// Параметры подбора мест и удержания брони.
#[derive(Debug, Clone, Deserialize)]
pub struct PickerConfig {
    /// Длительность удержания выбранных мест (секунды).
    pub hold_duration_seconds: u64,
    /// Опорная колонка "центра зала" для подбора ближайших мест.
    /// Зависит от раскладки площадки.
    pub center_column: i32,
    pub max_tickets_per_order: u32,
    pub suggestion_limit: usize,
    pub countdown_tick_millis: u64,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            hold_duration_seconds: 300,
            center_column: 10,
            max_tickets_per_order: MAX_REQUESTED_COUNT,
            suggestion_limit: 5,
            countdown_tick_millis: 1000,
        }
    }
}

// Настройки Circuit Breaker
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parsed_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let picker_defaults = PickerConfig::default();

        let config = Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parsed_or("PORT", 8000)?,
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "seat_picker=debug,tower_http=debug".to_string()),
                prune_interval_seconds: parsed_or("PICKER_PRUNE_INTERVAL_SECONDS", 60)?,
                picker_idle_timeout_seconds: parsed_or("PICKER_IDLE_TIMEOUT_SECONDS", 1800)?,
            },
            seat_api: SeatApiConfig {
                base_url: required("SEAT_API_URL")?.trim_end_matches('/').to_string(),
                timeout_seconds: parsed_or("SEAT_API_TIMEOUT_SECONDS", 10)?,
            },
            picker: PickerConfig {
                hold_duration_seconds: parsed_or(
                    "HOLD_DURATION_SECONDS",
                    picker_defaults.hold_duration_seconds,
                )?,
                center_column: parsed_or("CENTER_COLUMN", picker_defaults.center_column)?,
                max_tickets_per_order: parsed_or(
                    "MAX_TICKETS_PER_ORDER",
                    picker_defaults.max_tickets_per_order,
                )?,
                suggestion_limit: parsed_or("SUGGESTION_LIMIT", picker_defaults.suggestion_limit)?,
                countdown_tick_millis: parsed_or(
                    "COUNTDOWN_TICK_MILLIS",
                    picker_defaults.countdown_tick_millis,
                )?,
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: parsed_or("CIRCUIT_BREAKER_FAILURE_THRESHOLD", 5)?,
                timeout_seconds: parsed_or("CIRCUIT_BREAKER_TIMEOUT_SECONDS", 30)?,
            },
        };

        config.picker.validate()?;
        Ok(config)
    }
}

impl PickerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_REQUESTED_COUNT).contains(&self.max_tickets_per_order) {
            return Err(ConfigError::Invalid {
                name: "MAX_TICKETS_PER_ORDER",
                value: self.max_tickets_per_order.to_string(),
            });
        }
        if self.countdown_tick_millis == 0 {
            return Err(ConfigError::Invalid {
                name: "COUNTDOWN_TICK_MILLIS",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}
