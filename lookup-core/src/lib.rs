//! Core library for the `weather-lookup` widget.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather client and its failure classification
//! - Per-day forecast aggregation and unit conversion
//! - The UI state machine shared by every front end
//!
//! It is used by `weather-lookup-cli`, but can also be reused by other binaries or services.

pub mod client;
pub mod config;
pub mod forecast;
pub mod location;
pub mod model;
pub mod shell;
pub mod units;

pub use client::{FetchError, OpenWeatherClient, WeatherClient};
pub use config::{Config, GeolocationConfig};
pub use forecast::{DailyForecast, aggregate_by_day, is_today};
pub use location::{
    ConfiguredPosition, FixedPosition, LocationResolver, LocationUnavailable, PositionSource,
    UnavailableReason,
};
pub use model::{
    Coordinates, DayEntry, ForecastPayload, ForecastSample, LocationQuery, WeatherData,
    WeatherPayload, WeatherQuery,
};
pub use shell::{Phase, ShellError, ShellVariant, Ticket, UiState, WeatherShell};
pub use units::{Unit, to_fahrenheit};
