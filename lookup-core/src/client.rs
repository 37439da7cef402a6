use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;
use std::fmt::Debug;
use tracing::{debug, warn};

use crate::{
    model::{ForecastPayload, ForecastSample, LocationQuery, WeatherPayload, WeatherQuery},
    units::Unit,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

const DT_TXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Why a request produced no usable payload.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The provider rejected a free-text query, or the request never completed.
    #[error("location '{query}' could not be resolved: {detail}")]
    InvalidLocation { query: String, detail: String },

    /// A coordinate lookup failed at the network or provider level.
    #[error("weather lookup for coordinates failed: {detail}")]
    LocationFetchFailed { detail: String },

    /// The provider answered 2xx but the body did not match the expected schema.
    #[error("malformed provider response: {detail}")]
    MalformedResponse { detail: String },
}

impl FetchError {
    fn request_failed(location: &LocationQuery, detail: String) -> Self {
        match location {
            LocationQuery::Text(query) => FetchError::InvalidLocation {
                query: query.clone(),
                detail,
            },
            LocationQuery::Coordinates(_) => FetchError::LocationFetchFailed { detail },
        }
    }
}

#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    async fn fetch_current(
        &self,
        location: &str,
        unit: Unit,
    ) -> Result<WeatherPayload, FetchError>;

    /// Forecast samples always carry Celsius; `query.unit` is applied later by aggregation.
    async fn fetch_forecast(&self, query: &WeatherQuery) -> Result<ForecastPayload, FetchError>;
}

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherClient {
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    async fn get_json(
        &self,
        endpoint: &str,
        location: &LocationQuery,
        unit: Unit,
    ) -> Result<String, FetchError> {
        let url = format!("{}/{endpoint}", self.base_url);

        let mut params: Vec<(&str, String)> = match location {
            LocationQuery::Text(text) => vec![("q", text.clone())],
            LocationQuery::Coordinates(c) => vec![
                ("lat", c.latitude.to_string()),
                ("lon", c.longitude.to_string()),
            ],
        };
        params.push(("units", unit.as_str().to_string()));
        params.push(("appid", self.api_key.clone()));

        debug!(%url, %location, %unit, "issuing weather request");

        let res = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "weather request did not complete");
                FetchError::request_failed(location, e.to_string())
            })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| FetchError::request_failed(location, e.to_string()))?;

        if !status.is_success() {
            warn!(%status, body = %truncate_body(&body), "weather provider rejected request");
            return Err(FetchError::request_failed(
                location,
                format!("status {status}: {}", truncate_body(&body)),
            ));
        }

        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt_txt: String,
    main: OwForecastMain,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

impl TryFrom<OwForecastEntry> for ForecastSample {
    type Error = FetchError;

    fn try_from(entry: OwForecastEntry) -> Result<Self, Self::Error> {
        let timestamp = NaiveDateTime::parse_from_str(&entry.dt_txt, DT_TXT_FORMAT).map_err(|e| {
            FetchError::MalformedResponse {
                detail: format!("bad dt_txt '{}': {e}", entry.dt_txt),
            }
        })?;

        let description = entry
            .weather
            .into_iter()
            .next()
            .map(|w| w.description)
            .ok_or_else(|| FetchError::MalformedResponse {
                detail: format!("forecast entry {} has no weather description", entry.dt_txt),
            })?;

        Ok(ForecastSample {
            timestamp,
            temperature_celsius: entry.main.temp,
            description,
        })
    }
}

fn parse_current(body: &str, unit: Unit) -> Result<WeatherPayload, FetchError> {
    let parsed: OwCurrentResponse =
        serde_json::from_str(body).map_err(|e| FetchError::MalformedResponse {
            detail: format!("current conditions: {e}"),
        })?;

    Ok(WeatherPayload {
        location_name: parsed.name,
        temperature: parsed.main.temp,
        feels_like: parsed.main.feels_like,
        humidity_pct: parsed.main.humidity,
        wind_speed: parsed.wind.speed,
        unit,
    })
}

fn parse_forecast(body: &str) -> Result<ForecastPayload, FetchError> {
    let parsed: OwForecastResponse =
        serde_json::from_str(body).map_err(|e| FetchError::MalformedResponse {
            detail: format!("forecast: {e}"),
        })?;

    let samples = parsed
        .list
        .into_iter()
        .map(ForecastSample::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ForecastPayload {
        city: parsed.city.name,
        country: parsed.city.country,
        samples,
    })
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    async fn fetch_current(
        &self,
        location: &str,
        unit: Unit,
    ) -> Result<WeatherPayload, FetchError> {
        let query = LocationQuery::Text(location.to_string());
        let body = self.get_json("weather", &query, unit).await?;
        parse_current(&body, unit)
    }

    async fn fetch_forecast(&self, query: &WeatherQuery) -> Result<ForecastPayload, FetchError> {
        let body = self.get_json("forecast", &query.location, Unit::Metric).await?;
        parse_forecast(&body)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
