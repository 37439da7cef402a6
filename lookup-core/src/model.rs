use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::units::Unit;

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> anyhow::Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(anyhow::anyhow!(
                "Invalid coordinates ({latitude}, {longitude}): latitude must be -90..90, \
                 longitude must be -180..180."
            ));
        }

        Ok(Self { latitude, longitude })
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Where a request is aimed: free text typed by the user or a device position.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Text(String),
    Coordinates(Coordinates),
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationQuery::Text(text) => f.write_str(text),
            LocationQuery::Coordinates(coords) => write!(f, "{coords}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherQuery {
    pub location: LocationQuery,
    pub unit: Unit,
}

/// Current conditions, expressed in the unit they were requested with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherPayload {
    pub location_name: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity_pct: u8,
    pub wind_speed: f64,
    pub unit: Unit,
}

/// One 3-hour provider reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    /// Provider wall-clock time, interpreted as the viewer's local time.
    pub timestamp: NaiveDateTime,
    pub temperature_celsius: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPayload {
    pub city: String,
    pub country: String,
    pub samples: Vec<ForecastSample>,
}

/// Display-ready summary of one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayEntry {
    pub date: NaiveDate,
    pub weekday_label: String,
    pub temperature: i64,
    pub description: String,
}

/// Last successful result held by the shell.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherData {
    Current(WeatherPayload),
    Forecast(ForecastPayload),
}
