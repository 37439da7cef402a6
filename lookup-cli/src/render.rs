//! Plain-text rendering of the UI state.

use chrono::NaiveDate;
use weather_lookup_core::{
    DailyForecast, ForecastPayload, UiState, Unit, WeatherData, WeatherPayload, is_today,
};

pub fn render_state(state: &UiState, today: NaiveDate) -> String {
    if let Some(err) = state.error {
        return err.to_string();
    }

    match &state.data {
        Some(WeatherData::Current(payload)) => render_current(payload),
        Some(WeatherData::Forecast(payload)) => {
            let days = state.daily_forecast().unwrap_or_default();
            render_forecast(payload, &days, state.unit, today)
        }
        None => "Enter a location to see the weather.".to_string(),
    }
}

/// One-line footer for the interactive prompt.
pub fn render_status(state: &UiState) -> String {
    format!(
        "Units: {} ({}). Commands: :unit to toggle, :quit to exit.",
        state.unit.temperature_label(),
        state.unit
    )
}

fn render_current(payload: &WeatherPayload) -> String {
    let t = payload.unit.temperature_label();
    format!(
        "{}\n  Temperature: {}{t}\n  Feels like:  {}{t}\n  Humidity:    {}%\n  Wind:        {} {}",
        payload.location_name,
        payload.temperature.round() as i64,
        payload.feels_like.round() as i64,
        payload.humidity_pct,
        payload.wind_speed.round() as i64,
        payload.unit.speed_label(),
    )
}

fn render_forecast(
    payload: &ForecastPayload,
    days: &DailyForecast,
    unit: Unit,
    today: NaiveDate,
) -> String {
    let mut out = format!("{}, {}", payload.city, payload.country);

    if days.is_empty() {
        out.push_str("\n  No forecast data.");
        return out;
    }

    for day in days.iter() {
        let label = if is_today(day, today) { "Today" } else { day.weekday_label.as_str() };
        out.push_str(&format!(
            "\n  {label:<5}  {}  {:>4}{}  {}",
            day.date.format("%Y-%m-%d"),
            day.temperature,
            unit.temperature_label(),
            day.description,
        ));
    }

    out
}
