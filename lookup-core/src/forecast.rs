//! Collapses a 3-hourly forecast feed into one entry per calendar day.

use chrono::NaiveDate;

use crate::{
    model::{DayEntry, ForecastSample},
    units::Unit,
};

/// Day entries keyed by date, in the order each date was first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyForecast {
    entries: Vec<DayEntry>,
}

impl DailyForecast {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DayEntry> {
        self.entries.iter()
    }
}

impl IntoIterator for DailyForecast {
    type Item = DayEntry;
    type IntoIter = std::vec::IntoIter<DayEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Picks the earliest sample of every date. Later samples of the same date
/// are dropped, not averaged. Input order is trusted, never re-sorted.
pub fn aggregate_by_day(samples: &[ForecastSample], unit: Unit) -> DailyForecast {
    let mut entries: Vec<DayEntry> = Vec::new();

    for sample in samples {
        let date = sample.timestamp.date();
        if entries.iter().any(|e| e.date == date) {
            continue;
        }

        entries.push(DayEntry {
            date,
            weekday_label: date.format("%a").to_string(),
            temperature: unit.convert_celsius(sample.temperature_celsius).round() as i64,
            description: sample.description.clone(),
        });
    }

    DailyForecast { entries }
}

/// Whether `entry` should be labelled "Today" for a viewer whose local date is `today`.
pub fn is_today(entry: &DayEntry, today: NaiveDate) -> bool {
    entry.date == today
}
