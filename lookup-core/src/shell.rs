//! UI state container shared by every front end.
//!
//! A search is split into two phases so callers that run requests
//! concurrently can still keep the state consistent:
//! [`WeatherShell::issue_search`] validates input and hands out a [`Ticket`],
//! the ticket is executed against a [`WeatherClient`], and
//! [`WeatherShell::apply`] stores the outcome. Only the most recently issued
//! ticket may change the state; older results are dropped.

use tracing::{info, warn};

use crate::{
    client::{FetchError, WeatherClient},
    forecast::{DailyForecast, aggregate_by_day},
    location::{LocationResolver, UnavailableReason},
    model::{LocationQuery, WeatherData, WeatherQuery},
    units::Unit,
};

/// Which flavour of the widget is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShellVariant {
    /// Current conditions for a typed location.
    #[default]
    Basic,
    /// Five-day forecast for a typed location.
    Forecast,
    /// Forecast, plus one automatic lookup of the device position at start.
    Geolocated,
}

impl ShellVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShellVariant::Basic => "basic",
            ShellVariant::Forecast => "forecast",
            ShellVariant::Geolocated => "geolocated",
        }
    }

    pub fn shows_forecast(&self) -> bool {
        !matches!(self, ShellVariant::Basic)
    }
}

/// User-facing failure. `Display` is the exact message shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ShellError {
    #[error("Please enter a location.")]
    EmptyInput,
    #[error("Please enter a valid location.")]
    InvalidLocation,
    #[error("Location access was denied.")]
    GeolocationDenied,
    #[error("Geolocation is not supported on this device.")]
    GeolocationUnsupported,
    #[error("Unable to fetch weather for your location.")]
    GeolocationFetchFailed,
    #[error("Received an unexpected response from the weather service.")]
    MalformedResponse,
}

impl From<&FetchError> for ShellError {
    fn from(err: &FetchError) -> Self {
        match err {
            FetchError::InvalidLocation { .. } => ShellError::InvalidLocation,
            FetchError::LocationFetchFailed { .. } => ShellError::GeolocationFetchFailed,
            FetchError::MalformedResponse { .. } => ShellError::MalformedResponse,
        }
    }
}

impl From<UnavailableReason> for ShellError {
    fn from(reason: UnavailableReason) -> Self {
        match reason {
            UnavailableReason::NoPermission => ShellError::GeolocationDenied,
            UnavailableReason::Unsupported => ShellError::GeolocationUnsupported,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Success,
    Failure,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiState {
    pub data: Option<WeatherData>,
    pub location_text: String,
    pub error: Option<ShellError>,
    pub unit: Unit,
}

impl UiState {
    /// Forecast data collapsed to one entry per day in the currently selected unit.
    pub fn daily_forecast(&self) -> Option<DailyForecast> {
        match &self.data {
            Some(WeatherData::Forecast(payload)) => {
                Some(aggregate_by_day(&payload.samples, self.unit))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    Current,
    Forecast,
}

/// A request that has passed validation and is ready to run.
#[derive(Debug, Clone)]
pub struct Ticket {
    id: RequestId,
    kind: RequestKind,
    query: WeatherQuery,
}

impl Ticket {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub async fn execute<C>(&self, client: &C) -> Result<WeatherData, FetchError>
    where
        C: WeatherClient + ?Sized,
    {
        match (self.kind, &self.query.location) {
            (RequestKind::Current, LocationQuery::Text(text)) => client
                .fetch_current(text, self.query.unit)
                .await
                .map(WeatherData::Current),
            _ => client
                .fetch_forecast(&self.query)
                .await
                .map(WeatherData::Forecast),
        }
    }
}

#[derive(Debug)]
pub struct WeatherShell<C> {
    client: C,
    variant: ShellVariant,
    state: UiState,
    last_issued: u64,
    pending: Option<RequestId>,
}

impl<C: WeatherClient> WeatherShell<C> {
    pub fn new(client: C, variant: ShellVariant, unit: Unit) -> Self {
        Self {
            client,
            variant,
            state: UiState {
                unit,
                ..UiState::default()
            },
            last_issued: 0,
            pending: None,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn variant(&self) -> ShellVariant {
        self.variant
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        if self.pending.is_some() {
            Phase::Loading
        } else if self.state.error.is_some() {
            Phase::Failure
        } else if self.state.data.is_some() {
            Phase::Success
        } else {
            Phase::Idle
        }
    }

    pub fn set_location_text(&mut self, text: impl Into<String>) {
        self.state.location_text = text.into();
    }

    /// Switches the display unit. Never issues a request.
    pub fn toggle_unit(&mut self) -> Unit {
        self.state.unit = self.state.unit.toggled();
        self.state.unit
    }

    /// Validates the typed location and clears the input field.
    ///
    /// Blank input fails immediately with [`ShellError::EmptyInput`].
    pub fn issue_search(&mut self) -> Result<Ticket, ShellError> {
        let text = std::mem::take(&mut self.state.location_text);
        let id = self.next_id();
        let text = text.trim();

        if text.is_empty() {
            self.fail(ShellError::EmptyInput);
            return Err(ShellError::EmptyInput);
        }

        let kind = if self.variant.shows_forecast() {
            RequestKind::Forecast
        } else {
            RequestKind::Current
        };

        Ok(self.ticket(id, kind, LocationQuery::Text(text.to_string())))
    }

    /// Asks the resolver for the device position. The text field is left alone.
    pub async fn issue_locate(
        &mut self,
        resolver: &LocationResolver,
    ) -> Result<Ticket, ShellError> {
        let id = self.next_id();

        match resolver.resolve().await {
            Ok(coords) => {
                let location = LocationQuery::Coordinates(coords);
                Ok(self.ticket(id, RequestKind::Forecast, location))
            }
            Err(unavailable) => {
                let err = ShellError::from(unavailable.reason);
                self.fail(err);
                Err(err)
            }
        }
    }

    /// Stores a ticket's outcome. Returns `false` if a newer ticket has been
    /// issued since, in which case the state is left untouched.
    pub fn apply(&mut self, ticket: &Ticket, result: Result<WeatherData, FetchError>) -> bool {
        if ticket.id.get() != self.last_issued {
            warn!(
                request = ticket.id.get(),
                latest = self.last_issued,
                "discarding stale weather response"
            );
            return false;
        }

        self.pending = None;
        match result {
            Ok(data) => {
                info!(
                    request = ticket.id.get(),
                    query = %ticket.query.location,
                    "weather data updated"
                );
                self.state.error = None;
                self.state.data = Some(data);
            }
            Err(e) => {
                warn!(request = ticket.id.get(), error = %e, "weather request failed");
                self.fail(ShellError::from(&e));
            }
        }
        true
    }

    /// Submits the typed location and waits for the outcome.
    pub async fn search(&mut self) -> Result<(), ShellError> {
        let ticket = self.issue_search()?;
        let result = ticket.execute(&self.client).await;
        self.apply(&ticket, result);
        self.outcome()
    }

    /// Runs the automatic lookup for the device position.
    pub async fn locate(&mut self, resolver: &LocationResolver) -> Result<(), ShellError> {
        let ticket = self.issue_locate(resolver).await?;
        let result = ticket.execute(&self.client).await;
        self.apply(&ticket, result);
        self.outcome()
    }

    fn outcome(&self) -> Result<(), ShellError> {
        match self.state.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn next_id(&mut self) -> RequestId {
        self.last_issued += 1;
        self.pending = None;
        RequestId(self.last_issued)
    }

    fn ticket(&mut self, id: RequestId, kind: RequestKind, location: LocationQuery) -> Ticket {
        self.pending = Some(id);
        Ticket {
            id,
            kind,
            query: WeatherQuery {
                location,
                unit: self.state.unit,
            },
        }
    }

    fn fail(&mut self, err: ShellError) {
        self.state.data = None;
        self.state.error = Some(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::GeolocationConfig,
        location::{ConfiguredPosition, FixedPosition},
        model::{Coordinates, ForecastPayload, ForecastSample, WeatherPayload},
    };
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    /// Answers from memory; any location in `unknown` is rejected.
    #[derive(Debug, Default, Clone)]
    struct StubClient {
        calls: Arc<AtomicUsize>,
        unknown: Vec<String>,
        geo_broken: bool,
        queries: Arc<Mutex<Vec<WeatherQuery>>>,
    }

    impl StubClient {
        fn rejecting(names: &[&str]) -> Self {
            Self {
                unknown: names.iter().map(|s| s.to_string()).collect(),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn sample(ts: &str, temp: f64) -> ForecastSample {
        ForecastSample {
            timestamp: NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S")
                .expect("test timestamp must parse"),
            temperature_celsius: temp,
            description: "scattered clouds".into(),
        }
    }

    #[async_trait]
    impl WeatherClient for StubClient {
        async fn fetch_current(
            &self,
            location: &str,
            unit: Unit,
        ) -> Result<WeatherPayload, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unknown.iter().any(|u| u == location) {
                return Err(FetchError::InvalidLocation {
                    query: location.to_string(),
                    detail: "status 404 Not Found".into(),
                });
            }
            Ok(WeatherPayload {
                location_name: location.to_string(),
                temperature: 12.0,
                feels_like: 10.5,
                humidity_pct: 60,
                wind_speed: 3.1,
                unit,
            })
        }

        async fn fetch_forecast(
            &self,
            query: &WeatherQuery,
        ) -> Result<ForecastPayload, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().expect("lock").push(query.clone());
            match &query.location {
                LocationQuery::Text(t) if self.unknown.contains(t) => {
                    Err(FetchError::InvalidLocation {
                        query: t.clone(),
                        detail: "status 404 Not Found".into(),
                    })
                }
                LocationQuery::Coordinates(_) if self.geo_broken => {
                    Err(FetchError::LocationFetchFailed {
                        detail: "connection reset".into(),
                    })
                }
                _ => Ok(ForecastPayload {
                    city: "Berlin".into(),
                    country: "DE".into(),
                    samples: vec![
                        sample("2024-01-01 12:00:00", 10.0),
                        sample("2024-01-01 15:00:00", 20.0),
                        sample("2024-01-02 00:00:00", 5.0),
                    ],
                }),
            }
        }
    }

    fn basic(client: StubClient) -> WeatherShell<StubClient> {
        WeatherShell::new(client, ShellVariant::Basic, Unit::Metric)
    }

    #[test]
    fn starts_idle() {
        let shell = basic(StubClient::default());
        assert_eq!(shell.phase(), Phase::Idle);
        assert_eq!(shell.state().data, None);
        assert_eq!(shell.state().error, None);
    }

    #[tokio::test]
    async fn empty_input_never_hits_the_network() {
        let client = StubClient::default();
        let mut shell = basic(client.clone());

        shell.set_location_text("   ");
        let err = shell.search().await.unwrap_err();

        assert_eq!(err, ShellError::EmptyInput);
        assert_eq!(
            shell.state().error.map(|e| e.to_string()).as_deref(),
            Some("Please enter a location.")
        );
        assert_eq!(client.calls(), 0);
        assert_eq!(shell.phase(), Phase::Failure);
    }

    #[tokio::test]
    async fn failed_search_clears_data_and_success_clears_error() {
        let client = StubClient::rejecting(&["Atlantis"]);
        let mut shell = basic(client.clone());

        shell.set_location_text("Paris");
        shell.search().await.expect("Paris resolves");
        assert!(shell.state().data.is_some());

        shell.set_location_text("Atlantis");
        let err = shell.search().await.unwrap_err();
        assert_eq!(err.to_string(), "Please enter a valid location.");
        assert_eq!(shell.state().data, None);

        shell.set_location_text("Paris");
        shell.search().await.expect("Paris resolves again");
        assert_eq!(shell.state().error, None);
        assert_eq!(shell.phase(), Phase::Success);
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn input_is_cleared_whatever_the_outcome() {
        let mut shell = basic(StubClient::rejecting(&["Atlantis"]));

        shell.set_location_text("Atlantis");
        let _ = shell.search().await;
        assert_eq!(shell.state().location_text, "");

        shell.set_location_text("");
        let _ = shell.search().await;
        assert_eq!(shell.state().location_text, "");

        shell.set_location_text("Rome");
        shell.search().await.expect("Rome resolves");
        assert_eq!(shell.state().location_text, "");
    }

    #[tokio::test]
    async fn toggle_unit_does_not_refetch() {
        let client = StubClient::default();
        let mut shell = WeatherShell::new(client.clone(), ShellVariant::Forecast, Unit::Metric);

        shell.set_location_text("Berlin");
        shell.search().await.expect("Berlin resolves");
        let before = client.calls();

        assert_eq!(shell.toggle_unit(), Unit::Imperial);
        assert_eq!(shell.state().unit.temperature_label(), "°F");
        assert_eq!(client.calls(), before);
    }

    #[tokio::test]
    async fn forecast_is_aggregated_in_selected_unit() {
        let mut shell =
            WeatherShell::new(StubClient::default(), ShellVariant::Forecast, Unit::Metric);

        shell.set_location_text("Berlin");
        shell.search().await.expect("Berlin resolves");

        let temps: Vec<i64> = shell
            .state()
            .daily_forecast()
            .expect("forecast data")
            .iter()
            .map(|d| d.temperature)
            .collect();
        assert_eq!(temps, vec![10, 5]);

        shell.toggle_unit();
        let temps: Vec<i64> = shell
            .state()
            .daily_forecast()
            .expect("forecast data")
            .iter()
            .map(|d| d.temperature)
            .collect();
        assert_eq!(temps, vec![50, 41]);
    }

    #[tokio::test]
    async fn current_conditions_keep_fetched_unit() {
        let mut shell = basic(StubClient::default());

        shell.set_location_text("Paris");
        shell.search().await.expect("Paris resolves");
        shell.toggle_unit();

        match &shell.state().data {
            Some(WeatherData::Current(p)) => assert_eq!(p.unit, Unit::Metric),
            other => panic!("expected current conditions, got {other:?}"),
        }
        assert!(shell.state().daily_forecast().is_none());
    }

    #[tokio::test]
    async fn stale_response_is_discarded() {
        let client = StubClient::default();
        let mut shell = basic(client.clone());

        shell.set_location_text("Madrid");
        let first = shell.issue_search().expect("valid input");
        shell.set_location_text("Lima");
        let second = shell.issue_search().expect("valid input");
        assert!(first.id() < second.id());
        assert_eq!(shell.phase(), Phase::Loading);

        let second_result = second.execute(shell.client()).await;
        let first_result = first.execute(shell.client()).await;

        assert!(shell.apply(&second, second_result));
        assert!(!shell.apply(&first, first_result));

        match &shell.state().data {
            Some(WeatherData::Current(p)) => assert_eq!(p.location_name, "Lima"),
            other => panic!("expected Lima, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_input_supersedes_pending_request() {
        let mut shell = basic(StubClient::default());

        shell.set_location_text("Madrid");
        let pending = shell.issue_search().expect("valid input");
        shell.set_location_text("");
        assert!(shell.issue_search().is_err());

        let result = pending.execute(shell.client()).await;
        assert!(!shell.apply(&pending, result));
        assert_eq!(shell.state().error, Some(ShellError::EmptyInput));
    }

    #[tokio::test]
    async fn locate_uses_coordinates_and_keeps_text() {
        let client = StubClient::default();
        let mut shell = WeatherShell::new(client.clone(), ShellVariant::Geolocated, Unit::Imperial);
        let coords = Coordinates::new(52.52, 13.405).expect("valid coordinates");
        let resolver = LocationResolver::new(Box::new(FixedPosition(coords)));

        shell.set_location_text("half-typed");
        shell.locate(&resolver).await.expect("position resolves");

        assert_eq!(shell.state().location_text, "half-typed");
        let queries = client.queries.lock().expect("lock");
        assert_eq!(queries[0].location, LocationQuery::Coordinates(coords));
        assert_eq!(queries[0].unit, Unit::Imperial);
    }

    #[tokio::test]
    async fn locate_reports_permission_and_support_separately() {
        let client = StubClient::default();
        let mut shell = WeatherShell::new(client.clone(), ShellVariant::Geolocated, Unit::Metric);

        let denied = LocationResolver::new(Box::new(ConfiguredPosition::new(GeolocationConfig {
            enabled: false,
            latitude: None,
            longitude: None,
        })));
        assert_eq!(shell.locate(&denied).await, Err(ShellError::GeolocationDenied));

        let unsupported =
            LocationResolver::new(Box::new(ConfiguredPosition::new(GeolocationConfig::default())));
        assert_eq!(shell.locate(&unsupported).await, Err(ShellError::GeolocationUnsupported));

        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn locate_network_failure_is_distinct() {
        let client = StubClient {
            geo_broken: true,
            ..StubClient::default()
        };
        let mut shell = WeatherShell::new(client, ShellVariant::Geolocated, Unit::Metric);
        let coords = Coordinates::new(0.0, 0.0).expect("valid coordinates");
        let resolver = LocationResolver::new(Box::new(FixedPosition(coords)));

        let err = shell.locate(&resolver).await.unwrap_err();
        assert_eq!(err, ShellError::GeolocationFetchFailed);
        assert_eq!(err.to_string(), "Unable to fetch weather for your location.");
    }

    #[test]
    fn malformed_response_maps_to_its_own_message() {
        let err = ShellError::from(&FetchError::MalformedResponse { detail: "x".into() });
        assert_eq!(err, ShellError::MalformedResponse);
    }
}
