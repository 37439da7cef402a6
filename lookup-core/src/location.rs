//! Device-position lookup used for the automatic weather request at start-up.

use async_trait::async_trait;
use std::fmt::{self, Debug};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::{config::GeolocationConfig, model::Coordinates};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    NoPermission,
    Unsupported,
}

impl UnavailableReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnavailableReason::NoPermission => "no-permission",
            UnavailableReason::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("location unavailable: {reason}")]
pub struct LocationUnavailable {
    pub reason: UnavailableReason,
}

impl LocationUnavailable {
    pub fn new(reason: UnavailableReason) -> Self {
        Self { reason }
    }
}

/// A single-shot source of the current device position.
#[async_trait]
pub trait PositionSource: Send + Sync + Debug {
    async fn current_position(&self) -> Result<Coordinates, LocationUnavailable>;
}

/// Position taken from the `[geolocation]` section of the config file.
#[derive(Debug, Clone)]
pub struct ConfiguredPosition {
    config: GeolocationConfig,
}

impl ConfiguredPosition {
    pub fn new(config: GeolocationConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PositionSource for ConfiguredPosition {
    async fn current_position(&self) -> Result<Coordinates, LocationUnavailable> {
        if !self.config.enabled {
            return Err(LocationUnavailable::new(UnavailableReason::NoPermission));
        }

        self.config
            .coordinates()
            .ok_or(LocationUnavailable::new(UnavailableReason::Unsupported))
    }
}

/// Position given explicitly, e.g. on the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinates);

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<Coordinates, LocationUnavailable> {
        Ok(self.0)
    }
}

/// Asks its source once and replays that outcome for the resolver's lifetime.
#[derive(Debug)]
pub struct LocationResolver {
    source: Box<dyn PositionSource>,
    outcome: OnceCell<Result<Coordinates, LocationUnavailable>>,
}

impl LocationResolver {
    pub fn new(source: Box<dyn PositionSource>) -> Self {
        Self {
            source,
            outcome: OnceCell::new(),
        }
    }

    pub async fn resolve(&self) -> Result<Coordinates, LocationUnavailable> {
        *self
            .outcome
            .get_or_init(|| async {
                let outcome = self.source.current_position().await;
                match &outcome {
                    Ok(coords) => info!(%coords, "device position resolved"),
                    Err(e) => warn!(reason = %e.reason, "device position unavailable"),
                }
                outcome
            })
            .await
    }
}
