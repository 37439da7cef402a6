use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

use crate::{client::DEFAULT_BASE_URL, model::Coordinates, units::Unit};

/// Stand-in for the device geolocation capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeolocationConfig {
    /// `false` behaves like a denied permission prompt.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

fn default_enabled() -> bool {
    true
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            latitude: None,
            longitude: None,
        }
    }
}

impl GeolocationConfig {
    /// Both halves must be present and in range.
    pub fn coordinates(&self) -> Option<Coordinates> {
        let (lat, lon) = self.latitude.zip(self.longitude)?;
        match Coordinates::new(lat, lon) {
            Ok(coords) => Some(coords),
            Err(e) => {
                warn!(error = %e, "ignoring out-of-range home position in config");
                None
            }
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// default_unit = "imperial"
///
/// [geolocation]
/// enabled = true
/// latitude = 52.52
/// longitude = 13.405
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub api_key: Option<String>,

    /// Override for the provider endpoint root.
    pub base_url: Option<String>,

    /// "metric" or "imperial".
    pub default_unit: Option<String>,

    #[serde(default)]
    pub geolocation: GeolocationConfig,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Checks the values serde accepts but the app cannot use.
    pub fn validate(&self) -> Result<()> {
        self.unit()?;

        if let Some((lat, lon)) = self.geolocation.latitude.zip(self.geolocation.longitude) {
            Coordinates::new(lat, lon)
                .context("Invalid home position in the [geolocation] section of the config file")?;
        }

        Ok(())
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-lookup", "weather-lookup")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// Pick the credential to inject into the client: an explicit value wins over the file.
    pub fn credential_from(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key())
            .map(str::to_owned)
            .ok_or_else(|| {
                anyhow!(
                    "No API key configured.\n\
                     Hint: run `weather-lookup configure` or set OPENWEATHER_API_KEY."
                )
            })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Default unit as a strongly-typed value; metric when unset.
    pub fn unit(&self) -> Result<Unit> {
        match self.default_unit.as_deref() {
            None => Ok(Unit::default()),
            Some(s) => Unit::try_from(s).context("Invalid `default_unit` in config file"),
        }
    }

    pub fn set_default_unit(&mut self, unit: Unit) {
        self.default_unit = Some(unit.as_str().to_string());
    }

    pub fn set_home(&mut self, coords: Coordinates) {
        self.geolocation.latitude = Some(coords.latitude);
        self.geolocation.longitude = Some(coords.longitude);
    }
}
