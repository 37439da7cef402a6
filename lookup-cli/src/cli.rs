use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use inquire::{Confirm, CustomType, InquireError, Password, PasswordDisplayMode, Select, Text};
use std::{
    io::{self, Write},
    path::Path,
    process::ExitCode,
};
use tracing::{debug, warn};
use weather_lookup_core::{
    Config, ConfiguredPosition, Coordinates, FixedPosition, LocationResolver, OpenWeatherClient,
    PositionSource, ShellError, ShellVariant, UiState, Unit, WeatherShell,
};

use crate::render::{render_state, render_status};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-lookup", version, about = "Weather lookup widget")]
pub struct Cli {
    /// OpenWeather API key; overrides the one in the config file.
    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// "metric" or "imperial"; defaults to the configured unit.
    #[arg(long, global = true)]
    pub units: Option<String>,

    /// Log requests and state changes to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key, default unit and home position.
    Configure,

    /// Show current conditions for a location.
    Current {
        /// Location name, e.g. "London" or "Paris,FR".
        location: String,
    },

    /// Show the five-day forecast for a location, one line per day.
    Forecast {
        /// Location name, e.g. "London" or "Paris,FR".
        location: String,
    },

    /// Show the forecast for the current position.
    Here {
        /// Latitude in decimal degrees; defaults to the configured home position.
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude in decimal degrees.
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
    },

    /// Keep prompting for locations until `:quit`.
    Interactive {
        #[arg(long, value_enum, default_value_t = VariantArg::Forecast)]
        variant: VariantArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum VariantArg {
    Basic,
    Forecast,
    Geolocated,
}

impl From<VariantArg> for ShellVariant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::Basic => ShellVariant::Basic,
            VariantArg::Forecast => ShellVariant::Forecast,
            VariantArg::Geolocated => ShellVariant::Geolocated,
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        let path = Config::config_file_path()?;

        match &self.command {
            Command::Configure => {
                configure(load_for_repair(&path), &path)?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Current { location } => {
                let config = load_checked(&path)?;
                let mut shell = self.shell(&config, ShellVariant::Basic)?;
                shell.set_location_text(location.as_str());
                let outcome = shell.search().await;
                report(shell.state(), outcome)
            }
            Command::Forecast { location } => {
                let config = load_checked(&path)?;
                let mut shell = self.shell(&config, ShellVariant::Forecast)?;
                shell.set_location_text(location.as_str());
                let outcome = shell.search().await;
                report(shell.state(), outcome)
            }
            Command::Here { lat, lon } => {
                let config = load_checked(&path)?;
                let mut shell = self.shell(&config, ShellVariant::Geolocated)?;
                let resolver = resolver_for(&config, lat.zip(*lon))?;
                let outcome = shell.locate(&resolver).await;
                report(shell.state(), outcome)
            }
            Command::Interactive { variant } => {
                let config = load_checked(&path)?;
                let shell = self.shell(&config, (*variant).into())?;
                let resolver = resolver_for(&config, None)?;
                interactive(shell, &resolver).await?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }

    fn shell(
        &self,
        config: &Config,
        variant: ShellVariant,
    ) -> anyhow::Result<WeatherShell<OpenWeatherClient>> {
        let api_key = config.credential_from(self.api_key.as_deref())?;
        let unit = match self.units.as_deref() {
            Some(s) => Unit::try_from(s)?,
            None => config.unit()?,
        };

        debug!(variant = variant.as_str(), %unit, base_url = config.base_url(), "starting shell");

        let client = OpenWeatherClient::with_base_url(api_key, config.base_url().to_string());
        Ok(WeatherShell::new(client, variant, unit))
    }
}

fn load_checked(path: &Path) -> anyhow::Result<Config> {
    let config = Config::load_from(path)?;
    config.validate()?;
    Ok(config)
}

/// `configure` rewrites the file, so an unreadable one must not stop it.
fn load_for_repair(path: &Path) -> Config {
    Config::load_from(path).unwrap_or_else(|e| {
        warn!(error = ?e, "starting configuration from defaults");
        Config::default()
    })
}

/// Prints the rendered state, or only the error message on failure.
fn report(state: &UiState, outcome: Result<(), ShellError>) -> anyhow::Result<ExitCode> {
    let today = Local::now().date_naive();
    write_report(state, &outcome, today, &mut io::stdout().lock(), &mut io::stderr().lock())
        .context("Failed to write output")?;

    Ok(match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    })
}

fn write_report(
    state: &UiState,
    outcome: &Result<(), ShellError>,
    today: NaiveDate,
    out: &mut impl Write,
    err: &mut impl Write,
) -> io::Result<()> {
    match outcome {
        Ok(()) => writeln!(out, "{}", render_state(state, today)),
        Err(e) => writeln!(err, "{e}"),
    }
}

fn resolver_for(config: &Config, explicit: Option<(f64, f64)>) -> anyhow::Result<LocationResolver> {
    let source: Box<dyn PositionSource> = match explicit {
        Some((lat, lon)) => Box::new(FixedPosition(Coordinates::new(lat, lon)?)),
        None => Box::new(ConfiguredPosition::new(config.geolocation.clone())),
    };
    Ok(LocationResolver::new(source))
}

async fn interactive(
    mut shell: WeatherShell<OpenWeatherClient>,
    resolver: &LocationResolver,
) -> anyhow::Result<()> {
    if shell.variant() == ShellVariant::Geolocated {
        // Failures are shown like any other; the prompt still opens.
        let _ = shell.locate(resolver).await;
        println!("{}\n", render_state(shell.state(), Local::now().date_naive()));
    }

    loop {
        let input = match Text::new("Location:")
            .with_placeholder("Enter location here")
            .with_help_message(&render_status(shell.state()))
            .prompt()
        {
            Ok(input) => input,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e).context("Failed to read location"),
        };

        match input.trim() {
            ":quit" | ":q" => break,
            ":unit" | ":u" => {
                let unit = shell.toggle_unit();
                println!("Units switched to {}.", unit.temperature_label());
                continue;
            }
            _ => {}
        }

        shell.set_location_text(input);
        // The outcome is recorded in the state and rendered below.
        let _ = shell.search().await;
        println!("{}\n", render_state(shell.state(), Local::now().date_naive()));
    }

    Ok(())
}

fn configure(mut config: Config, path: &Path) -> anyhow::Result<()> {
    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key.trim().to_string());
    }

    let current = config.unit().unwrap_or_default();
    let start = Unit::all().iter().position(|u| *u == current).unwrap_or(0);
    let unit = Select::new("Default unit:", Unit::all().to_vec())
        .with_starting_cursor(start)
        .prompt()
        .context("Failed to read default unit")?;
    config.set_default_unit(unit);

    config.geolocation.enabled = Confirm::new("Allow looking up weather for your position?")
        .with_default(config.geolocation.enabled)
        .prompt()
        .context("Failed to read geolocation choice")?;

    if config.geolocation.enabled {
        let lat = CustomType::<f64>::new("Home latitude (Esc to skip):").prompt_skippable()?;
        let lon = match lat {
            Some(_) => CustomType::<f64>::new("Home longitude:").prompt_skippable()?,
            None => None,
        };
        if let Some((lat, lon)) = lat.zip(lon) {
            config.set_home(Coordinates::new(lat, lon)?);
        }
    }

    config.save_to(path)?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}
