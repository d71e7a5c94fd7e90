// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Configuration file handling.
//!
//! Describes the zone, its weekly schedule and the transition mode in TOML.
//! Default path: `/etc/setpointd/config.toml`

use crate::calendar::{Zone, holiday_calendar_for, parse_timezone};
use crate::engine::Transition;
use crate::error::{Result, SetpointError};
use crate::schedule::{self, ControlType, WeeklySchedule, hhmm};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default config file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/setpointd/config.toml";

/// Default daemon socket path.
pub const DEFAULT_SOCKET_PATH: &str = "/run/setpointd.sock";

/// Default poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 60_000;

pub const DEFAULT_TIMEZONE: &str = "Europe/Vienna";

pub const DEFAULT_COUNTRY: &str = "AT";

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Daemon settings.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Location of the zone.
    #[serde(default)]
    pub zone: ZoneConfig,

    /// Weekly setpoint schedule.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// How schedule transitions are eased.
    #[serde(default)]
    pub transition: Transition,
}

/// Daemon-specific settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// How often the daemon re-evaluates the setpoint, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Path for the Unix domain socket.
    #[serde(default = "default_socket_path")]
    pub socket_path: String,

    /// Start with optimization mode enabled.
    #[serde(default)]
    pub optimization: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            socket_path: DEFAULT_SOCKET_PATH.to_string(),
            optimization: false,
        }
    }
}

/// Timezone and holiday calendar of the zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// IANA timezone, e.g. "Europe/Berlin".
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// ISO country code for public holidays.
    #[serde(default = "default_country")]
    pub country: String,

    /// Extra closing days (YYYY-MM-DD).
    #[serde(default)]
    pub custom_holidays: Vec<NaiveDate>,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
            custom_holidays: Vec::new(),
        }
    }
}

impl ZoneConfig {
    pub fn build(&self) -> Result<Zone> {
        Ok(Zone {
            timezone: parse_timezone(&self.timezone)?,
            calendar: holiday_calendar_for(&self.country)?
                .with_custom_holidays(self.custom_holidays.iter().copied()),
        })
    }
}

/// Work hours and setpoints for the office-style builders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficeHours {
    #[serde(with = "hhmm")]
    pub work_start: NaiveTime,
    #[serde(with = "hhmm")]
    pub work_end: NaiveTime,
    pub high_setpoint: f64,
    pub low_setpoint: f64,
    #[serde(default)]
    pub works_saturdays: bool,
}

/// Where the weekly schedule comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScheduleConfig {
    Heating(OfficeHours),
    Cooling(OfficeHours),
    Constant { setpoint: f64 },
    /// Every day type spelled out.
    Custom { days: WeeklySchedule },
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig::Heating(OfficeHours {
            work_start: time_of_day(8, 0),
            work_end: time_of_day(17, 0),
            high_setpoint: 22.0,
            low_setpoint: 18.0,
            works_saturdays: false,
        })
    }
}

impl ScheduleConfig {
    pub fn build(&self) -> Result<WeeklySchedule> {
        let office = |control: ControlType, hours: &OfficeHours| {
            schedule::build_office(
                control,
                hours.work_start,
                hours.work_end,
                hours.high_setpoint,
                hours.low_setpoint,
                hours.works_saturdays,
            )
        };
        match self {
            ScheduleConfig::Heating(hours) => office(ControlType::Heating, hours),
            ScheduleConfig::Cooling(hours) => office(ControlType::Cooling, hours),
            ScheduleConfig::Constant { setpoint } => Ok(schedule::build_constant(*setpoint)),
            ScheduleConfig::Custom { days } => Ok(days.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Load / Save
// ---------------------------------------------------------------------------

/// Parse and check a TOML config.
pub fn parse_config(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents)
        .map_err(|e| SetpointError::InvalidConfig(format!("Failed to parse config: {e}")))?;
    config.transition.validate()?;
    Ok(config)
}

/// Load config from a TOML file, or return the default if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        log::info!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(path)?;
    let config = parse_config(&contents)?;

    log::info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Save config to a TOML file, creating parent directories if needed.
pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| SetpointError::InvalidConfig(format!("Failed to serialize config: {e}")))?;

    fs::write(path, contents)?;
    log::info!("Saved config to {}", path.display());
    Ok(())
}

/// Resolve the config file path from CLI arg or default.
pub fn resolve_config_path(cli_path: Option<&str>) -> PathBuf {
    cli_path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_socket_path() -> String {
    DEFAULT_SOCKET_PATH.to_string()
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

fn time_of_day(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}
