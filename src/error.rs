// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Error type shared by every setpoint operation.
//!
//! Failures are either configuration problems (caught when a schedule,
//! zone or transition mode is built) or lookup problems that a correct
//! calendar never produces.

use chrono::{NaiveDateTime, NaiveTime};
use std::io;
use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, SetpointError>;

/// Broad category of a [`SetpointError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or incomplete configuration.
    Config,
    /// Calendar lookup produced an impossible value.
    Lookup,
    /// Reading or writing a config file failed.
    Io,
}

#[derive(Debug, Error)]
pub enum SetpointError {
    #[error("window size must be odd (got {0})")]
    EvenWindowSize(u32),

    #[error("window size must be shorter than one day (got {0} minutes)")]
    WindowTooLong(u32),

    #[error("unknown smoothing function: {0}")]
    UnknownSmoothing(String),

    #[error("unknown offset policy: {0}")]
    UnknownOffsetPolicy(String),

    #[error("invalid time window {start}-{end}: start is after end")]
    InvalidWindow { start: NaiveTime, end: NaiveTime },

    #[error("invalid time of day '{0}', expected HH:MM")]
    InvalidTimeOfDay(String),

    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("no holiday calendar for country: {code} (supported: {supported})")]
    UnsupportedCountry { code: String, supported: String },

    #[error("lookahead horizon must be at least one minute")]
    ZeroLookahead,

    #[error("lookahead horizon must be shorter than one day (got {0} minutes)")]
    LookaheadTooLong(u32),

    /// Config file could not be decoded (includes schedules missing a day slot).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("weekday index {0} is out of range")]
    WeekdayOutOfRange(u32),

    #[error("{instant} shifted by {minutes} min is outside the supported date range")]
    InstantOutOfRange { instant: NaiveDateTime, minutes: i64 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SetpointError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SetpointError::WeekdayOutOfRange(_) | SetpointError::InstantOutOfRange { .. } => ErrorKind::Lookup,
            SetpointError::Io(_) => ErrorKind::Io,
            _ => ErrorKind::Config,
        }
    }
}
