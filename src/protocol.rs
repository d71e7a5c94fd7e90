// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Client-daemon protocol over Unix domain sockets.
//!
//! Messages are newline-delimited JSON. The client sends a [`Request`]
//! and the daemon replies with a [`Response`]. Instants are naive local
//! wall-clock times in the zone (`YYYY-MM-DDTHH:MM:SS`).

use crate::calendar::DayType;
use crate::engine::{SetpointEngine, Transition};
use crate::error::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Requests (client -> daemon)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Resolve the setpoint. `at` defaults to now, `optimization` to the
    /// daemon's current flag.
    #[serde(rename = "get_setpoint")]
    GetSetpoint {
        #[serde(default)]
        at: Option<NaiveDateTime>,
        #[serde(default)]
        optimization: Option<bool>,
    },

    /// Classify a day without resolving a setpoint.
    #[serde(rename = "get_day_type")]
    GetDayType {
        #[serde(default)]
        at: Option<NaiveDateTime>,
        #[serde(default)]
        optimization: Option<bool>,
    },

    /// Switch optimization mode on or off.
    #[serde(rename = "set_optimization")]
    SetOptimization { enabled: bool },

    /// Request the daemon's current state.
    #[serde(rename = "get_status")]
    GetStatus,

    /// Reload configuration from disk.
    #[serde(rename = "reload_config")]
    ReloadConfig,
}

// ---------------------------------------------------------------------------
// Responses (daemon -> client)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// A resolved setpoint.
    #[serde(rename = "setpoint")]
    Setpoint(Reading),

    /// A day classification.
    #[serde(rename = "day_type")]
    DayType {
        at: NaiveDateTime,
        day_type: DayType,
    },

    /// Current daemon state.
    #[serde(rename = "status")]
    Status {
        timezone: String,
        country: String,
        transition: Transition,
        optimization: bool,
        last: Option<Reading>,
    },

    /// Operation succeeded.
    #[serde(rename = "ok")]
    Ok { message: String },

    /// Operation failed.
    #[serde(rename = "error")]
    Error { message: String },
}

/// One evaluation of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub at: NaiveDateTime,
    pub day_type: DayType,
    pub optimization: bool,
    /// Setpoint before transition easing.
    pub raw: f64,
    /// Setpoint with the configured transition mode applied.
    pub setpoint: f64,
}

impl Reading {
    pub fn take(engine: &SetpointEngine, at: NaiveDateTime, optimization: bool) -> Result<Self> {
        Ok(Self {
            at,
            day_type: engine.day_type(at, optimization)?,
            optimization,
            raw: engine.raw_setpoint(at, optimization)?,
            setpoint: engine.setpoint(at, optimization)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Serialization helpers
// ---------------------------------------------------------------------------

/// Encode a message as a newline-delimited JSON string.
pub fn encode<T: Serialize>(msg: &T) -> std::result::Result<String, serde_json::Error> {
    let mut s = serde_json::to_string(msg)?;
    s.push('\n');
    Ok(s)
}

/// Decode a message from a JSON string (newline-trimmed).
pub fn decode<'a, T: Deserialize<'a>>(s: &'a str) -> std::result::Result<T, serde_json::Error> {
    serde_json::from_str(s.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Zone;
    use crate::schedule::build_constant;

    #[test]
    fn test_request_defaults() {
        let req: Request = decode(r#"{"type":"get_setpoint"}"#).unwrap();
        assert!(matches!(
            req,
            Request::GetSetpoint {
                at: None,
                optimization: None
            }
        ));

        let req: Request =
            decode(r#"{"type":"get_day_type","at":"2024-01-08T07:55:00","optimization":true}"#).unwrap();
        match req {
            Request::GetDayType { at, optimization } => {
                assert_eq!(at.unwrap().to_string(), "2024-01-08 07:55:00");
                assert_eq!(optimization, Some(true));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_encode_is_one_line() {
        let msg = encode(&Request::SetOptimization { enabled: true }).unwrap();
        assert_eq!(msg, "{\"type\":\"set_optimization\",\"enabled\":true}\n");
    }

    #[test]
    fn test_reading_response_shape() {
        let engine = SetpointEngine::new(
            build_constant(20.0),
            Zone::new("Europe/Zurich", "CH").unwrap(),
            Transition::Step,
        )
        .unwrap();
        let at = NaiveDateTime::parse_from_str("2024-08-01 12:00", "%Y-%m-%d %H:%M").unwrap();
        let reading = Reading::take(&engine, at, false).unwrap();
        assert_eq!(reading.day_type, DayType::Holiday);
        assert_eq!(reading.setpoint, 20.0);

        let encoded = encode(&Response::Setpoint(reading)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["type"], "setpoint");
        assert_eq!(value["day_type"], "holiday");
        assert_eq!(value["setpoint"], 20.0);
    }
}
