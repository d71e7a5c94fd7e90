// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Schedule-driven setpoints for building zones.
//!
//! A [`WeeklySchedule`] maps nine day types to ordered time windows. The
//! [`SetpointEngine`] classifies an instant (weekday, holiday or optimization
//! day), resolves the raw setpoint and optionally eases schedule transitions,
//! either by smoothing a per-minute window or by a linear lookahead ramp.

pub mod calendar;
pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod resolver;
pub mod schedule;
pub mod smoothing;

pub use calendar::{DayType, HolidayCalendar, Zone, classify, holiday_calendar_for};
pub use engine::{SetpointEngine, Transition, evaluate, resolve_smoothed};
pub use error::{ErrorKind, Result, SetpointError};
pub use resolver::{resolve, resolve_lookahead};
pub use schedule::{DailyRuleStore, TimeBasedSetpoint, WeeklySchedule, build_cooling, build_heating};
pub use smoothing::{OffsetPolicy, SmoothingKind, SmoothingStrategy, WindowSmoothing};
