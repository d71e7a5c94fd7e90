// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Weekly setpoint schedules.
//!
//! A [`WeeklySchedule`] holds one [`DailyRuleStore`] per day type. Each store
//! is an ordered list of inclusive time windows plus a default setpoint used
//! whenever no window matches. Times are `HH:MM` in config files.

use crate::calendar::DayType;
use crate::error::{Result, SetpointError};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Time windows
// ---------------------------------------------------------------------------

/// A setpoint that applies between two times of day, both inclusive.
///
/// Windows never wrap past midnight: `start_time <= end_time` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WindowRepr", into = "WindowRepr")]
pub struct TimeBasedSetpoint {
    start_time: NaiveTime,
    end_time: NaiveTime,
    setpoint: f64,
}

impl TimeBasedSetpoint {
    pub fn new(start_time: NaiveTime, end_time: NaiveTime, setpoint: f64) -> Result<Self> {
        if start_time > end_time {
            return Err(SetpointError::InvalidWindow {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            start_time,
            end_time,
            setpoint,
        })
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end_time
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    /// Whether `time` falls inside the window (bounds inclusive).
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start_time <= time && time <= self.end_time
    }
}

/// On-disk form of a window, validated on the way in.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WindowRepr {
    #[serde(with = "hhmm")]
    start: NaiveTime,
    #[serde(with = "hhmm")]
    end: NaiveTime,
    setpoint: f64,
}

impl TryFrom<WindowRepr> for TimeBasedSetpoint {
    type Error = SetpointError;

    fn try_from(repr: WindowRepr) -> Result<Self> {
        TimeBasedSetpoint::new(repr.start, repr.end, repr.setpoint)
    }
}

impl From<TimeBasedSetpoint> for WindowRepr {
    fn from(window: TimeBasedSetpoint) -> Self {
        Self {
            start: window.start_time,
            end: window.end_time,
            setpoint: window.setpoint,
        }
    }
}

// ---------------------------------------------------------------------------
// Daily and weekly stores
// ---------------------------------------------------------------------------

/// Ordered time windows for one day type. The first matching window wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRuleStore {
    /// Windows in declaration order. They may overlap.
    #[serde(default)]
    pub windows: Vec<TimeBasedSetpoint>,
    /// Setpoint used when no window matches.
    pub default_setpoint: f64,
}

impl DailyRuleStore {
    pub fn new(windows: Vec<TimeBasedSetpoint>, default_setpoint: f64) -> Self {
        Self {
            windows,
            default_setpoint,
        }
    }

    /// A store with no windows.
    pub fn constant(setpoint: f64) -> Self {
        Self::new(Vec::new(), setpoint)
    }
}

/// One rule store for every day type.
///
/// Every slot is a required field, so a schedule cannot be built (or
/// decoded from TOML) with a day type missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub monday: DailyRuleStore,
    pub tuesday: DailyRuleStore,
    pub wednesday: DailyRuleStore,
    pub thursday: DailyRuleStore,
    pub friday: DailyRuleStore,
    pub saturday: DailyRuleStore,
    pub sunday: DailyRuleStore,
    pub holiday: DailyRuleStore,
    pub optimization_day: DailyRuleStore,
}

impl WeeklySchedule {
    /// The rule store that applies to a day type.
    pub fn store_for(&self, day: DayType) -> &DailyRuleStore {
        match day {
            DayType::Monday => &self.monday,
            DayType::Tuesday => &self.tuesday,
            DayType::Wednesday => &self.wednesday,
            DayType::Thursday => &self.thursday,
            DayType::Friday => &self.friday,
            DayType::Saturday => &self.saturday,
            DayType::Sunday => &self.sunday,
            DayType::Holiday => &self.holiday,
            DayType::OptimizationDay => &self.optimization_day,
        }
    }

    /// Assign the workday and rest-day profiles the way the office builders do.
    ///
    /// Mon-Fri and the optimization day always work; Saturday and holidays
    /// always rest; Sunday follows `works_saturdays`.
    fn from_profiles(workday: DailyRuleStore, rest_day: DailyRuleStore, works_saturdays: bool) -> Self {
        let sunday = if works_saturdays {
            workday.clone()
        } else {
            rest_day.clone()
        };
        Self {
            monday: workday.clone(),
            tuesday: workday.clone(),
            wednesday: workday.clone(),
            thursday: workday.clone(),
            friday: workday.clone(),
            saturday: rest_day.clone(),
            sunday,
            holiday: rest_day,
            optimization_day: workday,
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Whether a zone is being heated or cooled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlType {
    Heating,
    Cooling,
}

/// Heating schedule: warm (`high_sp`) during work hours, `low_sp` otherwise.
pub fn build_heating(
    work_start: NaiveTime,
    work_end: NaiveTime,
    high_sp: f64,
    low_sp: f64,
    works_saturdays: bool,
) -> Result<WeeklySchedule> {
    let workday = DailyRuleStore::new(
        vec![TimeBasedSetpoint::new(work_start, work_end, high_sp)?],
        low_sp,
    );
    let rest_day = DailyRuleStore::constant(low_sp);
    Ok(WeeklySchedule::from_profiles(workday, rest_day, works_saturdays))
}

/// Cooling schedule: cool (`low_sp`) during work hours, `high_sp` otherwise.
pub fn build_cooling(
    work_start: NaiveTime,
    work_end: NaiveTime,
    high_sp: f64,
    low_sp: f64,
    works_saturdays: bool,
) -> Result<WeeklySchedule> {
    let workday = DailyRuleStore::new(
        vec![TimeBasedSetpoint::new(work_start, work_end, low_sp)?],
        high_sp,
    );
    let rest_day = DailyRuleStore::constant(high_sp);
    Ok(WeeklySchedule::from_profiles(workday, rest_day, works_saturdays))
}

/// Dispatch to the heating or cooling builder.
pub fn build_office(
    control: ControlType,
    work_start: NaiveTime,
    work_end: NaiveTime,
    high_sp: f64,
    low_sp: f64,
    works_saturdays: bool,
) -> Result<WeeklySchedule> {
    match control {
        ControlType::Heating => build_heating(work_start, work_end, high_sp, low_sp, works_saturdays),
        ControlType::Cooling => build_cooling(work_start, work_end, high_sp, low_sp, works_saturdays),
    }
}

/// The same setpoint around the clock, every day.
pub fn build_constant(setpoint: f64) -> WeeklySchedule {
    let store = DailyRuleStore::constant(setpoint);
    WeeklySchedule::from_profiles(store.clone(), store, true)
}

// ---------------------------------------------------------------------------
// HH:MM parsing
// ---------------------------------------------------------------------------

/// Parse a `HH:MM` time of day.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| SetpointError::InvalidTimeOfDay(s.to_string()))
}

/// Serde adapter for `HH:MM` strings.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_time_of_day(&s).map_err(serde::de::Error::custom)
    }
}
