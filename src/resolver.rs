// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Setpoint lookup within one day.
//!
//! [`resolve`] returns the raw, stepped setpoint for a time of day.
//! [`resolve_lookahead`] eases into and out of windows with a linear ramp
//! over a fixed lookahead horizon.

use crate::error::{Result, SetpointError};
use crate::schedule::{DailyRuleStore, TimeBasedSetpoint};
use chrono::{NaiveTime, Timelike};

/// Default lookahead horizon for [`resolve_lookahead`], in minutes.
pub const DEFAULT_LOOKAHEAD_MINUTES: u32 = 30;

/// Upper bound (exclusive) for window and lookahead lengths.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Drop seconds and sub-seconds: schedules work at minute resolution.
pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// First window that contains `time`, in declaration order.
fn first_match(store: &DailyRuleStore, time: NaiveTime) -> Option<&TimeBasedSetpoint> {
    store.windows.iter().find(|w| w.contains(time))
}

/// Resolve the setpoint for a time of day.
///
/// The first window (in declaration order) containing `time` wins, no matter
/// how narrow later overlapping windows are. Falls back to the default.
pub fn resolve(store: &DailyRuleStore, time: NaiveTime) -> f64 {
    let time = truncate_to_minute(time);
    first_match(store, time)
        .map(|w| w.setpoint())
        .unwrap_or(store.default_setpoint)
}

/// Resolve with a linear ramp ahead of and behind each window.
///
/// - outside now and `lookahead_minutes` later: the default
/// - inside at both points: the matching window's setpoint
/// - entering a window within the horizon: ramp from the default up to the
///   window's setpoint, reaching it at the window start
/// - leaving a window within the horizon: ramp from the window's setpoint
///   down to the default, reaching it at the window end
///
/// A lookahead point past midnight never counts as inside a window.
pub fn resolve_lookahead(store: &DailyRuleStore, time: NaiveTime, lookahead_minutes: u32) -> Result<f64> {
    if lookahead_minutes == 0 {
        return Err(SetpointError::ZeroLookahead);
    }

    let now = minute_of_day(truncate_to_minute(time));
    let horizon = lookahead_minutes as f64;

    let current = first_match(store, truncate_to_minute(time));
    let upcoming = now
        .checked_add(lookahead_minutes)
        .filter(|&ahead| ahead < MINUTES_PER_DAY)
        .and_then(|ahead| {
            store
                .windows
                .iter()
                .find(|w| minute_of_day(w.start_time()) <= ahead && ahead <= minute_of_day(w.end_time()))
        });

    let default = store.default_setpoint;
    let value = match (current, upcoming) {
        (None, None) => default,
        (Some(window), Some(_)) => window.setpoint(),
        (None, Some(window)) => {
            let slope = (window.setpoint() - default) / horizon;
            let ramp_start = minute_of_day(window.start_time()) as f64 - horizon;
            slope * (now as f64 - ramp_start) + default
        }
        (Some(window), None) => {
            let slope = (default - window.setpoint()) / horizon;
            let ramp_start = minute_of_day(window.end_time()) as f64 - horizon;
            slope * (now as f64 - ramp_start) + window.setpoint()
        }
    };

    log::trace!("lookahead at {time}: {value}");
    Ok(value)
}
