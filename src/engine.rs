// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Setpoint evaluation for a zone.
//!
//! [`evaluate`] gives the raw, stepped setpoint at an instant.
//! [`resolve_smoothed`] removes the step at schedule transitions by sampling
//! one setpoint per minute around the instant and reducing the window with a
//! smoothing strategy. [`SetpointEngine`] bundles a frozen schedule, a zone
//! and the chosen [`Transition`] mode behind a single call.

use crate::calendar::{DayType, Zone, classify};
use crate::config::Config;
use crate::error::{Result, SetpointError};
use crate::resolver::{self, DEFAULT_LOOKAHEAD_MINUTES, MINUTES_PER_DAY};
use crate::schedule::WeeklySchedule;
use crate::smoothing::{OffsetPolicy, SmoothingKind, WindowSmoothing};
use chrono::{NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Raw setpoint at an instant: classify the day, then resolve its time of day.
pub fn evaluate(
    schedule: &WeeklySchedule,
    instant: NaiveDateTime,
    zone: &Zone,
    optimization: bool,
) -> Result<f64> {
    let day = classify(instant, zone.timezone, &zone.calendar, optimization)?;
    Ok(resolver::resolve(schedule.store_for(day), instant.time()))
}

/// Setpoint at an instant with transitions smoothed over a sample window.
///
/// The setpoint at the instant is compared against the setpoints
/// `window_minutes / 2` minutes before and `window_minutes / 2 + 1` minutes
/// after. If all three agree no transition is near and the raw value is
/// returned. Otherwise one sample per minute is evaluated over the offset
/// policy's range and reduced by the configured strategy.
///
/// Each sampled minute is classified on its own date, so windows may cross
/// midnight.
pub fn resolve_smoothed(
    schedule: &WeeklySchedule,
    instant: NaiveDateTime,
    zone: &Zone,
    optimization: bool,
    smoothing: &WindowSmoothing,
) -> Result<f64> {
    smoothing.validate()?;

    let half = i64::from(smoothing.window_minutes / 2);
    let at = |minutes: i64| evaluate(schedule, shift(instant, minutes)?, zone, optimization);

    let current = at(0)?;
    let window_start = at(-half)?;
    let window_end = at(half + 1)?;

    if current == window_start && current == window_end {
        return Ok(current);
    }

    let samples = smoothing
        .offset
        .offsets(smoothing.window_minutes)
        .map(at)
        .collect::<Result<Vec<_>>>()?;
    let value = smoothing.reduce(&samples);

    log::debug!(
        "Transition near {instant}: {current} -> {value} ({} over {} min, {:?})",
        smoothing.strategy,
        smoothing.window_minutes,
        smoothing.offset
    );
    Ok(value)
}

/// `instant` moved by whole minutes, or an error past chrono's date range.
pub fn shift(instant: NaiveDateTime, minutes: i64) -> Result<NaiveDateTime> {
    instant
        .checked_add_signed(TimeDelta::minutes(minutes))
        .ok_or(SetpointError::InstantOutOfRange { instant, minutes })
}

// ---------------------------------------------------------------------------
// Transition modes
// ---------------------------------------------------------------------------

/// How schedule transitions are eased. Exactly one mode is active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Transition {
    /// No easing: setpoints step at window boundaries.
    Step,
    /// Per-minute window reduced by a smoothing strategy.
    Window(WindowSmoothing),
    /// Linear ramp over a lookahead horizon.
    Lookahead {
        #[serde(default = "default_lookahead")]
        lookahead_minutes: u32,
    },
}

impl Default for Transition {
    fn default() -> Self {
        Transition::Window(WindowSmoothing {
            strategy: SmoothingKind::Mean,
            window_minutes: 31,
            offset: OffsetPolicy::Centered,
        })
    }
}

impl Transition {
    pub fn validate(&self) -> Result<()> {
        match self {
            Transition::Step => Ok(()),
            Transition::Window(smoothing) => smoothing.validate(),
            Transition::Lookahead { lookahead_minutes: 0 } => Err(SetpointError::ZeroLookahead),
            Transition::Lookahead { lookahead_minutes } if *lookahead_minutes >= MINUTES_PER_DAY => {
                Err(SetpointError::LookaheadTooLong(*lookahead_minutes))
            }
            Transition::Lookahead { .. } => Ok(()),
        }
    }
}

fn default_lookahead() -> u32 {
    DEFAULT_LOOKAHEAD_MINUTES
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// A frozen schedule for one zone, ready for concurrent evaluation.
#[derive(Debug, Clone)]
pub struct SetpointEngine {
    schedule: Arc<WeeklySchedule>,
    zone: Zone,
    transition: Transition,
}

impl SetpointEngine {
    pub fn new(schedule: WeeklySchedule, zone: Zone, transition: Transition) -> Result<Self> {
        transition.validate()?;
        Ok(Self {
            schedule: Arc::new(schedule),
            zone,
            transition,
        })
    }

    /// Build the schedule, zone and transition mode described by a config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let engine = Self::new(config.schedule.build()?, config.zone.build()?, config.transition)?;
        log::info!(
            "Setpoint engine ready: {} ({}), transition {:?}",
            config.zone.timezone,
            engine.zone.calendar.country().iso_code(),
            engine.transition
        );
        Ok(engine)
    }

    pub fn schedule(&self) -> &WeeklySchedule {
        &self.schedule
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    pub fn transition(&self) -> Transition {
        self.transition
    }

    /// Current wall-clock time in the zone.
    pub fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.zone.timezone).naive_local()
    }

    pub fn day_type(&self, instant: NaiveDateTime, optimization: bool) -> Result<DayType> {
        classify(instant, self.zone.timezone, &self.zone.calendar, optimization)
    }

    /// Setpoint without any transition easing.
    pub fn raw_setpoint(&self, instant: NaiveDateTime, optimization: bool) -> Result<f64> {
        evaluate(&self.schedule, instant, &self.zone, optimization)
    }

    /// Setpoint with the configured transition mode applied.
    pub fn setpoint(&self, instant: NaiveDateTime, optimization: bool) -> Result<f64> {
        match self.transition {
            Transition::Step => self.raw_setpoint(instant, optimization),
            Transition::Window(smoothing) => {
                resolve_smoothed(&self.schedule, instant, &self.zone, optimization, &smoothing)
            }
            Transition::Lookahead { lookahead_minutes } => {
                let day = self.day_type(instant, optimization)?;
                resolver::resolve_lookahead(self.schedule.store_for(day), instant.time(), lookahead_minutes)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{DailyRuleStore, TimeBasedSetpoint, build_heating};
    use chrono::{NaiveDate, NaiveTime};

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, 0).unwrap()
    }

    fn office() -> WeeklySchedule {
        build_heating(hm(8, 0), hm(17, 0), 22.0, 18.0, false).unwrap()
    }

    fn vienna() -> Zone {
        Zone::new("Europe/Vienna", "AT").unwrap()
    }

    fn gaussian(window_minutes: u32, offset: OffsetPolicy) -> WindowSmoothing {
        WindowSmoothing {
            strategy: SmoothingKind::GaussianConvolution,
            window_minutes,
            offset,
        }
    }

    // 2024-01-08 is a Monday, 2024-01-13 a Saturday.

    #[test]
    fn test_office_scenario() {
        let (s, z) = (office(), vienna());
        assert_eq!(evaluate(&s, at(2024, 1, 8, 10, 0), &z, false).unwrap(), 22.0);
        assert_eq!(evaluate(&s, at(2024, 1, 8, 20, 0), &z, false).unwrap(), 18.0);
        assert_eq!(evaluate(&s, at(2024, 1, 13, 10, 0), &z, false).unwrap(), 18.0);

        let smoothed = resolve_smoothed(
            &s,
            at(2024, 1, 8, 7, 55),
            &z,
            false,
            &gaussian(21, OffsetPolicy::Centered),
        )
        .unwrap();
        assert!(smoothed > 18.0 && smoothed < 22.0, "got {smoothed}");
    }

    #[test]
    fn test_work_hours_property() {
        let (s, z) = (office(), vienna());
        for minute in (0..24 * 60).step_by(7) {
            let t = at(2024, 1, 9, minute / 60, minute % 60);
            let expected = if (8 * 60..=17 * 60).contains(&minute) { 22.0 } else { 18.0 };
            assert_eq!(evaluate(&s, t, &z, false).unwrap(), expected, "minute {minute}");
        }
    }

    #[test]
    fn test_far_from_transition_is_unsmoothed() {
        let (s, z) = (office(), vienna());
        let v = resolve_smoothed(&s, at(2024, 1, 8, 12, 0), &z, false, &gaussian(21, OffsetPolicy::Centered))
            .unwrap();
        assert_eq!(v, 22.0);
    }

    #[test]
    fn test_window_of_one_matches_raw() {
        let (s, z) = (office(), vienna());
        for kind in [
            SmoothingKind::Identity,
            SmoothingKind::Mean,
            SmoothingKind::Median,
            SmoothingKind::GaussianConvolution,
        ] {
            for offset in [OffsetPolicy::Centered, OffsetPolicy::Start, OffsetPolicy::End] {
                let smoothing = WindowSmoothing {
                    strategy: kind,
                    window_minutes: 1,
                    offset,
                };
                for (h, m) in [(7, 59), (8, 0), (17, 0), (17, 1), (12, 0)] {
                    let t = at(2024, 1, 8, h, m);
                    assert_eq!(
                        resolve_smoothed(&s, t, &z, false, &smoothing).unwrap(),
                        evaluate(&s, t, &z, false).unwrap(),
                        "{kind} {offset:?} {h}:{m}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_even_window_rejected() {
        let err = resolve_smoothed(
            &office(),
            at(2024, 1, 8, 7, 55),
            &vienna(),
            false,
            &gaussian(20, OffsetPolicy::Centered),
        )
        .unwrap_err();
        assert!(matches!(err, SetpointError::EvenWindowSize(20)));
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn test_gaussian_never_overshoots() {
        let (s, z) = (office(), vienna());
        for offset in [OffsetPolicy::Centered, OffsetPolicy::Start, OffsetPolicy::End] {
            for minute in (7 * 60 + 30)..(8 * 60 + 30) {
                let t = at(2024, 1, 8, minute / 60, minute % 60);
                let v = resolve_smoothed(&s, t, &z, false, &gaussian(21, offset)).unwrap();
                assert!((18.0..=22.0).contains(&v), "{offset:?} minute {minute}: {v}");
            }
        }
    }

    #[test]
    fn test_smoothing_rises_monotonically_into_window() {
        let (s, z) = (office(), vienna());
        let smoothing = WindowSmoothing {
            strategy: SmoothingKind::Mean,
            window_minutes: 31,
            offset: OffsetPolicy::Centered,
        };
        let mut last = 18.0;
        for minute in (7 * 60 + 40)..(8 * 60 + 20) {
            let t = at(2024, 1, 8, minute / 60, minute % 60);
            let v = resolve_smoothed(&s, t, &z, false, &smoothing).unwrap();
            assert!(v >= last, "minute {minute}: {v} < {last}");
            last = v;
        }
        assert_eq!(last, 22.0);
    }

    #[test]
    fn test_holiday_and_optimization_precedence() {
        let (s, z) = (office(), vienna());
        // 2024-12-25 is a Wednesday.
        let christmas = at(2024, 12, 25, 10, 0);
        assert_eq!(evaluate(&s, christmas, &z, false).unwrap(), 18.0);
        assert_eq!(evaluate(&s, christmas, &z, true).unwrap(), 22.0);
        // Optimization day also overrides the weekend.
        assert_eq!(evaluate(&s, at(2024, 1, 13, 10, 0), &z, true).unwrap(), 22.0);
    }

    #[test]
    fn test_window_crossing_midnight_uses_each_days_rules() {
        let mut s = office();
        s.monday = DailyRuleStore::new(
            vec![TimeBasedSetpoint::new(hm(0, 0), hm(17, 0), 22.0).unwrap()],
            18.0,
        );
        let z = vienna();
        let smoothing = WindowSmoothing {
            strategy: SmoothingKind::Mean,
            window_minutes: 21,
            offset: OffsetPolicy::Centered,
        };
        // Sunday 23:52..23:59 (rest day) and Monday 00:00..00:12 (window).
        let v = resolve_smoothed(&s, at(2024, 1, 8, 0, 2), &z, false, &smoothing).unwrap();
        let expected = (8.0 * 18.0 + 13.0 * 22.0) / 21.0;
        assert!((v - expected).abs() < 1e-9, "got {v}");
    }

    #[test]
    fn test_engine_transition_modes() {
        let monday_0745 = at(2024, 1, 8, 7, 45);

        let step = SetpointEngine::new(office(), vienna(), Transition::Step).unwrap();
        assert_eq!(step.setpoint(monday_0745, false).unwrap(), 18.0);

        let lookahead =
            SetpointEngine::new(office(), vienna(), Transition::Lookahead { lookahead_minutes: 30 })
                .unwrap();
        assert!((lookahead.setpoint(monday_0745, false).unwrap() - 20.0).abs() < 1e-9);
        // Saturdays have no windows, so nothing to ramp into.
        assert_eq!(lookahead.setpoint(at(2024, 1, 13, 7, 45), false).unwrap(), 18.0);

        let window = SetpointEngine::new(
            office(),
            vienna(),
            Transition::Window(gaussian(21, OffsetPolicy::Centered)),
        )
        .unwrap();
        // 07:45 is more than half a window away from 08:00.
        assert_eq!(window.setpoint(monday_0745, false).unwrap(), 18.0);
        let v = window.setpoint(at(2024, 1, 8, 7, 55), false).unwrap();
        assert!(v > 18.0 && v < 22.0);
        assert_eq!(window.day_type(monday_0745, false).unwrap(), DayType::Monday);
        assert_eq!(window.raw_setpoint(monday_0745, false).unwrap(), 18.0);
    }

    #[test]
    fn test_engine_rejects_invalid_transition() {
        assert!(matches!(
            SetpointEngine::new(office(), vienna(), Transition::Window(gaussian(4, OffsetPolicy::End))),
            Err(SetpointError::EvenWindowSize(4))
        ));
        assert!(matches!(
            SetpointEngine::new(office(), vienna(), Transition::Lookahead { lookahead_minutes: 0 }),
            Err(SetpointError::ZeroLookahead)
        ));
        assert!(matches!(
            SetpointEngine::new(
                office(),
                vienna(),
                Transition::Lookahead {
                    lookahead_minutes: u32::MAX
                }
            ),
            Err(SetpointError::LookaheadTooLong(u32::MAX))
        ));
    }

    #[test]
    fn test_start_and_end_windows_exact_mean() {
        let (s, z) = (office(), vienna());
        let mean = |offset| WindowSmoothing {
            strategy: SmoothingKind::Mean,
            window_minutes: 21,
            offset,
        };

        // 07:50..=08:10: ten minutes at 18, eleven at 22 (08:00 is inside).
        let end = resolve_smoothed(&s, at(2024, 1, 8, 7, 50), &z, false, &mean(OffsetPolicy::End)).unwrap();
        assert!((end - (10.0 * 18.0 + 11.0 * 22.0) / 21.0).abs() < 1e-9, "got {end}");

        // 07:45..=08:05: fifteen minutes at 18, six at 22.
        let start = resolve_smoothed(&s, at(2024, 1, 8, 8, 5), &z, false, &mean(OffsetPolicy::Start)).unwrap();
        assert!((start - (15.0 * 18.0 + 6.0 * 22.0) / 21.0).abs() < 1e-9, "got {start}");
    }

    #[test]
    fn test_instant_at_end_of_calendar_is_an_error() {
        let (s, z) = (office(), vienna());
        let last = NaiveDate::MAX.and_hms_opt(23, 55, 0).unwrap();

        assert!(evaluate(&s, last, &z, false).is_ok());
        let err = resolve_smoothed(&s, last, &z, false, &gaussian(21, OffsetPolicy::Centered)).unwrap_err();
        assert!(matches!(err, SetpointError::InstantOutOfRange { .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::Lookup);

        assert!(shift(last, 4).is_ok());
        assert!(shift(last, 5).is_err());
        assert!(shift(NaiveDate::MIN.and_hms_opt(0, 0, 0).unwrap(), -1).is_err());
    }

    #[test]
    fn test_engine_shared_across_threads() {
        let engine = Arc::new(
            SetpointEngine::new(
                office(),
                vienna(),
                Transition::Window(gaussian(21, OffsetPolicy::Centered)),
            )
            .unwrap(),
        );
        let minutes: Vec<u32> = (7 * 60..9 * 60).collect();
        let sequential: Vec<f64> = minutes
            .iter()
            .map(|m| engine.setpoint(at(2024, 1, 8, m / 60, m % 60), false).unwrap())
            .collect();

        let parallel: Vec<f64> = std::thread::scope(|scope| {
            let handles: Vec<_> = minutes
                .chunks(30)
                .map(|chunk| {
                    let engine = Arc::clone(&engine);
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|m| engine.setpoint(at(2024, 1, 8, m / 60, m % 60), false).unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_transition_toml() {
        let t: Transition = toml::from_str(
            r#"
            mode = "window"
            strategy = "gauss"
            window_minutes = 21
            "#,
        )
        .unwrap();
        assert_eq!(t, Transition::Window(gaussian(21, OffsetPolicy::Centered)));

        let t: Transition = toml::from_str(r#"mode = "lookahead""#).unwrap();
        assert_eq!(t, Transition::Lookahead { lookahead_minutes: 30 });

        let unknown = toml::from_str::<Transition>(
            r#"
            mode = "window"
            strategy = "gauss2"
            window_minutes = 21
            "#,
        );
        assert!(unknown.is_err());
    }
}
