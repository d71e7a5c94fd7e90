// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Day classification.
//!
//! Every instant maps to one of nine [`DayType`]s. Optimization mode wins over
//! everything, public and custom holidays win over the weekday, and otherwise
//! the local weekday decides.

use crate::error::{Result, SetpointError};
use chrono::{Datelike, Days, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Day types
// ---------------------------------------------------------------------------

/// The classification unit that selects a rule store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
    Holiday,
    OptimizationDay,
}

impl DayType {
    /// Map a weekday index (Monday = 0 ... Sunday = 6).
    pub fn from_weekday_index(index: u32) -> Result<Self> {
        match index {
            0 => Ok(DayType::Monday),
            1 => Ok(DayType::Tuesday),
            2 => Ok(DayType::Wednesday),
            3 => Ok(DayType::Thursday),
            4 => Ok(DayType::Friday),
            5 => Ok(DayType::Saturday),
            6 => Ok(DayType::Sunday),
            _ => Err(SetpointError::WeekdayOutOfRange(index)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayType::Monday => "monday",
            DayType::Tuesday => "tuesday",
            DayType::Wednesday => "wednesday",
            DayType::Thursday => "thursday",
            DayType::Friday => "friday",
            DayType::Saturday => "saturday",
            DayType::Sunday => "sunday",
            DayType::Holiday => "holiday",
            DayType::OptimizationDay => "optimization_day",
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Holiday calendars
// ---------------------------------------------------------------------------

/// Countries with a built-in list of nationwide public holidays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Country {
    Austria,
    Germany,
    Switzerland,
}

/// How a public holiday's date is determined.
#[derive(Debug, Clone, Copy)]
enum Rule {
    /// Same month and day every year.
    Fixed(u32, u32),
    /// Days relative to Easter Sunday.
    Easter(i64),
}

const AUSTRIA: &[Rule] = &[
    Rule::Fixed(1, 1),
    Rule::Fixed(1, 6),
    Rule::Easter(1),
    Rule::Fixed(5, 1),
    Rule::Easter(39),
    Rule::Easter(50),
    Rule::Easter(60),
    Rule::Fixed(8, 15),
    Rule::Fixed(10, 26),
    Rule::Fixed(11, 1),
    Rule::Fixed(12, 8),
    Rule::Fixed(12, 25),
    Rule::Fixed(12, 26),
];

const GERMANY: &[Rule] = &[
    Rule::Fixed(1, 1),
    Rule::Easter(-2),
    Rule::Easter(1),
    Rule::Fixed(5, 1),
    Rule::Easter(39),
    Rule::Easter(50),
    Rule::Fixed(10, 3),
    Rule::Fixed(12, 25),
    Rule::Fixed(12, 26),
];

const SWITZERLAND: &[Rule] = &[
    Rule::Fixed(1, 1),
    Rule::Easter(39),
    Rule::Fixed(8, 1),
    Rule::Fixed(12, 25),
];

impl Country {
    pub fn iso_code(&self) -> &'static str {
        match self {
            Country::Austria => "AT",
            Country::Germany => "DE",
            Country::Switzerland => "CH",
        }
    }

    fn rules(&self) -> &'static [Rule] {
        match self {
            Country::Austria => AUSTRIA,
            Country::Germany => GERMANY,
            Country::Switzerland => SWITZERLAND,
        }
    }

    /// Whether `date` is a nationwide public holiday.
    pub fn is_public_holiday(&self, date: NaiveDate) -> bool {
        let easter = easter_sunday(date.year());
        self.rules().iter().any(|rule| match *rule {
            Rule::Fixed(month, day) => date.month() == month && date.day() == day,
            Rule::Easter(offset) => easter.is_some_and(|e| {
                let shifted = if offset >= 0 {
                    e.checked_add_days(Days::new(offset as u64))
                } else {
                    e.checked_sub_days(Days::new(offset.unsigned_abs()))
                };
                shifted == Some(date)
            }),
        })
    }
}

/// ISO codes with a built-in holiday calendar.
pub const SUPPORTED_COUNTRIES: [&str; 3] = ["AT", "DE", "CH"];

impl FromStr for Country {
    type Err = SetpointError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AT" => Ok(Country::Austria),
            "DE" => Ok(Country::Germany),
            "CH" => Ok(Country::Switzerland),
            _ => Err(SetpointError::UnsupportedCountry {
                code: s.to_string(),
                supported: SUPPORTED_COUNTRIES.join(", "),
            }),
        }
    }
}

/// Easter Sunday in the Gregorian calendar (anonymous computus).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Public holidays for one country plus site-specific extra days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolidayCalendar {
    country: Country,
    custom: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    pub fn new(country: Country) -> Self {
        Self {
            country,
            custom: BTreeSet::new(),
        }
    }

    /// Add site-specific closing days (e.g. bridge days).
    pub fn with_custom_holidays(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.custom.extend(dates);
        self
    }

    pub fn country(&self) -> Country {
        self.country
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.custom.contains(&date) || self.country.is_public_holiday(date)
    }
}

/// Look up the holiday calendar for an ISO country code.
pub fn holiday_calendar_for(country: &str) -> Result<HolidayCalendar> {
    Ok(HolidayCalendar::new(country.parse()?))
}

// ---------------------------------------------------------------------------
// Zones and classification
// ---------------------------------------------------------------------------

/// Parse an IANA timezone identifier.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| SetpointError::UnknownTimezone(name.to_string()))
}

/// Where a building zone is: its timezone and holiday calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub timezone: Tz,
    pub calendar: HolidayCalendar,
}

impl Zone {
    pub fn new(timezone: &str, country: &str) -> Result<Self> {
        Ok(Self {
            timezone: parse_timezone(timezone)?,
            calendar: holiday_calendar_for(country)?,
        })
    }
}

/// Classify an instant into a day type.
///
/// `instant` is already a wall-clock reading in `timezone`, so its own date
/// and weekday are the local ones. Readings inside a spring-forward gap or the
/// repeated autumn hour are classified as given.
pub fn classify(
    instant: NaiveDateTime,
    timezone: Tz,
    calendar: &HolidayCalendar,
    optimization: bool,
) -> Result<DayType> {
    if optimization {
        return Ok(DayType::OptimizationDay);
    }

    if matches!(timezone.from_local_datetime(&instant), LocalResult::None) {
        log::debug!("{instant} does not exist in {timezone}, keeping wall-clock reading");
    }
    if calendar.is_holiday(instant.date()) {
        return Ok(DayType::Holiday);
    }

    DayType::from_weekday_index(instant.weekday().num_days_from_monday())
}
