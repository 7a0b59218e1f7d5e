//! Catalog data model: songs and scheduled events
//!
//! Records are validated at the store boundary so that a malformed upsert
//! is rejected immediately instead of surfacing later during matching.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A catalog song: metadata plus a reference into the audio resource store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    /// Unique id; assigned by the store on first upsert when empty
    #[serde(default)]
    pub id: String,
    /// Display name
    pub name: String,
    /// Stored audio filename (the audio reference); `None` until uploaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Hub-relative fetch path recorded at upload time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Song {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("song requires a name".to_string()));
        }
        Ok(())
    }
}

/// A scheduled event: plays a song at a weekly day + minute slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique id; assigned by the store on first upsert when empty
    #[serde(default)]
    pub id: String,
    /// Display name
    pub name: String,
    /// Day of week the event fires on
    pub day: DayOfWeek,
    /// Minute-granularity time the event fires at
    pub time: TimeOfDay,
    /// Referenced song id; may dangle (the matcher tolerates that)
    #[serde(rename = "songId")]
    pub song_id: String,
}

impl Event {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("event requires a name".to_string()));
        }
        if self.song_id.trim().is_empty() {
            return Err(Error::InvalidInput("event requires a songId".to_string()));
        }
        Ok(())
    }
}

/// Symbolic day of week used for event scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        };
        write!(f, "{}", name)
    }
}

/// Minute-granularity wall-clock time, serialized as `"HH:MM"`.
///
/// Validated on construction; an `Event` carrying a `TimeOfDay` is
/// guaranteed to hold a real minute slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(Error::InvalidInput(format!(
                "invalid time of day: {:02}:{:02}",
                hour, minute
            )));
        }
        Ok(Self { hour, minute })
    }

    /// The minute slot a timestamp falls into.
    pub fn from_datetime(ts: &DateTime<Local>) -> Self {
        Self {
            hour: ts.hour() as u8,
            minute: ts.minute() as u8,
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }
}

impl FromStr for TimeOfDay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidInput(format!("invalid time of day: {}", s)))?;
        let hour: u8 = h
            .parse()
            .map_err(|_| Error::InvalidInput(format!("invalid time of day: {}", s)))?;
        let minute: u8 = m
            .parse()
            .map_err(|_| Error::InvalidInput(format!("invalid time of day: {}", s)))?;
        TimeOfDay::new(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> String {
        t.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}
