//! Monitored people and their weekly availability windows.
//!
//! The roster is loaded once at startup from a YAML file and shared by
//! reference. Windows are written as `"HH:MM"` strings; `"24:00"` is accepted
//! as an end-of-day sentinel.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Minutes in a day; also the "24:00" end-of-day sentinel.
pub const MINUTES_PER_DAY: u16 = 1440;

/// A `[start, end)` minute-of-day interval.
///
/// A window whose end is at or before its start covers `[start, 1440)` only.
/// Next-day coverage has to be declared as a separate window starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWindow", into = "RawWindow")]
pub struct AvailabilityWindow {
    start: u16,
    end: u16,
}

impl AvailabilityWindow {
    pub fn new(start: u16, end: u16) -> Result<Self, CoreError> {
        if start >= MINUTES_PER_DAY {
            return Err(CoreError::Configuration(format!(
                "window start {start} is outside [0, {MINUTES_PER_DAY})"
            )));
        }
        if end > MINUTES_PER_DAY {
            return Err(CoreError::Configuration(format!(
                "window end {end} is outside [0, {MINUTES_PER_DAY}]"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start_minute(&self) -> u16 {
        self.start
    }

    /// End after applying the end-of-day rule.
    pub fn effective_end(&self) -> u16 {
        if self.end <= self.start {
            MINUTES_PER_DAY
        } else {
            self.end
        }
    }

    pub fn contains(&self, minute_of_day: u16) -> bool {
        minute_of_day >= self.start && minute_of_day < self.effective_end()
    }
}

impl fmt::Display for AvailabilityWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            format_clock(self.start),
            format_clock(self.effective_end())
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawWindow {
    start: String,
    end: String,
}

impl TryFrom<RawWindow> for AvailabilityWindow {
    type Error = CoreError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        AvailabilityWindow::new(parse_clock(&raw.start)?, parse_clock(&raw.end)?)
    }
}

impl From<AvailabilityWindow> for RawWindow {
    fn from(w: AvailabilityWindow) -> Self {
        RawWindow {
            start: format_clock(w.start),
            end: format_clock(w.end),
        }
    }
}

/// Parse `"HH:MM"` into minutes since midnight. `"24:00"` parses to 1440.
pub fn parse_clock(s: &str) -> Result<u16, CoreError> {
    let invalid = || CoreError::Configuration(format!("invalid clock time '{s}', expected HH:MM"));

    let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
    let hours: u16 = h.parse().map_err(|_| invalid())?;
    let minutes: u16 = m.parse().map_err(|_| invalid())?;

    if minutes >= 60 || hours > 24 || (hours == 24 && minutes != 0) {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

/// Render minutes since midnight as `"HH:MM"`.
pub fn format_clock(minute_of_day: u16) -> String {
    format!("{:02}:{:02}", minute_of_day / 60, minute_of_day % 60)
}

/// A roster entry whose out-of-hours mentions get queued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredPerson {
    /// Stable identifier, unique in the roster.
    pub key: String,
    /// Display name used in replies and digests.
    pub name: String,
    /// Platform user id that identifies a mention of this person.
    pub handle: String,
    #[serde(default)]
    pub windows: Vec<AvailabilityWindow>,
}

impl MonitoredPerson {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        handle: impl Into<String>,
        windows: Vec<AvailabilityWindow>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            handle: handle.into(),
            windows,
        }
    }

    /// Earliest window start of the day, if any window is declared.
    pub fn earliest_start(&self) -> Option<u16> {
        self.windows.iter().map(AvailabilityWindow::start_minute).min()
    }
}

fn default_timezone() -> Tz {
    chrono_tz::America::New_York
}

/// The full set of monitored people plus the organisation-wide reference zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
    pub people: Vec<MonitoredPerson>,
}

impl Roster {
    /// Build a roster and validate it.
    pub fn new(timezone: Tz, people: Vec<MonitoredPerson>) -> Result<Self, CoreError> {
        let roster = Self { timezone, people };
        roster.validate()?;
        Ok(roster)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, CoreError> {
        let roster: Roster = serde_yaml::from_str(yaml)?;
        roster.validate()?;
        Ok(roster)
    }

    /// Load and validate a roster file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let yaml = std::fs::read_to_string(path)?;
        let roster = Self::from_yaml_str(&yaml)?;
        tracing::info!(
            path = %path.display(),
            people = roster.people.len(),
            timezone = %roster.timezone,
            "Roster loaded"
        );
        Ok(roster)
    }

    /// Reject rosters the availability resolver cannot answer for.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut keys = HashSet::new();
        let mut handles = HashSet::new();

        for person in &self.people {
            if person.key.trim().is_empty() {
                return Err(CoreError::Configuration(
                    "monitored person with empty key".to_string(),
                ));
            }
            if !keys.insert(person.key.as_str()) {
                return Err(CoreError::Configuration(format!(
                    "duplicate person key '{}'",
                    person.key
                )));
            }
            if person.handle.trim().is_empty() {
                return Err(CoreError::Configuration(format!(
                    "person '{}' has an empty handle",
                    person.key
                )));
            }
            if !handles.insert(person.handle.as_str()) {
                return Err(CoreError::Configuration(format!(
                    "handle '{}' is shared by more than one person",
                    person.handle
                )));
            }
            if person.windows.is_empty() {
                return Err(CoreError::Configuration(format!(
                    "person '{}' has no availability windows",
                    person.key
                )));
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&MonitoredPerson> {
        self.people.iter().find(|p| p.key == key)
    }

    /// Look a person up by key, falling back to a case-insensitive name match.
    ///
    /// Admin commands accept either form.
    pub fn resolve(&self, key_or_name: &str) -> Result<&MonitoredPerson, CoreError> {
        self.get(key_or_name)
            .or_else(|| {
                self.people
                    .iter()
                    .find(|p| p.name.eq_ignore_ascii_case(key_or_name))
            })
            .ok_or_else(|| CoreError::UnknownPerson(key_or_name.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.people.iter().map(|p| p.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }
}
