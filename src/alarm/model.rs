use std::collections::HashSet;
use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{PersistenceError, ValidationError};

pub const ALARMS_KEY: &str = "alarms";
/// Highest alarm id ever issued, so deleted ids stay retired across reloads.
pub const LAST_ALARM_ID_KEY: &str = "alarmsLastId";
pub const DEFAULT_VOLUME: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(pub u64);

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Local wall-clock hour and minute. Stored and displayed as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AlarmTime(NaiveTime);

impl AlarmTime {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Accepts `H:MM` or `HH:MM`, 24-hour.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ValidationError::MissingTime);
        }
        let invalid = || ValidationError::InvalidTime(input.to_string());
        let (hour, minute) = input.split_once(':').ok_or_else(invalid)?;
        if !(1..=2).contains(&hour.len())
            || minute.len() != 2
            || !hour.bytes().chain(minute.bytes()).all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let hour: u32 = hour.parse().map_err(|_| invalid())?;
        let minute: u32 = minute.parse().map_err(|_| invalid())?;
        Self::from_hm(hour, minute).ok_or_else(invalid)
    }

    /// Minute containing `time`, seconds dropped. Wraps past midnight when
    /// the caller adds a duration first.
    pub fn of(time: NaiveTime) -> Self {
        Self(NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time))
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }
}

impl fmt::Display for AlarmTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Serialize for AlarmTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AlarmTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(de::Error::custom)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmSound {
    #[default]
    Default,
    Bell,
    Chime,
}

impl AlarmSound {
    pub fn name(self) -> &'static str {
        match self {
            AlarmSound::Default => "default",
            AlarmSound::Bell => "bell",
            AlarmSound::Chime => "chime",
        }
    }

    pub fn asset(self) -> String {
        format!("alarm-{}.mp3", self.name())
    }
}

impl fmt::Display for AlarmSound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmRecord {
    pub id: AlarmId,
    pub time: AlarmTime,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub sound: AlarmSound,
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default = "default_vibrate")]
    pub vibrate: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl AlarmRecord {
    pub fn title(&self) -> String {
        if self.label.is_empty() {
            self.time.to_string()
        } else {
            format!("{} - {}", self.time, self.label)
        }
    }
}

/// Fields a caller supplies when creating an alarm.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmSpec {
    pub time: Option<String>,
    pub label: String,
    pub sound: AlarmSound,
    pub volume: f64,
    pub vibrate: bool,
}

impl Default for AlarmSpec {
    fn default() -> Self {
        Self {
            time: None,
            label: String::new(),
            sound: AlarmSound::Default,
            volume: DEFAULT_VOLUME,
            vibrate: true,
        }
    }
}

impl AlarmSpec {
    pub fn at(time: impl Into<String>) -> Self {
        Self {
            time: Some(time.into()),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Spec that recreates `record`'s notification settings at another time.
    pub fn from_record(record: &AlarmRecord, time: AlarmTime) -> Self {
        Self {
            time: Some(time.to_string()),
            label: record.label.clone(),
            sound: record.sound,
            volume: record.volume,
            vibrate: record.vibrate,
        }
    }

    pub(crate) fn validate(&self) -> Result<(AlarmTime, f64), ValidationError> {
        let time = AlarmTime::parse(self.time.as_deref().unwrap_or_default())?;
        Ok((time, clamp_volume(self.volume)?))
    }
}

/// Out-of-range volumes are clamped to [0, 1]; NaN is rejected.
pub fn clamp_volume(volume: f64) -> Result<f64, ValidationError> {
    if volume.is_nan() {
        return Err(ValidationError::InvalidVolume);
    }
    Ok(volume.clamp(0.0, 1.0))
}

pub fn parse_alarm_records(content: &str) -> Result<Vec<AlarmRecord>, PersistenceError> {
    let mut records = serde_json::from_str::<Vec<AlarmRecord>>(content)
        .map_err(|err| PersistenceError::corrupt_json(ALARMS_KEY, &err))?;

    let mut ids = HashSet::new();
    for record in &mut records {
        if !ids.insert(record.id) {
            return Err(PersistenceError::Corrupt {
                key: ALARMS_KEY.to_string(),
                message: format!("duplicate alarm id found: {}", record.id),
            });
        }
        record.volume = clamp_volume(record.volume).unwrap_or(DEFAULT_VOLUME);
    }
    Ok(records)
}

pub fn encode_alarm_records(records: &[AlarmRecord]) -> Result<String, PersistenceError> {
    serde_json::to_string(records).map_err(|err| PersistenceError::corrupt_json(ALARMS_KEY, &err))
}

fn default_volume() -> f64 {
    DEFAULT_VOLUME
}

fn default_vibrate() -> bool {
    true
}

fn default_active() -> bool {
    true
}
