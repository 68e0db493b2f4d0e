use chrono::{Days, NaiveDateTime, Timelike};

use crate::alarm::model::{AlarmId, AlarmRecord};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    /// Every alarm that matched this tick, in store order. All of them are
    /// deactivated.
    pub fired: Vec<AlarmId>,
    /// The alarm left ringing. Only the last match survives.
    pub ringing: Option<AlarmId>,
}

impl TickOutcome {
    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }
}

/// True when `alarm` should fire at `now`. Only the first second of the
/// target minute matches, so a per-second tick fires once per minute.
pub fn is_due(alarm: &AlarmRecord, now: NaiveDateTime) -> bool {
    alarm.is_active
        && now.hour() == alarm.time.hour()
        && now.minute() == alarm.time.minute()
        && now.second() == 0
}

/// Snapshots of the alarms due at `now`, in the order given.
pub fn due_alarms(alarms: &[AlarmRecord], now: NaiveDateTime) -> Vec<AlarmRecord> {
    alarms
        .iter()
        .filter(|alarm| is_due(alarm, now))
        .cloned()
        .collect()
}

/// Next wall-clock instant an active alarm would fire, today or tomorrow.
pub fn next_occurrence(alarm: &AlarmRecord, now: NaiveDateTime) -> Option<NaiveDateTime> {
    if !alarm.is_active {
        return None;
    }
    let target = now
        .date()
        .and_hms_opt(alarm.time.hour(), alarm.time.minute(), 0)?;
    if target >= now.with_nanosecond(0)? {
        Some(target)
    } else {
        target.checked_add_days(Days::new(1))
    }
}

pub fn format_countdown(next: Option<NaiveDateTime>, now: NaiveDateTime) -> String {
    match next {
        Some(at) => {
            let total_minutes = (at - now).num_seconds().max(0).div_euclid(60);
            format!("in {}h {:02}m", total_minutes / 60, total_minutes % 60)
        }
        None => "-".to_string(),
    }
}
