use chrono::{NaiveDateTime, TimeDelta};

use crate::alarm::model::{AlarmRecord, AlarmSpec, AlarmTime};

pub const SNOOZE_MINUTES: i64 = 5;

/// An alarm that is currently sounding. Holds its own copy of the record as
/// it was when it fired.
#[derive(Debug, Clone, PartialEq)]
pub struct RingingSession {
    alarm: AlarmRecord,
    fired_at: NaiveDateTime,
}

impl RingingSession {
    pub fn alarm(&self) -> &AlarmRecord {
        &self.alarm
    }

    pub fn fired_at(&self) -> NaiveDateTime {
        self.fired_at
    }
}

/// Holds at most one ringing session.
#[derive(Debug, Default)]
pub struct Ringer {
    session: Option<RingingSession>,
}

impl Ringer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts ringing `alarm`, returning the session it replaced, if any.
    pub fn ring(&mut self, alarm: AlarmRecord, fired_at: NaiveDateTime) -> Option<RingingSession> {
        self.session.replace(RingingSession { alarm, fired_at })
    }

    pub fn current(&self) -> Option<&RingingSession> {
        self.session.as_ref()
    }

    pub fn is_ringing(&self) -> bool {
        self.session.is_some()
    }

    pub fn stop(&mut self) -> Option<RingingSession> {
        self.session.take()
    }

    /// Ends the session and returns the spec of its replacement alarm,
    /// `SNOOZE_MINUTES` after `now`. `None` when nothing was ringing.
    pub fn snooze(&mut self, now: NaiveDateTime) -> Option<(RingingSession, AlarmSpec)> {
        let session = self.session.take()?;
        let spec = AlarmSpec::from_record(&session.alarm, snooze_time(now));
        Some((session, spec))
    }
}

/// `now` plus the snooze delay, as an alarm time. Wraps past midnight.
pub fn snooze_time(now: NaiveDateTime) -> AlarmTime {
    AlarmTime::of(now.time() + TimeDelta::minutes(SNOOZE_MINUTES))
}
