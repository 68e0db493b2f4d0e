use chrono::NaiveDateTime;
use log::{debug, info, warn};

use crate::alarm::evaluator::{TickOutcome, due_alarms};
use crate::alarm::model::{AlarmId, AlarmRecord, AlarmSpec};
use crate::alarm::ringing::{Ringer, RingingSession};
use crate::alarm::store::AlarmStore;
use crate::error::{EngineError, PersistenceError};
use crate::notify::{NotificationSink, VIBRATION_PATTERN};
use crate::storage::KeyValueStore;

/// Owns the alarm store, the ringing session and the notification sink.
/// Every alarm mutation goes through here.
pub struct AlarmEngine<S, N> {
    store: AlarmStore<S>,
    ringer: Ringer,
    sink: N,
}

impl<S: KeyValueStore, N: NotificationSink> AlarmEngine<S, N> {
    pub fn new(store: AlarmStore<S>, sink: N) -> Self {
        Self {
            store,
            ringer: Ringer::new(),
            sink,
        }
    }

    pub fn load(storage: S, sink: N) -> Result<Self, PersistenceError> {
        let store = AlarmStore::load(storage)?;
        if store.is_empty() {
            debug!("no stored alarms");
        } else {
            info!("loaded {} alarms", store.len());
        }
        Ok(Self::new(store, sink))
    }

    pub fn add_alarm(
        &mut self,
        spec: &AlarmSpec,
        now: NaiveDateTime,
    ) -> Result<AlarmRecord, EngineError> {
        self.store.add(spec, issued_at_ms(now))
    }

    pub fn delete_alarm(&mut self, id: AlarmId) -> Result<bool, PersistenceError> {
        self.store.delete(id)
    }

    pub fn toggle_alarm(&mut self, id: AlarmId) -> Result<Option<bool>, PersistenceError> {
        self.store.toggle(id)
    }

    pub fn get_alarm(&self, id: AlarmId) -> Option<&AlarmRecord> {
        self.store.get(id)
    }

    pub fn list_alarms(&self) -> &[AlarmRecord] {
        self.store.list()
    }

    pub fn current_ringing_session(&self) -> Option<&RingingSession> {
        self.ringer.current()
    }

    /// Fires every alarm due at `now`. All matches are deactivated; the last
    /// one in store order is left ringing. A failed write is logged and the
    /// tick still completes. With nothing due, a ringing alarm is sustained.
    pub fn tick(&mut self, now: NaiveDateTime) -> TickOutcome {
        let due = due_alarms(self.store.list(), now);
        if due.is_empty() {
            if self.ringer.is_ringing() {
                self.sink.sustain();
            }
            return TickOutcome::default();
        }

        let fired: Vec<AlarmId> = due.iter().map(|alarm| alarm.id).collect();
        for &id in &fired {
            if let Err(err) = self.store.deactivate(id) {
                warn!("alarm {id} stays deactivated in memory only: {err}");
            }
        }

        let mut ringing = None;
        for mut snapshot in due {
            snapshot.is_active = false;
            ringing = Some(snapshot.id);
            self.start_ringing(snapshot, now);
        }
        TickOutcome { fired, ringing }
    }

    /// Silences the ringing alarm and schedules a fresh copy of it
    /// `SNOOZE_MINUTES` from `now`. Returns the new record, or `None` when
    /// nothing was ringing. The alarm is silenced even if saving the new
    /// record fails.
    pub fn snooze_alarm(&mut self, now: NaiveDateTime) -> Result<Option<AlarmRecord>, EngineError> {
        let Some((session, spec)) = self.ringer.snooze(now) else {
            return Ok(None);
        };
        self.silence();
        info!(
            "snoozed alarm {} ({}) until {}",
            session.alarm().id,
            session.alarm().title(),
            spec.time.as_deref().unwrap_or("-")
        );
        self.store.add(&spec, issued_at_ms(now)).map(Some)
    }

    pub fn stop_alarm(&mut self) -> Option<RingingSession> {
        let session = self.ringer.stop()?;
        self.silence();
        info!("stopped alarm {} ({})", session.alarm().id, session.alarm().title());
        Some(session)
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    fn start_ringing(&mut self, snapshot: AlarmRecord, now: NaiveDateTime) {
        info!("alarm {} ringing: {}", snapshot.id, snapshot.title());
        let (sound, volume, vibrate) = (snapshot.sound, snapshot.volume, snapshot.vibrate);
        if let Some(replaced) = self.ringer.ring(snapshot, now) {
            warn!("alarm {} replaced by a later match", replaced.alarm().id);
            self.silence();
        }
        self.sink.play_sound(sound, volume);
        if vibrate {
            self.sink.vibrate(&VIBRATION_PATTERN);
        }
    }

    fn silence(&mut self) {
        self.sink.stop_sound();
        self.sink.cancel_vibrate();
    }
}

fn issued_at_ms(now: NaiveDateTime) -> i64 {
    now.and_utc().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::alarm::model::{ALARMS_KEY, AlarmSound, parse_alarm_records};
    use crate::notify::testing::{Feedback, RecordingSink};
    use crate::storage::MemoryStore;

    fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 7)
            .expect("date")
            .and_hms_opt(hour, minute, second)
            .expect("time")
    }

    fn engine() -> (AlarmEngine<MemoryStore, RecordingSink>, MemoryStore) {
        let storage = MemoryStore::new();
        let engine =
            AlarmEngine::load(storage.clone(), RecordingSink::default()).expect("empty engine");
        (engine, storage)
    }

    fn persisted(storage: &MemoryStore) -> Vec<AlarmRecord> {
        parse_alarm_records(&storage.snapshot(ALARMS_KEY).expect("persisted")).expect("parse")
    }

    #[test]
    fn fires_once_at_second_zero_and_deactivates() {
        let (mut engine, storage) = engine();
        let wake = engine
            .add_alarm(&AlarmSpec::at("07:30"), at(6, 0, 0))
            .expect("add");

        assert!(engine.tick(at(7, 29, 59)).is_empty());
        let outcome = engine.tick(at(7, 30, 0));
        assert_eq!(outcome.fired, vec![wake.id]);
        assert_eq!(outcome.ringing, Some(wake.id));
        assert!(!engine.list_alarms()[0].is_active);
        assert!(!persisted(&storage)[0].is_active);

        assert!(engine.tick(at(7, 30, 1)).is_empty());
        let session = engine.current_ringing_session().expect("ringing");
        assert_eq!(session.alarm().id, wake.id);
        assert_eq!(session.fired_at(), at(7, 30, 0));
    }

    #[test]
    fn tick_off_the_minute_start_produces_nothing() {
        let (mut engine, _) = engine();
        engine
            .add_alarm(&AlarmSpec::at("07:30"), at(6, 0, 0))
            .expect("add");
        assert!(engine.tick(at(7, 30, 1)).is_empty());
        assert!(engine.current_ringing_session().is_none());
        assert!(engine.list_alarms()[0].is_active);
    }

    #[test]
    fn simultaneous_alarms_all_deactivate_but_last_one_rings() {
        let (mut engine, _) = engine();
        let first = engine
            .add_alarm(&AlarmSpec::at("07:30").with_label("first"), at(6, 0, 0))
            .expect("add");
        let second = engine
            .add_alarm(&AlarmSpec::at("07:30").with_label("second"), at(6, 0, 0))
            .expect("add");

        let outcome = engine.tick(at(7, 30, 0));
        assert_eq!(outcome.fired, vec![first.id, second.id]);
        assert_eq!(outcome.ringing, Some(second.id));
        assert!(engine.list_alarms().iter().all(|alarm| !alarm.is_active));
        assert_eq!(
            engine.current_ringing_session().expect("ringing").alarm().label,
            "second"
        );
        let plays = engine
            .sink()
            .calls
            .iter()
            .filter(|call| matches!(call, Feedback::Play(..)))
            .count();
        assert_eq!(plays, 2);
    }

    #[test]
    fn notification_follows_alarm_settings() {
        let (mut engine, _) = engine();
        let spec = AlarmSpec {
            sound: AlarmSound::Chime,
            volume: 0.5,
            vibrate: true,
            ..AlarmSpec::at("07:30")
        };
        engine.add_alarm(&spec, at(6, 0, 0)).expect("add");
        engine.tick(at(7, 30, 0));
        assert_eq!(
            engine.sink().calls,
            vec![
                Feedback::Play(AlarmSound::Chime, 0.5),
                Feedback::Vibrate(VIBRATION_PATTERN.to_vec()),
            ]
        );
    }

    #[test]
    fn snooze_creates_new_alarm_five_minutes_out() {
        let (mut engine, storage) = engine();
        let gym = engine
            .add_alarm(&AlarmSpec::at("07:30").with_label("Gym"), at(6, 0, 0))
            .expect("add");
        engine.tick(at(7, 30, 0));

        let snoozed = engine
            .snooze_alarm(at(7, 30, 0))
            .expect("snooze")
            .expect("was ringing");
        assert_eq!(snoozed.time.to_string(), "07:35");
        assert_eq!(snoozed.label, "Gym");
        assert!(snoozed.is_active);
        assert_ne!(snoozed.id, gym.id);
        assert!(engine.current_ringing_session().is_none());
        assert!(!engine.list_alarms()[0].is_active);
        assert_eq!(persisted(&storage).len(), 2);
        assert_eq!(
            engine.sink().calls.last(),
            Some(&Feedback::CancelVibrate)
        );

        let outcome = engine.tick(at(7, 35, 0));
        assert_eq!(outcome.ringing, Some(snoozed.id));
    }

    #[test]
    fn stop_clears_session_without_adding() {
        let (mut engine, _) = engine();
        engine
            .add_alarm(&AlarmSpec::at("07:30"), at(6, 0, 0))
            .expect("add");
        engine.tick(at(7, 30, 0));

        assert!(engine.stop_alarm().is_some());
        assert!(engine.current_ringing_session().is_none());
        assert_eq!(engine.list_alarms().len(), 1);
        assert!(engine.stop_alarm().is_none());
        assert!(engine.snooze_alarm(at(7, 31, 0)).expect("idle").is_none());
        assert_eq!(engine.list_alarms().len(), 1);
    }

    #[test]
    fn session_is_unaffected_by_deleting_the_alarm() {
        let (mut engine, _) = engine();
        let wake = engine
            .add_alarm(&AlarmSpec::at("07:30").with_label("Wake"), at(6, 0, 0))
            .expect("add");
        engine.tick(at(7, 30, 0));
        assert!(engine.delete_alarm(wake.id).expect("delete"));

        let session = engine.current_ringing_session().expect("still ringing");
        assert_eq!(session.alarm().label, "Wake");
        assert!(engine.list_alarms().is_empty());
    }

    #[test]
    fn snooze_silences_even_when_saving_fails() {
        let (mut engine, storage) = engine();
        engine
            .add_alarm(&AlarmSpec::at("07:30"), at(6, 0, 0))
            .expect("add");
        engine.tick(at(7, 30, 0));

        storage.set_reject_writes(true);
        let err = engine.snooze_alarm(at(7, 30, 0)).expect_err("write rejected");
        assert!(matches!(err, EngineError::Persistence(_)));
        assert!(engine.current_ringing_session().is_none());
        assert_eq!(engine.sink().calls.last(), Some(&Feedback::CancelVibrate));
        assert_eq!(engine.list_alarms().len(), 2);
        assert_eq!(persisted(&storage).len(), 1);
    }

    #[test]
    fn tick_still_rings_when_deactivation_cannot_be_saved() {
        let (mut engine, storage) = engine();
        engine
            .add_alarm(&AlarmSpec::at("07:30"), at(6, 0, 0))
            .expect("add");
        storage.set_reject_writes(true);

        let outcome = engine.tick(at(7, 30, 0));
        assert_eq!(outcome.fired.len(), 1);
        assert!(engine.current_ringing_session().is_some());
        assert!(!engine.list_alarms()[0].is_active);
    }
}
