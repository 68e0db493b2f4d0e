use log::{error, info, warn};

use crate::alarm::model::{
    ALARMS_KEY, AlarmId, AlarmRecord, AlarmSpec, LAST_ALARM_ID_KEY, encode_alarm_records,
    parse_alarm_records,
};
use crate::error::{EngineError, PersistenceError};
use crate::storage::KeyValueStore;

/// Owns the alarm records and writes the whole set through to storage after
/// every change. A failed write leaves the in-memory change in place.
pub struct AlarmStore<S> {
    records: Vec<AlarmRecord>,
    last_id: u64,
    storage: S,
}

impl<S: KeyValueStore> AlarmStore<S> {
    pub fn load(storage: S) -> Result<Self, PersistenceError> {
        let records = match storage.get(ALARMS_KEY)? {
            Some(text) if !text.trim().is_empty() => parse_alarm_records(&text)?,
            _ => Vec::new(),
        };
        let stored_last_id = match storage.get(LAST_ALARM_ID_KEY)? {
            Some(text) if !text.trim().is_empty() => {
                text.trim()
                    .parse::<u64>()
                    .map_err(|err| PersistenceError::Corrupt {
                        key: LAST_ALARM_ID_KEY.to_string(),
                        message: format!("'{}' is not an alarm id: {err}", text.trim()),
                    })?
            }
            _ => 0,
        };
        let last_id = records
            .iter()
            .map(|record| record.id.0)
            .max()
            .unwrap_or(0)
            .max(stored_last_id);
        Ok(Self {
            records,
            last_id,
            storage,
        })
    }

    /// Ids are seeded from `issued_at_ms` (wall-clock millis) and always
    /// exceed every id this store has ever handed out, deleted ones included.
    pub fn add(&mut self, spec: &AlarmSpec, issued_at_ms: i64) -> Result<AlarmRecord, EngineError> {
        let (time, volume) = spec.validate()?;
        let id = self.next_id(issued_at_ms);
        let record = AlarmRecord {
            id,
            time,
            label: spec.label.trim().to_string(),
            sound: spec.sound,
            volume,
            vibrate: spec.vibrate,
            is_active: true,
        };
        self.records.push(record.clone());
        info!("added alarm {} at {}", record.id, record.time);
        self.persist()?;
        Ok(record)
    }

    pub fn delete(&mut self, id: AlarmId) -> Result<bool, PersistenceError> {
        let Some(index) = self.position(id) else {
            warn!("delete ignored, no alarm with id {id}");
            return Ok(false);
        };
        self.records.remove(index);
        info!("deleted alarm {id}");
        self.persist()?;
        Ok(true)
    }

    /// Returns the new `is_active` value, or `None` when the id is unknown.
    pub fn toggle(&mut self, id: AlarmId) -> Result<Option<bool>, PersistenceError> {
        let Some(index) = self.position(id) else {
            warn!("toggle ignored, no alarm with id {id}");
            return Ok(None);
        };
        let record = &mut self.records[index];
        record.is_active = !record.is_active;
        let active = record.is_active;
        info!("alarm {id} is now {}", if active { "on" } else { "off" });
        self.persist()?;
        Ok(Some(active))
    }

    /// Clears `is_active` without toggling. Returns whether anything
    /// changed; an already inactive or unknown alarm is not written again.
    pub fn deactivate(&mut self, id: AlarmId) -> Result<bool, PersistenceError> {
        let Some(record) = self.records.iter_mut().find(|record| record.id == id) else {
            return Ok(false);
        };
        if !record.is_active {
            return Ok(false);
        }
        record.is_active = false;
        self.persist()?;
        Ok(true)
    }

    pub fn list(&self) -> &[AlarmRecord] {
        &self.records
    }

    pub fn get(&self, id: AlarmId) -> Option<&AlarmRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn position(&self, id: AlarmId) -> Option<usize> {
        self.records.iter().position(|record| record.id == id)
    }

    fn next_id(&mut self, issued_at_ms: i64) -> AlarmId {
        let seed = u64::try_from(issued_at_ms).unwrap_or(0);
        self.last_id = seed.max(self.last_id.saturating_add(1));
        AlarmId(self.last_id)
    }

    fn persist(&mut self) -> Result<(), PersistenceError> {
        let text = encode_alarm_records(&self.records)?;
        self.storage
            .set(ALARMS_KEY, &text)
            .and_then(|()| {
                self.storage
                    .set(LAST_ALARM_ID_KEY, &self.last_id.to_string())
            })
            .inspect_err(|err| {
                error!("failed to persist {} alarms: {err}", self.records.len());
            })
    }
}
