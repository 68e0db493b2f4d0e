use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, PersistenceError, ValidationError};
use crate::storage::KeyValueStore;

pub const CITIES_KEY: &str = "cities";
pub const MIN_OFFSET_HOURS: i32 = -12;
pub const MAX_OFFSET_HOURS: i32 = 14;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub offset: i32,
}

impl City {
    /// Parses `"Name,Offset"`, e.g. `"Paris,+2"`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidCity(input.trim().to_string());
        let (name, offset) = input.split_once(',').ok_or_else(invalid)?;
        let name = name.trim();
        let offset: i32 = offset.trim().parse().map_err(|_| invalid())?;
        if name.is_empty() || !(MIN_OFFSET_HOURS..=MAX_OFFSET_HOURS).contains(&offset) {
            return Err(invalid());
        }
        Ok(Self {
            name: name.to_string(),
            offset,
        })
    }

    pub fn offset_label(&self) -> String {
        format!("UTC{:+}", self.offset)
    }

    pub fn local_time(&self, now: DateTime<Utc>) -> NaiveDateTime {
        match FixedOffset::east_opt(self.offset * 3_600) {
            Some(zone) => now.with_timezone(&zone).naive_local(),
            None => now.naive_utc(),
        }
    }
}

/// Cities shown alongside local time, persisted under `cities`.
pub struct WorldClock<S> {
    cities: Vec<City>,
    storage: S,
}

impl<S: KeyValueStore> WorldClock<S> {
    pub fn load(storage: S) -> Result<Self, PersistenceError> {
        let cities = match storage.get(CITIES_KEY)? {
            Some(text) if !text.trim().is_empty() => serde_json::from_str(&text)
                .map_err(|err| PersistenceError::corrupt_json(CITIES_KEY, &err))?,
            _ => Vec::new(),
        };
        Ok(Self { cities, storage })
    }

    pub fn add(&mut self, input: &str) -> Result<City, EngineError> {
        let city = City::parse(input)?;
        if self.cities.iter().any(|existing| existing.name == city.name) {
            return Err(ValidationError::DuplicateCity(city.name).into());
        }
        self.cities.push(city.clone());
        info!("added city {} ({})", city.name, city.offset_label());
        self.persist()?;
        Ok(city)
    }

    pub fn remove(&mut self, name: &str) -> Result<bool, PersistenceError> {
        let before = self.cities.len();
        self.cities.retain(|city| city.name != name.trim());
        if self.cities.len() == before {
            return Ok(false);
        }
        info!("removed city {}", name.trim());
        self.persist()?;
        Ok(true)
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    fn persist(&mut self) -> Result<(), PersistenceError> {
        let text = serde_json::to_string(&self.cities)
            .map_err(|err| PersistenceError::corrupt_json(CITIES_KEY, &err))?;
        self.storage.set(CITIES_KEY, &text).inspect_err(|err| {
            error!("failed to persist {} cities: {err}", self.cities.len());
        })
    }
}
