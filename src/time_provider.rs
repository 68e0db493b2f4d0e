use anyhow::{Result, anyhow};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// Wall-clock source, sampled once per tick.
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> Result<DateTime<Local>>;

    fn now_local(&self) -> Result<NaiveDateTime> {
        Ok(self.now()?.naive_local())
    }

    fn now_utc(&self) -> Result<DateTime<Utc>> {
        Ok(self.now()?.with_timezone(&Utc))
    }
}

pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> Result<DateTime<Local>> {
        Ok(Local::now())
    }
}

/// Always reports the same instant.
pub struct FixedTimeProvider {
    at: DateTime<Local>,
}

impl FixedTimeProvider {
    pub fn new(at: DateTime<Local>) -> Self {
        Self { at }
    }

    /// Resolves a local wall-clock reading; the earlier instant wins when the
    /// reading is ambiguous.
    pub fn from_local(naive: NaiveDateTime) -> Result<Self> {
        let at = Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| anyhow!("local time {naive} does not exist in this timezone"))?;
        Ok(Self::new(at))
    }
}

impl TimeProvider for FixedTimeProvider {
    fn now(&self) -> Result<DateTime<Local>> {
        Ok(self.at)
    }
}

pub fn parse_local_datetime(input: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S"))
        .map_err(|_| anyhow!("invalid datetime '{input}'"))
}
