use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    Running { remaining_secs: u64 },
    Finished,
}

/// Countdown timer advanced one second per `tick`.
#[derive(Debug, Default)]
pub struct Countdown {
    remaining_secs: u64,
    running: bool,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a duration from form text. Blank fields count as zero; the
    /// total must be positive.
    pub fn set(&mut self, minutes: &str, seconds: &str) -> Result<u64, ValidationError> {
        let total = parse_field(minutes)?
            .checked_mul(60)
            .and_then(|secs| secs.checked_add(parse_field(seconds).ok()?))
            .ok_or(ValidationError::InvalidDuration)?;
        if total == 0 {
            return Err(ValidationError::InvalidDuration);
        }
        self.remaining_secs = total;
        Ok(total)
    }

    /// Toggles running. Has no effect when nothing is left.
    pub fn start_pause(&mut self) -> bool {
        if self.remaining_secs > 0 {
            self.running = !self.running;
        }
        self.running
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.remaining_secs = 0;
    }

    /// `None` while paused or idle.
    pub fn tick(&mut self) -> Option<CountdownEvent> {
        if !self.running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.running = false;
            return Some(CountdownEvent::Finished);
        }
        Some(CountdownEvent::Running {
            remaining_secs: self.remaining_secs,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn format(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.remaining_secs / 60,
            self.remaining_secs % 60
        )
    }
}

fn parse_field(text: &str) -> Result<u64, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(0);
    }
    text.parse().map_err(|_| ValidationError::InvalidDuration)
}
