use std::time::{Duration, Instant};

/// Elapsed-time counter. Callers pass the current `Instant` so runs can be
/// replayed in tests.
#[derive(Debug, Default)]
pub struct Stopwatch {
    accumulated: Duration,
    started_at: Option<Instant>,
    laps: Vec<Duration>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts when stopped, stops when running. Returns whether it is now
    /// running.
    pub fn start_stop(&mut self, now: Instant) -> bool {
        match self.started_at.take() {
            Some(started) => {
                self.accumulated += now.saturating_duration_since(started);
                false
            }
            None => {
                self.started_at = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        self.started_at = None;
        self.laps.clear();
    }

    /// Records the current reading. Ignored while stopped.
    pub fn lap(&mut self, now: Instant) -> Option<Duration> {
        self.started_at?;
        let reading = self.elapsed(now);
        self.laps.push(reading);
        Some(reading)
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.accumulated
            + self
                .started_at
                .map(|started| now.saturating_duration_since(started))
                .unwrap_or_default()
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn laps(&self) -> &[Duration] {
        &self.laps
    }
}

/// `MM:SS.cc`, minutes uncapped.
pub fn format_elapsed(elapsed: Duration) -> String {
    let centis = elapsed.as_millis() / 10;
    format!(
        "{:02}:{:02}.{:02}",
        centis / 6_000,
        (centis / 100) % 60,
        centis % 100
    )
}
