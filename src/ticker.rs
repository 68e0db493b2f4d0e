use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use log::{debug, warn};

const STOP_POLL: Duration = Duration::from_millis(50);

/// When each tick is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Lined up with wall clock multiples of the period, so one-second ticks
    /// land just after each second boundary.
    WallClock,
    /// A full period after start, then every period from there.
    FromStart,
}

/// Calls `on_tick` on its own thread once per `period`. The thread is
/// stopped and joined when the ticker is dropped.
pub struct Ticker {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Wall-clock aligned ticks. `on_tick` returns `false` to end the
    /// schedule, e.g. when its receiver has gone away.
    pub fn start<F>(period: Duration, on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        Self::with_pacing(period, Pacing::WallClock, on_tick)
    }

    pub fn with_pacing<F>(period: Duration, pacing: Pacing, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = Arc::clone(&stop);
        let join = thread::spawn(move || {
            let started = Instant::now();
            let mut ticks: u32 = 0;
            while !stop_for_thread.load(Ordering::Relaxed) {
                let deadline = match pacing {
                    Pacing::WallClock => Instant::now() + until_next_boundary(period),
                    Pacing::FromStart => {
                        ticks = ticks.saturating_add(1);
                        started + period.saturating_mul(ticks)
                    }
                };
                if !sleep_until(deadline, &stop_for_thread) {
                    break;
                }
                if !on_tick() {
                    debug!("tick receiver gone, ticker exiting");
                    break;
                }
            }
        });
        Self {
            stop,
            join: Some(join),
        }
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(join) = self.join.take()
            && join.join().is_err()
        {
            warn!("ticker thread panicked");
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn until_next_boundary(period: Duration) -> Duration {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let period_ns = period.as_nanos().max(1);
    let into_period = since_epoch.as_nanos() % period_ns;
    Duration::from_nanos(u64::try_from(period_ns - into_period).unwrap_or(u64::MAX))
}

/// Sleeps in short slices so a stop request is noticed quickly. Returns
/// `false` if stopped before `deadline`.
fn sleep_until(deadline: Instant, stop: &AtomicBool) -> bool {
    loop {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(deadline.saturating_duration_since(now).min(STOP_POLL));
    }
}
