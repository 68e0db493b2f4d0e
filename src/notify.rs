use std::io::{self, Write};

use log::{debug, info};

use crate::alarm::model::AlarmSound;

/// On/off/on vibration used for alarms and finished timers, in milliseconds.
pub const VIBRATION_PATTERN: [u64; 3] = [500, 200, 500];

/// Where audible and haptic feedback goes.
pub trait NotificationSink {
    fn play_sound(&mut self, sound: AlarmSound, volume: f64);
    fn stop_sound(&mut self);
    fn vibrate(&mut self, pattern: &[u64]);
    fn cancel_vibrate(&mut self);

    /// Called on every tick while an alarm keeps ringing. Sinks that cannot
    /// loop a sound on their own re-trigger it here.
    fn sustain(&mut self) {}
}

/// Rings the terminal bell while a sound is playing. Vibration has no
/// terminal equivalent and is only logged.
#[derive(Debug, Default)]
pub struct TerminalSink {
    playing: Option<AlarmSound>,
    vibrating: bool,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.is_some()
    }
}

impl NotificationSink for TerminalSink {
    fn play_sound(&mut self, sound: AlarmSound, volume: f64) {
        info!(
            "playing {} at {:.0}% volume",
            sound.asset(),
            volume * 100.0
        );
        self.playing = Some(sound);
        bell();
    }

    fn stop_sound(&mut self) {
        if let Some(sound) = self.playing.take() {
            info!("stopped {}", sound.asset());
        }
    }

    fn vibrate(&mut self, pattern: &[u64]) {
        debug!("vibrate {pattern:?}");
        self.vibrating = true;
    }

    fn cancel_vibrate(&mut self) {
        if self.vibrating {
            debug!("vibration cancelled");
        }
        self.vibrating = false;
    }

    fn sustain(&mut self) {
        if self.playing.is_some() {
            bell();
        }
    }
}

fn bell() {
    let mut stdout = io::stdout();
    let _ = stdout.write_all(b"\x07");
    let _ = stdout.flush();
}
