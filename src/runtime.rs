use std::io::{BufRead, Write};
use std::ops::ControlFlow;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use anyhow::Result;
use chrono::NaiveDateTime;
use log::{debug, warn};

use crate::alarm::engine::AlarmEngine;
use crate::alarm::model::AlarmSpec;
use crate::alarm::ringing::SNOOZE_MINUTES;
use crate::console::{Command, HELP, format_alarm_table, parse_command};
use crate::notify::NotificationSink;
use crate::storage::KeyValueStore;
use crate::time_provider::TimeProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Tick,
    Line(String),
    InputClosed,
}

/// Terminal front end for a running engine. Ticks and input lines are
/// handled one at a time, each to completion.
pub struct AlarmConsole<S, N, W> {
    engine: AlarmEngine<S, N>,
    out: W,
}

impl<S, N, W> AlarmConsole<S, N, W>
where
    S: KeyValueStore,
    N: NotificationSink,
    W: Write,
{
    pub fn new(engine: AlarmEngine<S, N>, out: W) -> Self {
        Self { engine, out }
    }

    pub fn engine(&self) -> &AlarmEngine<S, N> {
        &self.engine
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn handle_tick(&mut self, now: NaiveDateTime) -> Result<()> {
        let outcome = self.engine.tick(now);
        if outcome.is_empty() {
            return Ok(());
        }
        if outcome.fired.len() > 1 {
            writeln!(
                self.out,
                "{} alarms matched {}; showing the last one",
                outcome.fired.len(),
                now.format("%H:%M")
            )?;
        }
        if outcome.ringing.is_some()
            && let Some(session) = self.engine.current_ringing_session()
        {
            writeln!(
                self.out,
                "*** ALARM {} ({}) *** [s]nooze {SNOOZE_MINUTES} min / [x] stop",
                session.alarm().title(),
                session.alarm().sound
            )?;
        }
        Ok(())
    }

    pub fn handle_line(&mut self, line: &str, now: NaiveDateTime) -> Result<ControlFlow<()>> {
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(err) => {
                writeln!(self.out, "{err}")?;
                return Ok(ControlFlow::Continue(()));
            }
        };

        match command {
            Command::Quit => return Ok(ControlFlow::Break(())),
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::List => {
                for row in format_alarm_table(self.engine.list_alarms(), now) {
                    writeln!(self.out, "{row}")?;
                }
            }
            Command::Add { time, label } => {
                let spec = AlarmSpec::at(time).with_label(label);
                match self.engine.add_alarm(&spec, now) {
                    Ok(record) => writeln!(self.out, "added {} ({})", record.title(), record.id)?,
                    Err(err) => writeln!(self.out, "error: {err}")?,
                }
            }
            Command::Delete(id) => match self.engine.delete_alarm(id) {
                Ok(true) => writeln!(self.out, "deleted {id}")?,
                Ok(false) => writeln!(self.out, "no alarm {id}")?,
                Err(err) => writeln!(self.out, "deleted {id}, but not saved: {err}")?,
            },
            Command::Toggle(id) => match self.engine.toggle_alarm(id) {
                Ok(Some(active)) => {
                    writeln!(self.out, "{id} {}", if active { "on" } else { "off" })?
                }
                Ok(None) => writeln!(self.out, "no alarm {id}")?,
                Err(err) => writeln!(self.out, "toggled {id}, but not saved: {err}")?,
            },
            Command::Snooze => match self.engine.snooze_alarm(now) {
                Ok(Some(record)) => writeln!(self.out, "snoozed until {}", record.time)?,
                Ok(None) => writeln!(self.out, "nothing is ringing")?,
                Err(err) => writeln!(self.out, "snoozed, but not saved: {err}")?,
            },
            Command::Stop => match self.engine.stop_alarm() {
                Some(session) => writeln!(
                    self.out,
                    "stopped {} (rang at {})",
                    session.alarm().title(),
                    session.fired_at().format("%H:%M:%S")
                )?,
                None => writeln!(self.out, "nothing is ringing")?,
            },
        }
        Ok(ControlFlow::Continue(()))
    }
}

/// Drains `events` until input closes or the user quits. The clock is
/// sampled once per event.
pub fn run_event_loop<S, N, W>(
    console: &mut AlarmConsole<S, N, W>,
    clock: &dyn TimeProvider,
    events: &Receiver<Event>,
) -> Result<()>
where
    S: KeyValueStore,
    N: NotificationSink,
    W: Write,
{
    while let Ok(event) = events.recv() {
        match event {
            Event::Tick => console.handle_tick(clock.now_local()?)?,
            Event::Line(line) => {
                if console.handle_line(&line, clock.now_local()?)?.is_break() {
                    break;
                }
            }
            Event::InputClosed => {
                debug!("input closed");
                break;
            }
        }
    }
    Ok(())
}

/// Forwards lines from `input` as events. The thread ends at end of input or
/// once the receiver is gone.
pub fn spawn_line_reader<R>(input: R, events: Sender<Event>) -> JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!("stopped reading input: {err}");
                    break;
                }
            };
            if events.send(Event::Line(line)).is_err() {
                return;
            }
        }
        let _ = events.send(Event::InputClosed);
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::mpsc;

    use chrono::NaiveDate;

    use super::*;
    use crate::notify::testing::RecordingSink;
    use crate::storage::MemoryStore;
    use crate::time_provider::FixedTimeProvider;

    fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 7)
            .expect("date")
            .and_hms_opt(hour, minute, second)
            .expect("time")
    }

    fn console() -> AlarmConsole<MemoryStore, RecordingSink, Vec<u8>> {
        let engine =
            AlarmEngine::load(MemoryStore::new(), RecordingSink::default()).expect("engine");
        AlarmConsole::new(engine, Vec::new())
    }

    fn output(console: AlarmConsole<MemoryStore, RecordingSink, Vec<u8>>) -> String {
        String::from_utf8(console.into_output()).expect("utf8")
    }

    #[test]
    fn banner_then_snooze() {
        let mut console = console();
        console
            .handle_line("add 07:30 Gym", at(6, 0, 0))
            .expect("add");
        console.handle_tick(at(7, 30, 0)).expect("tick");
        assert!(console.engine().current_ringing_session().is_some());
        console.handle_line("s", at(7, 30, 4)).expect("snooze");
        assert!(console.engine().current_ringing_session().is_none());

        let text = output(console);
        assert!(text.contains("added 07:30 - Gym"));
        assert!(text.contains("*** ALARM 07:30 - Gym (default) ***"));
        assert!(text.contains("snoozed until 07:35"));
    }

    #[test]
    fn reports_bad_input_without_stopping() {
        let mut console = console();
        let flow = console.handle_line("add 25:00", at(6, 0, 0)).expect("add");
        assert!(flow.is_continue());
        let flow = console.handle_line("dance", at(6, 0, 0)).expect("unknown");
        assert!(flow.is_continue());
        console.handle_line("stop", at(6, 0, 0)).expect("stop");
        assert!(console.handle_line("quit", at(6, 0, 0)).expect("quit").is_break());

        let text = output(console);
        assert!(text.contains("error: invalid time '25:00'"));
        assert!(text.contains("unknown command 'dance'"));
        assert!(text.contains("nothing is ringing"));
    }

    #[test]
    fn event_loop_serves_ticks_and_lines_until_quit() {
        let clock = FixedTimeProvider::from_local(at(7, 30, 0)).expect("clock");
        let (tx, rx) = mpsc::channel();
        for event in [
            Event::Line("add 07:30".to_string()),
            Event::Tick,
            Event::Line("x".to_string()),
            Event::Line("list".to_string()),
            Event::Line("q".to_string()),
            Event::Line("add 08:00".to_string()),
        ] {
            tx.send(event).expect("send");
        }

        let mut console = console();
        run_event_loop(&mut console, &clock, &rx).expect("loop");
        assert_eq!(console.engine().list_alarms().len(), 1);
        assert!(!console.engine().list_alarms()[0].is_active);

        let text = output(console);
        assert!(text.contains("*** ALARM 07:30"));
        assert!(text.contains("stopped 07:30"));
        assert!(text.contains(" off "));
    }

    #[test]
    fn line_reader_forwards_lines_then_closes() {
        let (tx, rx) = mpsc::channel();
        spawn_line_reader(Cursor::new("list\nq\n"), tx)
            .join()
            .expect("reader");
        let events: Vec<Event> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                Event::Line("list".to_string()),
                Event::Line("q".to_string()),
                Event::InputClosed,
            ]
        );
    }
}
