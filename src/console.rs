use anyhow::{Result, anyhow, bail};
use chrono::NaiveDateTime;

use crate::alarm::evaluator::{format_countdown, next_occurrence};
use crate::alarm::model::{AlarmId, AlarmRecord};
use crate::world::City;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Snooze,
    Stop,
    List,
    Add { time: String, label: String },
    Delete(AlarmId),
    Toggle(AlarmId),
    Help,
    Quit,
}

pub const HELP: &str = "commands: add HH:MM [label] | delete ID | toggle ID | list | snooze (s) | stop (x) | quit (q)";

pub fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let command = match verb.to_ascii_lowercase().as_str() {
        "s" | "snooze" => Command::Snooze,
        "x" | "stop" => Command::Stop,
        "l" | "list" | "ls" => Command::List,
        "h" | "help" | "?" => Command::Help,
        "q" | "quit" | "exit" => Command::Quit,
        "add" | "a" => {
            let (time, label) = match rest.split_once(char::is_whitespace) {
                Some((time, label)) => (time, label.trim()),
                None => (rest, ""),
            };
            Command::Add {
                time: time.to_string(),
                label: label.to_string(),
            }
        }
        "delete" | "del" | "rm" => Command::Delete(parse_id(rest)?),
        "toggle" | "t" => Command::Toggle(parse_id(rest)?),
        "" => bail!("empty command; {HELP}"),
        other => bail!("unknown command '{other}'; {HELP}"),
    };
    Ok(command)
}

fn parse_id(token: &str) -> Result<AlarmId> {
    token
        .parse()
        .map(AlarmId)
        .map_err(|_| anyhow!("invalid alarm id '{token}'"))
}

pub fn format_alarm_row(alarm: &AlarmRecord, now: NaiveDateTime) -> String {
    format!(
        "{:>13}  {}  {:<3}  {:<7}  {:>3}%  {:<9}  {:<10}  {}",
        alarm.id,
        alarm.time,
        if alarm.is_active { "on" } else { "off" },
        alarm.sound,
        (alarm.volume * 100.0).round() as u32,
        if alarm.vibrate { "vibrate" } else { "silent" },
        format_countdown(next_occurrence(alarm, now), now),
        alarm.label
    )
}

pub fn format_alarm_table(alarms: &[AlarmRecord], now: NaiveDateTime) -> Vec<String> {
    if alarms.is_empty() {
        return vec!["No alarms.".to_string()];
    }
    alarms
        .iter()
        .map(|alarm| format_alarm_row(alarm, now))
        .collect()
}

pub fn format_city_row(city: &City, local: &NaiveDateTime) -> String {
    format!(
        "{:<20}  ({})  {}",
        city.name,
        city.offset_label(),
        crate::dial::format_time(local, true)
    )
}
