mod alarm;
mod console;
mod countdown;
mod dial;
mod error;
mod notify;
mod runtime;
mod stopwatch;
mod storage;
mod ticker;
mod time_provider;
mod world;

use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use crate::alarm::engine::AlarmEngine;
use crate::alarm::model::{AlarmId, AlarmSound, AlarmSpec};
use crate::console::{HELP, format_alarm_table, format_city_row};
use crate::countdown::{Countdown, CountdownEvent};
use crate::dial::{HandAngles, format_time};
use crate::notify::{NotificationSink, TerminalSink, VIBRATION_PATTERN};
use crate::runtime::{AlarmConsole, Event, run_event_loop, spawn_line_reader};
use crate::stopwatch::{Stopwatch, format_elapsed};
use crate::storage::{FileStore, KeyValueStore, MemoryStore};
use crate::ticker::{Pacing, Ticker};
use crate::time_provider::{
    FixedTimeProvider, SystemTimeProvider, TimeProvider, parse_local_datetime,
};
use crate::world::WorldClock;

type Storage = Box<dyn KeyValueStore>;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliSound {
    Default,
    Bell,
    Chime,
}

impl From<CliSound> for AlarmSound {
    fn from(value: CliSound) -> Self {
        match value {
            CliSound::Default => AlarmSound::Default,
            CliSound::Bell => AlarmSound::Bell,
            CliSound::Chime => AlarmSound::Chime,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "clockdeck",
    version,
    about = "Terminal alarm clock with world clock, timer and stopwatch"
)]
struct Cli {
    /// Data file holding alarms and cities.
    #[arg(long, global = true, default_value = "clockdeck.json")]
    data: PathBuf,

    /// Keep everything in memory for this run.
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Pretend the local time is this instant (YYYY-MM-DDTHH:MM:SS).
    #[arg(long, global = true)]
    at: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage alarms.
    Alarm {
        #[command(subcommand)]
        action: AlarmAction,
    },
    /// Manage world clock cities.
    World {
        #[command(subcommand)]
        action: WorldAction,
    },
    /// Print the local time, the dial hands and every world clock city.
    Clock {
        #[arg(long)]
        seconds: bool,
    },
    /// Count down and ring when done.
    Timer {
        #[arg(default_value = "")]
        minutes: String,
        #[arg(default_value = "")]
        seconds: String,
    },
    /// Record laps at a fixed interval.
    Stopwatch {
        #[arg(long, default_value_t = 3)]
        laps: u32,
        #[arg(long = "interval-ms", default_value_t = 1_000)]
        interval_ms: u64,
    },
    /// Watch alarms and take commands from stdin.
    Run,
}

#[derive(Subcommand, Debug)]
enum AlarmAction {
    Add {
        #[arg(long)]
        time: Option<String>,
        #[arg(long, default_value = "")]
        label: String,
        #[arg(long, value_enum, default_value_t = CliSound::Default)]
        sound: CliSound,
        #[arg(long, default_value_t = crate::alarm::model::DEFAULT_VOLUME)]
        volume: f64,
        #[arg(long)]
        no_vibrate: bool,
    },
    List,
    Delete {
        id: u64,
    },
    Toggle {
        id: u64,
    },
}

#[derive(Subcommand, Debug)]
enum WorldAction {
    /// Add a city as "City,Offset", e.g. "Paris,+2".
    Add { city: String },
    List,
    Remove { name: String },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let clock = select_clock(cli.at.as_deref())?;
    let storage = open_storage(&cli);

    match cli.command {
        Command::Alarm { action } => run_alarm(action, storage, clock.as_ref(), &cli.data),
        Command::World { action } => run_world(action, storage, clock.as_ref(), &cli.data),
        Command::Clock { seconds } => run_clock(seconds, storage, clock.as_ref(), &cli.data),
        Command::Timer { minutes, seconds } => run_timer(&minutes, &seconds),
        Command::Stopwatch { laps, interval_ms } => run_stopwatch(laps, interval_ms),
        Command::Run => run_console(storage, clock.as_ref(), &cli.data),
    }
}

fn select_clock(at: Option<&str>) -> Result<Box<dyn TimeProvider>> {
    match at {
        Some(text) => {
            let naive = parse_local_datetime(text).context("failed to parse --at")?;
            Ok(Box::new(FixedTimeProvider::from_local(naive)?))
        }
        None => Ok(Box::new(SystemTimeProvider)),
    }
}

fn open_storage(cli: &Cli) -> Storage {
    if cli.ephemeral {
        info!("using in-memory storage");
        Box::new(MemoryStore::new())
    } else {
        let store = FileStore::new(&cli.data);
        info!("using {}", store.path().display());
        Box::new(store)
    }
}

fn load_engine(storage: Storage, data: &Path) -> Result<AlarmEngine<Storage, TerminalSink>> {
    AlarmEngine::load(storage, TerminalSink::new())
        .with_context(|| format!("failed to load {}", data.display()))
}

fn load_world(storage: Storage, data: &Path) -> Result<WorldClock<Storage>> {
    WorldClock::load(storage).with_context(|| format!("failed to load {}", data.display()))
}

fn run_alarm(
    action: AlarmAction,
    storage: Storage,
    clock: &dyn TimeProvider,
    data: &Path,
) -> Result<()> {
    let mut engine = load_engine(storage, data)?;
    let now = clock.now_local()?;
    match action {
        AlarmAction::Add {
            time,
            label,
            sound,
            volume,
            no_vibrate,
        } => {
            let spec = AlarmSpec {
                time,
                label,
                sound: sound.into(),
                volume,
                vibrate: !no_vibrate,
            };
            let record = engine.add_alarm(&spec, now)?;
            println!("added {} ({})", record.title(), record.id);
        }
        AlarmAction::List => {
            for row in format_alarm_table(engine.list_alarms(), now) {
                println!("{row}");
            }
        }
        AlarmAction::Delete { id } => {
            let id = AlarmId(id);
            if engine.delete_alarm(id)? {
                println!("deleted {id}");
            } else {
                println!("no alarm {id}");
            }
        }
        AlarmAction::Toggle { id } => {
            let id = AlarmId(id);
            match engine.toggle_alarm(id)? {
                Some(active) => {
                    let title = engine
                        .get_alarm(id)
                        .map(|alarm| alarm.title())
                        .unwrap_or_default();
                    println!("{id} {} {title}", if active { "on" } else { "off" });
                }
                None => println!("no alarm {id}"),
            }
        }
    }
    Ok(())
}

fn run_world(
    action: WorldAction,
    storage: Storage,
    clock: &dyn TimeProvider,
    data: &Path,
) -> Result<()> {
    let mut world = load_world(storage, data)?;
    match action {
        WorldAction::Add { city } => {
            let city = world.add(&city)?;
            println!("added {} ({})", city.name, city.offset_label());
        }
        WorldAction::List => print_cities(&world, clock)?,
        WorldAction::Remove { name } => {
            if world.remove(&name)? {
                println!("removed {}", name.trim());
            } else {
                println!("no city {}", name.trim());
            }
        }
    }
    Ok(())
}

fn print_cities(world: &WorldClock<Storage>, clock: &dyn TimeProvider) -> Result<()> {
    if world.cities().is_empty() {
        println!("No cities.");
        return Ok(());
    }
    let now = clock.now_utc()?;
    for city in world.cities() {
        println!("{}", format_city_row(city, &city.local_time(now)));
    }
    Ok(())
}

fn run_clock(
    show_seconds: bool,
    storage: Storage,
    clock: &dyn TimeProvider,
    data: &Path,
) -> Result<()> {
    let world = load_world(storage, data)?;
    let now = clock.now_local()?;
    let hands = HandAngles::at(&now);
    println!("{}", format_time(&now, show_seconds));
    println!(
        "hands: hour {:.1} minute {:.1} second {:.1}",
        hands.hour, hands.minute, hands.second
    );
    print_cities(&world, clock)
}

fn run_timer(minutes: &str, seconds: &str) -> Result<()> {
    let mut countdown = Countdown::new();
    countdown.set(minutes, seconds)?;
    countdown.start_pause();
    println!("{}", countdown.format());

    let (tx, rx) = mpsc::channel();
    let ticker = Ticker::with_pacing(Duration::from_secs(1), Pacing::FromStart, move || {
        tx.send(Event::Tick).is_ok()
    });
    let mut sink = TerminalSink::new();
    while countdown.is_running() && rx.recv().is_ok() {
        match countdown.tick() {
            Some(CountdownEvent::Running { .. }) => println!("{}", countdown.format()),
            Some(CountdownEvent::Finished) => {
                println!("{}", countdown.format());
                println!("time's up");
                sink.vibrate(&VIBRATION_PATTERN);
                sink.cancel_vibrate();
            }
            None => break,
        }
    }
    ticker.stop();
    countdown.reset();
    Ok(())
}

fn run_stopwatch(laps: u32, interval_ms: u64) -> Result<()> {
    if laps == 0 {
        bail!("--laps must be greater than zero");
    }
    if interval_ms == 0 {
        bail!("--interval-ms must be greater than zero");
    }

    let mut watch = Stopwatch::new();
    watch.start_stop(Instant::now());
    for number in 1..=laps {
        thread::sleep(Duration::from_millis(interval_ms));
        if let Some(split) = watch.lap(Instant::now()) {
            println!("lap {number}: {}", format_elapsed(split));
        }
    }
    let stopped_at = Instant::now();
    if watch.is_running() {
        watch.start_stop(stopped_at);
    }
    println!(
        "total {} over {} laps",
        format_elapsed(watch.elapsed(stopped_at)),
        watch.laps().len()
    );
    watch.reset();
    Ok(())
}

fn run_console(storage: Storage, clock: &dyn TimeProvider, data: &Path) -> Result<()> {
    let engine = load_engine(storage, data)?;
    let mut stdout = io::stdout();
    writeln!(stdout, "{HELP}")?;
    let mut console = AlarmConsole::new(engine, stdout);

    let (tx, rx) = mpsc::channel();
    let tick_tx = tx.clone();
    let ticker = Ticker::start(Duration::from_secs(1), move || {
        tick_tx.send(Event::Tick).is_ok()
    });
    spawn_line_reader(BufReader::new(io::stdin()), tx);

    let result = run_event_loop(&mut console, clock, &rx);
    ticker.stop();
    if console.engine().sink().is_playing() {
        info!("exiting while an alarm is ringing");
    }
    result
}
