use std::io;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{ArgAction, Parser};
use itertools::Itertools;
use rand::Rng;

use shiftshow::num::Float;
use shiftshow::{
    ColorScheme, ContentLibrary, ControlHandle, Director, Mode, Outputs, ShowConfig, Signal, SignalFrame,
    SoftwareRenderer,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Log verbosity. Add more v's for more verbosity.
    #[arg(short, action = ArgAction::Count)]
    verbose: u8,

    /// Mode to start in: blackout, chill, gentle or rave.
    #[arg(long, default_value = "gentle")]
    mode: Mode,

    /// Color scheme preset to start with, e.g. standard-1 or tropical-2.
    #[arg(long, default_value = "standard-1")]
    scheme: String,

    /// Ticks per second.
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Seed for every random choice. Random if not given.
    #[arg(long)]
    seed: Option<u64>,

    /// Seconds between automatic shifts.
    #[arg(long, default_value_t = 60.0)]
    shift_after: f64,

    /// Seconds to ramp signals in after startup.
    #[arg(long, default_value_t = 10.0)]
    warmup: f64,

    /// Tempo of the synthetic analysis feed.
    #[arg(long, default_value_t = 128.0)]
    bpm: f64,

    /// Read commands (`mode rave`, `shift 0.5`, ...) from stdin.
    #[arg(long)]
    stdin: bool,

    /// Never pick rainbow effects.
    #[arg(long)]
    no_rainbows: bool,
}

fn main() -> Result<()> {
    // Set up colorful logging for `log::` calls.
    let args = Args::parse();
    env_logger::builder()
        .filter_module(
            "shiftshow",
            match args.verbose {
                0 => log::LevelFilter::Info,
                1 => log::LevelFilter::Debug,
                _ => log::LevelFilter::Trace,
            },
        )
        .format_timestamp(None)
        .format_module_path(false)
        .parse_default_env()
        .init();

    let config = ShowConfig {
        fps: args.fps,
        warmup_secs: args.warmup,
        shift_after_secs: args.shift_after,
        seed: args.seed,
        mode: args.mode,
        scheme: ColorScheme::named(&args.scheme)?,
        allow_rainbows: !args.no_rainbows,
        ..Default::default()
    };
    let (w, h) = config.canvas;
    let renderer = SoftwareRenderer::new(w, h, config.pool_capacity);
    let period = Duration::from_secs_f64(1.0 / config.fps);

    let mut director = Director::new(config, ContentLibrary::builtin(), renderer)?;
    let handle = director.handle();

    spawn_analysis(handle.clone(), args.bpm);
    spawn_transport(director.outputs());
    let stdin_channel = args.stdin.then(spawn_stdin_channel);

    let start = Instant::now();
    loop {
        let tick_start = Instant::now();

        if let Some(rx) = &stdin_channel {
            follow_stdin(&handle, rx);
        }
        let report = director.tick(start.elapsed().as_secs_f64());
        if report.rebuilt || report.regenerated > 0 {
            log::debug!("{report:?}");
        }

        if let Some(rest) = period.checked_sub(tick_start.elapsed()) {
            thread::sleep(rest);
        }
    }
}

/// Apply every command typed since the last tick.
fn follow_stdin(handle: &ControlHandle, rx: &Receiver<String>) {
    loop {
        match rx.try_recv() {
            Ok(line) if line.trim().is_empty() => {}
            Ok(line) => {
                if let Err(e) = handle.command(&line) {
                    log::warn!("{e}");
                }
            }
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => break,
        }
    }
}

fn spawn_stdin_channel() -> Receiver<String> {
    let (tx, rx) = mpsc::channel::<String>();
    thread::spawn(move || loop {
        let mut buffer = String::new();
        match io::stdin().read_line(&mut buffer) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                if tx.send(buffer).is_err() {
                    break;
                }
            }
        }
    });
    rx
}

/// Stand-in for the audio analysis: beat-shaped pulses and bass swells at `bpm`.
fn spawn_analysis(handle: ControlHandle, bpm: f64) {
    thread::spawn(move || {
        let mut rng = rand::thread_rng();
        let beat = 60.0 / bpm;
        let start = Instant::now();
        loop {
            let t = start.elapsed().as_secs_f64();
            // Four bars on, one bar breakdown
            let section = if (t / beat).fmod(20.0) < 16.0 { 1.0 } else { 0.2 };
            let kick = t.ramp(beat).inv().in_quad() * section;
            let hats = t.phase(beat, 0.5).square(beat, 0.1) * rng.gen_range(0.5..1.0) * section;
            let swell = (t / 4.0).tri(8.0).lerp(0.2..0.9) * section;

            let frame = SignalFrame::new(t)
                .with(Signal::FreqLow, kick)
                .with(Signal::FreqHigh, hats)
                .with(Signal::FreqAll, (kick + hats) / 2.0)
                .with(Signal::SustainedLow, swell)
                .with(Signal::SustainedHigh, hats * 0.5)
                .with(Signal::Pulse, t.square(beat, 0.25));
            handle.publish_frame(frame);
            thread::sleep(Duration::from_millis(10));
        }
    });
}

/// Stand-in for the fixture transport: reads the last finished tick at its own pace.
fn spawn_transport(outputs: Outputs) {
    thread::spawn(move || loop {
        thread::sleep(Duration::from_secs(1));
        let fixtures = outputs.fixtures();
        let dimmers = fixtures.iter().map(|s| format!("{:.0}", s.dimmer * 9.0)).join("");
        let lit = fixtures.iter().filter(|s| s.dimmer > 0.0).count();
        let frame = outputs.frame().map(|f| format!("{:?}", f.size())).unwrap_or_else(|| "none".into());
        log::info!("tick {}: {lit}/{} lit [{dimmers}] frame {frame}", outputs.tick(), fixtures.len());
        for (i, s) in fixtures.iter().enumerate() {
            log::trace!("  {i:2}: {s:?}");
        }
    });
}
