//! # Reshoot - Headless Front End
//!
//! Drives the reshoot core from a terminal: a replayed accelerometer
//! recording stands in for the live sensor, a folder of images for the
//! camera and a directory for the gallery.
//!
//! ## Architecture
//! - **Main Thread**: Message loop, prints alignment and capture feedback
//! - **Orientation Thread**: Turns samples into pitch/roll and alignment
//! - **Capture Threads**: One per trigger, owned by the orchestrator
//! - **Communication**: Crossbeam channels between all of the above
//!
//! ## Commands (one per line on stdin)
//! `ref`, `shot`, `reset`, `status`, `quit`

mod devices;
mod replay;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{Receiver, Sender};
use devices::{FolderSource, GallerySink};
use log::LevelFilter;
use reshoot_core::error::TriggerError;
use reshoot_core::logger::init_logging;
use reshoot_core::sensor::{SensorWorker, sample_channel};
use reshoot_core::{
    AlignmentResult, CaptureOrchestrator, CaptureReport, CaptureRequest, CoreConfig, LiveOutputs,
    ReferenceStore,
};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How often the live alignment line is refreshed.
const STATUS_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Parser)]
#[command(name = "reshoot", about = "Repeat a recorded camera orientation and keep only sharp shots")]
struct Args {
    /// Directory of image files used as camera frames.
    #[arg(long)]
    frames: PathBuf,

    /// Directory accepted shots are written to.
    #[arg(long, default_value = "gallery")]
    gallery: PathBuf,

    /// Newline-delimited JSON accelerometer recording.
    #[arg(long)]
    samples: PathBuf,

    /// JSON settings file; defaults are used when it does not exist.
    #[arg(long, default_value = "reshoot.json")]
    config: PathBuf,

    /// Replay rate of the accelerometer recording.
    #[arg(long, default_value_t = 50.0)]
    sample_rate_hz: f64,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

/// Everything the main loop reacts to.
#[derive(Debug, Clone, PartialEq)]
enum Message {
    CaptureReference,
    CaptureShot,
    ResetReference,
    Status,
    Quit,
    Unknown(String),
}

impl Message {
    fn parse(line: &str) -> Option<Self> {
        let command = line.trim();
        if command.is_empty() {
            return None;
        }
        Some(match command.to_ascii_lowercase().as_str() {
            "ref" | "reference" => Message::CaptureReference,
            "shot" | "s" => Message::CaptureShot,
            "reset" => Message::ResetReference,
            "status" => Message::Status,
            "quit" | "exit" | "q" => Message::Quit,
            _ => Message::Unknown(command.to_string()),
        })
    }
}

/// Main application state.
struct App {
    outputs: LiveOutputs,
    orchestrator: CaptureOrchestrator,
    last_alignment: Option<AlignmentResult>,
    // Kept for their Drop: stopping the replay closes the sensor pipeline.
    _replay: replay::Replay,
    _sensor: SensorWorker,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level);
    log::info!("[MAIN] Starting reshoot...");

    let config = CoreConfig::load(&args.config)?;
    let app = App::new(&args, &config)?;
    let commands = spawn_command_reader();
    app.run(commands);

    log::info!("[MAIN] Finished");
    Ok(())
}

impl App {
    fn new(args: &Args, config: &CoreConfig) -> Result<Self> {
        let source = FolderSource::open(&args.frames).context("opening frame folder")?;
        let sink = GallerySink::new(&args.gallery);
        let samples = replay::load_samples(&args.samples)?;

        let outputs = LiveOutputs::default();
        let reference = ReferenceStore::new();

        let (sample_tx, sample_rx) = sample_channel(config.sensor_queue);
        let sensor = SensorWorker::spawn(
            sample_rx,
            outputs.clone(),
            reference.clone(),
            config.tolerance_deg,
        )
        .context("starting orientation thread")?;
        let replay = replay::start_replay(samples, args.sample_rate_hz, sample_tx)?;

        let orchestrator = CaptureOrchestrator::new(
            Arc::new(source),
            Arc::new(sink),
            reference,
            outputs.orientation.clone(),
            config,
        );

        Ok(Self {
            outputs,
            orchestrator,
            last_alignment: None,
            _replay: replay,
            _sensor: sensor,
        })
    }

    fn run(mut self, commands: Receiver<Message>) {
        let reports = self.orchestrator.outcomes();
        let ticker = crossbeam_channel::tick(STATUS_INTERVAL);
        println!("commands: ref | shot | reset | status | quit");

        loop {
            crossbeam_channel::select! {
                recv(commands) -> msg => match msg {
                    Ok(Message::Quit) | Err(_) => break,
                    Ok(message) => self.update(message),
                },
                recv(reports) -> report => {
                    if let Ok(report) = report {
                        print_report(&report);
                    }
                },
                recv(ticker) -> _ => self.refresh_alignment(),
            }
        }

        log::info!("[MAIN] Shutting down capture...");
        self.orchestrator.shutdown();
    }

    fn update(&mut self, message: Message) {
        log::debug!("[UPDATE] Received message: {message:?}");
        match message {
            Message::CaptureReference => self.trigger(CaptureRequest::Reference),
            Message::CaptureShot => self.trigger(CaptureRequest::Shot),
            Message::ResetReference => {
                self.orchestrator.reset_reference();
                self.last_alignment = None;
                println!("reference cleared");
            }
            Message::Status => self.print_status(),
            Message::Unknown(command) => println!("unknown command: {command}"),
            Message::Quit => {}
        }
    }

    fn trigger(&self, request: CaptureRequest) {
        match self.orchestrator.trigger(request) {
            Ok(()) => println!("capturing {}...", request_label(request)),
            Err(TriggerError::Busy) => println!("busy: a capture is already running"),
            Err(e) => println!("{e}"),
        }
    }

    /// Prints the alignment line only when it changed.
    fn refresh_alignment(&mut self) {
        if !self.orchestrator.reference().is_set() {
            return;
        }
        let alignment = self.outputs.alignment.get();
        if self.last_alignment != Some(alignment) {
            self.last_alignment = Some(alignment);
            println!("{}", alignment_line(alignment));
        }
    }

    fn print_status(&self) {
        let o = self.outputs.orientation.get();
        println!("orientation: pitch {:+.1}°, roll {:+.1}°", o.pitch, o.roll);
        match self.orchestrator.reference().target() {
            Some(target) => {
                println!("target:      pitch {:+.1}°, roll {:+.1}°", target.pitch, target.roll);
                println!("{}", alignment_line(self.outputs.alignment.get()));
            }
            None => println!("no reference set"),
        }
        println!("capture:     {:?}", self.orchestrator.state());
    }
}

fn request_label(request: CaptureRequest) -> &'static str {
    match request {
        CaptureRequest::Reference => "reference",
        CaptureRequest::Shot => "shot",
    }
}

fn alignment_line(alignment: AlignmentResult) -> String {
    let mark = |ok: bool| if ok { "ok" } else { "--" };
    format!(
        "alignment:   pitch [{}] roll [{}]{}",
        mark(alignment.pitch_aligned),
        mark(alignment.roll_aligned),
        if alignment.is_aligned() { "  ALIGNED" } else { "" }
    )
}

fn print_report(report: &CaptureReport) {
    println!("{}: {}", request_label(report.request), report.outcome);
}

/// Reads stdin on its own thread; EOF closes the channel.
fn spawn_command_reader() -> Receiver<Message> {
    let (tx, rx): (Sender<Message>, Receiver<Message>) = crossbeam_channel::unbounded();
    let spawned = thread::Builder::new().name("stdin".into()).spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if let Some(message) = Message::parse(&line) {
                if tx.send(message).is_err() {
                    break;
                }
            }
        }
    });
    if let Err(e) = spawned {
        log::error!("[MAIN] Could not read commands: {e}");
    }
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Message::parse("ref"), Some(Message::CaptureReference));
        assert_eq!(Message::parse("  SHOT \n"), Some(Message::CaptureShot));
        assert_eq!(Message::parse("reset"), Some(Message::ResetReference));
        assert_eq!(Message::parse("q"), Some(Message::Quit));
        assert_eq!(Message::parse(""), None);
        assert_eq!(Message::parse("zoom"), Some(Message::Unknown("zoom".into())));
    }

    #[test]
    fn alignment_line_marks_axes() {
        let both = AlignmentResult {
            pitch_aligned: true,
            roll_aligned: true,
        };
        assert!(alignment_line(both).ends_with("ALIGNED"));

        let pitch_only = AlignmentResult {
            pitch_aligned: true,
            roll_aligned: false,
        };
        assert_eq!(alignment_line(pitch_only), "alignment:   pitch [ok] roll [--]");
    }

    #[test]
    fn args_parse() {
        let args = Args::try_parse_from([
            "reshoot",
            "--frames",
            "frames",
            "--samples",
            "tilt.jsonl",
            "--log-level",
            "debug",
        ])
        .expect("args");
        assert_eq!(args.gallery, PathBuf::from("gallery"));
        assert_eq!(args.sample_rate_hz, 50.0);
        assert_eq!(args.log_level, LevelFilter::Debug);
    }
}
