//! # Sensor Replay Module
//!
//! Plays back recorded accelerometer samples as if they came from a live
//! sensor. The recording is newline-delimited JSON, one
//! `{"x": .., "y": .., "z": ..}` object per line; blank lines and lines
//! starting with `#` are skipped.

use anyhow::{Context, Result, bail};
use crossbeam_channel::Sender;
use reshoot_core::AccelerationSample;
use reshoot_core::sensor::SampleSender;
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Running playback thread. Stops when dropped.
#[derive(Debug)]
pub struct Replay {
    shutdown_tx: Option<Sender<()>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Replay {
    pub fn stop(&mut self) {
        self.shutdown_tx.take();
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("[REPLAY] Replay thread panicked");
            }
        }
    }
}

impl Drop for Replay {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Parses a whole recording.
pub fn load_samples(path: &Path) -> Result<Vec<AccelerationSample>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading samples {}", path.display()))?;
    let samples = parse_samples(&text).with_context(|| format!("parsing {}", path.display()))?;
    if samples.is_empty() {
        bail!("{} contains no samples", path.display());
    }
    Ok(samples)
}

fn parse_samples(text: &str) -> Result<Vec<AccelerationSample>> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| serde_json::from_str(line).with_context(|| format!("line {n}")))
        .collect()
}

/// Starts pushing `samples` into `sender` at `rate_hz`, looping forever.
///
/// # Returns
/// * `Ok(replay)` - Playback handle; drop or `stop()` it to end playback
/// * `Err(e)` - Invalid rate, or the thread could not be started
pub fn start_replay(samples: Vec<AccelerationSample>, rate_hz: f64, sender: SampleSender) -> Result<Replay> {
    if !(rate_hz.is_finite() && rate_hz > 0.0) || samples.is_empty() {
        bail!("replay needs samples and a positive rate (got {rate_hz} Hz)");
    }
    let period = Duration::from_secs_f64(1.0 / rate_hz);
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

    let thread_handle = thread::Builder::new()
        .name("sensor-replay".into())
        .spawn(move || {
            log::info!("[REPLAY] Replaying {} samples at {rate_hz} Hz", samples.len());
            for sample in samples.iter().cycle() {
                if !sender.push(*sample) {
                    log::info!("[REPLAY] Sensor pipeline closed");
                    break;
                }
                crossbeam_channel::select! {
                    recv(shutdown_rx) -> _ => break,
                    default(period) => {},
                }
            }
            log::info!("[REPLAY] Replay thread finished");
        })
        .context("starting replay thread")?;

    Ok(Replay {
        shutdown_tx: Some(shutdown_tx),
        thread_handle: Some(thread_handle),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reshoot_core::sensor::sample_channel;

    #[test]
    fn parses_json_lines_and_skips_comments() {
        let text = "# tilt recording\n{\"x\": 0.0, \"y\": 0.1, \"z\": 9.8}\n\n{\"x\":1,\"y\":2,\"z\":3}\n";
        let samples = parse_samples(text).expect("parse");
        assert_eq!(
            samples,
            vec![
                AccelerationSample::new(0.0, 0.1, 9.8),
                AccelerationSample::new(1.0, 2.0, 3.0),
            ]
        );
    }

    #[test]
    fn reports_bad_line_number() {
        let err = parse_samples("{\"x\":1,\"y\":2,\"z\":3}\n{oops}\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"), "{err:#}");
    }

    #[test]
    fn replay_feeds_the_channel_and_stops() {
        let (tx, rx) = sample_channel(16);
        let sample = AccelerationSample::new(0.0, 0.0, 1.0);
        let mut replay = start_replay(vec![sample], 1000.0, tx).expect("start");
        let got = rx.recv_timeout(Duration::from_secs(5)).expect("sample");
        assert_eq!(got, sample);
        replay.stop();
    }

    #[test]
    fn rejects_zero_rate() {
        let (tx, _rx) = sample_channel(1);
        assert!(start_replay(vec![AccelerationSample::default()], 0.0, tx).is_err());
    }
}
