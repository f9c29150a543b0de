//! # Sensor Module
//!
//! Runs the orientation pipeline on its own thread.
//!
//! The accelerometer pushes samples through a bounded channel. The worker
//! wakes on each arrival, drains whatever has piled up and keeps only the
//! newest sample, so a slow consumer never falls behind the sensor. Each
//! processed sample publishes a fresh orientation and a fresh alignment.

use crate::alignment;
use crate::orientation::{self, AccelerationSample};
use crate::reference::ReferenceStore;
use crate::LiveOutputs;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::thread::{self, JoinHandle};

/// Creates the sample queue with room for `capacity` pending samples.
pub fn sample_channel(capacity: usize) -> (SampleSender, Receiver<AccelerationSample>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    (SampleSender { tx }, rx)
}

/// Producer half of the sample queue, handed to the accelerometer driver.
#[derive(Debug, Clone)]
pub struct SampleSender {
    tx: Sender<AccelerationSample>,
}

impl SampleSender {
    /// Queues a sample without blocking.
    ///
    /// A full queue drops the sample. Returns `false` once the worker is
    /// gone, so the driver knows to stop.
    pub fn push(&self, sample: AccelerationSample) -> bool {
        match self.tx.try_send(sample) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::trace!("[SENSOR] Queue full, dropping sample");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Handle to the orientation processing thread.
#[derive(Debug)]
pub struct SensorWorker {
    shutdown_tx: Option<Sender<()>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl SensorWorker {
    /// Starts processing samples from `samples`.
    ///
    /// # Arguments
    /// * `samples` - Receiving half from [`sample_channel`]
    /// * `outputs` - Where orientation and alignment are published
    /// * `reference` - Source of the alignment target
    /// * `tolerance_deg` - Per-axis alignment tolerance
    pub fn spawn(
        samples: Receiver<AccelerationSample>,
        outputs: LiveOutputs,
        reference: ReferenceStore,
        tolerance_deg: f64,
    ) -> std::io::Result<Self> {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        let thread_handle = thread::Builder::new()
            .name("orientation".into())
            .spawn(move || {
                log::info!("[SENSOR] Orientation thread started");
                loop {
                    crossbeam_channel::select! {
                        recv(samples) -> msg => match msg {
                            Ok(first) => {
                                let newest = samples.try_iter().last().unwrap_or(first);
                                process_sample(newest, &outputs, &reference, tolerance_deg);
                            }
                            Err(_) => {
                                log::info!("[SENSOR] Sample channel closed");
                                break;
                            }
                        },
                        recv(shutdown_rx) -> _ => {
                            log::info!("[SENSOR] Received shutdown signal");
                            break;
                        },
                    }
                }
                log::info!("[SENSOR] Orientation thread finished");
            })?;

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            thread_handle: Some(thread_handle),
        })
    }

    /// Stops the thread and waits for it to exit.
    pub fn shutdown(&mut self) {
        // Dropping the sender wakes the select even if a signal is pending.
        self.shutdown_tx.take();
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("[SENSOR] Orientation thread panicked");
            }
        }
    }
}

impl Drop for SensorWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn process_sample(
    sample: AccelerationSample,
    outputs: &LiveOutputs,
    reference: &ReferenceStore,
    tolerance_deg: f64,
) {
    let current = orientation::estimate(sample);
    outputs.orientation.publish(current);
    let result = alignment::evaluate(current, reference.target(), tolerance_deg);
    outputs.alignment.publish(result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::Orientation;
    use crate::reference::ImageHandle;
    use approx::assert_abs_diff_eq;
    use std::time::{Duration, Instant};

    fn wait_for_version(outputs: &LiveOutputs, at_least: u64) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while outputs.orientation.version() < at_least {
            assert!(Instant::now() < deadline, "sensor worker never published");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn publishes_orientation_and_alignment() {
        let (tx, rx) = sample_channel(8);
        let outputs = LiveOutputs::default();
        let reference = ReferenceStore::new();
        reference.set(ImageHandle::new(vec![0u8; 4]), Orientation::new(0.0, 0.0));

        let mut worker = SensorWorker::spawn(rx, outputs.clone(), reference, 2.0).expect("spawn");
        assert!(tx.push(AccelerationSample::new(0.0, 0.0, 1.0)));
        wait_for_version(&outputs, 1);

        let o = outputs.orientation.get();
        assert_abs_diff_eq!(o.pitch, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(o.roll, 0.0, epsilon = 1e-9);
        assert!(outputs.alignment.get().is_aligned());
        worker.shutdown();
    }

    #[test]
    fn unaligned_without_reference() {
        let (tx, rx) = sample_channel(8);
        let outputs = LiveOutputs::default();
        let _worker =
            SensorWorker::spawn(rx, outputs.clone(), ReferenceStore::new(), 2.0).expect("spawn");

        tx.push(AccelerationSample::new(0.0, 0.0, 1.0));
        wait_for_version(&outputs, 1);
        assert!(!outputs.alignment.get().pitch_aligned);
        assert!(!outputs.alignment.get().roll_aligned);
    }

    #[test]
    fn backlog_collapses_to_newest_sample() {
        let (tx, rx) = sample_channel(16);
        // Fill the queue before the worker exists so it wakes to a backlog.
        for i in 0..10 {
            tx.push(AccelerationSample::new(0.0, f64::from(i), 1.0));
        }
        let newest = orientation::estimate(AccelerationSample::new(0.0, 9.0, 1.0));

        let outputs = LiveOutputs::default();
        let mut worker =
            SensorWorker::spawn(rx, outputs.clone(), ReferenceStore::new(), 2.0).expect("spawn");
        wait_for_version(&outputs, 1);
        worker.shutdown();

        assert_eq!(outputs.orientation.get(), newest);
        assert_eq!(outputs.orientation.version(), 1);
    }

    #[test]
    fn push_reports_closed_worker() {
        let (tx, rx) = sample_channel(1);
        assert!(tx.push(AccelerationSample::default()));
        // Full queue drops, but the receiver is still alive.
        assert!(tx.push(AccelerationSample::default()));
        drop(rx);
        assert!(!tx.push(AccelerationSample::default()));
    }

    #[test]
    fn shutdown_is_idempotent() {
        let (_tx, rx) = sample_channel(4);
        let mut worker =
            SensorWorker::spawn(rx, LiveOutputs::default(), ReferenceStore::new(), 2.0).expect("spawn");
        worker.shutdown();
        worker.shutdown();
    }
}
