// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle management for frame producers
//!
//! Frame sources that generate frames on their own thread use
//! [`CaptureLoopController`] to pace the loop, stop it on unbind and
//! join the thread before the camera is considered released.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Action returned by the loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Controller for a capture loop running in a separate thread
///
/// # Example
///
/// ```ignore
/// let controller = CaptureLoopController::start("file-camera", Some(interval), move || {
///     match sender.try_send(next_frame()) {
///         Err(e) if e.is_disconnected() => LoopAction::Stop,
///         _ => LoopAction::Continue,
///     }
/// });
///
/// // On unbind
/// controller.stop();
/// ```
pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl CaptureLoopController {
    /// Start a new capture loop in a separate thread
    ///
    /// The closure is called repeatedly until it returns `LoopAction::Stop`
    /// or the controller is stopped. With an `interval`, iterations are
    /// paced to start at most once per interval; the sleep is split so a
    /// stop request is noticed within a few milliseconds.
    pub fn start<F>(name: &str, interval: Option<Duration>, mut loop_fn: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();

        info!(name = %name, ?interval, "Starting capture loop");

        let thread_handle = thread::spawn(move || {
            debug!(name = %name_clone, "Capture loop thread started");
            let mut next_tick = Instant::now();

            'outer: loop {
                if stop_signal_clone.load(Ordering::SeqCst) {
                    debug!(name = %name_clone, "Stop signal received");
                    break;
                }

                if let LoopAction::Stop = loop_fn() {
                    debug!(name = %name_clone, "Loop requested stop");
                    break;
                }

                let Some(interval) = interval else {
                    continue;
                };
                next_tick += interval;
                let now = Instant::now();
                if next_tick < now {
                    // Fell behind; don't try to catch up with a burst
                    next_tick = now;
                    continue;
                }
                while Instant::now() < next_tick {
                    if stop_signal_clone.load(Ordering::SeqCst) {
                        debug!(name = %name_clone, "Stop signal received while paced");
                        break 'outer;
                    }
                    let remaining = next_tick.saturating_duration_since(Instant::now());
                    thread::sleep(remaining.min(Duration::from_millis(5)));
                }
            }

            info!(name = %name_clone, "Capture loop thread exiting");
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting capture loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending the stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            debug!(name = %self.name, "Waiting for capture loop thread to finish");
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CaptureLoopController dropped, stopping loop");
            self.stop();
        }
    }
}

impl std::fmt::Debug for CaptureLoopController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureLoopController")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_loop_stops_itself() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = CaptureLoopController::start("test-loop", None, move || {
            let count = counter_clone.fetch_add(1, Ordering::SeqCst);
            if count >= 10 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        });

        controller.join();
        assert_eq!(counter.load(Ordering::SeqCst), 11); // 0-10 inclusive
        assert!(!controller.is_running());
    }

    #[test]
    fn test_paced_loop_runs_at_interval() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = CaptureLoopController::start(
            "test-paced",
            Some(Duration::from_millis(20)),
            move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                LoopAction::Continue
            },
        );

        thread::sleep(Duration::from_millis(110));
        controller.stop();

        // Roughly 6 iterations; allow generous scheduling slack
        let count = counter.load(Ordering::SeqCst);
        assert!(count >= 2, "too few iterations: {count}");
        assert!(count <= 12, "loop was not paced: {count}");
    }

    #[test]
    fn test_stop_interrupts_long_interval() {
        let mut controller = CaptureLoopController::start(
            "test-slow",
            Some(Duration::from_secs(30)),
            || LoopAction::Continue,
        );
        assert!(controller.is_running());

        let started = Instant::now();
        controller.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!controller.is_running());
    }

    #[test]
    fn test_drop_stops_loop() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);
        let controller = CaptureLoopController::start(
            "test-drop",
            Some(Duration::from_millis(5)),
            move || {
                ran_clone.store(true, Ordering::SeqCst);
                LoopAction::Continue
            },
        );
        thread::sleep(Duration::from_millis(20));
        drop(controller);
        assert!(ran.load(Ordering::SeqCst));
    }
}
