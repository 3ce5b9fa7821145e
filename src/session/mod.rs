// SPDX-License-Identifier: GPL-3.0-only

//! Scan session state machine
//!
//! A [`ScanSession`] owns one scanning attempt. It binds a [`FrameSource`],
//! feeds frames to a [`Detector`] one at a time, and hands the first decoded
//! payload to its caller exactly once.
//!
//! ```text
//!  FrameSource ──frames──▶ pump task ──▶ on_frame ──▶ detect task
//!                                          │              │
//!                                    ┌─────┴──────┐       │
//!  set_facing / set_torch ─────────▶ │ Mutex<Inner>│ ◀─────┘ on_detector_result
//!  terminate ──────────────────────▶ └────────────┘
//! ```
//!
//! Every input funnels through the one mutex. Frames and detector
//! completions from an older binding carry an older generation and fall
//! out at the state check; nothing is forcibly cancelled except the pump.

pub mod state;

pub use state::{DetectionTicket, FrameDisposition, ResultDisposition, SessionState};

use crate::backends::camera::types::{CameraFacing, Frame, FrameReceiver, StillImage};
use crate::backends::camera::FrameSource;
use crate::errors::{DetectorResult, SessionError};
use crate::frame_processor::{DetectionResult, Detector};
use futures::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Receives the single latched result of a session
pub type DetectionCallback = Box<dyn FnOnce(DetectionResult) + Send + 'static>;

/// One scanning attempt
///
/// Dropping the session terminates it.
pub struct ScanSession {
    shared: Arc<Shared>,
}

struct Shared {
    id: Uuid,
    inner: Mutex<Inner>,
    detector: Arc<dyn Detector>,
    runtime: Handle,
}

struct Inner {
    state: SessionState,
    facing: CameraFacing,
    torch: bool,
    /// Bumped on every bind and on terminate
    generation: u64,
    next_sequence: u64,
    /// At most one detector call runs at a time, across rebinds too
    in_flight: Option<DetectionTicket>,
    /// Whether `source` currently holds a binding
    bound: bool,
    source: Box<dyn FrameSource>,
    pump: Option<JoinHandle<()>>,
    on_detected: Option<DetectionCallback>,
}

impl ScanSession {
    /// Create an idle session on the current tokio runtime
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime. Use
    /// [`ScanSession::with_runtime`] to pass a handle explicitly.
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Arc<dyn Detector>,
        on_detected: impl FnOnce(DetectionResult) + Send + 'static,
    ) -> Self {
        Self::with_runtime(Handle::current(), source, detector, on_detected)
    }

    /// Create an idle session that spawns its tasks on `runtime`
    pub fn with_runtime(
        runtime: Handle,
        source: Box<dyn FrameSource>,
        detector: Arc<dyn Detector>,
        on_detected: impl FnOnce(DetectionResult) + Send + 'static,
    ) -> Self {
        let id = Uuid::new_v4();
        debug!(session = %id, "Scan session created");
        Self {
            shared: Arc::new(Shared {
                id,
                inner: Mutex::new(Inner {
                    state: SessionState::Idle,
                    facing: CameraFacing::default(),
                    torch: false,
                    generation: 0,
                    next_sequence: 0,
                    in_flight: None,
                    bound: false,
                    source,
                    pump: None,
                    on_detected: Some(Box::new(on_detected)),
                }),
                detector,
                runtime,
            }),
        }
    }

    /// Create an idle session that delivers its result through a channel
    ///
    /// The receiver resolves with the latched result, or with an error once
    /// the session terminates without one.
    pub fn with_channel(
        source: Box<dyn FrameSource>,
        detector: Arc<dyn Detector>,
    ) -> (Self, oneshot::Receiver<DetectionResult>) {
        let (tx, rx) = oneshot::channel();
        let session = Self::new(source, detector, move |result| {
            // The receiver may be gone if the caller stopped waiting
            let _ = tx.send(result);
        });
        (session, rx)
    }

    /// Bind the frame source for `facing` and start analyzing frames
    ///
    /// Only valid in `Idle`. On a binding failure the session stays `Idle`
    /// and the caller may retry.
    pub fn start(&self, facing: CameraFacing) -> Result<(), SessionError> {
        self.shared.start(facing)
    }

    /// Offer one frame to the session
    ///
    /// Never blocks on the detector. Frames that are not submitted are
    /// released before this returns.
    pub fn on_frame(&self, frame: Frame) -> FrameDisposition {
        self.shared.on_frame(None, frame)
    }

    /// Apply the outcome of the detector call identified by `ticket`
    ///
    /// Detection tasks spawned by [`ScanSession::on_frame`] call this
    /// themselves.
    pub fn on_detector_result(
        &self,
        ticket: DetectionTicket,
        outcome: DetectorResult<Option<String>>,
    ) -> ResultDisposition {
        self.shared.on_detector_result(ticket, outcome)
    }

    /// Switch cameras while armed
    ///
    /// Ignored unless the session is `Armed`. Detections still running
    /// against the old binding are discarded when they complete. If the
    /// new facing cannot be bound the previous facing is restored.
    pub fn set_facing(&self, facing: CameraFacing) -> Result<(), SessionError> {
        self.shared.set_facing(facing)
    }

    /// Request the torch on or off; failures are logged and ignored
    pub fn set_torch(&self, on: bool) {
        self.shared.set_torch(on)
    }

    /// Decode a still image outside the live pipeline
    ///
    /// Runs in any state and never touches the session state or the
    /// in-flight detection.
    pub async fn scan_static(&self, image: StillImage) -> Option<DetectionResult> {
        self.shared.scan_static(image).await
    }

    /// Close the session from any state; repeated calls do nothing
    pub fn terminate(&self) {
        self.shared.terminate()
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    pub fn facing(&self) -> CameraFacing {
        self.shared.lock().facing
    }

    pub fn torch(&self) -> bool {
        self.shared.lock().torch
    }

    pub fn has_detection_in_flight(&self) -> bool {
        self.shared.lock().in_flight.is_some()
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.shared.terminate();
    }
}

impl std::fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.lock();
        f.debug_struct("ScanSession")
            .field("id", &self.shared.id)
            .field("state", &inner.state)
            .field("facing", &inner.facing)
            .field("torch", &inner.torch)
            .field("generation", &inner.generation)
            .field("in_flight", &inner.in_flight)
            .finish()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking callback elsewhere must not wedge terminate()
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start(self: &Arc<Self>, facing: CameraFacing) -> Result<(), SessionError> {
        let mut inner = self.lock();
        if inner.state != SessionState::Idle {
            return Err(SessionError::InvalidState(inner.state));
        }

        let frames = inner.source.bind(facing).map_err(|e| {
            warn!(session = %self.id, %facing, error = %e, "Failed to bind frame source");
            SessionError::Binding(e)
        })?;

        inner.state = SessionState::Armed;
        inner.facing = facing;
        inner.bound = true;
        self.attach(&mut inner, frames);
        if inner.torch {
            apply_torch(&mut inner, true);
        }

        info!(session = %self.id, %facing, "Scan session armed");
        Ok(())
    }

    /// Start a pump for a fresh binding under a new generation
    fn attach(self: &Arc<Self>, inner: &mut Inner, frames: FrameReceiver) {
        inner.generation += 1;
        let pump = pump_frames(Arc::downgrade(self), inner.generation, frames);
        inner.pump = Some(self.runtime.spawn(pump));
    }

    /// `generation` is `Some` for frames arriving through a pump
    fn on_frame(self: &Arc<Self>, generation: Option<u64>, frame: Frame) -> FrameDisposition {
        let (ticket, detection) = {
            let mut inner = self.lock();

            if inner.state != SessionState::Armed {
                trace!(session = %self.id, sequence = frame.sequence, state = %inner.state, "Frame discarded");
                return FrameDisposition::DiscardedInactive(inner.state);
            }
            if generation.is_some_and(|g| g != inner.generation) {
                trace!(session = %self.id, sequence = frame.sequence, "Frame from replaced binding discarded");
                return FrameDisposition::DiscardedStale;
            }
            if let Some(busy) = inner.in_flight {
                trace!(session = %self.id, sequence = frame.sequence, in_flight = %busy, "Detector busy, frame dropped");
                return FrameDisposition::DroppedBusy;
            }

            inner.next_sequence += 1;
            let ticket = DetectionTicket {
                generation: inner.generation,
                sequence: inner.next_sequence,
            };
            inner.in_flight = Some(ticket);
            // detect() only builds the future; the work happens when polled
            (ticket, self.detector.detect(frame))
        };

        let session = Arc::downgrade(self);
        self.runtime.spawn(async move {
            let outcome = detection.await;
            if let Some(session) = session.upgrade() {
                session.on_detector_result(ticket, outcome);
            }
        });

        trace!(session = %self.id, %ticket, "Frame submitted to detector");
        FrameDisposition::Submitted(ticket)
    }

    fn on_detector_result(
        &self,
        ticket: DetectionTicket,
        outcome: DetectorResult<Option<String>>,
    ) -> ResultDisposition {
        let (callback, payload) = {
            let mut inner = self.lock();
            if inner.in_flight == Some(ticket) {
                inner.in_flight = None;
            }

            if inner.state != SessionState::Armed || ticket.generation != inner.generation {
                debug!(session = %self.id, %ticket, state = %inner.state, "Stale detection discarded");
                return ResultDisposition::Stale;
            }

            let payload = match outcome {
                Ok(Some(payload)) => payload,
                Ok(None) => return ResultDisposition::NoPayload,
                Err(e) => {
                    debug!(session = %self.id, %ticket, error = %e, "Detector failed, treating as no payload");
                    return ResultDisposition::NoPayload;
                }
            };

            inner.state = SessionState::Detected;
            if let Some(pump) = inner.pump.take() {
                pump.abort();
            }
            (inner.on_detected.take(), payload)
        };

        info!(session = %self.id, %ticket, "QR code latched");
        // Outside the lock so the callback may call back into the session
        if let Some(callback) = callback {
            callback(DetectionResult::live(payload));
        }
        ResultDisposition::Latched
    }

    fn set_facing(self: &Arc<Self>, facing: CameraFacing) -> Result<(), SessionError> {
        let mut inner = self.lock();
        if inner.state != SessionState::Armed {
            debug!(session = %self.id, %facing, state = %inner.state, "Facing change ignored");
            return Ok(());
        }
        if inner.facing == facing {
            return Ok(());
        }

        let previous = inner.facing;
        if let Some(pump) = inner.pump.take() {
            pump.abort();
        }
        if inner.bound {
            inner.source.unbind();
            inner.bound = false;
        }

        match inner.source.bind(facing) {
            Ok(frames) => {
                inner.facing = facing;
                inner.bound = true;
                self.attach(&mut inner, frames);
                if inner.torch {
                    apply_torch(&mut inner, true);
                }
                info!(session = %self.id, from = %previous, to = %facing, "Switched camera");
                Ok(())
            }
            Err(e) => {
                warn!(session = %self.id, %facing, error = %e, "Failed to switch camera, restoring previous");
                // Frames from before the failed switch are stale either way
                inner.generation += 1;
                match inner.source.bind(previous) {
                    Ok(frames) => {
                        inner.bound = true;
                        self.attach(&mut inner, frames);
                        if inner.torch {
                            apply_torch(&mut inner, true);
                        }
                    }
                    Err(restore) => {
                        warn!(session = %self.id, facing = %previous, error = %restore, "Failed to restore camera");
                    }
                }
                Err(SessionError::Binding(e))
            }
        }
    }

    fn set_torch(&self, on: bool) {
        let mut inner = self.lock();
        if inner.state.is_terminated() {
            return;
        }
        inner.torch = on;
        if inner.bound {
            apply_torch(&mut inner, on);
        }
    }

    async fn scan_static(&self, image: StillImage) -> Option<DetectionResult> {
        let detector = Arc::clone(&self.detector);
        let id = self.id;
        let outcome = self
            .runtime
            .spawn_blocking(move || detector.detect_static(&image))
            .await;

        match outcome {
            Ok(Ok(Some(payload))) => {
                info!(session = %id, "QR code found in still image");
                Some(DetectionResult::still(payload))
            }
            Ok(Ok(None)) => {
                debug!(session = %id, "No QR code in still image");
                None
            }
            Ok(Err(e)) => {
                debug!(session = %id, error = %e, "Still image detection failed");
                None
            }
            Err(e) => {
                warn!(session = %id, error = %e, "Still image detection task failed");
                None
            }
        }
    }

    fn terminate(&self) {
        let callback = {
            let mut inner = self.lock();
            if inner.state.is_terminated() {
                return;
            }

            let from = inner.state;
            inner.state = SessionState::Terminated;
            inner.generation += 1;
            if let Some(pump) = inner.pump.take() {
                pump.abort();
            }
            if inner.bound {
                inner.source.unbind();
                inner.bound = false;
            }
            info!(session = %self.id, from = %from, "Scan session terminated");
            inner.on_detected.take()
        };
        // Dropped outside the lock; it may own arbitrary caller state
        drop(callback);
    }
}

fn apply_torch(inner: &mut Inner, on: bool) {
    if let Err(e) = inner.source.set_torch(on) {
        warn!(on, error = %e, "Torch request ignored");
    }
}

/// Forward frames from one binding into the session
async fn pump_frames(session: Weak<Shared>, generation: u64, mut frames: FrameReceiver) {
    while let Some(frame) = frames.next().await {
        let Some(session) = session.upgrade() else {
            break;
        };
        match session.on_frame(Some(generation), frame) {
            FrameDisposition::DiscardedInactive(_) | FrameDisposition::DiscardedStale => break,
            FrameDisposition::Submitted(_) | FrameDisposition::DroppedBusy => {}
        }
    }
    trace!(generation, "Frame pump finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::FrameSender;
    use crate::errors::{BindingError, BindingResult, DetectorError, TorchError};
    use crate::frame_processor::DetectFuture;
    use futures::FutureExt;
    use futures::channel::mpsc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source whose channel the test keeps, so frames can be pushed by hand
    #[derive(Default)]
    struct ManualSource {
        senders: Arc<Mutex<Vec<FrameSender>>>,
        binds: Arc<AtomicUsize>,
        unbinds: Arc<AtomicUsize>,
    }

    impl FrameSource for ManualSource {
        fn bind(&mut self, _facing: CameraFacing) -> BindingResult<FrameReceiver> {
            self.binds.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::channel(4);
            self.senders.lock().unwrap().push(tx);
            Ok(rx)
        }

        fn set_torch(&mut self, _on: bool) -> Result<(), TorchError> {
            Err(TorchError::Unavailable)
        }

        fn unbind(&mut self) {
            self.unbinds.fetch_add(1, Ordering::SeqCst);
            self.senders.lock().unwrap().clear();
        }
    }

    struct DeniedSource;

    impl FrameSource for DeniedSource {
        fn bind(&mut self, _facing: CameraFacing) -> BindingResult<FrameReceiver> {
            Err(BindingError::PermissionDenied)
        }

        fn set_torch(&mut self, _on: bool) -> Result<(), TorchError> {
            Ok(())
        }

        fn unbind(&mut self) {}
    }

    /// Detector that never completes unless the test resolves it
    struct PendingDetector {
        calls: Arc<AtomicUsize>,
    }

    impl Detector for PendingDetector {
        fn detect(&self, frame: Frame) -> DetectFuture {
            self.calls.fetch_add(1, Ordering::SeqCst);
            async move {
                let _frame = frame;
                futures::future::pending::<()>().await;
                Ok(None)
            }
            .boxed()
        }

        fn detect_static(&self, _image: &StillImage) -> DetectorResult<Option<String>> {
            Ok(Some("still".to_string()))
        }
    }

    fn pending_detector() -> (Arc<dyn Detector>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let detector = PendingDetector {
            calls: Arc::clone(&calls),
        };
        (Arc::new(detector), calls)
    }

    fn frame() -> Frame {
        Frame::gray(2, 2, vec![0u8; 4])
    }

    #[tokio::test]
    async fn test_new_session_is_idle() {
        let (detector, _) = pending_detector();
        let session = ScanSession::new(Box::new(ManualSource::default()), detector, |_| {});
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.on_frame(frame()), FrameDisposition::DiscardedInactive(SessionState::Idle));
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let (detector, _) = pending_detector();
        let session = ScanSession::new(Box::new(ManualSource::default()), detector, |_| {});
        session.start(CameraFacing::Back).unwrap();
        assert_eq!(
            session.start(CameraFacing::Back),
            Err(SessionError::InvalidState(SessionState::Armed))
        );
    }

    #[tokio::test]
    async fn test_start_failure_stays_idle() {
        let (detector, _) = pending_detector();
        let session = ScanSession::new(Box::new(DeniedSource), detector, |_| {});
        assert_eq!(
            session.start(CameraFacing::Front),
            Err(SessionError::Binding(BindingError::PermissionDenied))
        );
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_detector_error_keeps_session_armed() {
        let (detector, _) = pending_detector();
        let session = ScanSession::new(Box::new(ManualSource::default()), detector, |_| {});
        session.start(CameraFacing::Back).unwrap();

        let ticket = session.on_frame(frame()).ticket().unwrap();
        let outcome = Err(DetectorError::Decode("bad grid".to_string()));
        assert_eq!(session.on_detector_result(ticket, outcome), ResultDisposition::NoPayload);
        assert_eq!(session.state(), SessionState::Armed);
        assert!(!session.has_detection_in_flight());
    }

    #[tokio::test]
    async fn test_pumped_frames_reach_detector_once_while_busy() {
        let source = ManualSource::default();
        let senders = Arc::clone(&source.senders);
        let (detector, calls) = pending_detector();
        let session = ScanSession::new(Box::new(source), detector, |_| {});
        session.start(CameraFacing::Back).unwrap();

        let mut tx = senders.lock().unwrap().pop().unwrap();
        for _ in 0..3 {
            tx.try_send(frame()).unwrap();
        }
        for _ in 0..50 {
            if calls.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(session.has_detection_in_flight());
    }

    #[tokio::test]
    async fn test_set_facing_in_idle_is_ignored() {
        let source = ManualSource::default();
        let binds = Arc::clone(&source.binds);
        let (detector, _) = pending_detector();
        let session = ScanSession::new(Box::new(source), detector, |_| {});

        session.set_facing(CameraFacing::Front).unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(binds.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_torch_failure_is_swallowed() {
        let (detector, _) = pending_detector();
        let session = ScanSession::new(Box::new(ManualSource::default()), detector, |_| {});
        session.start(CameraFacing::Back).unwrap();
        session.set_torch(true);
        assert!(session.torch());
        assert_eq!(session.state(), SessionState::Armed);
    }

    #[tokio::test]
    async fn test_drop_terminates_and_unbinds() {
        let source = ManualSource::default();
        let unbinds = Arc::clone(&source.unbinds);
        let (detector, _) = pending_detector();
        let session = ScanSession::new(Box::new(source), detector, |_| {});
        session.start(CameraFacing::Back).unwrap();

        drop(session);
        assert_eq!(unbinds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_channel_closes_on_terminate_without_result() {
        let (detector, _) = pending_detector();
        let (session, rx) = ScanSession::with_channel(Box::new(ManualSource::default()), detector);
        session.start(CameraFacing::Back).unwrap();
        session.terminate();
        assert!(rx.await.is_err());
    }
}
