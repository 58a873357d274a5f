//! Thread-safe entry point shared by the capture thread and the detector.

use super::associator::ProcessReport;
use super::feeder::FrameOutcome;
use super::state::{FrameGeometry, TrackerState};
use super::track::TrackedObject;
use crate::{
    config::TrackerConfig, detection::Detection, error::TrackError,
    frame::LumaFrame, matcher::MatcherProvider,
};
use log::debug;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// MultiBoxTracker - keeps detections alive between detector runs
///
/// Two producers drive one state machine:
/// - [`MultiBoxTracker::on_frame`] for every camera frame
/// - [`MultiBoxTracker::process`] whenever a detection batch completes
///
/// Each call holds the state lock for its whole duration, so the two never
/// interleave. Only one `process` call runs at a time; a batch that arrives
/// while another is being matched is dropped.
///
/// # Example
/// ```
/// use multibox_rs::{
///     Detection, LumaFrame, MatcherProvider, MultiBoxTracker, NccBackend,
///     Rect, TrackerConfig,
/// };
///
/// let tracker = MultiBoxTracker::new(
///     TrackerConfig::default(),
///     MatcherProvider::new(NccBackend::default()),
/// )
/// .unwrap();
///
/// let pixels: Vec<u8> = (0..64 * 64).map(|i| ((i * 37) % 251) as u8).collect();
/// let frame = LumaFrame::packed(&pixels, 64, 64).unwrap();
/// tracker.on_frame(&frame, 0, 1).unwrap();
///
/// let cat = Detection::new("0", "cat", 0.9, Rect::new(8.0, 8.0, 32.0, 32.0));
/// tracker.process(&[cat], &frame, 1).unwrap();
/// assert_eq!(tracker.tracked_objects().len(), 1);
/// ```
#[derive(Debug)]
pub struct MultiBoxTracker {
    state: Mutex<TrackerState>,
    processing: AtomicBool,
}

impl MultiBoxTracker {
    pub fn new(
        config: TrackerConfig,
        provider: MatcherProvider,
    ) -> Result<Self, TrackError> {
        Ok(Self {
            state: Mutex::new(TrackerState::new(config, Some(provider))?),
            processing: AtomicBool::new(false),
        })
    }

    /// Tracker without a visual matcher: every batch replaces the tracks.
    pub fn detection_only(config: TrackerConfig) -> Result<Self, TrackError> {
        Ok(Self {
            state: Mutex::new(TrackerState::new(config, None)?),
            processing: AtomicBool::new(false),
        })
    }

    /// Feed one camera frame. `timestamp` must increase from call to call.
    pub fn on_frame(
        &self,
        frame: &LumaFrame<'_>,
        sensor_orientation: i32,
        timestamp: u64,
    ) -> Result<FrameOutcome, TrackError> {
        self.state
            .lock()
            .on_frame(frame, sensor_orientation, timestamp)
    }

    /// Reconcile a detection batch computed on `frame` (taken at
    /// `timestamp`) with the live tracks.
    pub fn process(
        &self,
        detections: &[Detection],
        frame: &LumaFrame<'_>,
        timestamp: u64,
    ) -> Result<ProcessReport, TrackError> {
        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(
                "dropping {} detections at {timestamp}, previous batch still running",
                detections.len()
            );
            return Ok(ProcessReport::skipped());
        }
        let _in_flight = InFlight(&self.processing);

        self.state.lock().process(detections, frame, timestamp)
    }

    /// Copy of the live tracks, in creation order.
    pub fn tracked_objects(&self) -> Vec<TrackedObject> {
        self.state.lock().tracked_objects()
    }

    /// Every detection of the last batch, including ones too small to track.
    pub fn debug_detections(&self) -> Vec<Detection> {
        self.state.lock().debug_detections.clone()
    }

    pub fn is_detection_only(&self) -> bool {
        self.state.lock().is_detection_only()
    }

    pub fn frame_geometry(&self) -> Option<FrameGeometry> {
        self.state.lock().geometry
    }

    pub fn available_colors(&self) -> usize {
        self.state.lock().palette.available()
    }

    pub fn palette_capacity(&self) -> usize {
        self.state.lock().palette.capacity()
    }

    pub fn config(&self) -> TrackerConfig {
        self.state.lock().config.clone()
    }

    #[cfg(test)]
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&TrackerState) -> R) -> R {
        f(&self.state.lock())
    }

    #[cfg(test)]
    pub(crate) fn set_processing(&self, busy: bool) {
        self.processing.store(busy, Ordering::Release);
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
