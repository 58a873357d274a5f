use crate::{
    detection::Detection,
    error::TrackError,
    matcher::{MatcherReading, TrackHandle, VisualMatcher},
    palette::Color,
    rect::Rect,
};

pub type TrackId = usize;

/*----------------------------------------------------------------------------
Track State enums
----------------------------------------------------------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionCause {
    /// Correlation dropped below the minimum during a frame sweep.
    Decay,
    /// Displaced by an overlapping, better candidate.
    Overlap,
    /// Lowest-confidence track, dropped to make room for a new one.
    Worst,
    /// Dropped wholesale by a detection-only batch.
    Replaced,
    /// The matcher no longer recognizes the track's handle.
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Live,
    Evicted(EvictionCause),
}

/*----------------------------------------------------------------------------
Candidate struct
----------------------------------------------------------------------------*/

/// A detection registered with the matcher but not yet accepted as a track.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    handle: TrackHandle,
    label: String,
    confidence: f32,
    rect: Rect<f32>,
    correlation: f32,
}

impl Candidate {
    pub(crate) fn new(
        handle: TrackHandle,
        detection: &Detection,
        reading: MatcherReading,
    ) -> Self {
        Self {
            handle,
            label: detection.get_label().to_string(),
            confidence: detection.get_confidence(),
            rect: reading.rect,
            correlation: reading.correlation,
        }
    }

    pub(crate) fn get_handle(&self) -> TrackHandle {
        self.handle
    }

    pub(crate) fn get_confidence(&self) -> f32 {
        self.confidence
    }

    pub(crate) fn get_rect(&self) -> Rect<f32> {
        self.rect
    }
}

/*----------------------------------------------------------------------------
Track struct
----------------------------------------------------------------------------*/

#[derive(Debug, Clone)]
pub struct Track {
    track_id: TrackId,
    handle: Option<TrackHandle>,
    label: Option<String>,
    confidence: f32,
    color: Color,
    rect: Rect<f32>,
    correlation: Option<f32>,
    state: TrackState,
}

impl Track {
    pub(crate) fn from_candidate(
        track_id: TrackId,
        candidate: Candidate,
        color: Color,
    ) -> Self {
        Self {
            track_id,
            handle: Some(candidate.handle),
            label: Some(candidate.label),
            confidence: candidate.confidence,
            color,
            rect: candidate.rect,
            correlation: Some(candidate.correlation),
            state: TrackState::Live,
        }
    }

    /// Track without optical continuity, used when no matcher is available.
    pub(crate) fn from_detection(
        track_id: TrackId,
        detection: &Detection,
        color: Color,
    ) -> Self {
        Self {
            track_id,
            handle: None,
            label: Some(detection.get_label().to_string()),
            confidence: detection.get_confidence(),
            color,
            rect: detection.get_rect(),
            correlation: None,
            state: TrackState::Live,
        }
    }

    pub fn get_track_id(&self) -> TrackId {
        self.track_id
    }

    pub fn get_handle(&self) -> Option<TrackHandle> {
        self.handle
    }

    pub fn get_label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn get_confidence(&self) -> f32 {
        self.confidence
    }

    pub fn get_color(&self) -> Color {
        self.color
    }

    pub fn get_rect(&self) -> Rect<f32> {
        self.rect
    }

    pub fn get_correlation(&self) -> Option<f32> {
        self.correlation
    }

    pub fn get_state(&self) -> TrackState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state == TrackState::Live
    }

    /// Whether the matcher still reports this track at or above `threshold`.
    /// Detection-only tracks never qualify.
    pub(crate) fn correlates_at_least(&self, threshold: f32) -> bool {
        self.correlation.is_some_and(|c| c >= threshold)
    }

    /// Whether the last refresh fell under `threshold`.
    pub(crate) fn has_decayed(&self, threshold: f32) -> bool {
        self.correlation.is_some_and(|c| c < threshold)
    }

    fn ensure_live(&self) -> Result<(), TrackError> {
        match self.state {
            TrackState::Live => Ok(()),
            TrackState::Evicted(_) => {
                Err(TrackError::TrackEvicted(self.track_id))
            }
        }
    }

    /// Pull the current position and correlation from the matcher.
    pub(crate) fn refresh(
        &mut self,
        matcher: &mut dyn VisualMatcher,
    ) -> Result<(), TrackError> {
        self.ensure_live()?;
        if let Some(handle) = self.handle {
            let reading = matcher.update_position(handle)?;
            self.rect = reading.rect;
            self.correlation = Some(reading.correlation);
        }
        Ok(())
    }

    /// Stop tracking: forget the matcher handle and hand back the color.
    pub(crate) fn evict(
        &mut self,
        cause: EvictionCause,
        matcher: Option<&mut dyn VisualMatcher>,
    ) -> Result<Color, TrackError> {
        self.ensure_live()?;
        if let (Some(handle), Some(matcher)) = (self.handle, matcher) {
            matcher.forget(handle)?;
        }
        self.handle = None;
        self.state = TrackState::Evicted(cause);
        Ok(self.color)
    }

    pub fn to_tracked_object(&self) -> TrackedObject {
        TrackedObject {
            track_id: self.track_id,
            rect: self.rect,
            label: self.label.clone(),
            confidence: self.confidence,
            color: self.color,
            correlation: self.correlation,
        }
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.track_id == other.track_id
    }
}

/*----------------------------------------------------------------------------
TrackedObject struct
----------------------------------------------------------------------------*/

/// Point-in-time copy of a live track for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedObject {
    pub track_id: TrackId,
    pub rect: Rect<f32>,
    pub label: Option<String>,
    pub confidence: f32,
    pub color: Color,
    pub correlation: Option<f32>,
}
