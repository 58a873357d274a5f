use super::track::{EvictionCause, Track, TrackId, TrackedObject};
use crate::{
    config::TrackerConfig,
    detection::Detection,
    error::TrackError,
    frame::LumaFrame,
    matcher::{MatcherProvider, MatcherSession, TrackHandle, VisualMatcher},
    palette::{Color, ColorPalette},
};
use log::debug;
use std::collections::BTreeMap;

/// Geometry of the frames the tracker was initialized with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: usize,
    pub height: usize,
    pub row_stride: usize,
    pub sensor_orientation: i32,
}

impl FrameGeometry {
    pub(crate) fn matches(&self, frame: &LumaFrame<'_>) -> bool {
        self.width == frame.width()
            && self.height == frame.height()
            && self.row_stride == frame.row_stride()
    }
}

/*-----------------------------------------------------------------------------
TrackerState
-----------------------------------------------------------------------------*/

/// Everything the frame feeder and the associator mutate.
///
/// Owned by a single lock in [`super::MultiBoxTracker`]; every method here
/// assumes exclusive access for its whole duration.
#[derive(Debug)]
pub(crate) struct TrackerState {
    pub(super) config: TrackerConfig,
    pub(super) provider: Option<MatcherProvider>,
    pub(super) session: Option<MatcherSession>,
    pub(super) geometry: Option<FrameGeometry>,
    pub(super) last_timestamp: Option<u64>,
    pub(super) palette: ColorPalette,
    pub(super) tracks: BTreeMap<TrackId, Track>,
    pub(super) debug_detections: Vec<Detection>,
    next_track_id: TrackId,
}

impl TrackerState {
    pub(crate) fn new(
        config: TrackerConfig,
        provider: Option<MatcherProvider>,
    ) -> Result<Self, TrackError> {
        config.validate()?;
        let palette = ColorPalette::new(&config.colors)?;

        Ok(Self {
            config,
            provider,
            session: None,
            geometry: None,
            last_timestamp: None,
            palette,
            tracks: BTreeMap::new(),
            debug_detections: Vec::new(),
            next_track_id: 0,
        })
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.geometry.is_some()
    }

    /// No matcher: either none was supplied or the backend was unavailable.
    pub(crate) fn is_detection_only(&self) -> bool {
        self.provider.is_none()
            || (self.is_initialized() && self.session.is_none())
    }

    pub(crate) fn tracked_objects(&self) -> Vec<TrackedObject> {
        self.tracks.values().map(Track::to_tracked_object).collect()
    }

    pub(super) fn issue_track_id(&mut self) -> TrackId {
        self.next_track_id += 1;
        self.next_track_id
    }

    /// Evict a live track and return its color.
    ///
    /// With `release_color` the color goes back to the palette; otherwise the
    /// caller takes ownership of it. When the matcher refuses to forget the
    /// handle the track stays live and the error is returned.
    pub(super) fn evict(
        &mut self,
        track_id: TrackId,
        cause: EvictionCause,
        release_color: bool,
    ) -> Result<Color, TrackError> {
        let track = self
            .tracks
            .get_mut(&track_id)
            .ok_or(TrackError::UnknownTrack(track_id))?;
        let matcher = self
            .session
            .as_mut()
            .map(|session| &mut **session as &mut dyn VisualMatcher);
        let color = track.evict(cause, matcher)?;
        self.finish_eviction(track_id, cause, color, release_color)
    }

    /// Drop a track whose handle the matcher no longer knows, without
    /// asking the matcher to forget it.
    pub(super) fn drop_lost(&mut self, track_id: TrackId) -> Result<Color, TrackError> {
        let track = self
            .tracks
            .get_mut(&track_id)
            .ok_or(TrackError::UnknownTrack(track_id))?;
        let color = track.evict(EvictionCause::Lost, None)?;
        self.finish_eviction(track_id, EvictionCause::Lost, color, true)
    }

    fn finish_eviction(
        &mut self,
        track_id: TrackId,
        cause: EvictionCause,
        color: Color,
        release_color: bool,
    ) -> Result<Color, TrackError> {
        let track = self.tracks.remove(&track_id);
        if release_color {
            self.palette.release(color)?;
        }

        debug!(
            "track {} ({}) evicted: {:?}, color {}",
            track_id,
            track.as_ref().and_then(Track::get_label).unwrap_or("-"),
            cause,
            color
        );
        Ok(color)
    }

    /// Drop a candidate that will not become a track.
    pub(super) fn abandon(&mut self, handle: TrackHandle) -> Result<(), TrackError> {
        match self.session.as_mut() {
            Some(session) => session.forget(handle),
            None => Ok(()),
        }
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        use std::collections::HashSet;

        let capacity = self.palette.capacity();
        assert!(self.tracks.len() <= capacity, "more live tracks than colors");
        assert_eq!(
            self.tracks.len() + self.palette.available(),
            capacity,
            "palette leaked or double-released a color"
        );

        let mut colors = HashSet::new();
        let mut handles = HashSet::new();
        for track in self.tracks.values() {
            assert!(track.is_live());
            assert!(colors.insert(track.get_color()), "duplicate live color");
            assert!(
                !self.palette.is_available(&track.get_color()),
                "live color also available"
            );
            if let Some(handle) = track.get_handle() {
                assert!(handles.insert(handle), "shared matcher handle");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn handle_of(&self, track_id: TrackId) -> Option<TrackHandle> {
        self.tracks.get(&track_id).and_then(Track::get_handle)
    }
}
