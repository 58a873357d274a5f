//! Per-frame maintenance: advance the matcher, refresh every live track,
//! and evict tracks whose correlation has decayed.

use super::state::{FrameGeometry, TrackerState};
use super::track::{EvictionCause, TrackId};
use crate::{error::TrackError, frame::LumaFrame, matcher::MatcherParams};
use log::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Stale timestamp or unexpected geometry; nothing changed.
    Ignored,
    /// No matcher is available, so there is nothing to advance.
    DetectionOnly,
    /// The matcher advanced one frame; `evicted` tracks decayed or were lost
    /// by the matcher.
    Advanced { evicted: usize },
}

impl TrackerState {
    pub(crate) fn on_frame(
        &mut self,
        frame: &LumaFrame<'_>,
        sensor_orientation: i32,
        timestamp: u64,
    ) -> Result<FrameOutcome, TrackError> {
        if let Some(last) = self.last_timestamp {
            if timestamp <= last {
                warn!("ignoring frame at {timestamp}, last frame was at {last}");
                return Ok(FrameOutcome::Ignored);
            }
        }

        match self.geometry {
            None => self.initialize(frame, sensor_orientation)?,
            Some(geometry) if !geometry.matches(frame) => {
                warn!(
                    "ignoring {}x{} frame (stride {}), tracker runs at {}x{} (stride {})",
                    frame.width(),
                    frame.height(),
                    frame.row_stride(),
                    geometry.width,
                    geometry.height,
                    geometry.row_stride
                );
                return Ok(FrameOutcome::Ignored);
            }
            Some(_) => {}
        }
        self.last_timestamp = Some(timestamp);

        let Some(session) = self.session.as_mut() else {
            return Ok(FrameOutcome::DetectionOnly);
        };

        session.advance_frame(frame, timestamp);
        let mut lost: Vec<TrackId> = Vec::new();
        for track in self.tracks.values_mut() {
            if let Err(e) = track.refresh(&mut **session) {
                warn!("dropping track {}: {e}", track.get_track_id());
                lost.push(track.get_track_id());
            }
        }
        for &track_id in &lost {
            self.drop_lost(track_id)?;
        }

        let min_correlation = self.config.min_correlation;
        let decayed: Vec<TrackId> = self
            .tracks
            .values()
            .filter(|track| track.has_decayed(min_correlation))
            .map(|track| track.get_track_id())
            .collect();
        for &track_id in &decayed {
            self.evict(track_id, EvictionCause::Decay, true)?;
        }

        trace!(
            "frame {timestamp}: {} live, {} decayed, {} lost",
            self.tracks.len(),
            decayed.len(),
            lost.len()
        );
        Ok(FrameOutcome::Advanced {
            evicted: decayed.len() + lost.len(),
        })
    }

    fn initialize(
        &mut self,
        frame: &LumaFrame<'_>,
        sensor_orientation: i32,
    ) -> Result<(), TrackError> {
        let params = MatcherParams {
            width: frame.width(),
            height: frame.height(),
            row_stride: frame.row_stride(),
            always_track: self.config.always_track,
        };

        self.session = match &self.provider {
            Some(provider) => {
                let session = provider.open(&params)?;
                if session.is_none() {
                    warn!("visual matcher unavailable, tracking raw detections only");
                }
                session
            }
            None => None,
        };
        if self.session.is_none() {
            self.tracks.clear();
            self.palette.reset();
        }

        self.geometry = Some(FrameGeometry {
            width: params.width,
            height: params.height,
            row_stride: params.row_stride,
            sensor_orientation,
        });
        debug!(
            "tracker initialized at {}x{} (stride {}, orientation {})",
            params.width, params.height, params.row_stride, sensor_orientation
        );
        Ok(())
    }
}
