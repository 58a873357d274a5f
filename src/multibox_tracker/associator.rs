//! Greedy association of a detection batch against the live tracks.
//!
//! Candidates are handled one at a time in input order. Each candidate
//! either becomes a live track (possibly displacing overlapping or weaker
//! tracks) or is dropped, before the next candidate is looked at. There is
//! no global assignment step, so the outcome depends on detection order.

use super::state::TrackerState;
use super::track::{Candidate, EvictionCause, Track, TrackId};
use crate::{
    detection::Detection, error::TrackError, frame::LumaFrame, matcher::TrackHandle,
    palette::Color,
};
use log::{debug, error, warn};

/// Counters describing what one `process` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessReport {
    /// Detections smaller than the minimum size.
    pub degenerate: usize,
    /// Candidates whose initial correlation was too low.
    pub untrackable: usize,
    /// Candidates that lost against a healthier, more confident track.
    pub rejected: usize,
    /// Tracks removed because a candidate overlapped them.
    pub displaced: usize,
    /// Tracks removed to free a color for a more confident candidate.
    pub evicted_as_worst: usize,
    /// Candidates dropped because every color was taken by better tracks.
    pub saturated: usize,
    /// Tracks created.
    pub accepted: usize,
    /// The batch was not looked at (busy, or no frame seen yet).
    pub skipped: bool,
}

impl ProcessReport {
    pub(crate) fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

impl TrackerState {
    pub(crate) fn process(
        &mut self,
        detections: &[Detection],
        frame: &LumaFrame<'_>,
        timestamp: u64,
    ) -> Result<ProcessReport, TrackError> {
        let mut report = ProcessReport::default();
        self.debug_detections = detections.to_vec();

        let min_size = self.config.min_size;
        let survivors: Vec<&Detection> = detections
            .iter()
            .filter(|detection| !detection.is_degenerate(min_size))
            .collect();
        report.degenerate = detections.len() - survivors.len();

        if self.is_detection_only() {
            self.replace_with_detections(&survivors, &mut report)?;
            return Ok(report);
        }

        if !self.is_initialized() {
            debug!(
                "no frame seen yet, skipping {} detections",
                detections.len()
            );
            return Ok(ProcessReport::skipped());
        }

        if survivors.is_empty() {
            debug!("nothing to track at {timestamp}");
            return Ok(report);
        }

        for detection in survivors {
            self.associate(detection, frame, timestamp, &mut report)?;
        }

        debug!(
            "processed detections at {timestamp}: {:?}, {} live",
            report,
            self.tracks.len()
        );
        Ok(report)
    }

    /// Detection-only mode: the batch becomes the new track set.
    fn replace_with_detections(
        &mut self,
        survivors: &[&Detection],
        report: &mut ProcessReport,
    ) -> Result<(), TrackError> {
        let stale: Vec<TrackId> = self.tracks.keys().copied().collect();
        for track_id in stale {
            self.evict(track_id, EvictionCause::Replaced, true)?;
        }
        self.palette.reset();

        for detection in survivors.iter().take(self.palette.capacity()) {
            let Some(color) = self.palette.acquire() else {
                break;
            };
            let track_id = self.issue_track_id();
            self.tracks
                .insert(track_id, Track::from_detection(track_id, detection, color));
            report.accepted += 1;
        }
        Ok(())
    }

    fn associate(
        &mut self,
        detection: &Detection,
        frame: &LumaFrame<'_>,
        timestamp: u64,
        report: &mut ProcessReport,
    ) -> Result<(), TrackError> {
        let marginal = self.config.marginal_correlation;
        let max_overlap = self.config.max_overlap;

        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let handle =
            session.register_candidate(&detection.get_rect(), frame, timestamp)?;
        let reading = match session.update_position(handle) {
            Ok(reading) => reading,
            Err(e) => return self.fail_candidate(handle, None, e),
        };
        if reading.correlation < marginal {
            debug!(
                "detection {} ({}) correlates at {:.3}, not tracking",
                detection.get_id(),
                detection.get_label(),
                reading.correlation
            );
            session.forget(handle)?;
            report.untrackable += 1;
            return Ok(());
        }
        let candidate = Candidate::new(handle, detection, reading);

        // Tracks the candidate overlaps, and the best-overlapping one, which
        // hands its color straight to the candidate.
        let mut removals: Vec<TrackId> = Vec::new();
        let mut donor: Option<(TrackId, f32)> = None;
        let mut blocked_by: Option<TrackId> = None;
        for track in self.tracks.values() {
            let iou = candidate.get_rect().calc_iou(&track.get_rect());
            if iou <= max_overlap {
                continue;
            }
            if candidate.get_confidence() < track.get_confidence()
                && track.correlates_at_least(marginal)
            {
                blocked_by = Some(track.get_track_id());
                break;
            }
            removals.push(track.get_track_id());
            if donor.map_or(true, |(_, best)| iou > best) {
                donor = Some((track.get_track_id(), iou));
            }
        }

        if let Some(incumbent) = blocked_by {
            debug!(
                "detection {} ({}) loses to track {}",
                detection.get_id(),
                detection.get_label(),
                incumbent
            );
            report.rejected += 1;
            return self.abandon(candidate.get_handle());
        }

        let mut cause = EvictionCause::Overlap;
        if removals.is_empty() && self.palette.is_exhausted() {
            let victim = self
                .tracks
                .values()
                .filter(|track| track.get_confidence() < candidate.get_confidence())
                .fold(None::<&Track>, |worst, track| match worst {
                    Some(worst) if worst.get_confidence() <= track.get_confidence() => {
                        Some(worst)
                    }
                    _ => Some(track),
                })
                .map(Track::get_track_id);

            match victim {
                Some(track_id) => {
                    removals.push(track_id);
                    donor = Some((track_id, 0.0));
                    cause = EvictionCause::Worst;
                }
                None => {
                    debug!(
                        "no room for detection {} ({}), all tracks are more confident",
                        detection.get_id(),
                        detection.get_label()
                    );
                    report.saturated += 1;
                    return self.abandon(candidate.get_handle());
                }
            }
        }

        let donor = donor.map(|(track_id, _)| track_id);
        let mut donated = None;
        for track_id in removals {
            let is_donor = donor == Some(track_id);
            let color = match self.evict(track_id, cause, !is_donor) {
                Ok(color) => color,
                Err(e) => return self.fail_candidate(candidate.get_handle(), donated, e),
            };
            if is_donor {
                donated = Some(color);
            }
            match cause {
                EvictionCause::Worst => report.evicted_as_worst += 1,
                _ => report.displaced += 1,
            }
        }

        let Some(color) = donated.or_else(|| self.palette.acquire()) else {
            error!("palette exhausted after making room for a new track");
            report.saturated += 1;
            return self.abandon(candidate.get_handle());
        };

        let track_id = self.issue_track_id();
        debug!(
            "tracking detection {} ({}) as track {} in {}",
            detection.get_id(),
            detection.get_label(),
            track_id,
            color
        );
        self.tracks
            .insert(track_id, Track::from_candidate(track_id, candidate, color));
        report.accepted += 1;
        Ok(())
    }

    /// Undo a half-finished association: hand back a color already taken
    /// from an evicted donor, forget the candidate, and report `err`.
    fn fail_candidate(
        &mut self,
        handle: TrackHandle,
        donated: Option<Color>,
        err: TrackError,
    ) -> Result<(), TrackError> {
        error!("association aborted for candidate {handle}: {err}");
        if let Some(color) = donated {
            self.palette.release(color)?;
        }
        if let Err(forget_err) = self.abandon(handle) {
            warn!("could not forget candidate {handle}: {forget_err}");
        }
        Err(err)
    }
}
