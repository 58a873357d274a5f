//! Pure Rust reference matcher based on normalized cross-correlation.
//!
//! Each registered region is resampled to a small square template. On every
//! frame the template is compared against the region shifted over a square
//! search window, and the best-scoring shift becomes the new position. The
//! score (clamped to `[0, 1]`) is reported as the correlation.

use super::{
    MatcherBackend, MatcherParams, MatcherReading, TrackHandle, VisualMatcher,
};
use crate::{error::TrackError, frame::LumaFrame, rect::Rect};
use log::warn;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NccConfig {
    /// Side of the square template, in samples.
    pub template_size: usize,
    /// Largest shift searched per frame, in pixels.
    pub search_radius: usize,
    /// Distance between searched shifts, in pixels.
    pub search_step: usize,
}

impl Default for NccConfig {
    fn default() -> Self {
        Self {
            template_size: 16,
            search_radius: 16,
            search_step: 2,
        }
    }
}

/// Creates [`NccMatcher`]s. Reports itself unavailable for an unusable
/// configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NccBackend {
    cfg: NccConfig,
}

impl NccBackend {
    pub fn new(cfg: NccConfig) -> Self {
        Self { cfg }
    }
}

impl MatcherBackend for NccBackend {
    fn create(&self, params: &MatcherParams) -> Option<Box<dyn VisualMatcher>> {
        if self.cfg.template_size < 2 || self.cfg.search_step == 0 {
            warn!("unusable NCC configuration {:?}", self.cfg);
            return None;
        }
        if params.width == 0 || params.height == 0 {
            return None;
        }
        Some(Box::new(NccMatcher::new(self.cfg, *params)))
    }
}

#[derive(Debug)]
struct NccTrack {
    /// Zero-mean, unit-norm samples; `None` for a textureless region.
    template: Option<Vec<f32>>,
    rect: Rect<f32>,
    correlation: f32,
    located_in: Option<u64>,
}

#[derive(Debug)]
pub struct NccMatcher {
    cfg: NccConfig,
    params: MatcherParams,
    current: Option<Vec<u8>>,
    frame_index: u64,
    next_handle: u64,
    tracks: HashMap<TrackHandle, NccTrack>,
    offsets: Vec<isize>,
}

impl NccMatcher {
    pub fn new(cfg: NccConfig, params: MatcherParams) -> Self {
        let step = cfg.search_step.max(1) as isize;
        let mut offsets = vec![0isize];
        for k in 1..=(cfg.search_radius as isize / step) {
            offsets.push(k * step);
            offsets.push(-k * step);
        }

        Self {
            cfg,
            params,
            current: None,
            frame_index: 0,
            next_handle: 0,
            tracks: HashMap::new(),
            offsets,
        }
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn locate(&self, track: &NccTrack) -> Result<MatcherReading, TrackError> {
        let Some(current) = &self.current else {
            return Err(TrackError::InvalidFrame(
                "no frame has been advanced yet".to_string(),
            ));
        };
        let Some(template) = &track.template else {
            return Ok(MatcherReading {
                rect: track.rect,
                correlation: 0.0,
            });
        };
        let frame =
            LumaFrame::packed(current, self.params.width, self.params.height)?;

        let n = self.cfg.template_size;
        let mut best_rect = track.rect;
        let mut best_score = correlate(template, &sample_patch(&frame, &track.rect, n));
        for &dy in &self.offsets {
            for &dx in &self.offsets {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let rect = track.rect.translated(dx as f32, dy as f32);
                let score = correlate(template, &sample_patch(&frame, &rect, n));
                if score > best_score {
                    best_score = score;
                    best_rect = rect;
                }
            }
        }

        Ok(MatcherReading {
            rect: best_rect,
            correlation: best_score.clamp(0.0, 1.0),
        })
    }
}

impl VisualMatcher for NccMatcher {
    fn advance_frame(&mut self, frame: &LumaFrame<'_>, _timestamp: u64) {
        if frame.width() != self.params.width || frame.height() != self.params.height
        {
            warn!(
                "NCC matcher sized {}x{} got a {}x{} frame",
                self.params.width,
                self.params.height,
                frame.width(),
                frame.height()
            );
            return;
        }

        let mut packed = self.current.take().unwrap_or_default();
        packed.clear();
        for y in 0..frame.height() {
            packed.extend_from_slice(frame.row(y));
        }
        self.current = Some(packed);
        self.frame_index += 1;
    }

    fn register_candidate(
        &mut self,
        rect: &Rect<f32>,
        frame: &LumaFrame<'_>,
        _timestamp: u64,
    ) -> Result<TrackHandle, TrackError> {
        let patch = sample_patch(frame, rect, self.cfg.template_size);
        self.next_handle += 1;
        let handle = TrackHandle::new(self.next_handle);
        self.tracks.insert(
            handle,
            NccTrack {
                template: normalize(patch),
                rect: *rect,
                correlation: 0.0,
                located_in: None,
            },
        );
        Ok(handle)
    }

    fn update_position(
        &mut self,
        handle: TrackHandle,
    ) -> Result<MatcherReading, TrackError> {
        let track = self
            .tracks
            .get(&handle)
            .ok_or(TrackError::UnknownHandle(handle.value()))?;
        if track.located_in == Some(self.frame_index) {
            return Ok(MatcherReading {
                rect: track.rect,
                correlation: track.correlation,
            });
        }

        let reading = self.locate(track)?;
        if let Some(track) = self.tracks.get_mut(&handle) {
            track.rect = reading.rect;
            track.correlation = reading.correlation;
            track.located_in = Some(self.frame_index);
        }
        Ok(reading)
    }

    fn forget(&mut self, handle: TrackHandle) -> Result<(), TrackError> {
        self.tracks
            .remove(&handle)
            .map(|_| ())
            .ok_or(TrackError::UnknownHandle(handle.value()))
    }

    fn release(&mut self) {
        self.tracks.clear();
        self.current = None;
    }
}

/// Resample `rect` onto an `n`x`n` grid of cell centers.
fn sample_patch(frame: &LumaFrame<'_>, rect: &Rect<f32>, n: usize) -> Vec<f32> {
    let cell_w = rect.width() / n as f32;
    let cell_h = rect.height() / n as f32;
    let mut patch = Vec::with_capacity(n * n);
    for j in 0..n {
        let y = rect.y() + (j as f32 + 0.5) * cell_h;
        for i in 0..n {
            let x = rect.x() + (i as f32 + 0.5) * cell_w;
            patch.push(frame.sample(x, y));
        }
    }
    patch
}

fn normalize(mut patch: Vec<f32>) -> Option<Vec<f32>> {
    if patch.is_empty() {
        return None;
    }
    let mean = patch.iter().sum::<f32>() / patch.len() as f32;
    let mut norm = 0.0f32;
    for v in patch.iter_mut() {
        *v -= mean;
        norm += *v * *v;
    }
    let norm = norm.sqrt();
    if norm < 1e-3 {
        return None;
    }
    for v in patch.iter_mut() {
        *v /= norm;
    }
    Some(patch)
}

fn correlate(template: &[f32], patch: &[f32]) -> f32 {
    match normalize(patch.to_vec()) {
        Some(patch) => template.iter().zip(&patch).map(|(a, b)| a * b).sum(),
        None => 0.0,
    }
}
