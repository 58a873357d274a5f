//! Scripted matcher backend for unit tests.
//!
//! Every registered region keeps the box it was registered with and reports
//! a correlation chosen by the test, either queued before registration or
//! set afterwards per handle.

use crate::error::TrackError;
use crate::frame::LumaFrame;
use crate::matcher::{
    MatcherBackend, MatcherParams, MatcherReading, TrackHandle, VisualMatcher,
};
use crate::rect::Rect;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

#[derive(Debug)]
pub(crate) struct Script {
    pub default_correlation: f32,
    pub queued_correlations: VecDeque<f32>,
    pub readings: BTreeMap<u64, MatcherReading>,
    pub forgotten: Vec<u64>,
    pub frames: Vec<u64>,
    pub params: Option<MatcherParams>,
    pub released: bool,
    /// Fail the next `update_position` call, whatever the handle.
    pub fail_next_update: bool,
    next_handle: u64,
}

impl Script {
    /// Correlation reported for the next registration.
    pub fn queue(&mut self, correlation: f32) {
        self.queued_correlations.push_back(correlation);
    }

    pub fn set_correlation(&mut self, handle: TrackHandle, correlation: f32) {
        if let Some(reading) = self.readings.get_mut(&handle.value()) {
            reading.correlation = correlation;
        }
    }

    pub fn set_all_correlations(&mut self, correlation: f32) {
        for reading in self.readings.values_mut() {
            reading.correlation = correlation;
        }
    }

    /// Drop `handle` as if the backend lost it; later calls on it fail.
    pub fn lose(&mut self, handle: TrackHandle) {
        self.readings.remove(&handle.value());
    }

    pub fn live_handles(&self) -> usize {
        self.readings.len()
    }
}

pub(crate) type SharedScript = Arc<Mutex<Script>>;

pub(crate) struct ScriptedBackend {
    script: SharedScript,
}

impl ScriptedBackend {
    pub fn new() -> (Self, SharedScript) {
        let script = Arc::new(Mutex::new(Script {
            default_correlation: 0.9,
            queued_correlations: VecDeque::new(),
            readings: BTreeMap::new(),
            forgotten: Vec::new(),
            frames: Vec::new(),
            params: None,
            released: false,
            fail_next_update: false,
            next_handle: 1,
        }));
        (
            Self {
                script: Arc::clone(&script),
            },
            script,
        )
    }
}

impl MatcherBackend for ScriptedBackend {
    fn create(&self, params: &MatcherParams) -> Option<Box<dyn VisualMatcher>> {
        let mut script = self.script.lock();
        script.params = Some(*params);
        script.released = false;
        Some(Box::new(ScriptedMatcher {
            script: Arc::clone(&self.script),
        }))
    }
}

pub(crate) struct ScriptedMatcher {
    script: SharedScript,
}

impl VisualMatcher for ScriptedMatcher {
    fn advance_frame(&mut self, _frame: &LumaFrame<'_>, timestamp: u64) {
        self.script.lock().frames.push(timestamp);
    }

    fn register_candidate(
        &mut self,
        rect: &Rect<f32>,
        _frame: &LumaFrame<'_>,
        _timestamp: u64,
    ) -> Result<TrackHandle, TrackError> {
        let mut script = self.script.lock();
        let handle = script.next_handle;
        script.next_handle += 1;
        let correlation = script
            .queued_correlations
            .pop_front()
            .unwrap_or(script.default_correlation);
        script.readings.insert(
            handle,
            MatcherReading {
                rect: *rect,
                correlation,
            },
        );
        Ok(TrackHandle::new(handle))
    }

    fn update_position(
        &mut self,
        handle: TrackHandle,
    ) -> Result<MatcherReading, TrackError> {
        let mut script = self.script.lock();
        if script.fail_next_update {
            script.fail_next_update = false;
            return Err(TrackError::UnknownHandle(handle.value()));
        }
        script
            .readings
            .get(&handle.value())
            .copied()
            .ok_or(TrackError::UnknownHandle(handle.value()))
    }

    fn forget(&mut self, handle: TrackHandle) -> Result<(), TrackError> {
        let mut script = self.script.lock();
        if script.readings.remove(&handle.value()).is_none() {
            return Err(TrackError::UnknownHandle(handle.value()));
        }
        script.forgotten.push(handle.value());
        Ok(())
    }

    fn release(&mut self) {
        self.script.lock().released = true;
    }
}

pub(crate) struct UnavailableBackend;

impl MatcherBackend for UnavailableBackend {
    fn create(&self, _params: &MatcherParams) -> Option<Box<dyn VisualMatcher>> {
        None
    }
}

/// Flat gray frame; the scripted matcher never looks at pixels.
pub(crate) fn blank_frame(width: usize, height: usize) -> Vec<u8> {
    vec![128; width * height]
}
