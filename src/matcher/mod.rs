//! Contract with the single-object visual matcher.
//!
//! The matcher owns per-track appearance state and, once per frame, reports
//! where each registered region moved and how well it still correlates. A
//! [`MatcherProvider`] wraps a backend and enforces that at most one
//! [`MatcherSession`] is open at a time.

pub mod ncc;

use crate::error::TrackError;
use crate::frame::LumaFrame;
use crate::rect::Rect;
use log::{debug, error};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use ncc::{NccBackend, NccConfig, NccMatcher};

/// Opaque reference to one region registered with a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackHandle(u64);

impl TrackHandle {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TrackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Frame geometry and flags a backend is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatcherParams {
    pub width: usize,
    pub height: usize,
    pub row_stride: usize,
    pub always_track: bool,
}

/// Position and correlation of a registered region in the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatcherReading {
    pub rect: Rect<f32>,
    pub correlation: f32,
}

pub trait VisualMatcher: Send {
    /// Make `frame` the current frame.
    fn advance_frame(&mut self, frame: &LumaFrame<'_>, timestamp: u64);

    /// Start following `rect`, taking its appearance from `frame` captured
    /// at `timestamp` (which may lag behind the current frame).
    fn register_candidate(
        &mut self,
        rect: &Rect<f32>,
        frame: &LumaFrame<'_>,
        timestamp: u64,
    ) -> Result<TrackHandle, TrackError>;

    /// Locate `handle` in the current frame.
    fn update_position(
        &mut self,
        handle: TrackHandle,
    ) -> Result<MatcherReading, TrackError>;

    fn forget(&mut self, handle: TrackHandle) -> Result<(), TrackError>;

    /// Free backend resources. Called once when the session closes.
    fn release(&mut self) {}
}

pub trait MatcherBackend: Send + Sync {
    /// `None` when the backend cannot run on this host.
    fn create(&self, params: &MatcherParams) -> Option<Box<dyn VisualMatcher>>;
}

/*----------------------------------------------------------------------------
MatcherProvider
----------------------------------------------------------------------------*/

/// Hands out at most one open [`MatcherSession`] at a time.
///
/// The lease is shared by a provider and its clones only. Two providers built
/// with separate [`MatcherProvider::new`] calls each allow their own session,
/// so a host must create one provider per backend and clone it into every
/// tracker that uses that backend.
#[derive(Clone)]
pub struct MatcherProvider {
    backend: Arc<dyn MatcherBackend>,
    live: Arc<AtomicBool>,
}

impl MatcherProvider {
    pub fn new(backend: impl MatcherBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
            live: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True while a session opened from this provider (or a clone) is open.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Open the single matcher session.
    ///
    /// Returns `Ok(None)` when the backend is unavailable and
    /// [`TrackError::MatcherAlreadyLive`] when another session is still open.
    pub fn open(
        &self,
        params: &MatcherParams,
    ) -> Result<Option<MatcherSession>, TrackError> {
        if self
            .live
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            error!("refusing to open a second visual matcher session");
            return Err(TrackError::MatcherAlreadyLive);
        }

        match self.backend.create(params) {
            Some(matcher) => {
                debug!(
                    "visual matcher opened for {}x{} (stride {})",
                    params.width, params.height, params.row_stride
                );
                Ok(Some(MatcherSession {
                    matcher,
                    live: Arc::clone(&self.live),
                }))
            }
            None => {
                self.live.store(false, Ordering::Release);
                Ok(None)
            }
        }
    }
}

impl fmt::Debug for MatcherProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherProvider")
            .field("live", &self.is_live())
            .finish()
    }
}

/*----------------------------------------------------------------------------
MatcherSession
----------------------------------------------------------------------------*/

/// An open matcher. Dropping it releases the backend and the provider lease.
pub struct MatcherSession {
    matcher: Box<dyn VisualMatcher>,
    live: Arc<AtomicBool>,
}

impl MatcherSession {
    pub fn release(self) {
        drop(self);
    }
}

impl Deref for MatcherSession {
    type Target = dyn VisualMatcher;

    fn deref(&self) -> &Self::Target {
        self.matcher.as_ref()
    }
}

impl DerefMut for MatcherSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.matcher.as_mut()
    }
}

impl Drop for MatcherSession {
    fn drop(&mut self) {
        self.matcher.release();
        self.live.store(false, Ordering::Release);
        debug!("visual matcher released");
    }
}

impl fmt::Debug for MatcherSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherSession").finish_non_exhaustive()
    }
}
