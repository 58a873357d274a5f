pub mod config;
pub mod detection;
pub mod error;
pub mod frame;
pub mod matcher;
pub mod multibox_tracker;
pub mod palette;
pub mod rect;

#[cfg(test)]
mod test_multibox_tracker;
#[cfg(test)]
mod test_support;

pub use config::TrackerConfig;
pub use detection::Detection;
pub use error::TrackError;
pub use frame::LumaFrame;
pub use matcher::{
    MatcherBackend, MatcherParams, MatcherProvider, MatcherReading,
    MatcherSession, NccBackend, NccConfig, NccMatcher, TrackHandle,
    VisualMatcher,
};
pub use multibox_tracker::{
    FrameGeometry, FrameOutcome, MultiBoxTracker, ProcessReport, TrackedObject,
};
pub use palette::{Color, ColorPalette, DEFAULT_COLORS};
pub use rect::Rect;
