mod associator;
mod feeder;
mod multibox_tracker;
mod state;
pub mod track;

pub use crate::error::TrackError;
pub use crate::rect::Rect;
pub use associator::ProcessReport;
pub use feeder::FrameOutcome;
pub use multibox_tracker::MultiBoxTracker;
pub use state::FrameGeometry;
pub use track::{EvictionCause, Track, TrackState, TrackedObject};
