use thiserror::Error;

use crate::palette::Color;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackError {
    #[error("a visual matcher instance is already live")]
    MatcherAlreadyLive,
    #[error("track {0} has already been evicted")]
    TrackEvicted(usize),
    #[error("track {0} is not live")]
    UnknownTrack(usize),
    #[error("unknown matcher handle {0}")]
    UnknownHandle(u64),
    #[error("color {0} is already available")]
    DoubleRelease(Color),
    #[error("color {0} is not part of the palette")]
    ForeignColor(Color),
    #[error("invalid palette: {0}")]
    InvalidPalette(String),
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
