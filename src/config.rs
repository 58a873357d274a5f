use crate::error::TrackError;
use crate::palette::{Color, DEFAULT_COLORS};
use serde::Deserialize;

/// Thresholds and palette used by [`crate::MultiBoxTracker`].
///
/// Every field has a default, so a JSON document only needs to name the
/// values it overrides:
///
/// ```
/// use multibox_rs::TrackerConfig;
/// let config = TrackerConfig::from_json(r#"{ "max_overlap": 0.4 }"#).unwrap();
/// assert_eq!(config.max_overlap, 0.4);
/// assert_eq!(config.min_size, 16.0);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Detections narrower or shorter than this (pixels) are never tracked.
    pub min_size: f32,
    /// Tracks whose correlation falls below this are evicted on the next frame.
    pub min_correlation: f32,
    /// Candidates must reach this correlation to be tracked, and incumbents
    /// at or above it keep their place against lower-confidence overlaps.
    pub marginal_correlation: f32,
    /// IoU above which a candidate competes with an existing track.
    pub max_overlap: f32,
    /// Passed through to the matcher backend on creation.
    pub always_track: bool,
    /// Display colors; the palette size bounds the number of live tracks.
    pub colors: Vec<Color>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_size: 16.0,
            min_correlation: 0.3,
            marginal_correlation: 0.75,
            max_overlap: 0.2,
            always_track: true,
            colors: DEFAULT_COLORS.to_vec(),
        }
    }
}

impl TrackerConfig {
    pub fn from_json(json: &str) -> Result<Self, TrackError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TrackError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_min_size(self, min_size: f32) -> Self {
        Self { min_size, ..self }
    }

    pub fn with_correlation(
        self,
        min_correlation: f32,
        marginal_correlation: f32,
    ) -> Self {
        Self {
            min_correlation,
            marginal_correlation,
            ..self
        }
    }

    pub fn with_max_overlap(self, max_overlap: f32) -> Self {
        Self {
            max_overlap,
            ..self
        }
    }

    pub fn with_always_track(self, always_track: bool) -> Self {
        Self {
            always_track,
            ..self
        }
    }

    pub fn with_colors(self, colors: Vec<Color>) -> Self {
        Self { colors, ..self }
    }

    pub fn validate(&self) -> Result<(), TrackError> {
        if self.min_size.is_nan() || self.min_size < 0.0 {
            return Err(TrackError::InvalidConfig(format!(
                "min_size must be non-negative, got {}",
                self.min_size
            )));
        }
        for (name, value) in [
            ("min_correlation", self.min_correlation),
            ("marginal_correlation", self.marginal_correlation),
            ("max_overlap", self.max_overlap),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TrackError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.colors.is_empty() {
            return Err(TrackError::InvalidConfig(
                "at least one color is required".to_string(),
            ));
        }
        for (i, color) in self.colors.iter().enumerate() {
            if self.colors[..i].contains(color) {
                return Err(TrackError::InvalidConfig(format!(
                    "color {color} is listed twice"
                )));
            }
        }
        Ok(())
    }
}
