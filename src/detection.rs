use crate::rect::Rect;

/*------------------------------------------------------------------------------
Detection struct
------------------------------------------------------------------------------*/

/// One raw detector output for a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    id: String,
    label: String,
    confidence: f32,
    rect: Rect<f32>,
}

impl Detection {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        confidence: f32,
        rect: Rect<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            confidence,
            rect,
        }
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_label(&self) -> &str {
        &self.label
    }

    pub fn get_confidence(&self) -> f32 {
        self.confidence
    }

    pub fn get_rect(&self) -> Rect<f32> {
        self.rect
    }

    /// True when either side of the box is shorter than `min_size`.
    pub fn is_degenerate(&self, min_size: f32) -> bool {
        self.rect.width() < min_size || self.rect.height() < min_size
    }
}
