use crate::error::TrackError;

/// Borrowed 8-bit luma plane with an explicit row stride.
#[derive(Debug, Clone, Copy)]
pub struct LumaFrame<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    row_stride: usize,
}

impl<'a> LumaFrame<'a> {
    pub fn new(
        data: &'a [u8],
        width: usize,
        height: usize,
        row_stride: usize,
    ) -> Result<Self, TrackError> {
        if width == 0 || height == 0 {
            return Err(TrackError::InvalidFrame(format!(
                "empty frame {width}x{height}"
            )));
        }
        if row_stride < width {
            return Err(TrackError::InvalidFrame(format!(
                "row stride {row_stride} is smaller than width {width}"
            )));
        }
        let required = row_stride
            .checked_mul(height - 1)
            .and_then(|rows| rows.checked_add(width))
            .ok_or_else(|| {
                TrackError::InvalidFrame(format!(
                    "{width}x{height} with stride {row_stride} overflows"
                ))
            })?;
        if data.len() < required {
            return Err(TrackError::InvalidFrame(format!(
                "buffer holds {} bytes, {width}x{height} with stride {row_stride} needs {required}",
                data.len()
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            row_stride,
        })
    }

    /// Tightly packed frame (`row_stride == width`).
    pub fn packed(
        data: &'a [u8],
        width: usize,
        height: usize,
    ) -> Result<Self, TrackError> {
        Self::new(data, width, height, width)
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    pub fn row(&self, y: usize) -> &'a [u8] {
        let start = y * self.row_stride;
        &self.data[start..start + self.width]
    }

    #[inline(always)]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.row_stride + x]
    }

    /// Bilinear sample at a sub-pixel position, clamped to the frame edges.
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        let x = x.clamp(0.0, max_x);
        let y = y.clamp(0.0, max_y);

        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let wx = x - x0 as f32;
        let wy = y - y0 as f32;

        let p00 = self.pixel(x0, y0) as f32;
        let p01 = self.pixel(x1, y0) as f32;
        let p10 = self.pixel(x0, y1) as f32;
        let p11 = self.pixel(x1, y1) as f32;
        (1.0 - wy) * ((1.0 - wx) * p00 + wx * p01)
            + wy * ((1.0 - wx) * p10 + wx * p11)
    }
}
