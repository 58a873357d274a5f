use nalgebra::Matrix1x4;
use num::Float;
use std::fmt::Debug;

/* ------------------------------------------------------------------------------
 * Rect struct
 * ------------------------------------------------------------------------------ */

/// Axis-aligned box stored as `[top, left, width, height]` in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect<T>
where
    T: Debug + Float + 'static,
{
    tlwh: Matrix1x4<T>,
}

impl<T> Rect<T>
where
    T: Debug + Float + 'static,
{
    pub fn new(x: T, y: T, width: T, height: T) -> Self {
        Self {
            tlwh: Matrix1x4::new(x, y, width, height),
        }
    }

    #[inline(always)]
    pub fn x(&self) -> T {
        self.tlwh[(0, 0)]
    }

    #[inline(always)]
    pub fn y(&self) -> T {
        self.tlwh[(0, 1)]
    }

    #[inline(always)]
    pub fn width(&self) -> T {
        self.tlwh[(0, 2)]
    }

    #[inline(always)]
    pub fn height(&self) -> T {
        self.tlwh[(0, 3)]
    }

    /// Area of the box; negative extents count as empty.
    pub fn area(&self) -> T {
        self.width().max(T::zero()) * self.height().max(T::zero())
    }

    pub fn intersection_area(&self, other: &Rect<T>) -> T {
        let [ax1, ay1, ax2, ay2] = self.get_xyxy();
        let [bx1, by1, bx2, by2] = other.get_xyxy();

        let iw = ax2.min(bx2) - ax1.max(bx1);
        let ih = ay2.min(by2) - ay1.max(by1);
        if iw <= T::zero() || ih <= T::zero() {
            return T::zero();
        }
        iw * ih
    }

    /// Intersection over union: `inter / (area_a + area_b - inter)`.
    ///
    /// Returns zero when the union is empty.
    pub fn calc_iou(&self, other: &Rect<T>) -> T {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union <= T::zero() {
            return T::zero();
        }
        inter / union
    }

    /// Get bounding box as [x1, y1, x2, y2] format
    pub fn get_xyxy(&self) -> [T; 4] {
        [
            self.tlwh[(0, 0)],
            self.tlwh[(0, 1)],
            self.tlwh[(0, 0)] + self.tlwh[(0, 2)],
            self.tlwh[(0, 1)] + self.tlwh[(0, 3)],
        ]
    }

    /// Same extent shifted by `(dx, dy)`.
    pub fn translated(&self, dx: T, dy: T) -> Self {
        Self::new(self.x() + dx, self.y() + dy, self.width(), self.height())
    }
}
