use foundation::bounds::AxisRange;

use crate::error::ViewportError;

/// Fixed span of world coordinates visible along each axis.
///
/// Read-only for the lifetime of a view; the constructor guarantees a
/// strictly positive size so the transform never divides by zero.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ZoomWindow {
    min: f64,
    max: f64,
}

impl ZoomWindow {
    pub fn new(min: f64, max: f64) -> Result<Self, ViewportError> {
        if !min.is_finite() || !max.is_finite() || max <= min {
            return Err(ViewportError::InvalidZoomWindow { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn size(&self) -> f64 {
        self.max - self.min
    }

    pub fn as_range(&self) -> AxisRange {
        AxisRange::new(self.min, self.max)
    }
}

impl Default for ZoomWindow {
    fn default() -> Self {
        Self { min: 0.0, max: 250.0 }
    }
}
