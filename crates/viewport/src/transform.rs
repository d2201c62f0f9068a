//! World ↔ pixel mapping.
//!
//! The forward transform along one axis is
//!
//! ```text
//! effective_min = zoom.min + pan[axis]
//! pixel = (value - effective_min) / zoom.size * canvas_size * display_scale
//! ```
//!
//! with an optional reflection `pixel = canvas_size - pixel` on the vertical
//! axis when world Y grows upward but the surface origin is top-left. The
//! inverse undoes the same steps in reverse order. Everything here is pure and
//! allocation-free; it runs on every pointer event and every frame.

use foundation::math::{Axis, WorldPoint};

use crate::error::ViewportError;
use crate::zoom::ZoomWindow;

/// Measured rendering-surface size in pixels.
///
/// Only constructible with strictly positive, finite extents; an unmeasured
/// surface is represented as `Option::<SurfaceSize>::None` by callers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceSize {
    width: f64,
    height: f64,
}

impl SurfaceSize {
    pub fn new(width: f64, height: f64) -> Option<Self> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(width) && ok(height) {
            Some(Self { width, height })
        } else {
            None
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn extent(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.width,
            Axis::Y => self.height,
        }
    }
}

/// Camera translation in world units.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct PanOffset {
    pub x: f64,
    pub y: f64,
}

impl PanOffset {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn get(self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
        }
    }
}

/// Position on the rendering surface in pixels.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn get(self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CoordinateTransformer {
    zoom: ZoomWindow,
    display_scale: f64,
    invert_y: bool,
}

impl CoordinateTransformer {
    pub fn new(zoom: ZoomWindow, display_scale: f64, invert_y: bool) -> Result<Self, ViewportError> {
        if !display_scale.is_finite() || display_scale <= 0.0 {
            return Err(ViewportError::InvalidScale(display_scale));
        }
        Ok(Self {
            zoom,
            display_scale,
            invert_y,
        })
    }

    pub fn zoom(&self) -> ZoomWindow {
        self.zoom
    }

    pub fn display_scale(&self) -> f64 {
        self.display_scale
    }

    pub fn invert_y(&self) -> bool {
        self.invert_y
    }

    fn reflects(&self, axis: Axis) -> bool {
        self.invert_y && axis == Axis::Y
    }

    pub fn to_pixel(&self, value: f64, axis: Axis, pan: PanOffset, surface: SurfaceSize) -> f64 {
        let canvas = surface.extent(axis);
        let effective_min = self.zoom.min() + pan.get(axis);
        let pixel = (value - effective_min) / self.zoom.size() * canvas * self.display_scale;
        if self.reflects(axis) {
            canvas - pixel
        } else {
            pixel
        }
    }

    pub fn to_world(&self, pixel: f64, axis: Axis, pan: PanOffset, surface: SurfaceSize) -> f64 {
        let canvas = surface.extent(axis);
        let pixel = if self.reflects(axis) {
            canvas - pixel
        } else {
            pixel
        };
        let effective_min = self.zoom.min() + pan.get(axis);
        pixel / (canvas * self.display_scale) * self.zoom.size() + effective_min
    }

    pub fn point_to_pixel(&self, p: WorldPoint, pan: PanOffset, surface: SurfaceSize) -> PixelPoint {
        PixelPoint::new(
            self.to_pixel(p.x, Axis::X, pan, surface),
            self.to_pixel(p.y, Axis::Y, pan, surface),
        )
    }

    pub fn pixel_to_point(&self, p: PixelPoint, pan: PanOffset, surface: SurfaceSize) -> WorldPoint {
        WorldPoint::new(
            self.to_world(p.x, Axis::X, pan, surface),
            self.to_world(p.y, Axis::Y, pan, surface),
        )
    }

    /// World distance covered by one pixel along `axis`.
    pub fn world_per_pixel(&self, axis: Axis, surface: SurfaceSize) -> f64 {
        self.zoom.size() / (surface.extent(axis) * self.display_scale)
    }

    /// World coordinate shown at the middle of the surface along `axis`.
    pub fn view_center(&self, axis: Axis, pan: PanOffset, surface: SurfaceSize) -> f64 {
        self.to_world(surface.extent(axis) * 0.5, axis, pan, surface)
    }
}
