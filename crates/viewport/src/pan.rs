use foundation::bounds::Bounds;
use foundation::math::{Axis, WorldPoint};

use crate::error::ViewportError;
use crate::transform::{CoordinateTransformer, PanOffset, SurfaceSize};

/// Pixels kept between the outermost tracked entity and the surface edge.
pub const DEFAULT_PADDING_PX: f64 = 40.0;

/// World units applied per unit of scroll-wheel delta.
pub const DEFAULT_SCROLL_SENSITIVITY: f64 = 0.1;

/// Validated pan input. Construction is the boundary where non-finite
/// deltas are rejected; the controller itself assumes finite input.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PanDelta {
    pub dx: f64,
    pub dy: f64,
}

impl PanDelta {
    pub fn new(dx: f64, dy: f64) -> Result<Self, ViewportError> {
        if !dx.is_finite() || !dy.is_finite() {
            return Err(ViewportError::NonFiniteDelta { dx, dy });
        }
        Ok(Self { dx, dy })
    }
}

/// Owns the pan offset and keeps the camera near the tracked entities.
///
/// Clamping works on the view centre, per axis. With `reach` being the
/// surface half-extent minus the padding, converted to world units:
/// - if the bounds fit inside the padded view, the centre is confined so
///   every point of the bounds stays at least `padding` pixels inside the
///   surface;
/// - otherwise the centre is confined so the padded view stays inside the
///   bounds, and panning walks across them.
///
/// Both cases collapse to clamping the centre between `max - reach` and
/// `min + reach` (in whichever order they come).
#[derive(Debug, Clone)]
pub struct PanController {
    transform: CoordinateTransformer,
    offset: PanOffset,
    surface: Option<SurfaceSize>,
    bounds: Option<Bounds>,
    padding_px: f64,
    scroll_sensitivity: f64,
}

impl PanController {
    pub fn new(transform: CoordinateTransformer, padding_px: f64, scroll_sensitivity: f64) -> Self {
        Self {
            transform,
            offset: PanOffset::default(),
            surface: None,
            bounds: None,
            padding_px: padding_px.max(0.0),
            scroll_sensitivity,
        }
    }

    pub fn offset(&self) -> PanOffset {
        self.offset
    }

    pub fn surface(&self) -> Option<SurfaceSize> {
        self.surface
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn transform(&self) -> &CoordinateTransformer {
        &self.transform
    }

    /// Records a new measurement (or loss of one) and re-clamps.
    pub fn set_surface(&mut self, surface: Option<SurfaceSize>) -> PanOffset {
        self.surface = surface;
        self.offset = self.clamp(self.offset);
        self.offset
    }

    /// Records freshly derived bounds and re-clamps, so a shrinking entity set
    /// pulls the camera back instead of stranding it.
    pub fn set_bounds(&mut self, bounds: Bounds) -> PanOffset {
        self.bounds = Some(bounds);
        self.offset = self.clamp(self.offset);
        self.offset
    }

    pub fn apply_delta(&mut self, dx: f64, dy: f64) -> PanOffset {
        debug_assert!(dx.is_finite() && dy.is_finite(), "pan delta must be finite");
        let candidate = PanOffset::new(self.offset.x + dx, self.offset.y + dy);
        self.offset = self.clamp(candidate);
        self.offset
    }

    pub fn apply(&mut self, delta: PanDelta) -> PanOffset {
        self.apply_delta(delta.dx, delta.dy)
    }

    /// Scroll-wheel input, applied per event without batching.
    pub fn scroll(&mut self, delta: PanDelta) -> PanOffset {
        self.apply_delta(
            delta.dx * self.scroll_sensitivity,
            delta.dy * self.scroll_sensitivity,
        )
    }

    /// Grab-and-move drag expressed in surface pixels.
    ///
    /// Needs a measurement to convert pixels to world units; before that the
    /// drag is dropped.
    pub fn drag_pixels(&mut self, delta: PanDelta) -> PanOffset {
        let Some(surface) = self.surface else {
            return self.offset;
        };
        let dx = -delta.dx * self.transform.world_per_pixel(Axis::X, surface);
        let dy_world = delta.dy * self.transform.world_per_pixel(Axis::Y, surface);
        let dy = if self.transform.invert_y() {
            dy_world
        } else {
            -dy_world
        };
        self.apply_delta(dx, dy)
    }

    pub fn view_center(&self) -> Option<WorldPoint> {
        let surface = self.surface?;
        Some(WorldPoint::new(
            self.transform.view_center(Axis::X, self.offset, surface),
            self.transform.view_center(Axis::Y, self.offset, surface),
        ))
    }

    /// Brings `point` to the middle of the view (subject to clamping).
    pub fn center_on(&mut self, point: WorldPoint) -> PanOffset {
        let Some(center) = self.view_center() else {
            return self.offset;
        };
        let d = point - center;
        self.apply_delta(d.x, d.y)
    }

    pub fn reset(&mut self) {
        self.offset = PanOffset::default();
        self.surface = None;
        self.bounds = None;
    }

    fn clamp(&self, candidate: PanOffset) -> PanOffset {
        let (Some(surface), Some(bounds)) = (self.surface, self.bounds) else {
            return candidate;
        };
        let mut out = candidate;
        for axis in Axis::ALL {
            out.set(axis, self.clamp_axis(candidate.get(axis), axis, surface, bounds));
        }
        out
    }

    fn clamp_axis(&self, candidate: f64, axis: Axis, surface: SurfaceSize, bounds: Bounds) -> f64 {
        let per_px = self.transform.world_per_pixel(axis, surface);
        let half_extent = surface.extent(axis) * 0.5;
        let half_view = half_extent * per_px;
        let reach = (half_extent - self.padding_px).max(0.0) * per_px;

        let range = bounds.range(axis);
        let a = range.max - reach;
        let b = range.min + reach;
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

        let zoom_min = self.transform.zoom().min();
        let center = zoom_min + candidate + half_view;
        if center < lo {
            lo - zoom_min - half_view
        } else if center > hi {
            hi - zoom_min - half_view
        } else {
            candidate
        }
    }
}
