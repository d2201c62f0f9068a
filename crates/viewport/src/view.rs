use foundation::bounds::Bounds;
use foundation::math::WorldPoint;
use scene::StateSnapshot;
use serde::{Deserialize, Serialize};

use crate::bounds::WorldBoundsCalculator;
use crate::error::ViewportError;
use crate::pan::{DEFAULT_PADDING_PX, DEFAULT_SCROLL_SENSITIVITY, PanController, PanDelta};
use crate::transform::{CoordinateTransformer, PanOffset, PixelPoint, SurfaceSize};
use crate::zoom::ZoomWindow;

/// Viewport tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Lower edge of the visible world span on each axis.
    pub zoom_min: f64,

    /// Upper edge of the visible world span on each axis.
    pub zoom_max: f64,

    /// Fraction of the surface the zoom window maps onto.
    pub display_scale: f64,

    /// Reflect the vertical axis so world Y grows upward.
    pub invert_y: bool,

    /// Minimum pixel gap between tracked entities and the surface edge.
    pub padding_px: f64,

    /// World units per unit of scroll-wheel delta.
    pub scroll_sensitivity: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            zoom_min: 0.0,
            zoom_max: 250.0,
            display_scale: 0.7,
            invert_y: false,
            padding_px: DEFAULT_PADDING_PX,
            scroll_sensitivity: DEFAULT_SCROLL_SENSITIVITY,
        }
    }
}

/// One view onto the herding world: transform, pan state, and the bounds
/// the pan is clamped against.
#[derive(Debug, Clone)]
pub struct Viewport {
    transform: CoordinateTransformer,
    calculator: WorldBoundsCalculator,
    pan: PanController,
}

impl Viewport {
    pub fn new(config: &ViewportConfig) -> Result<Self, ViewportError> {
        let zoom = ZoomWindow::new(config.zoom_min, config.zoom_max)?;
        let transform = CoordinateTransformer::new(zoom, config.display_scale, config.invert_y)?;
        Ok(Self {
            transform,
            calculator: WorldBoundsCalculator::new(zoom),
            pan: PanController::new(transform, config.padding_px, config.scroll_sensitivity),
        })
    }

    pub fn transform(&self) -> &CoordinateTransformer {
        &self.transform
    }

    pub fn offset(&self) -> PanOffset {
        self.pan.offset()
    }

    pub fn surface(&self) -> Option<SurfaceSize> {
        self.pan.surface()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.pan.bounds()
    }

    /// Recomputes bounds from a new snapshot and re-clamps the pan.
    pub fn update_snapshot(&mut self, snapshot: &StateSnapshot) -> Bounds {
        let bounds = self.calculator.compute(snapshot);
        self.pan.set_bounds(bounds);
        bounds
    }

    /// Accepts a raw measurement; zero or non-finite sizes mark the surface
    /// as unmeasured.
    pub fn resize(&mut self, width: f64, height: f64) -> PanOffset {
        self.pan.set_surface(SurfaceSize::new(width, height))
    }

    pub fn set_surface(&mut self, surface: Option<SurfaceSize>) -> PanOffset {
        self.pan.set_surface(surface)
    }

    pub fn to_pixel(&self, p: WorldPoint) -> Option<PixelPoint> {
        let surface = self.pan.surface()?;
        Some(self.transform.point_to_pixel(p, self.pan.offset(), surface))
    }

    pub fn to_world(&self, p: PixelPoint) -> Option<WorldPoint> {
        let surface = self.pan.surface()?;
        Some(self.transform.pixel_to_point(p, self.pan.offset(), surface))
    }

    pub fn pan_by(&mut self, delta: PanDelta) -> PanOffset {
        self.pan.apply(delta)
    }

    pub fn scroll(&mut self, delta: PanDelta) -> PanOffset {
        self.pan.scroll(delta)
    }

    pub fn drag(&mut self, delta: PanDelta) -> PanOffset {
        self.pan.drag_pixels(delta)
    }

    pub fn center_on(&mut self, point: WorldPoint) -> PanOffset {
        self.pan.center_on(point)
    }

    pub fn view_center(&self) -> Option<WorldPoint> {
        self.pan.view_center()
    }

    /// Forgets pan, measurement and bounds; used when the view is torn down.
    pub fn reset(&mut self) {
        self.pan.reset();
    }
}
