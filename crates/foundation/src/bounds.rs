use crate::math::Axis;

/// Axis-aligned rectangle in world coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Bounds {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn from_ranges(x: AxisRange, y: AxisRange) -> Self {
        Self::new(x.min, x.max, y.min, y.max)
    }

    pub fn range(&self, axis: Axis) -> AxisRange {
        match axis {
            Axis::X => AxisRange::new(self.min_x, self.max_x),
            Axis::Y => AxisRange::new(self.min_y, self.max_y),
        }
    }
}

/// Closed interval along one axis.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub fn new(min: f64, max: f64) -> Self {
        AxisRange { min, max }
    }
}

/// Incrementally grows a range from a stream of values.
///
/// Non-finite values are ignored so a single bad sample cannot poison the
/// extent.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RangeAccumulator {
    range: Option<AxisRange>,
}

impl RangeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(&mut self, v: f64) {
        if !v.is_finite() {
            return;
        }
        self.range = Some(match self.range {
            None => AxisRange::new(v, v),
            Some(r) => AxisRange::new(r.min.min(v), r.max.max(v)),
        });
    }

    pub fn finish(self) -> Option<AxisRange> {
        self.range
    }
}
