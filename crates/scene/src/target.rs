use foundation::math::WorldPoint;
use serde::{Deserialize, Serialize};

/// Zone the fleet is herding toward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Target {
    Circle {
        center: WorldPoint,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        radius: Option<f64>,
    },
    Polygon {
        points: Vec<WorldPoint>,
    },
}

impl Target {
    pub fn circle(center: WorldPoint, radius: Option<f64>) -> Self {
        Target::Circle { center, radius }
    }

    pub fn polygon(points: Vec<WorldPoint>) -> Self {
        Target::Polygon { points }
    }

    /// Centre of a circle target. Polygons have no tracked centre.
    pub fn circle_center(&self) -> Option<WorldPoint> {
        match self {
            Target::Circle { center, .. } => Some(*center),
            Target::Polygon { .. } => None,
        }
    }
}

/// Body of the per-job target assignment write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPatch {
    pub target: Target,
}
