use earcutr::earcut;
use foundation::math::WorldPoint;
use scene::StateSnapshot;
use viewport::{PixelPoint, Viewport};

use crate::layer::{Layer, LayerId};

/// Everything in a snapshot that is drawn at a position, in surface pixels.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProjectedFrame {
    pub flock: Vec<PixelPoint>,
    pub drones: Vec<PixelPoint>,
    pub obstacles: Vec<Vec<PixelPoint>>,
    /// Flat triangle list (3 vertices per triangle) filling the obstacles.
    pub obstacle_triangles: Vec<PixelPoint>,
    pub target_centers: Vec<PixelPoint>,
    pub paused: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntitiesLayer {
    id: LayerId,
}

impl EntitiesLayer {
    pub fn new(id: u64) -> Self {
        Self { id: LayerId(id) }
    }

    pub fn extract(&self, snapshot: &StateSnapshot, view: &Viewport) -> Option<ProjectedFrame> {
        project_entities(snapshot, view)
    }
}

impl Layer for EntitiesLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn name(&self) -> &'static str {
        "entities"
    }
}

/// Projects a snapshot through `view`; `None` until the surface is measured.
pub fn project_entities(snapshot: &StateSnapshot, view: &Viewport) -> Option<ProjectedFrame> {
    let project = |points: &[WorldPoint]| -> Option<Vec<PixelPoint>> {
        points.iter().map(|p| view.to_pixel(*p)).collect()
    };

    let obstacles = snapshot
        .polygons
        .iter()
        .map(|ring| project(ring))
        .collect::<Option<Vec<_>>>()?;
    let obstacle_triangles = obstacles.iter().flat_map(|ring| triangulate(ring)).collect();

    let centers: Vec<WorldPoint> = snapshot
        .live_jobs()
        .filter_map(|job| job.target.as_ref()?.circle_center())
        .collect();

    Some(ProjectedFrame {
        flock: project(&snapshot.flock)?,
        drones: project(&snapshot.drones)?,
        obstacles,
        obstacle_triangles,
        target_centers: project(&centers)?,
        paused: snapshot.paused,
    })
}

fn triangulate(ring: &[PixelPoint]) -> Vec<PixelPoint> {
    if ring.len() < 3 {
        return Vec::new();
    }
    let coords: Vec<f64> = ring.iter().flat_map(|p| [p.x, p.y]).collect();
    let indices = match earcut(&coords, &[], 2) {
        Ok(ix) => ix,
        Err(_) => return Vec::new(),
    };
    indices.into_iter().filter_map(|i| ring.get(i).copied()).collect()
}
