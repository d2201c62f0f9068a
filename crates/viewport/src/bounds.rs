use foundation::bounds::{Bounds, RangeAccumulator};
use foundation::math::WorldPoint;
use scene::StateSnapshot;

use crate::zoom::ZoomWindow;

/// Derives the extent that must stay reachable from a snapshot.
///
/// Counted: every flock position, every drone position, and the centre of
/// each non-cancelled job's circle target. Polygon targets do not contribute.
/// An axis with no samples falls back to the zoom window's span, so the
/// result is never degenerate-by-absence.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WorldBoundsCalculator {
    fallback: ZoomWindow,
}

impl WorldBoundsCalculator {
    pub fn new(fallback: ZoomWindow) -> Self {
        Self { fallback }
    }

    pub fn fallback(&self) -> ZoomWindow {
        self.fallback
    }

    pub fn compute(&self, snapshot: &StateSnapshot) -> Bounds {
        let target_centers = snapshot
            .live_jobs()
            .filter_map(|job| job.target.as_ref()?.circle_center());

        self.from_points(
            snapshot
                .flock
                .iter()
                .chain(snapshot.drones.iter())
                .copied()
                .chain(target_centers),
        )
    }

    pub fn from_points(&self, points: impl IntoIterator<Item = WorldPoint>) -> Bounds {
        let mut xs = RangeAccumulator::new();
        let mut ys = RangeAccumulator::new();
        for p in points {
            xs.include(p.x);
            ys.include(p.y);
        }
        let fallback = self.fallback.as_range();
        Bounds::from_ranges(
            xs.finish().unwrap_or(fallback),
            ys.finish().unwrap_or(fallback),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::WorldBoundsCalculator;
    use crate::zoom::ZoomWindow;
    use chrono::{TimeZone, Utc};
    use foundation::bounds::Bounds;
    use foundation::math::WorldPoint;
    use scene::{Job, JobId, JobStatus, StateSnapshot, Target};

    fn job(id: i64, status: JobStatus, target: Option<Target>) -> Job {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        Job {
            id: JobId::Number(id),
            target,
            is_active: false,
            drone_count: 1,
            status,
            start_at: None,
            created_at: t,
            updated_at: t,
        }
    }

    fn calc() -> WorldBoundsCalculator {
        WorldBoundsCalculator::new(ZoomWindow::new(0.0, 250.0).unwrap())
    }

    #[test]
    fn empty_snapshot_falls_back_to_zoom_window() {
        let b = calc().compute(&StateSnapshot::default());
        assert_eq!(b, Bounds::new(0.0, 250.0, 0.0, 250.0));
    }

    #[test]
    fn covers_flock_drones_and_circle_centers() {
        let snap = StateSnapshot {
            flock: vec![WorldPoint::new(10.0, 20.0), WorldPoint::new(30.0, 5.0)],
            drones: vec![WorldPoint::new(-4.0, 12.0)],
            jobs: vec![job(
                1,
                JobStatus::Pending,
                Some(Target::circle(WorldPoint::new(50.0, 60.0), Some(10.0))),
            )],
            ..StateSnapshot::default()
        };
        assert_eq!(calc().compute(&snap), Bounds::new(-4.0, 50.0, 5.0, 60.0));
    }

    #[test]
    fn ignores_polygons_and_cancelled_jobs() {
        let snap = StateSnapshot {
            drones: vec![WorldPoint::new(1.0, 1.0)],
            jobs: vec![
                job(
                    1,
                    JobStatus::Cancelled,
                    Some(Target::circle(WorldPoint::new(900.0, 900.0), None)),
                ),
                job(
                    2,
                    JobStatus::Pending,
                    Some(Target::polygon(vec![
                        WorldPoint::new(-500.0, -500.0),
                        WorldPoint::new(500.0, 500.0),
                    ])),
                ),
                job(3, JobStatus::Pending, None),
            ],
            polygons: vec![vec![WorldPoint::new(-999.0, 999.0)]],
            ..StateSnapshot::default()
        };
        assert_eq!(calc().compute(&snap), Bounds::new(1.0, 1.0, 1.0, 1.0));
    }
}
