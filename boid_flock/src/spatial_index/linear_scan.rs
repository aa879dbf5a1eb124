use crate::error::FlockError;
use crate::spatial_index::octree::SpatialPoint;
use crate::spatial_index::spatial_index::SpatialIndex;
use crate::{AgentId, Point};

/// Brute force neighbour lookup: every query checks every agent.
///
/// Unbounded, so it never rejects an agent. Useful as ground truth for the
/// tree and grid indices and perfectly adequate for small flocks.
#[derive(Clone, Debug, Default)]
pub struct LinearScan {
    points: Vec<SpatialPoint>,
}

impl LinearScan {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpatialIndex for LinearScan {
    fn clear(&mut self) {
        self.points.clear();
    }

    fn insert(&mut self, agent: AgentId, position: Point) -> Result<(), FlockError> {
        self.points.push(SpatialPoint::new(position, agent));
        Ok(())
    }

    fn get_neighbours_in_radius(&self, radius: f64, position: Point) -> Vec<AgentId> {
        let radius_squared = radius * radius;
        self.points
            .iter()
            .filter(|point| radius > 0f64 && (point.position() - position).norm_squared() < radius_squared)
            .map(|point| point.agent_id())
            .collect()
    }

    fn len(&self) -> usize {
        self.points.len()
    }
}
