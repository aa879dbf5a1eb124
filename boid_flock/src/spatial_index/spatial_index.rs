use crate::error::FlockError;
use crate::{AgentId, Point};

/// Neighbour lookup used by the flock coordinator.
///
/// Indices are rebuilt from scratch every tick: `clear` followed by one
/// `insert` per agent. Queries never mutate the index.
pub trait SpatialIndex {
    /// Forget every agent while keeping allocations around for the next rebuild
    fn clear(&mut self);

    /// Adds an agent at the given position. Fails if the position lies outside
    /// the region covered by the index.
    fn insert(&mut self, agent: AgentId, position: Point) -> Result<(), FlockError>;

    /// All agents strictly closer than `radius` to `position`, in no
    /// particular order.
    fn get_neighbours_in_radius(&self, radius: f64, position: Point) -> Vec<AgentId>;

    /// Number of agents currently stored
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
