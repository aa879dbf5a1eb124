use crate::error::FlockError;
use crate::spatial_index::cuboid::Cuboid;
use crate::spatial_index::spatial_index::SpatialIndex;
use crate::{AgentId, Point, Vec3f};

use std::collections::{HashMap, HashSet};

/// Largest grid a location hash will allocate
pub const MAX_GRID_CELLS: usize = 1 << 21;

/// A 3D dense grid with list of agents in each cell.
/// A radius search only visits the cells overlapping the query's bounding
/// box, so the cost depends on how many agents share those cells rather than
/// on the size of the flock. It degrades when the whole flock crowds into a
/// handful of cells; choosing a cell size close to the sight radius keeps
/// that in check for typical flocks.
pub struct LocationHash3D {
    data: Vec<HashSet<AgentId>>,
    id_to_index: HashMap<AgentId, usize>,
    id_to_exact_location: HashMap<AgentId, Point>,
    /// Cells touched since the last clear
    occupied: Vec<usize>,
    /// Region accepted by `insert`. The last cell along an axis may reach past it.
    boundary: Cuboid,
    cells_x: usize,
    cells_y: usize,
    cells_z: usize,
    /// Edge length of each cell
    resolution: f64,
    offset: Point,
}

impl LocationHash3D {
    /// Creates a new LocationHash3D instance
    /// # Arguments
    /// * `width` - Extent of the grid along x
    /// * `height`- Extent of the grid along y
    /// * `depth` - Extent of the grid along z
    /// * `cell_size` - Each cell will be of `cell_size`x`cell_size`x`cell_size` dimensions in
    /// whatever units the extents are.
    /// * `offset` - The position of the minimum corner of the 0,0,0 cell.
    pub fn new(
        width: f64,
        height: f64,
        depth: f64,
        cell_size: f64,
        offset: Point,
    ) -> Result<Self, FlockError> {
        let half_extents = Vec3f::new(width, height, depth) / 2f64;
        let boundary = Cuboid::from_half_extents(offset + half_extents, half_extents)?;
        Self::from_boundary(&boundary, cell_size)
    }

    /// Grid covering `boundary` with cubic cells of `cell_size`. Fails if the
    /// grid would need more than [`MAX_GRID_CELLS`] cells.
    pub fn from_boundary(boundary: &Cuboid, cell_size: f64) -> Result<Self, FlockError> {
        if !(cell_size.is_finite() && cell_size > 0f64) {
            return Err(FlockError::InvalidConfig(format!(
                "grid cell size must be positive, got {}",
                cell_size
            )));
        }
        let size = boundary.half_extents() * 2f64;
        // Float to int casts saturate, so huge ratios end up in the checks below
        let cells_along = |extent: f64| ((extent / cell_size).ceil() as usize).max(1);
        let cells_x = cells_along(size.x);
        let cells_y = cells_along(size.y);
        let cells_z = cells_along(size.z);

        let cell_count = cells_x
            .checked_mul(cells_y)
            .and_then(|count| count.checked_mul(cells_z))
            .filter(|count| *count <= MAX_GRID_CELLS)
            .ok_or_else(|| {
                FlockError::InvalidConfig(format!(
                    "grid cell size {} splits the index region into more than {} cells",
                    cell_size, MAX_GRID_CELLS
                ))
            })?;

        let mut data_table = vec![];
        data_table.resize_with(cell_count, HashSet::new);

        Ok(Self {
            data: data_table,
            id_to_index: HashMap::new(),
            id_to_exact_location: HashMap::new(),
            occupied: vec![],
            boundary: *boundary,
            cells_x,
            cells_y,
            cells_z,
            resolution: cell_size,
            offset: boundary.min(),
        })
    }

    pub fn boundary(&self) -> &Cuboid {
        &self.boundary
    }

    pub fn cell_count(&self) -> usize {
        self.data.len()
    }

    fn location_to_signed_idx(&self, point: Point) -> [i64; 3] {
        let local = (point - self.offset) / self.resolution;
        [
            local.x.floor() as i64,
            local.y.floor() as i64,
            local.z.floor() as i64,
        ]
    }

    fn signed_idx_to_data_idx(&self, idx: [i64; 3]) -> Option<usize> {
        let limits = [self.cells_x, self.cells_y, self.cells_z];
        if idx.iter().zip(limits).any(|(i, limit)| *i < 0 || *i as usize >= limit) {
            return None;
        }
        let [x, y, z] = idx.map(|i| i as usize);
        Some((x * self.cells_y + y) * self.cells_z + z)
    }

    /// Returns an index given a point
    fn location_to_index(&self, point: Point) -> Option<usize> {
        self.signed_idx_to_data_idx(self.location_to_signed_idx(point))
    }

    /// Range of cells overlapping the axis aligned box around a query sphere,
    /// clipped to the grid.
    fn get_bounds(&self, radius: f64, position: Point) -> ([i64; 3], [i64; 3]) {
        let reach = Point::new(radius, radius, radius);
        let lower = self.location_to_signed_idx(position - reach);
        let upper = self.location_to_signed_idx(position + reach);
        let limits = [self.cells_x, self.cells_y, self.cells_z];
        let mut low = [0i64; 3];
        let mut high = [0i64; 3];
        for axis in 0..3 {
            low[axis] = lower[axis].max(0);
            high[axis] = upper[axis].min(limits[axis] as i64 - 1);
        }
        (low, high)
    }
}

impl SpatialIndex for LocationHash3D {
    fn clear(&mut self) {
        for idx in self.occupied.drain(..) {
            self.data[idx].clear();
        }
        self.id_to_index.clear();
        self.id_to_exact_location.clear();
    }

    fn insert(&mut self, id: AgentId, position: Point) -> Result<(), FlockError> {
        let new_index = match self.location_to_index(position) {
            Some(idx) if self.boundary.contains(&position) => idx,
            _ => return Err(FlockError::OutOfBounds { agent: id, position }),
        };

        if let Some(old_index) = self.id_to_index.insert(id, new_index) {
            if old_index != new_index {
                self.data[old_index].remove(&id);
            }
        }

        if self.data[new_index].is_empty() {
            self.occupied.push(new_index);
        }
        self.data[new_index].insert(id);
        self.id_to_exact_location.insert(id, position);
        Ok(())
    }

    fn get_neighbours_in_radius(&self, radius: f64, position: Point) -> Vec<AgentId> {
        let mut agents = vec![];
        if radius.is_nan() || radius <= 0f64 {
            return agents;
        }

        let radius_squared = radius * radius;
        let (low, high) = self.get_bounds(radius, position);
        for x_idx in low[0]..=high[0] {
            for y_idx in low[1]..=high[1] {
                for z_idx in low[2]..=high[2] {
                    let Some(idx) = self.signed_idx_to_data_idx([x_idx, y_idx, z_idx]) else {
                        continue;
                    };
                    let inliers = self.data[idx].iter().filter(|agent_id| {
                        let agent_pos = self.id_to_exact_location[*agent_id];
                        (agent_pos - position).norm_squared() < radius_squared
                    });
                    agents.extend(inliers);
                }
            }
        }
        agents
    }

    fn len(&self) -> usize {
        self.id_to_index.len()
    }
}
