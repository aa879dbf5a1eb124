use crate::error::FlockError;
use crate::spatial_index::cuboid::Cuboid;
use crate::spatial_index::spatial_index::SpatialIndex;
use crate::{AgentId, Point};

/// Depth at which nodes stop subdividing and start collecting points in a
/// bucket instead.
pub const DEFAULT_MAX_DEPTH: usize = 16;

const ROOT: usize = 0;

/// A position tagged with the agent it belongs to. Recreated every tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpatialPoint {
    position: Point,
    agent_id: AgentId,
}

impl SpatialPoint {
    pub fn new(position: Point, agent_id: AgentId) -> Self {
        Self { position, agent_id }
    }

    pub fn position(&self) -> &Point {
        &self.position
    }

    pub fn agent_id(&self) -> AgentId {
        self.agent_id
    }
}

#[derive(Clone, Debug)]
struct OctreeNode {
    boundary: Cuboid,
    depth: usize,
    point: Option<SpatialPoint>,
    /// Extra points of a node that may not subdivide any further
    bucket: Vec<SpatialPoint>,
    /// Index of the first of eight consecutive children in the node pool
    first_child: Option<usize>,
}

impl OctreeNode {
    fn new(boundary: Cuboid, depth: usize) -> Self {
        Self {
            boundary,
            depth,
            point: None,
            bucket: vec![],
            first_child: None,
        }
    }

    fn is_divided(&self) -> bool {
        self.first_child.is_some()
    }

    fn children(&self) -> Option<std::ops::Range<usize>> {
        self.first_child.map(|first| first..first + 8)
    }
}

/// Point octree used for sight radius queries.
///
/// Every node keeps at most one point of its own. Putting a second point into
/// an occupied leaf splits the leaf into its eight octants and the point moves
/// on to whichever octant accepts it; the point already stored stays where it
/// is. Subdivision is lazy, so a tree holding a single point is a single node.
///
/// Nodes live in a pool owned by the tree. [`Octree::clear`] drops every node
/// but the root and keeps the pool's capacity, so rebuilding the tree every
/// tick does not reallocate once the flock has settled.
///
/// Coincident points would otherwise split forever; a node at `max_depth`
/// keeps any further points in a small bucket instead.
#[derive(Clone, Debug)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    max_depth: usize,
    len: usize,
}

impl Octree {
    pub fn new(boundary: Cuboid) -> Self {
        Self::with_max_depth(boundary, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(boundary: Cuboid, max_depth: usize) -> Self {
        Self {
            nodes: vec![OctreeNode::new(boundary, 0)],
            max_depth,
            len: 0,
        }
    }

    /// Region covered by the root node
    pub fn boundary(&self) -> &Cuboid {
        &self.nodes[ROOT].boundary
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nodes in the tree, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest node. A tree that never subdivided has depth 0.
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|node| node.depth).max().unwrap_or(0)
    }

    /// Removes every point. The root boundary is kept.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        let root = &mut self.nodes[ROOT];
        root.point = None;
        root.bucket.clear();
        root.first_child = None;
        self.len = 0;
    }

    /// Inserts a point. Returns false, leaving the tree untouched, if the point
    /// lies outside the root boundary.
    pub fn insert_point(&mut self, point: SpatialPoint) -> bool {
        if self.insert_at(ROOT, point) {
            self.len += 1;
            return true;
        }
        false
    }

    fn insert_at(&mut self, index: usize, point: SpatialPoint) -> bool {
        let node = &mut self.nodes[index];
        if !node.boundary.contains(point.position()) {
            return false;
        }

        if node.point.is_none() {
            node.point = Some(point);
            return true;
        }

        if !node.is_divided() {
            if node.depth >= self.max_depth {
                node.bucket.push(point);
                return true;
            }
            self.subdivide(index);
        }

        if let Some(children) = self.nodes[index].children() {
            for child in children {
                if self.insert_at(child, point) {
                    return true;
                }
            }
        }

        // Halving the extents can round away a sliver of the parent that no
        // child covers. The point is still inside this node, so keep it here.
        self.nodes[index].bucket.push(point);
        true
    }

    fn subdivide(&mut self, index: usize) {
        if self.nodes[index].is_divided() {
            return;
        }

        let first_child = self.nodes.len();
        let depth = self.nodes[index].depth + 1;
        let octants = self.nodes[index].boundary.octants();
        self.nodes
            .extend(octants.into_iter().map(|boundary| OctreeNode::new(boundary, depth)));
        self.nodes[index].first_child = Some(first_child);
    }

    /// Agents of every point strictly closer than `radius` to `centre`.
    pub fn query_sphere(&self, centre: &Point, radius: f64) -> Vec<AgentId> {
        let mut found = vec![];
        self.query_sphere_into(centre, radius, &mut found);
        found
    }

    /// Same as [`Octree::query_sphere`] but appends to an existing list.
    /// Results come out in traversal order.
    pub fn query_sphere_into(&self, centre: &Point, radius: f64, found: &mut Vec<AgentId>) {
        if radius.is_nan() || radius <= 0f64 {
            return;
        }
        self.query_node(ROOT, centre, radius, found);
    }

    fn query_node(&self, index: usize, centre: &Point, radius: f64, found: &mut Vec<AgentId>) {
        let node = &self.nodes[index];
        if !node.boundary.intersects_sphere(centre, radius) {
            return;
        }

        let radius_squared = radius * radius;
        for point in node.point.iter().chain(node.bucket.iter()) {
            if (point.position() - centre).norm_squared() < radius_squared {
                found.push(point.agent_id());
            }
        }

        if let Some(children) = node.children() {
            for child in children {
                self.query_node(child, centre, radius, found);
            }
        }
    }
}

impl SpatialIndex for Octree {
    fn clear(&mut self) {
        Octree::clear(self);
    }

    fn insert(&mut self, agent: AgentId, position: Point) -> Result<(), FlockError> {
        if self.insert_point(SpatialPoint::new(position, agent)) {
            Ok(())
        } else {
            Err(FlockError::OutOfBounds { agent, position })
        }
    }

    fn get_neighbours_in_radius(&self, radius: f64, position: Point) -> Vec<AgentId> {
        self.query_sphere(&position, radius)
    }

    fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial_index::linear_scan::LinearScan;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    fn cube(half: f64) -> Cuboid {
        Cuboid::new(Point::new(0f64, 0f64, 0f64), half, half, half).unwrap()
    }

    fn random_point(rng: &mut StdRng, half: f64) -> Point {
        Point::new(
            rng.gen_range(-half..half),
            rng.gen_range(-half..half),
            rng.gen_range(-half..half),
        )
    }

    fn assert_points_inside_their_nodes(octree: &Octree) {
        for node in &octree.nodes {
            for point in node.point.iter().chain(node.bucket.iter()) {
                assert!(node.boundary.contains(point.position()));
            }
        }
    }

    #[test]
    fn test_single_point_does_not_subdivide() {
        let mut octree = Octree::new(cube(10f64));
        assert!(octree.insert_point(SpatialPoint::new(Point::new(1f64, 2f64, 3f64), 0)));
        assert_eq!(octree.len(), 1);
        assert_eq!(octree.node_count(), 1);
        assert_eq!(octree.depth(), 0);
    }

    #[test]
    fn test_second_point_subdivides_once() {
        let mut octree = Octree::new(cube(10f64));
        assert!(octree.insert_point(SpatialPoint::new(Point::new(1f64, 1f64, 1f64), 0)));
        assert!(octree.insert_point(SpatialPoint::new(Point::new(-1f64, -1f64, -1f64), 1)));
        assert_eq!(octree.node_count(), 9);
        assert_eq!(octree.depth(), 1);

        // A third point in an empty octant does not split anything further
        assert!(octree.insert_point(SpatialPoint::new(Point::new(5f64, -5f64, 5f64), 2)));
        assert_eq!(octree.node_count(), 9);
    }

    #[test]
    fn test_outside_point_is_rejected() {
        let mut octree = Octree::new(cube(10f64));
        assert!(octree.insert_point(SpatialPoint::new(Point::new(0f64, 0f64, 0f64), 0)));
        assert!(!octree.insert_point(SpatialPoint::new(Point::new(10f64, 0f64, 0f64), 1)));
        assert!(!octree.insert_point(SpatialPoint::new(Point::new(0f64, -10.5f64, 0f64), 2)));
        assert_eq!(octree.len(), 1);
        assert_eq!(octree.node_count(), 1);

        let res = SpatialIndex::insert(&mut octree, 3, Point::new(0f64, 0f64, 11f64));
        assert_eq!(
            res,
            Err(FlockError::OutOfBounds {
                agent: 3,
                position: Point::new(0f64, 0f64, 11f64)
            })
        );
        assert_eq!(octree.len(), 1);
    }

    #[test]
    fn test_contained_points_are_found_by_any_radius() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut octree = Octree::new(cube(50f64));
        let mut points = vec![];
        for agent in 0..300 {
            let p = random_point(&mut rng, 50f64);
            assert!(octree.insert_point(SpatialPoint::new(p, agent)));
            points.push(p);
        }
        assert_eq!(octree.len(), 300);
        assert_points_inside_their_nodes(&octree);

        for (agent, p) in points.iter().enumerate() {
            for radius in [1e-9f64, 0.5f64, 10f64] {
                assert!(octree.query_sphere(p, radius).contains(&agent));
            }
        }
    }

    #[test]
    fn test_query_matches_linear_scan() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let mut octree = Octree::new(cube(20f64));
            let mut linear = LinearScan::new();
            let count = rng.gen_range(0..200);
            for agent in 0..count {
                let p = random_point(&mut rng, 20f64);
                octree.insert(agent, p).unwrap();
                linear.insert(agent, p).unwrap();
            }

            for _ in 0..50 {
                let centre = random_point(&mut rng, 25f64);
                let radius = rng.gen_range(0f64..15f64);
                let expected: HashSet<AgentId> =
                    HashSet::from_iter(linear.get_neighbours_in_radius(radius, centre));
                let found = octree.query_sphere(&centre, radius);
                let found_set: HashSet<AgentId> = HashSet::from_iter(found.iter().copied());
                assert_eq!(found.len(), found_set.len());
                assert_eq!(found_set, expected);
            }
        }
    }

    #[test]
    fn test_query_radius_is_exclusive() {
        let mut octree = Octree::new(cube(10f64));
        octree.insert(0, Point::new(0f64, 0f64, 0f64)).unwrap();
        octree.insert(1, Point::new(2f64, 0f64, 0f64)).unwrap();

        let found = octree.query_sphere(&Point::new(0f64, 0f64, 0f64), 2f64);
        assert_eq!(found, vec![0]);

        let found = octree.query_sphere(&Point::new(0f64, 0f64, 0f64), 2.0001f64);
        let found: HashSet<AgentId> = HashSet::from_iter(found);
        assert_eq!(found, HashSet::from([0, 1]));

        assert!(octree.query_sphere(&Point::new(0f64, 0f64, 0f64), 0f64).is_empty());
        assert!(octree.query_sphere(&Point::new(0f64, 0f64, 0f64), -3f64).is_empty());
    }

    #[test]
    fn test_query_into_appends() {
        let mut octree = Octree::new(cube(10f64));
        octree.insert(4, Point::new(1f64, 1f64, 1f64)).unwrap();
        let mut found = vec![99];
        octree.query_sphere_into(&Point::new(1f64, 1f64, 1f64), 1f64, &mut found);
        assert_eq!(found, vec![99, 4]);
    }

    #[test]
    fn test_coincident_points_stop_at_max_depth() {
        let mut octree = Octree::with_max_depth(cube(8f64), 3);
        let p = Point::new(0.1f64, 0.1f64, 0.1f64);
        for agent in 0..9 {
            assert!(octree.insert_point(SpatialPoint::new(p, agent)));
        }
        assert_eq!(octree.len(), 9);
        assert_eq!(octree.depth(), 3);
        // One split per level on the way down
        assert_eq!(octree.node_count(), 1 + 3 * 8);
        assert_points_inside_their_nodes(&octree);

        let found: HashSet<AgentId> = HashSet::from_iter(octree.query_sphere(&p, 0.01f64));
        assert_eq!(found, HashSet::from_iter(0..9));
    }

    #[test]
    fn test_depth_grows_only_as_needed() {
        // Every point falls into the octant already holding the previous one,
        // so each insertion splits exactly one more level.
        let mut octree = Octree::new(cube(8f64));
        let points = [
            Point::new(0.5f64, 0.5f64, 0.5f64),
            Point::new(1.5f64, 0.5f64, 0.5f64),
            Point::new(0.5f64, 1.5f64, 0.5f64),
        ];
        let expected = [(0usize, 1usize), (1, 9), (2, 17)];
        for (agent, (p, (depth, nodes))) in points.iter().zip(expected).enumerate() {
            octree.insert(agent, *p).unwrap();
            assert_eq!(octree.depth(), depth);
            assert_eq!(octree.node_count(), nodes);
        }
        assert_points_inside_their_nodes(&octree);
    }

    #[test]
    fn test_clear_keeps_boundary() {
        let mut octree = Octree::new(cube(10f64));
        for agent in 0..20 {
            octree
                .insert(agent, Point::new(agent as f64 * 0.4f64 - 4f64, 0f64, 0f64))
                .unwrap();
        }
        assert!(octree.node_count() > 1);

        octree.clear();
        assert!(octree.is_empty());
        assert_eq!(octree.node_count(), 1);
        assert_eq!(octree.boundary(), &cube(10f64));
        assert!(octree.query_sphere(&Point::new(0f64, 0f64, 0f64), 100f64).is_empty());

        octree.insert(7, Point::new(0f64, 0f64, 0f64)).unwrap();
        assert_eq!(octree.query_sphere(&Point::new(0f64, 0f64, 0f64), 1f64), vec![7]);
    }
}
