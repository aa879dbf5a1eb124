use crate::error::FlockError;
use crate::{Point, Vec3f};

/// Axis aligned box described by its centre and half extents.
///
/// Containment is closed on the minimum face and open on the maximum face, so
/// the eight octants of a box never claim the same point twice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cuboid {
    centre: Point,
    half_width: f64,
    half_height: f64,
    half_depth: f64,
}

impl Cuboid {
    /// Creates a new Cuboid
    /// # Arguments
    /// * `centre` - Centre of the box
    /// * `half_width` - Half of the extent along x
    /// * `half_height` - Half of the extent along y
    /// * `half_depth` - Half of the extent along z
    pub fn new(
        centre: Point,
        half_width: f64,
        half_height: f64,
        half_depth: f64,
    ) -> Result<Self, FlockError> {
        let half_extents = Vec3f::new(half_width, half_height, half_depth);
        if half_extents.iter().any(|half| !half.is_finite() || *half < 0f64)
            || centre.iter().any(|c| !c.is_finite())
        {
            return Err(FlockError::InvalidExtent { half_extents });
        }

        Ok(Self {
            centre,
            half_width,
            half_height,
            half_depth,
        })
    }

    pub fn from_half_extents(centre: Point, half_extents: Vec3f) -> Result<Self, FlockError> {
        Self::new(centre, half_extents.x, half_extents.y, half_extents.z)
    }

    pub fn centre(&self) -> &Point {
        &self.centre
    }

    pub fn half_extents(&self) -> Vec3f {
        Vec3f::new(self.half_width, self.half_height, self.half_depth)
    }

    /// Corner with the smallest coordinates (inclusive)
    pub fn min(&self) -> Point {
        self.centre - self.half_extents()
    }

    /// Corner with the largest coordinates (exclusive)
    pub fn max(&self) -> Point {
        self.centre + self.half_extents()
    }

    pub fn volume(&self) -> f64 {
        8f64 * self.half_width * self.half_height * self.half_depth
    }

    /// Same centre, every half extent multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Result<Self, FlockError> {
        Self::from_half_extents(self.centre, self.half_extents() * factor)
    }

    /// Checks if a point lies inside this box
    pub fn contains(&self, point: &Point) -> bool {
        let min = self.min();
        let max = self.max();
        (0..3).all(|axis| point[axis] >= min[axis] && point[axis] < max[axis])
    }

    /// Checks if a sphere overlaps this box.
    ///
    /// The sphere centre is clamped onto the box to find the closest point; a
    /// sphere that only touches the box (distance equal to the radius) does
    /// not count.
    pub fn intersects_sphere(&self, sphere_centre: &Point, radius: f64) -> bool {
        let min = self.min();
        let max = self.max();
        let mut distance_squared = 0f64;
        for axis in 0..3 {
            let closest = min[axis].max(sphere_centre[axis].min(max[axis]));
            let delta = closest - sphere_centre[axis];
            distance_squared += delta * delta;
        }
        distance_squared < radius * radius
    }

    /// Splits the box into its eight octants.
    ///
    /// Octant `i` lies on the positive side of x when bit 0 of `i` is set, of
    /// y when bit 1 is set and of z when bit 2 is set.
    pub fn octants(&self) -> [Cuboid; 8] {
        let half = self.half_extents() / 2f64;
        std::array::from_fn(|i| {
            let sign = |bit: usize| if (i >> bit) & 1 == 1 { 1f64 } else { -1f64 };
            let offset = Vec3f::new(sign(0) * half.x, sign(1) * half.y, sign(2) * half.z);
            Cuboid {
                centre: self.centre + offset,
                half_width: half.x,
                half_height: half.y,
                half_depth: half.z,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn unit_box() -> Cuboid {
        Cuboid::new(Point::new(0f64, 0f64, 0f64), 1f64, 1f64, 1f64).unwrap()
    }

    #[test]
    fn test_rejects_negative_extent() {
        let res = Cuboid::new(Point::new(0f64, 0f64, 0f64), 1f64, -1f64, 1f64);
        assert_eq!(
            res,
            Err(FlockError::InvalidExtent {
                half_extents: Vec3f::new(1f64, -1f64, 1f64)
            })
        );
        assert!(Cuboid::new(Point::new(0f64, 0f64, 0f64), f64::NAN, 1f64, 1f64).is_err());
    }

    #[test]
    fn test_contains_is_half_open() {
        let cuboid = unit_box();
        assert!(cuboid.contains(&Point::new(0f64, 0f64, 0f64)));
        assert!(cuboid.contains(&Point::new(-1f64, -1f64, -1f64)));
        assert!(!cuboid.contains(&Point::new(1f64, 0f64, 0f64)));
        assert!(!cuboid.contains(&Point::new(0f64, 1f64, 0f64)));
        assert!(!cuboid.contains(&Point::new(0f64, 0f64, 1f64)));
        assert!(!cuboid.contains(&Point::new(0f64, 0f64, -1.0001f64)));
    }

    #[test]
    fn test_zero_extent_contains_nothing() {
        let flat = Cuboid::new(Point::new(0f64, 0f64, 0f64), 0f64, 1f64, 1f64).unwrap();
        assert!(!flat.contains(&Point::new(0f64, 0f64, 0f64)));
    }

    #[test]
    fn test_sphere_intersection() {
        let cuboid = unit_box();
        // Centre inside the box
        assert!(cuboid.intersects_sphere(&Point::new(0.5f64, 0f64, 0f64), 0.01f64));
        // Overlapping a face
        assert!(cuboid.intersects_sphere(&Point::new(2f64, 0f64, 0f64), 1.5f64));
        // Exactly tangent to a face is not an intersection
        assert!(!cuboid.intersects_sphere(&Point::new(2f64, 0f64, 0f64), 1f64));
        // Near a corner but outside the rounded region
        assert!(!cuboid.intersects_sphere(&Point::new(2f64, 2f64, 2f64), 1.7f64));
        assert!(cuboid.intersects_sphere(&Point::new(2f64, 2f64, 2f64), 1.75f64));
    }

    #[test]
    fn test_sphere_intersection_symmetric_under_reflection() {
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..500 {
            let centre = Point::new(
                rng.gen_range(-10f64..10f64),
                rng.gen_range(-10f64..10f64),
                rng.gen_range(-10f64..10f64),
            );
            let half = Vec3f::new(
                rng.gen_range(0f64..5f64),
                rng.gen_range(0f64..5f64),
                rng.gen_range(0f64..5f64),
            );
            let sphere = Point::new(
                rng.gen_range(-20f64..20f64),
                rng.gen_range(-20f64..20f64),
                rng.gen_range(-20f64..20f64),
            );
            let radius = rng.gen_range(0f64..10f64);
            let cuboid = Cuboid::from_half_extents(centre, half).unwrap();
            let expected = cuboid.intersects_sphere(&sphere, radius);

            for axis in 0..3 {
                let mut reflected_centre = centre;
                reflected_centre[axis] = -reflected_centre[axis];
                let mut reflected_sphere = sphere;
                reflected_sphere[axis] = -reflected_sphere[axis];
                let reflected = Cuboid::from_half_extents(reflected_centre, half).unwrap();
                assert_eq!(reflected.intersects_sphere(&reflected_sphere, radius), expected);
            }
        }
    }

    #[test]
    fn test_octants_partition_parent() {
        let parent = Cuboid::new(Point::new(1f64, -2f64, 4f64), 4f64, 2f64, 8f64).unwrap();
        let octants = parent.octants();

        for child in &octants {
            assert_eq!(child.half_extents(), parent.half_extents() / 2f64);
        }

        // Every sign combination shows up exactly once
        let mut seen = [false; 8];
        for child in &octants {
            let offset = child.centre() - parent.centre();
            let index = (offset.x > 0f64) as usize
                | ((offset.y > 0f64) as usize) << 1
                | ((offset.z > 0f64) as usize) << 2;
            assert!(!seen[index]);
            seen[index] = true;
        }

        let total_volume: f64 = octants.iter().map(|child| child.volume()).sum();
        assert_eq!(total_volume, parent.volume());

        // No overlaps: interiors of distinct octants are disjoint
        for (i, a) in octants.iter().enumerate() {
            for b in octants.iter().skip(i + 1) {
                let overlaps = (0..3).all(|axis| a.min()[axis] < b.max()[axis] && b.min()[axis] < a.max()[axis]);
                assert!(!overlaps);
            }
        }

        // No gaps: any point of the parent belongs to exactly one octant
        let min = parent.min();
        let size = parent.max() - min;
        for i in 0..=8 {
            for j in 0..=8 {
                for k in 0..=8 {
                    let p = min
                        + Vec3f::new(
                            size.x * i as f64 / 8f64,
                            size.y * j as f64 / 8f64,
                            size.z * k as f64 / 8f64,
                        );
                    let owners = octants.iter().filter(|child| child.contains(&p)).count();
                    let expected = if parent.contains(&p) { 1 } else { 0 };
                    assert_eq!(owners, expected);
                }
            }
        }
    }
}
