use crate::{Point, Vec3f};

use nalgebra::UnitQuaternion;

/// The part of an agent's physical state the flock reads and writes.
///
/// Bodies belong to the host. The flock never integrates; it adds forces,
/// occasionally overwrites the velocity and turns the body, and the host's
/// physics step does the rest.
pub trait PhysicalBody {
    fn position(&self) -> Point;

    /// Unit vector the body is facing
    fn forward(&self) -> Vec3f;

    /// Unit vector pointing out of the top of the body
    fn up(&self) -> Vec3f;

    fn velocity(&self) -> Vec3f;

    /// Accumulate a force to be applied on the next physics step
    fn add_force(&mut self, force: Vec3f);

    fn set_velocity(&mut self, velocity: Vec3f);

    fn set_orientation(&mut self, orientation: UnitQuaternion<f64>);
}
