use crate::body::physical_body::PhysicalBody;
use crate::{Point, Vec3f};

use nalgebra::UnitQuaternion;
use std::time::Duration;

/// Minimal rigid body: a point mass with an orientation and semi-implicit
/// Euler integration. Good enough to drive a flock without a physics engine.
///
/// Local +z is forward and local +y is up.
#[derive(Clone, Debug, PartialEq)]
pub struct PointMassBody {
    pub position: Point,
    pub velocity: Vec3f,
    pub orientation: UnitQuaternion<f64>,
    pub mass: f64,
    accumulated_force: Vec3f,
}

impl PointMassBody {
    pub fn new(position: Point, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            velocity: Vec3f::zeros(),
            orientation,
            mass: 1f64,
            accumulated_force: Vec3f::zeros(),
        }
    }

    pub fn with_velocity(mut self, velocity: Vec3f) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    /// Sum of forces added since the last integration
    pub fn accumulated_force(&self) -> Vec3f {
        self.accumulated_force
    }

    /// Applies the accumulated force over `dt` and moves the body.
    pub fn integrate(&mut self, dt: Duration) {
        let dt = dt.as_secs_f64();
        if self.mass > 0f64 {
            self.velocity += self.accumulated_force * (dt / self.mass);
        }
        self.position += self.velocity * dt;
        self.accumulated_force = Vec3f::zeros();
    }
}

impl PhysicalBody for PointMassBody {
    fn position(&self) -> Point {
        self.position
    }

    fn forward(&self) -> Vec3f {
        self.orientation * Vec3f::z()
    }

    fn up(&self) -> Vec3f {
        self.orientation * Vec3f::y()
    }

    fn velocity(&self) -> Vec3f {
        self.velocity
    }

    fn add_force(&mut self, force: Vec3f) {
        self.accumulated_force += force;
    }

    fn set_velocity(&mut self, velocity: Vec3f) {
        self.velocity = velocity;
    }

    fn set_orientation(&mut self, orientation: UnitQuaternion<f64>) {
        self.orientation = orientation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integration_step() {
        let mut body = PointMassBody::new(Point::new(0f64, 0f64, 0f64), UnitQuaternion::identity())
            .with_mass(2f64);
        body.add_force(Vec3f::new(4f64, 0f64, 0f64));
        body.add_force(Vec3f::new(0f64, 2f64, 0f64));
        assert_eq!(body.accumulated_force(), Vec3f::new(4f64, 2f64, 0f64));

        body.integrate(Duration::from_millis(500));
        assert!((body.velocity - Vec3f::new(1f64, 0.5f64, 0f64)).norm() < 1e-12);
        assert!((body.position - Point::new(0.5f64, 0.25f64, 0f64)).norm() < 1e-12);
        assert_eq!(body.accumulated_force(), Vec3f::zeros());
    }

    #[test]
    fn test_default_axes() {
        let body = PointMassBody::new(Point::new(0f64, 0f64, 0f64), UnitQuaternion::identity());
        assert_eq!(body.forward(), Vec3f::z());
        assert_eq!(body.up(), Vec3f::y());
    }
}
