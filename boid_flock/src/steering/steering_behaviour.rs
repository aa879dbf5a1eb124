use crate::body::physical_body::PhysicalBody;
use crate::{Agent, Vec3f};

use nalgebra::UnitQuaternion;
use rand::RngCore;

/// What a steering behaviour asks the host to do with an agent's body this
/// tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Steering {
    /// Force to add to the body
    pub force: Vec3f,
    /// Velocity to write directly, bypassing integration
    pub velocity: Option<Vec3f>,
    /// New orientation of the body
    pub orientation: Option<UnitQuaternion<f64>>,
}

impl Default for Steering {
    fn default() -> Self {
        Self {
            force: Vec3f::zeros(),
            velocity: None,
            orientation: None,
        }
    }
}

impl Steering {
    pub fn apply_to<B: PhysicalBody + ?Sized>(&self, body: &mut B) {
        if self.force != Vec3f::zeros() {
            body.add_force(self.force);
        }
        if let Some(velocity) = self.velocity {
            body.set_velocity(velocity);
        }
        if let Some(orientation) = self.orientation {
            body.set_orientation(orientation);
        }
    }
}

pub trait SteeringBehaviour {
    /// Steering for `agent` given the agents within its sight radius.
    /// `nearby_agents` may contain `agent` itself.
    fn get_steering(&self, agent: &Agent, nearby_agents: &[Agent]) -> Steering;

    /// Force applied every tick whether or not the agent sees anyone
    fn ambient_force(&self, _agent: &Agent, _rng: &mut dyn RngCore) -> Vec3f {
        Vec3f::zeros()
    }
}
