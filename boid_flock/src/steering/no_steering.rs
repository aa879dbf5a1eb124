use crate::steering::steering_behaviour::{Steering, SteeringBehaviour};
use crate::Agent;

/// Leaves every agent to the host's physics; only boundary forces act.
pub struct NoSteering {}

impl SteeringBehaviour for NoSteering {
    fn get_steering(&self, _agent: &Agent, _nearby_agents: &[Agent]) -> Steering {
        Steering::default()
    }
}
