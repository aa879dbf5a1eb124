use crate::config::BoidParameters;
use crate::steering::steering_behaviour::{Steering, SteeringBehaviour};
use crate::{Agent, Vec3f};

use nalgebra::UnitQuaternion;
use rand::{Rng, RngCore};

/// Chance per tick that an agent gives itself an upward push. Without it the
/// flock slowly flattens into a single horizontal sheet.
pub const CLIMB_PROBABILITY: f64 = 0.3;

/// Separation distances are clamped to at least this, so two agents sitting
/// on top of each other cannot produce an infinite push.
pub const MIN_SEPARATION_DISTANCE: f64 = 1e-6;

const PARALLEL_EPSILON: f64 = 1e-12;

/// The three flocking rules evaluated for one agent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RuleForces {
    /// Flockmates considered, the agent itself excluded
    pub neighbours: usize,
    pub alignment: Vec3f,
    pub cohesion: Vec3f,
    pub separation: Vec3f,
}

impl RuleForces {
    pub fn total(&self) -> Vec3f {
        self.alignment + self.cohesion + self.separation
    }
}

/// Classic boids steering: match the heading of nearby flockmates, move
/// toward their centre and keep away from the ones that are too close. On top
/// of that the agent regulates its speed, never exceeds its maximum speed and
/// turns to face where it is going.
pub struct FlockingBehaviour {
    params: BoidParameters,
}

impl FlockingBehaviour {
    pub fn new(params: BoidParameters) -> Self {
        Self { params }
    }

    pub fn parameters(&self) -> &BoidParameters {
        &self.params
    }

    /// Alignment, cohesion and separation for `agent`.
    ///
    /// Entries of `nearby_agents` sharing the agent's id are skipped. Any
    /// remaining flockmate, even a single one, contributes to all three
    /// rules.
    pub fn rule_forces(&self, agent: &Agent, nearby_agents: &[Agent]) -> RuleForces {
        let mut neighbours = 0usize;
        let mut position_sum = Vec3f::zeros();
        let mut heading_sum = Vec3f::zeros();
        let mut separation_sum = Vec3f::zeros();

        for other in nearby_agents.iter().filter(|other| other.agent_id != agent.agent_id) {
            neighbours += 1;
            position_sum += other.position;
            heading_sum += other.forward;

            // Unit vector away from the other agent, weighted by 1 / distance.
            // Only exactly coincident agents have no direction to push along.
            let away = agent.position - other.position;
            let distance = away.norm().max(MIN_SEPARATION_DISTANCE);
            if let Some(direction) = away.try_normalize(0f64) {
                separation_sum += direction / distance;
            }
        }

        if neighbours == 0 {
            return RuleForces {
                neighbours,
                alignment: Vec3f::zeros(),
                cohesion: Vec3f::zeros(),
                separation: Vec3f::zeros(),
            };
        }

        let count = neighbours as f64;
        let average_position = position_sum / count;
        let average_heading = heading_sum / count;
        let steering = self.params.steering_strength;

        RuleForces {
            neighbours,
            alignment: average_heading * steering * self.params.alignment_priority,
            cohesion: (average_position - agent.position) * steering * self.params.cohesion_priority,
            // Summed rather than averaged: a crowd pushes harder than one
            // close neighbour.
            separation: separation_sum * steering * self.params.separation_priority,
        }
    }

    /// Accelerate along the heading below the desired speed, brake at half
    /// strength otherwise.
    pub fn speed_regulation(&self, agent: &Agent) -> Vec3f {
        if agent.velocity.norm() < self.params.desired_speed {
            agent.forward * self.params.acceleration_strength
        } else {
            agent.forward * (-self.params.acceleration_strength / 2f64)
        }
    }

    /// Velocity rescaled to `max_speed` if it is faster than that. A
    /// non-positive `max_speed` stops the agent.
    pub fn clamp_velocity(&self, velocity: &Vec3f) -> Option<Vec3f> {
        let speed = velocity.norm();
        let max_speed = self.params.max_speed.max(0f64);
        if speed > max_speed {
            Some(velocity * (max_speed / speed))
        } else {
            None
        }
    }
}

/// Rotation whose forward (+z) axis points along `direction`, rolled so that
/// its up (+y) axis leans towards `up`. Falls back to world up, then world x,
/// when `up` is parallel to the direction.
pub fn look_rotation(direction: &Vec3f, up: &Vec3f) -> Option<UnitQuaternion<f64>> {
    if direction.norm_squared() == 0f64 {
        return None;
    }
    let reference = [*up, Vec3f::y(), Vec3f::x()]
        .into_iter()
        .find(|candidate| direction.cross(candidate).norm_squared() > PARALLEL_EPSILON * direction.norm_squared())?;
    Some(UnitQuaternion::face_towards(direction, &reference))
}

impl SteeringBehaviour for FlockingBehaviour {
    fn get_steering(&self, agent: &Agent, nearby_agents: &[Agent]) -> Steering {
        let rules = self.rule_forces(agent, nearby_agents);
        let force = rules.total() + self.speed_regulation(agent);

        let velocity = self.clamp_velocity(&agent.velocity);
        let heading = velocity.unwrap_or(agent.velocity);
        let orientation = look_rotation(&heading, &agent.up);

        Steering {
            force,
            velocity,
            orientation,
        }
    }

    /// Random climb so the flock keeps some height to it
    fn ambient_force(&self, _agent: &Agent, rng: &mut dyn RngCore) -> Vec3f {
        if rng.gen::<f64>() < CLIMB_PROBABILITY {
            Vec3f::y() * self.params.acceleration_strength
        } else {
            Vec3f::zeros()
        }
    }
}
