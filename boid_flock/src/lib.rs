use std::sync::Arc;
pub extern crate nalgebra as na;
use log::debug;
use na::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub mod body;
pub mod config;
pub mod error;
pub mod spatial_index;
pub mod steering;

pub use crate::body::physical_body::PhysicalBody;
pub use crate::body::point_mass::PointMassBody;
pub use crate::config::{BoidParameters, FlockConfig, NeighbourLookup};
pub use crate::error::FlockError;
pub use crate::spatial_index::cuboid::Cuboid;
pub use crate::spatial_index::linear_scan::LinearScan;
pub use crate::spatial_index::location_hash_3d::LocationHash3D;
pub use crate::spatial_index::octree::{Octree, SpatialPoint};
pub use crate::spatial_index::spatial_index::SpatialIndex;
pub use crate::steering::flocking::FlockingBehaviour;
pub use crate::steering::no_steering::NoSteering;
pub use crate::steering::steering_behaviour::{Steering, SteeringBehaviour};

/// Agent  ID
pub type AgentId = usize;

/// Point
pub type Point = Vector3<f64>;

/// 3-vector
pub type Vec3f = Vector3<f64>;

/// Snapshot of an individual agent, taken from its body at the start of a tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Agent {
    /// Unique Agent ID
    pub agent_id: AgentId,
    /// Position of a point
    pub position: Point,
    /// Direction the agent is facing
    pub forward: Vec3f,
    /// Roll reference of the agent
    pub up: Vec3f,
    /// Velocity of agent
    pub velocity: Vec3f,
}

impl Agent {
    pub fn from_body<B: PhysicalBody + ?Sized>(agent_id: AgentId, body: &B) -> Self {
        Self {
            agent_id,
            position: body.position(),
            forward: body.forward(),
            up: body.up(),
            velocity: body.velocity(),
        }
    }
}

/// Summary of one call to [`FlockCoordinator::step`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Agents in the flock
    pub agents: usize,
    /// Agents the spatial index accepted
    pub indexed: usize,
    /// Agents outside the region covered by the spatial index
    pub out_of_bounds: usize,
    /// Agents that were pushed back towards the containment box
    pub contained: usize,
    /// Agents whose steering behaviour ran
    pub steered: usize,
    /// Sum of neighbour set sizes, the agents themselves included
    pub neighbour_pairs: usize,
}

/// Drives a flock, one tick at a time.
///
/// The coordinator borrows nothing from the host between ticks: it owns the
/// bodies and hands them back through [`FlockCoordinator::bodies_mut`] so the
/// host can integrate them. Each tick rebuilds the spatial index from scratch,
/// so neighbour sets never go stale.
pub struct FlockCoordinator<B: PhysicalBody> {
    /// Bodies of all agents. An agent's id is its index here.
    bodies: Vec<B>,
    /// Steering strategy for each agent
    behaviours: Vec<Arc<dyn SteeringBehaviour>>,
    /// Spatial Index. Rebuilt every tick
    spatial_index: Box<dyn SpatialIndex>,
    /// Box the boundary forces keep the flock in
    containment: Cuboid,
    config: FlockConfig,
    rng: StdRng,
    /// Agent snapshots of the current tick
    snapshot: Vec<Agent>,
    /// Neighbours of the agent being steered
    neighbour_buffer: Vec<Agent>,
    tick: u64,
}

impl<B: PhysicalBody> FlockCoordinator<B> {
    /// Create a new, empty flock
    pub fn new(config: FlockConfig) -> Result<Self, FlockError> {
        config.validate()?;
        let spatial_index = config.build_spatial_index()?;
        let containment = config.containment_box()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            bodies: vec![],
            behaviours: vec![],
            spatial_index,
            containment,
            config,
            rng,
            snapshot: vec![],
            neighbour_buffer: vec![],
            tick: 0,
        })
    }

    /// Replace the configured spatial index with a custom one. The index is
    /// cleared before every use.
    pub fn with_spatial_index(mut self, spatial_index: Box<dyn SpatialIndex>) -> Self {
        self.spatial_index = spatial_index;
        self
    }

    pub fn add_agent(&mut self, body: B, behaviour: Arc<dyn SteeringBehaviour>) -> AgentId {
        let agent_id = self.bodies.len();
        self.bodies.push(body);
        self.behaviours.push(behaviour);
        agent_id
    }

    pub fn add_agents(
        &mut self,
        bodies: impl IntoIterator<Item = B>,
        behaviour: Arc<dyn SteeringBehaviour>,
    ) -> Vec<AgentId> {
        bodies
            .into_iter()
            .map(|body| self.add_agent(body, behaviour.clone()))
            .collect()
    }

    pub fn bodies(&self) -> &[B] {
        &self.bodies
    }

    /// Mutable access for the host's physics step. Agents cannot be added or
    /// removed through this.
    pub fn bodies_mut(&mut self) -> &mut [B] {
        &mut self.bodies
    }

    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    pub fn spatial_index(&self) -> &dyn SpatialIndex {
        self.spatial_index.as_ref()
    }

    /// Ticks completed so far
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Clears the spatial index and inserts every agent at its current
    /// position. Returns how many agents fell outside the index.
    pub fn rebuild_index(&mut self) -> usize {
        self.spatial_index.clear();
        let mut out_of_bounds = 0;
        for (agent_id, body) in self.bodies.iter().enumerate() {
            if let Err(error) = self.spatial_index.insert(agent_id, body.position()) {
                debug!("{}", error);
                out_of_bounds += 1;
            }
        }
        out_of_bounds
    }

    /// Ids of all indexed agents within sight of `agent`, the agent itself
    /// included. Reflects the index as of the last rebuild.
    pub fn neighbours_of(&self, agent: AgentId) -> Vec<AgentId> {
        match self.bodies.get(agent) {
            Some(body) => self
                .spatial_index
                .get_neighbours_in_radius(self.config.sight_radius, body.position()),
            None => vec![],
        }
    }

    /// Force pushing an agent at `position` back into the containment box.
    /// Zero on every axis along which the agent is inside.
    pub fn boundary_force(&self, position: &Point) -> Vec3f {
        let min = self.containment.min();
        let max = self.containment.max();
        let correction = |axis: usize| {
            if position[axis] < min[axis] {
                min[axis] - position[axis]
            } else if position[axis] > max[axis] {
                max[axis] - position[axis]
            } else {
                0f64
            }
        };

        Vec3f::new(
            correction(0) * self.config.horizontal_bounds_force,
            correction(1) * self.config.vertical_bounds_force,
            correction(2) * self.config.horizontal_bounds_force,
        )
    }

    /// Runs one tick: rebuild the index, then for every agent apply the
    /// boundary force, its behaviour's ambient force and, if anyone is in
    /// sight, its steering. Integration is left to the host.
    pub fn step(&mut self) -> TickReport {
        let mut report = TickReport {
            agents: self.bodies.len(),
            ..Default::default()
        };

        self.snapshot.clear();
        self.snapshot.extend(
            self.bodies
                .iter()
                .enumerate()
                .map(|(agent_id, body)| Agent::from_body(agent_id, body)),
        );

        report.out_of_bounds = self.rebuild_index();
        report.indexed = self.spatial_index.len();

        for agent_id in 0..self.bodies.len() {
            let agent = self.snapshot[agent_id];

            let boundary_force = self.boundary_force(&agent.position);
            if boundary_force != Vec3f::zeros() {
                self.bodies[agent_id].add_force(boundary_force);
                report.contained += 1;
            }

            let behaviour = &self.behaviours[agent_id];
            let ambient_force = behaviour.ambient_force(&agent, &mut self.rng);
            if ambient_force != Vec3f::zeros() {
                self.bodies[agent_id].add_force(ambient_force);
            }

            let neighbour_ids = self
                .spatial_index
                .get_neighbours_in_radius(self.config.sight_radius, agent.position);
            if neighbour_ids.is_empty() {
                continue;
            }
            report.neighbour_pairs += neighbour_ids.len();

            self.neighbour_buffer.clear();
            self.neighbour_buffer.extend(
                neighbour_ids
                    .iter()
                    .filter_map(|neighbour_id| self.snapshot.get(*neighbour_id).copied()),
            );

            let steering = behaviour.get_steering(&agent, &self.neighbour_buffer);
            steering.apply_to(&mut self.bodies[agent_id]);
            report.steered += 1;
        }

        self.tick += 1;
        debug!(
            "tick {}: {} agents, {} indexed, {} outside the index, {} pushed back, {} steered, {:.2} neighbours on average",
            self.tick,
            report.agents,
            report.indexed,
            report.out_of_bounds,
            report.contained,
            report.steered,
            report.neighbour_pairs as f64 / report.agents.max(1) as f64
        );
        report
    }
}
