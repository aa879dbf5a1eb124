//! Flock configuration.
//!
//! Configuration lives in a YAML document. Every key is optional; anything
//! left out keeps its [`Default`] value.
//!
//! ```yaml
//! flock:
//!   population: 200
//!   sight_radius: 5.0
//!   lookup: octree        # octree | brute_force | location_hash
//!   seed: 7
//! bounds:
//!   centre: [0.0, 15.0, 0.0]
//!   half_extents: [30.0, 15.0, 30.0]
//!   horizontal_force: 1.0
//!   vertical_force: 2.0
//! index:
//!   margin: 1.5
//!   octree_max_depth: 16
//!   grid_cell_size: 5.0
//! boid:
//!   desired_speed: 8.0
//!   max_speed: 12.0
//!   acceleration_strength: 4.0
//!   steering_strength: 1.0
//!   alignment_priority: 1.0
//!   cohesion_priority: 0.5
//!   separation_priority: 2.0
//! ```

use std::fmt;
use std::str::FromStr;

use log::warn;
use yaml_rust::{Yaml, YamlLoader};

use crate::error::FlockError;
use crate::spatial_index::cuboid::Cuboid;
use crate::spatial_index::linear_scan::LinearScan;
use crate::spatial_index::location_hash_3d::LocationHash3D;
use crate::spatial_index::octree::{Octree, DEFAULT_MAX_DEPTH};
use crate::spatial_index::spatial_index::SpatialIndex;
use crate::{Point, Vec3f};

/// Per agent tuning of the flocking behaviour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoidParameters {
    /// Cruising speed the agent accelerates towards
    pub desired_speed: f64,
    /// Hard cap on the agent's speed
    pub max_speed: f64,
    /// Strength of the speed regulation and climbing forces
    pub acceleration_strength: f64,
    /// Common scale of the three flocking rules
    pub steering_strength: f64,
    pub alignment_priority: f64,
    pub cohesion_priority: f64,
    pub separation_priority: f64,
}

impl Default for BoidParameters {
    fn default() -> Self {
        Self {
            desired_speed: 8.0,
            max_speed: 12.0,
            acceleration_strength: 4.0,
            steering_strength: 1.0,
            alignment_priority: 1.0,
            cohesion_priority: 0.5,
            separation_priority: 2.0,
        }
    }
}

/// Which spatial index answers the per-agent neighbour queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NeighbourLookup {
    #[default]
    Octree,
    /// Check every agent against every other agent
    BruteForce,
    /// Uniform grid broad phase
    LocationHash,
}

impl FromStr for NeighbourLookup {
    type Err = FlockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "octree" => Ok(NeighbourLookup::Octree),
            "brute_force" | "linear" => Ok(NeighbourLookup::BruteForce),
            "location_hash" | "grid" => Ok(NeighbourLookup::LocationHash),
            other => Err(FlockError::InvalidConfig(format!(
                "unknown neighbour lookup `{}`, expected octree, brute_force or location_hash",
                other
            ))),
        }
    }
}

impl fmt::Display for NeighbourLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NeighbourLookup::Octree => "octree",
            NeighbourLookup::BruteForce => "brute_force",
            NeighbourLookup::LocationHash => "location_hash",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FlockConfig {
    /// Number of agents the host should spawn
    pub population: usize,
    /// How far each agent can see its flockmates
    pub sight_radius: f64,
    /// Centre of the box agents are pushed back into
    pub bounds_centre: Point,
    /// Half extents of the box agents are pushed back into
    pub bounds_half_extents: Vec3f,
    /// Boundary force scale along x and z
    pub horizontal_bounds_force: f64,
    /// Boundary force scale along y
    pub vertical_bounds_force: f64,
    pub neighbour_lookup: NeighbourLookup,
    /// The spatial index covers the containment box grown by this factor, so
    /// agents that overshoot the box are still indexed.
    pub index_margin: f64,
    pub octree_max_depth: usize,
    /// Cell edge of the location hash grid
    pub grid_cell_size: f64,
    /// Seed of the random source; `None` draws one from the OS
    pub seed: Option<u64>,
    pub boid: BoidParameters,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            population: 200,
            sight_radius: 5.0,
            bounds_centre: Point::new(0.0, 15.0, 0.0),
            bounds_half_extents: Vec3f::new(30.0, 15.0, 30.0),
            horizontal_bounds_force: 1.0,
            vertical_bounds_force: 2.0,
            neighbour_lookup: NeighbourLookup::Octree,
            index_margin: 1.5,
            octree_max_depth: DEFAULT_MAX_DEPTH,
            grid_cell_size: 5.0,
            seed: None,
            boid: BoidParameters::default(),
        }
    }
}

impl FlockConfig {
    /// Parse a configuration document. See the module docs for the layout.
    pub fn from_yaml(yaml_str: &str) -> Result<Self, FlockError> {
        let docs = YamlLoader::load_from_str(yaml_str)?;
        let mut config = FlockConfig::default();
        let Some(doc) = docs.first() else {
            return Ok(config);
        };

        let flock = &doc["flock"];
        read_usize(flock, "population", &mut config.population)?;
        read_f64(flock, "sight_radius", &mut config.sight_radius)?;
        if let Some(lookup) = read_str(flock, "lookup")? {
            config.neighbour_lookup = lookup.parse()?;
        }
        match &flock["seed"] {
            Yaml::BadValue | Yaml::Null => {}
            Yaml::Integer(seed) if *seed >= 0 => config.seed = Some(*seed as u64),
            other => return Err(type_error("flock.seed", "a non-negative integer", other)),
        }

        let bounds = &doc["bounds"];
        read_vec3(bounds, "centre", &mut config.bounds_centre)?;
        read_vec3(bounds, "half_extents", &mut config.bounds_half_extents)?;
        read_f64(bounds, "horizontal_force", &mut config.horizontal_bounds_force)?;
        read_f64(bounds, "vertical_force", &mut config.vertical_bounds_force)?;

        let index = &doc["index"];
        read_f64(index, "margin", &mut config.index_margin)?;
        read_usize(index, "octree_max_depth", &mut config.octree_max_depth)?;
        read_f64(index, "grid_cell_size", &mut config.grid_cell_size)?;

        let boid = &doc["boid"];
        let params = &mut config.boid;
        read_f64(boid, "desired_speed", &mut params.desired_speed)?;
        read_f64(boid, "max_speed", &mut params.max_speed)?;
        read_f64(boid, "acceleration_strength", &mut params.acceleration_strength)?;
        read_f64(boid, "steering_strength", &mut params.steering_strength)?;
        read_f64(boid, "alignment_priority", &mut params.alignment_priority)?;
        read_f64(boid, "cohesion_priority", &mut params.cohesion_priority)?;
        read_f64(boid, "separation_priority", &mut params.separation_priority)?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FlockError> {
        if !(self.sight_radius.is_finite() && self.sight_radius > 0.0) {
            return Err(FlockError::InvalidConfig(format!(
                "sight radius must be positive, got {}",
                self.sight_radius
            )));
        }
        if !(self.index_margin.is_finite() && self.index_margin > 0.0) {
            return Err(FlockError::InvalidConfig(format!(
                "index margin must be positive, got {}",
                self.index_margin
            )));
        }
        if !(self.grid_cell_size.is_finite() && self.grid_cell_size > 0.0) {
            return Err(FlockError::InvalidConfig(format!(
                "grid cell size must be positive, got {}",
                self.grid_cell_size
            )));
        }
        self.containment_box()?;
        self.index_boundary()?;

        if self.index_margin < 1.0 {
            warn!(
                "index margin {} is smaller than the containment box; agents near the walls will not be indexed",
                self.index_margin
            );
        }
        if !(self.boid.max_speed > 0.0) {
            warn!(
                "max speed {} is not positive; every moving agent will be stopped",
                self.boid.max_speed
            );
        } else if self.boid.max_speed < self.boid.desired_speed {
            warn!(
                "max speed {} is below desired speed {}; agents will never cruise",
                self.boid.max_speed, self.boid.desired_speed
            );
        }
        Ok(())
    }

    /// Box the boundary forces keep the flock in
    pub fn containment_box(&self) -> Result<Cuboid, FlockError> {
        Cuboid::from_half_extents(self.bounds_centre, self.bounds_half_extents)
    }

    /// Region covered by the spatial index
    pub fn index_boundary(&self) -> Result<Cuboid, FlockError> {
        self.containment_box()?.scaled(self.index_margin)
    }

    /// Fresh, empty spatial index of the configured kind
    pub fn build_spatial_index(&self) -> Result<Box<dyn SpatialIndex>, FlockError> {
        let boundary = self.index_boundary()?;
        let index: Box<dyn SpatialIndex> = match self.neighbour_lookup {
            NeighbourLookup::Octree => {
                Box::new(Octree::with_max_depth(boundary, self.octree_max_depth))
            }
            NeighbourLookup::BruteForce => Box::new(LinearScan::new()),
            NeighbourLookup::LocationHash => {
                Box::new(LocationHash3D::from_boundary(&boundary, self.grid_cell_size)?)
            }
        };
        Ok(index)
    }
}

fn type_error(key: &str, expected: &str, found: &Yaml) -> FlockError {
    FlockError::InvalidConfig(format!("`{}` must be {}, found {:?}", key, expected, found))
}

fn as_number(value: &Yaml) -> Option<f64> {
    match value {
        Yaml::Real(_) => value.as_f64(),
        Yaml::Integer(i) => Some(*i as f64),
        _ => None,
    }
}

fn read_f64(node: &Yaml, key: &str, target: &mut f64) -> Result<(), FlockError> {
    let value = &node[key];
    if let Yaml::BadValue = value {
        return Ok(());
    }
    *target = as_number(value).ok_or_else(|| type_error(key, "a number", value))?;
    Ok(())
}

fn read_usize(node: &Yaml, key: &str, target: &mut usize) -> Result<(), FlockError> {
    match &node[key] {
        Yaml::BadValue => Ok(()),
        Yaml::Integer(i) if *i >= 0 => {
            *target = *i as usize;
            Ok(())
        }
        other => Err(type_error(key, "a non-negative integer", other)),
    }
}

fn read_str<'a>(node: &'a Yaml, key: &str) -> Result<Option<&'a str>, FlockError> {
    match &node[key] {
        Yaml::BadValue => Ok(None),
        Yaml::String(s) => Ok(Some(s.as_str())),
        other => Err(type_error(key, "a string", other)),
    }
}

fn read_vec3(node: &Yaml, key: &str, target: &mut Vec3f) -> Result<(), FlockError> {
    let value = &node[key];
    if let Yaml::BadValue = value {
        return Ok(());
    }
    let components = value
        .as_vec()
        .filter(|items| items.len() == 3)
        .ok_or_else(|| type_error(key, "a list of three numbers", value))?;
    for (axis, component) in components.iter().enumerate() {
        target[axis] = as_number(component).ok_or_else(|| type_error(key, "a list of three numbers", value))?;
    }
    Ok(())
}
