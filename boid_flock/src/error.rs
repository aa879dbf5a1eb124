//! Error types for the flock simulation.
//!
//! Nothing in a tick is fatal. These errors surface bad configuration up
//! front, and let a spatial index tell its caller that an agent escaped the
//! region it tracks.

use std::fmt;

use yaml_rust::ScanError;

use crate::{AgentId, Point, Vec3f};

/// Errors produced while configuring or feeding the flock.
#[derive(Clone, Debug, PartialEq)]
pub enum FlockError {
    /// A bounding volume was given a negative or non-finite half extent.
    InvalidExtent { half_extents: Vec3f },
    /// An agent lies outside the region covered by a spatial index.
    OutOfBounds { agent: AgentId, position: Point },
    /// A configuration value is missing its expected type or range.
    InvalidConfig(String),
    /// The configuration document is not valid YAML.
    Yaml(ScanError),
}

impl fmt::Display for FlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlockError::InvalidExtent { half_extents } => write!(
                f,
                "Half extents must be finite and non-negative, got ({}, {}, {})",
                half_extents.x, half_extents.y, half_extents.z
            ),
            FlockError::OutOfBounds { agent, position } => write!(
                f,
                "Agent {} at ({:.3}, {:.3}, {:.3}) is outside the indexed region",
                agent, position.x, position.y, position.z
            ),
            FlockError::InvalidConfig(msg) => write!(f, "Invalid flock configuration: {}", msg),
            FlockError::Yaml(e) => write!(f, "Failed to parse configuration: {}", e),
        }
    }
}

impl std::error::Error for FlockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FlockError::Yaml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ScanError> for FlockError {
    fn from(e: ScanError) -> Self {
        FlockError::Yaml(e)
    }
}
