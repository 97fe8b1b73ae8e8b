//! Errors raised while building or running a road network.
//!
//! Capacity rejections are not errors: a full road or a saturated junction
//! simply leaves the car queued for the next tick.

use crate::simulation_engine::network::NodeId;
use crate::simulation_engine::vehicles::CarId;

/// Errors that can occur while building, loading or simulating a network.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// A second road was requested for an already connected ordered pair.
    #[error("road between nodes {from} and {to} already exists")]
    DuplicateRoad {
        /// Origin of the road.
        from: NodeId,
        /// Target of the road.
        to: NodeId,
    },

    /// The graph description used a node tag other than `locality` or `junction`.
    #[error("unknown type of node: {0:?}")]
    UnknownNodeType(String),

    /// An edge or dependency refers to a node index outside the network.
    #[error("node {0} does not exist")]
    UnknownNode(usize),

    /// A dependency names an approach that has no stoplight.
    #[error("junction {junction} has no stoplight for approach {neighbor}")]
    UnknownStopLight {
        /// The junction declaring the dependency.
        junction: NodeId,
        /// The approach that has no light.
        neighbor: NodeId,
    },

    /// Dependent stoplights cannot be given alternating, non-overlapping phases.
    #[error("junction {junction}: stoplights from {light} and {other} cannot alternate")]
    ConflictingSchedule {
        /// The junction owning both lights.
        junction: NodeId,
        /// Approach of the first light.
        light: NodeId,
        /// Approach of the dependent light.
        other: NodeId,
    },

    /// A retime request would make a light overlap one of its dependency partners.
    #[error("junction {junction}: new timing for stoplight {light} overlaps stoplight {other}")]
    IncompatibleRetime {
        /// The junction owning both lights.
        junction: NodeId,
        /// Approach of the light being retimed.
        light: NodeId,
        /// Approach of the partner that would overlap.
        other: NodeId,
    },

    /// A tracked car ran out of path before reaching its destination.
    #[error("car {car} exhausted its path at node {node} before reaching its destination")]
    PathExhausted {
        /// The car whose path broke.
        car: CarId,
        /// Where the car was when the breach was detected.
        node: NodeId,
    },

    /// The graph or configuration document did not have the expected shape.
    #[error("malformed document: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("plotting failed: {0}")]
    Plot(String),
}

pub type Result<T> = std::result::Result<T, SimulationError>;
