use std::collections::BTreeMap;

use crate::simulation_engine::junction::Junction;
use crate::simulation_engine::network::{EdgeId, NodeId};

/// A settlement that emits trips and attracts visitors.
#[derive(Debug, Clone, PartialEq)]
pub struct Locality {
    pub population: f64,
    /// Propensity of residents to start trips.
    pub emigration_factor: f64,
    /// Relative attractiveness as a destination; a sampling weight.
    pub popularity_factor: f64,
}

impl Locality {
    pub fn new(population: f64, emigration_factor: f64, popularity_factor: f64) -> Self {
        Self {
            population,
            emigration_factor,
            popularity_factor,
        }
    }
}

/// The two kinds of node in the network.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Locality(Locality),
    Junction(Junction),
}

/// A network node (node arena entry).
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    /// Outgoing roads keyed by target node, at most one per target.
    pub output_roads: BTreeMap<NodeId, EdgeId>,
    /// Nodes with a road leading here, in road creation order.
    pub input_nodes: Vec<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            output_roads: BTreeMap::new(),
            input_nodes: Vec::new(),
            kind,
        }
    }

    pub fn as_locality(&self) -> Option<&Locality> {
        match &self.kind {
            NodeKind::Locality(locality) => Some(locality),
            NodeKind::Junction(_) => None,
        }
    }

    pub fn as_junction(&self) -> Option<&Junction> {
        match &self.kind {
            NodeKind::Junction(junction) => Some(junction),
            NodeKind::Locality(_) => None,
        }
    }

    pub fn as_junction_mut(&mut self) -> Option<&mut Junction> {
        match &mut self.kind {
            NodeKind::Junction(junction) => Some(junction),
            NodeKind::Locality(_) => None,
        }
    }

    pub fn is_junction(&self) -> bool {
        matches!(self.kind, NodeKind::Junction(_))
    }
}
