//! Arena of nodes and roads addressed by stable integer indices.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};
use crate::simulation_engine::edge::Edge;
use crate::simulation_engine::node::{Locality, Node, NodeKind};

/// Index of a node in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

/// Index of a road in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owns every node and road for the lifetime of a simulation.
#[derive(Debug, Clone, Default)]
pub struct RoadNetwork {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    endpoints: Vec<(NodeId, NodeId)>,
}

impl RoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node and returns its index.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id, kind));
        id
    }

    /// Creates the road `from -> to` and registers the reverse adjacency.
    /// At most one road may exist per ordered pair.
    pub fn build_road(
        &mut self,
        from: NodeId,
        to: NodeId,
        speed_limit: f64,
        length: f64,
        width: f64,
    ) -> Result<EdgeId> {
        self.check_node(from)?;
        self.check_node(to)?;

        if self.nodes[from.0].output_roads.contains_key(&to) {
            return Err(SimulationError::DuplicateRoad { from, to });
        }

        let id = EdgeId(self.edges.len());
        self.edges.push(Edge::new(speed_limit, length, width));
        self.endpoints.push((from, to));
        self.nodes[from.0].output_roads.insert(to, id);
        self.nodes[to.0].input_nodes.push(from);
        Ok(id)
    }

    fn check_node(&self, id: NodeId) -> Result<()> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(SimulationError::UnknownNode(id.0))
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        &mut self.edges[id.0]
    }

    /// Origin and target of a road.
    pub fn endpoints(&self, id: EdgeId) -> (NodeId, NodeId) {
        self.endpoints[id.0]
    }

    pub fn edge_between(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        self.nodes
            .get(from.0)
            .and_then(|node| node.output_roads.get(&to).copied())
    }

    /// All roads in index order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.edges.iter().enumerate().map(|(i, edge)| (EdgeId(i), edge))
    }

    /// All localities in index order.
    pub fn localities(&self) -> impl Iterator<Item = (NodeId, &Locality)> + '_ {
        self.nodes
            .iter()
            .filter_map(|node| node.as_locality().map(|locality| (node.id, locality)))
    }

    /// Mean workload over all roads; zero for a network without roads.
    pub fn average_workload(&self) -> f64 {
        if self.edges.is_empty() {
            return 0.0;
        }
        self.edges.iter().map(Edge::workload).sum::<f64>() / self.edges.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locality() -> NodeKind {
        NodeKind::Locality(Locality::new(100.0, 1.0, 1.0))
    }

    #[test]
    fn build_road_registers_both_directions_of_adjacency() {
        let mut network = RoadNetwork::new();
        let a = network.add_node(locality());
        let b = network.add_node(locality());

        let ab = network.build_road(a, b, 50.0, 2.0, 4.0).unwrap();

        assert_eq!(network.edge_between(a, b), Some(ab));
        assert_eq!(network.edge_between(b, a), None);
        assert_eq!(network.node(b).input_nodes, vec![a]);
        assert_eq!(network.endpoints(ab), (a, b));
        assert_eq!(network.edge(ab).capacity(), 8.0);
    }

    #[test]
    fn duplicate_road_is_rejected() {
        let mut network = RoadNetwork::new();
        let a = network.add_node(locality());
        let b = network.add_node(locality());
        network.build_road(a, b, 50.0, 2.0, 4.0).unwrap();

        let err = network.build_road(a, b, 30.0, 1.0, 1.0).unwrap_err();
        assert!(matches!(err, SimulationError::DuplicateRoad { from, to } if from == a && to == b));
        assert!(network.build_road(b, a, 30.0, 1.0, 1.0).is_ok());
        assert_eq!(network.edge_count(), 2);
    }

    #[test]
    fn road_to_missing_node_is_rejected() {
        let mut network = RoadNetwork::new();
        let a = network.add_node(locality());
        assert!(matches!(
            network.build_road(a, NodeId(3), 50.0, 1.0, 1.0),
            Err(SimulationError::UnknownNode(3))
        ));
    }

    #[test]
    fn average_workload_over_all_roads() {
        let mut network = RoadNetwork::new();
        let a = network.add_node(locality());
        let b = network.add_node(locality());
        let ab = network.build_road(a, b, 50.0, 2.0, 2.0).unwrap();
        network.build_road(b, a, 50.0, 2.0, 2.0).unwrap();

        assert_eq!(network.average_workload(), 0.0);
        network.edge_mut(ab).update_cars(2.0);
        assert!((network.average_workload() - 0.25).abs() < 1e-12);
    }
}
