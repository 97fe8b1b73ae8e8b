use std::collections::VecDeque;
use std::fmt;

use crate::simulation_engine::network::{EdgeId, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CarId(pub u64);

impl fmt::Display for CarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a car is on the road.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripKind {
    /// A resident leaving its home locality.
    Native,
    /// A visitor returning to its home locality.
    Returning,
}

/// A tracked car. It is either parked at a node or travelling on a road,
/// never both.
#[derive(Debug, Clone)]
pub struct Car {
    pub id: CarId,
    pub kind: TripKind,
    pub from_node: NodeId,
    pub dest_node: NodeId,
    /// Set only while the car waits at a node.
    pub cur_node: Option<NodeId>,
    /// Set only while the car travels.
    pub cur_edge: Option<EdgeId>,
    /// Remaining nodes to visit; the head is the next node.
    pub cur_path: VecDeque<NodeId>,
    /// When the car reaches the end of its current road.
    pub time_reaching_node: Option<u64>,
    pub previous_node: Option<NodeId>,
}

impl Car {
    /// Creates a car waiting at `from_node`.
    pub fn new(id: CarId, kind: TripKind, from_node: NodeId, dest_node: NodeId) -> Self {
        Self {
            id,
            kind,
            from_node,
            dest_node,
            cur_node: Some(from_node),
            cur_edge: None,
            cur_path: VecDeque::new(),
            time_reaching_node: None,
            previous_node: None,
        }
    }

    pub fn with_path(mut self, path: Vec<NodeId>) -> Self {
        self.cur_path = path.into();
        self
    }

    /// The node at the end of the road the car is on, or the next node to
    /// head for when parked.
    pub fn next_node(&self) -> Option<NodeId> {
        self.cur_path.front().copied()
    }

    pub fn is_travelling(&self) -> bool {
        self.cur_edge.is_some()
    }

    /// Moves the car from its node (or previous road) onto `edge`, heading
    /// for the path head.
    pub fn enter_road(&mut self, at: NodeId, edge: EdgeId, arrival: u64) {
        self.previous_node = Some(at);
        self.cur_node = None;
        self.cur_edge = Some(edge);
        self.time_reaching_node = Some(arrival);
    }

    /// Leaves the current road at the path head and parks there.
    pub fn park(&mut self) -> Option<NodeId> {
        let node = self.cur_path.pop_front()?;
        self.cur_node = Some(node);
        self.cur_edge = None;
        self.time_reaching_node = None;
        Some(node)
    }
}
