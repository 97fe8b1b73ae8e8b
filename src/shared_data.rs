// src/shared_data.rs

use crate::simulation_engine::network::NodeId;
use serde::{Deserialize, Serialize};

/// Workload of one road at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub from: NodeId,
    pub to: NodeId,
    pub workload: f64,
}

/// Read-only picture of the network handed to renderers and statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    /// Simulated seconds since the start of the epoch.
    pub time: u64,
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeSnapshot>,
}

impl NetworkSnapshot {
    /// Mean workload over all roads, 0 for a network without roads.
    pub fn average_workload(&self) -> f64 {
        if self.edges.is_empty() {
            return 0.0;
        }
        self.edges.iter().map(|e| e.workload).sum::<f64>() / self.edges.len() as f64
    }

    pub fn busiest_edge(&self) -> Option<&EdgeSnapshot> {
        self.edges
            .iter()
            .max_by(|a, b| a.workload.total_cmp(&b.workload))
    }
}
