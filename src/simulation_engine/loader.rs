// loader.rs
//
// Builds a RoadNetwork from a JSON document:
//
// {
//   "nodes": [
//     { "type": "locality", "population": 5000, "emigration_factor": 0.3, "popularity_factor": 1.0 },
//     { "type": "junction", "bandwidth": 4, "out_stoplight": [30, 0],
//       "stoplights": { "0": [30, 30], "2": [30, 30] }, "dependencies": { "0": [2] } }
//   ],
//   "edges": [[0, 1, 50, 400, 2], [1, 0, 50, 400, 2]]
// }
//
// Node ids are positions in the node list.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::Rng;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, SimulationError};
use crate::simulation_engine::junction::Junction;
use crate::simulation_engine::network::{NodeId, RoadNetwork};
use crate::simulation_engine::node::{Locality, NodeKind};
use crate::simulation_engine::stoplight::StopLight;

#[derive(Debug, Deserialize)]
struct GraphDocument {
    nodes: Vec<RawNode>,
    #[serde(default)]
    edges: Vec<(usize, usize, f64, f64, f64)>,
}

/// The tag is checked by hand so an unknown tag is reported as such rather
/// than as a generic shape error.
#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    params: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct LocalityParams {
    population: f64,
    emigration_factor: f64,
    popularity_factor: f64,
}

#[derive(Debug, Deserialize)]
struct JunctionParams {
    bandwidth: u32,
    out_stoplight: (u64, u64),
    #[serde(default)]
    stoplights: BTreeMap<usize, (u64, u64)>,
    #[serde(default)]
    dependencies: BTreeMap<usize, Vec<usize>>,
}

/// Reads and builds the network stored at `path`.
pub fn load_network<R: Rng + ?Sized>(path: impl AsRef<Path>, rng: &mut R) -> Result<RoadNetwork> {
    let text = fs::read_to_string(path)?;
    network_from_json(&text, rng)
}

/// Builds a network from a JSON document. `rng` decides the initial phase of
/// stoplights outside any dependency chain.
pub fn network_from_json<R: Rng + ?Sized>(text: &str, rng: &mut R) -> Result<RoadNetwork> {
    let document: GraphDocument = serde_json::from_str(text)?;
    let node_count = document.nodes.len();
    let mut network = RoadNetwork::new();

    for (index, raw) in document.nodes.into_iter().enumerate() {
        let params = Value::Object(raw.params.into_iter().collect());
        let kind = match raw.kind.as_str() {
            "locality" => {
                let p: LocalityParams = serde_json::from_value(params)?;
                NodeKind::Locality(Locality::new(
                    p.population,
                    p.emigration_factor,
                    p.popularity_factor,
                ))
            }
            "junction" => {
                let p: JunctionParams = serde_json::from_value(params)?;
                NodeKind::Junction(build_junction(NodeId(index), p, node_count, rng)?)
            }
            other => return Err(SimulationError::UnknownNodeType(other.to_string())),
        };
        network.add_node(kind);
    }

    for (from, to, speed_limit, length, width) in document.edges {
        network.build_road(NodeId(from), NodeId(to), speed_limit, length, width)?;
    }

    log::debug!(
        "loaded network with {} nodes and {} roads",
        network.node_count(),
        network.edge_count()
    );
    Ok(network)
}

fn build_junction<R: Rng + ?Sized>(
    id: NodeId,
    params: JunctionParams,
    node_count: usize,
    rng: &mut R,
) -> Result<Junction> {
    let known = |index: usize| {
        if index < node_count {
            Ok(NodeId(index))
        } else {
            Err(SimulationError::UnknownNode(index))
        }
    };

    let mut stoplights = BTreeMap::new();
    for (neighbor, (green, red)) in params.stoplights {
        stoplights.insert(known(neighbor)?, StopLight::new(green, red));
    }

    let mut dependencies = BTreeMap::new();
    for (light, partners) in params.dependencies {
        let partners = partners.into_iter().map(known).collect::<Result<Vec<_>>>()?;
        dependencies.insert(known(light)?, partners);
    }

    let (green, red) = params.out_stoplight;
    Junction::new(
        id,
        params.bandwidth,
        StopLight::new(green, red),
        stoplights,
        dependencies,
        rng,
    )
}
