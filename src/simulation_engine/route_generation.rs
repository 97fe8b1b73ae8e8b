// route_generation.rs
//
// Congestion-aware routing. Road weights are travel times under the current
// workload, so routes are computed fresh for every trip and never cached.
// Destinations are drawn from the localities weighted by popularity.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;

use crate::simulation_engine::network::{NodeId, RoadNetwork};

/// Frontier entry ordered by estimated total cost, then by insertion order.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    estimate: f64,
    seq: u64,
    node: NodeId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    // Reversed so the max-heap pops the cheapest, earliest entry.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Shortest path by current travel time from `start` to `goal`.
///
/// Returns the nodes to visit, excluding `start` and including `goal`, or
/// `None` if `goal` is unreachable. When `start == goal` the shortest round
/// trip through at least one other node is returned.
pub fn find_path(network: &RoadNetwork, start: NodeId, goal: NodeId) -> Option<Vec<NodeId>> {
    find_path_with(network, start, goal, |_| 0.0)
}

/// A* search with a caller supplied heuristic. The heuristic must never
/// overestimate the remaining travel time to `goal`.
pub fn find_path_with<H>(
    network: &RoadNetwork,
    start: NodeId,
    goal: NodeId,
    heuristic: H,
) -> Option<Vec<NodeId>>
where
    H: Fn(NodeId) -> f64,
{
    let n = network.node_count();
    if start.0 >= n || goal.0 >= n {
        return None;
    }

    // `came_from[v] == None` with a finite cost means `v` was reached
    // straight from `start`.
    let mut cost = vec![f64::INFINITY; n];
    let mut came_from: Vec<Option<NodeId>> = vec![None; n];
    let mut closed = vec![false; n];
    let mut heap = BinaryHeap::new();
    let mut seq = 0u64;

    let mut relax = |heap: &mut BinaryHeap<Frontier>,
                     cost: &mut Vec<f64>,
                     came_from: &mut Vec<Option<NodeId>>,
                     from: Option<NodeId>,
                     base: f64| {
        let origin = from.unwrap_or(start);
        for (&next, &edge) in &network.node(origin).output_roads {
            if next == start && start != goal {
                continue;
            }
            let candidate = base + network.edge(edge).travel_time();
            if candidate < cost[next.0] {
                cost[next.0] = candidate;
                came_from[next.0] = from;
                heap.push(Frontier {
                    estimate: candidate + heuristic(next),
                    seq,
                    node: next,
                });
                seq += 1;
            }
        }
    };

    relax(&mut heap, &mut cost, &mut came_from, None, 0.0);

    while let Some(Frontier { node, .. }) = heap.pop() {
        if closed[node.0] {
            continue;
        }
        if node == goal {
            let mut path = vec![goal];
            let mut current = came_from[goal.0];
            while let Some(previous) = current {
                path.push(previous);
                current = came_from[previous.0];
            }
            path.reverse();
            return Some(path);
        }
        closed[node.0] = true;
        let base = cost[node.0];
        relax(&mut heap, &mut cost, &mut came_from, Some(node), base);
    }

    None
}

/// Draws a destination locality with probability proportional to its
/// popularity. Returns `None` when no locality has positive popularity.
pub fn choose_destination<R: Rng + ?Sized>(network: &RoadNetwork, rng: &mut R) -> Option<NodeId> {
    let (ids, weights): (Vec<NodeId>, Vec<f64>) = network
        .localities()
        .map(|(id, locality)| (id, locality.popularity_factor.max(0.0)))
        .unzip();
    let index = WeightedIndex::new(&weights).ok()?;
    Some(ids[index.sample(rng)])
}
