//! Workload-driven retiming of junction stoplights.
//!
//! Each junction reachable from a locality hands out green time to its
//! approach lights in proportion to the workload of the matching outgoing
//! roads. New timings go through the stoplight's pending-retime mechanism, so
//! they only apply from the next cycle boundary.

use std::collections::{BTreeMap, VecDeque};

use crate::simulation_engine::junction::Junction;
use crate::simulation_engine::network::{NodeId, RoadNetwork};
use crate::simulation_engine::stoplight::StopLight;

/// A timing change scheduled by the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightAdjustment {
    pub junction: NodeId,
    pub approach: NodeId,
    pub green_time: u64,
    pub red_time: u64,
}

/// Junctions in breadth-first order from all localities.
pub fn junctions_by_reach(network: &RoadNetwork) -> Vec<NodeId> {
    let mut visited = vec![false; network.node_count()];
    let mut queue: VecDeque<NodeId> = VecDeque::new();

    for (id, _) in network.localities() {
        visited[id.0] = true;
        queue.push_back(id);
    }

    let mut junctions = Vec::new();
    while let Some(current) = queue.pop_front() {
        let node = network.node(current);
        for &next in node.output_roads.keys() {
            if !visited[next.0] {
                visited[next.0] = true;
                queue.push_back(next);
            }
        }
        if node.is_junction() {
            junctions.push(current);
        }
    }
    junctions
}

/// Retimes every reachable junction at `time` and returns the adjustments made.
pub fn optimize_stoplights(
    network: &mut RoadNetwork,
    time: u64,
    tolerance: f64,
) -> Vec<LightAdjustment> {
    let mut adjustments = Vec::new();

    for id in junctions_by_reach(network) {
        let weights: BTreeMap<NodeId, f64> = network
            .node(id)
            .output_roads
            .iter()
            .map(|(&next, &edge)| (next, network.edge(edge).workload()))
            .collect();
        let total: f64 = weights.values().sum();
        if weights.is_empty() || total <= 0.0 {
            continue;
        }

        let Some(junction) = network.node_mut(id).as_junction_mut() else {
            continue;
        };

        let approaches: Vec<NodeId> = junction.stoplights.keys().copied().collect();
        for approach in approaches {
            let Some(&weight) = weights.get(&approach) else {
                continue;
            };
            let light = &junction.stoplights[&approach];
            let cycle = light.cycle();
            if cycle == 0 {
                continue;
            }

            let green = if weights.len() == 1 {
                cycle
            } else {
                ((cycle as f64 * weight / total).floor() as u64).clamp(1, cycle)
            };
            let ideal_red = cycle - green;

            let Some(red) = find_compatible_red_time(junction, approach, green, ideal_red, tolerance)
            else {
                log::debug!(
                    "junction {}: no compatible red phase near {}s for approach {}",
                    id,
                    ideal_red,
                    approach
                );
                continue;
            };

            let light = &junction.stoplights[&approach];
            let current = (light.green_time, light.red_time);
            let scheduled = light.pending().unwrap_or(current);
            if scheduled == (green, red) {
                continue;
            }

            match junction.update_stoplight_times(id, time, green, red, Some(approach)) {
                Ok(()) => {
                    log::info!(
                        "junction {}: approach {} retimed to {}s green / {}s red",
                        id,
                        approach,
                        green,
                        red
                    );
                    adjustments.push(LightAdjustment {
                        junction: id,
                        approach,
                        green_time: green,
                        red_time: red,
                    });
                }
                Err(e) => log::warn!("junction {}: retime rejected: {}", id, e),
            }
        }
    }

    adjustments
}

/// Closest red duration to `ideal_red`, within `tolerance` of it, that keeps
/// a `(green, red)` light on `approach` compatible with all its partners.
/// Ties prefer the shorter red. `tolerance` is clamped to `[0, 1]`; NaN
/// means an exact match only.
pub fn find_compatible_red_time(
    junction: &Junction,
    approach: NodeId,
    green: u64,
    ideal_red: u64,
    tolerance: f64,
) -> Option<u64> {
    let tolerance = if tolerance.is_finite() { tolerance.clamp(0.0, 1.0) } else { 0.0 };
    let low = ((ideal_red as f64 * (1.0 - tolerance)).floor() as u64).min(ideal_red);
    let high = ((ideal_red as f64 * (1.0 + tolerance)).ceil() as u64).max(ideal_red);
    let partners = junction.partners_of(approach);

    let fits = |red: u64| {
        if green + red == 0 {
            return false;
        }
        let candidate = StopLight::new(green, red);
        partners
            .iter()
            .all(|other| candidate.is_compatible(&junction.stoplights[other]))
    };

    let reach = (ideal_red - low).max(high - ideal_red);
    for distance in 0..=reach {
        if distance <= ideal_red - low && fits(ideal_red - distance) {
            return Some(ideal_red - distance);
        }
        if distance > 0 && ideal_red + distance <= high && fits(ideal_red + distance) {
            return Some(ideal_red + distance);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_engine::node::{Locality, NodeKind};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Two localities on either side of a junction with dependent approaches.
    fn crossing(dependent: bool) -> (RoadNetwork, NodeId, NodeId, NodeId) {
        let mut rng = StdRng::seed_from_u64(1);
        let mut network = RoadNetwork::new();
        let west = network.add_node(NodeKind::Locality(Locality::new(10.0, 1.0, 1.0)));
        let east = network.add_node(NodeKind::Locality(Locality::new(10.0, 1.0, 1.0)));
        let stoplights: BTreeMap<NodeId, StopLight> =
            [(west, StopLight::new(10, 10)), (east, StopLight::new(10, 10))]
                .into_iter()
                .collect();
        let dependencies: BTreeMap<NodeId, Vec<NodeId>> = if dependent {
            [(west, vec![east])].into_iter().collect()
        } else {
            BTreeMap::new()
        };
        let junction = Junction::new(
            NodeId(2),
            5,
            StopLight::new(10, 0),
            stoplights,
            dependencies,
            &mut rng,
        )
        .unwrap();
        let hub = network.add_node(NodeKind::Junction(junction));
        for side in [west, east] {
            network.build_road(side, hub, 50.0, 8.0, 1.0).unwrap();
            network.build_road(hub, side, 50.0, 8.0, 1.0).unwrap();
        }
        (network, west, east, hub)
    }

    #[test]
    fn junctions_are_found_from_localities() {
        let (network, _, _, hub) = crossing(false);
        assert_eq!(junctions_by_reach(&network), vec![hub]);
    }

    #[test]
    fn idle_network_is_left_alone() {
        let (mut network, _, _, _) = crossing(false);
        assert!(optimize_stoplights(&mut network, 0, 0.15).is_empty());
    }

    #[test]
    fn green_follows_outgoing_workload() {
        let (mut network, west, east, hub) = crossing(false);
        let to_west = network.edge_between(hub, west).unwrap();
        let to_east = network.edge_between(hub, east).unwrap();
        network.edge_mut(to_west).update_cars(6.0);
        network.edge_mut(to_east).update_cars(2.0);

        let adjustments = optimize_stoplights(&mut network, 5, 0.15);
        assert_eq!(
            adjustments,
            vec![
                LightAdjustment { junction: hub, approach: west, green_time: 15, red_time: 5 },
                LightAdjustment { junction: hub, approach: east, green_time: 5, red_time: 15 },
            ]
        );

        let junction = network.node(hub).as_junction().unwrap();
        assert_eq!(junction.stoplights[&west].pending(), Some((15, 5)));
        assert_eq!(junction.stoplights[&west].time_last_update, Some(20));

        // Same workloads, same plan: nothing new to schedule.
        assert!(optimize_stoplights(&mut network, 6, 0.15).is_empty());
    }

    #[test]
    fn dependent_partner_blocks_overlapping_retime() {
        let (mut network, west, east, hub) = crossing(true);
        let to_west = network.edge_between(hub, west).unwrap();
        let to_east = network.edge_between(hub, east).unwrap();
        network.edge_mut(to_west).update_cars(6.0);
        network.edge_mut(to_east).update_cars(2.0);

        // West wants 15s green against east's 10s: no red within the band
        // fits, so only east (which shrinks its green) is retimed.
        let adjustments = optimize_stoplights(&mut network, 0, 0.15);
        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].approach, east);
        assert_eq!((adjustments[0].green_time, adjustments[0].red_time), (5, 15));
    }

    #[test]
    fn red_search_stays_within_band() {
        let (network, west, _, hub) = crossing(true);
        let junction = network.node(hub).as_junction().unwrap();
        assert_eq!(find_compatible_red_time(junction, west, 10, 10, 0.15), Some(10));
        assert_eq!(find_compatible_red_time(junction, west, 15, 5, 0.15), None);
        // 4s green: 16s red fits exactly; within 15% of 16 the closest is 16.
        assert_eq!(find_compatible_red_time(junction, west, 4, 16, 0.15), Some(16));
    }

    #[test]
    fn out_of_range_tolerance_degrades_to_exact_match() {
        let (network, west, _, hub) = crossing(true);
        let junction = network.node(hub).as_junction().unwrap();
        assert_eq!(find_compatible_red_time(junction, west, 10, 10, -0.5), Some(10));
        assert_eq!(find_compatible_red_time(junction, west, 15, 5, f64::NAN), None);
        assert_eq!(find_compatible_red_time(junction, west, 4, 16, 7.0), Some(16));
    }
}
