use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use crate::error::{Result, SimulationError};
use crate::simulation_engine::network::NodeId;
use crate::simulation_engine::stoplight::StopLight;

/// A signal-controlled crossing with a per-tick throughput cap.
#[derive(Debug, Clone)]
pub struct Junction {
    /// Maximum number of cars advanced through the junction per tick.
    pub bandwidth: u32,
    /// Node-level light gating every exit.
    pub out_stoplight: StopLight,
    /// Light controlling arrivals from each upstream neighbor.
    pub stoplights: BTreeMap<NodeId, StopLight>,
    /// Approaches whose lights must alternate with the keyed approach.
    pub dependencies: BTreeMap<NodeId, Vec<NodeId>>,
}

impl Junction {
    /// Builds a junction and assigns consistent initial phases to its lights.
    pub fn new<R: Rng + ?Sized>(
        id: NodeId,
        bandwidth: u32,
        out_stoplight: StopLight,
        stoplights: BTreeMap<NodeId, StopLight>,
        dependencies: BTreeMap<NodeId, Vec<NodeId>>,
        rng: &mut R,
    ) -> Result<Self> {
        let mut junction = Self {
            bandwidth,
            out_stoplight,
            stoplights,
            dependencies,
        };
        junction.assign_initial_lights(id, rng)?;
        Ok(junction)
    }

    /// Gives every dependency chain alternating polarities, starting each
    /// chain green-first. Lights outside any chain get a random polarity.
    fn assign_initial_lights<R: Rng + ?Sized>(&mut self, id: NodeId, rng: &mut R) -> Result<()> {
        for (&light, partners) in &self.dependencies {
            for &neighbor in std::iter::once(&light).chain(partners) {
                if !self.stoplights.contains_key(&neighbor) {
                    return Err(SimulationError::UnknownStopLight {
                        junction: id,
                        neighbor,
                    });
                }
            }
        }

        let mut polarity: BTreeMap<NodeId, bool> = BTreeMap::new();
        let roots: Vec<NodeId> = self.dependencies.keys().copied().collect();

        for root in roots {
            if polarity.contains_key(&root) {
                continue;
            }

            let mut stack = vec![(root, true, root)];
            while let Some((light, green_first, parent)) = stack.pop() {
                match polarity.get(&light) {
                    Some(&assigned) if assigned == green_first => continue,
                    Some(_) => {
                        return Err(SimulationError::ConflictingSchedule {
                            junction: id,
                            light: parent,
                            other: light,
                        })
                    }
                    None => {
                        polarity.insert(light, green_first);
                    }
                }

                for other in self.partners_of(light) {
                    if !self.stoplights[&light].is_compatible(&self.stoplights[&other]) {
                        return Err(SimulationError::ConflictingSchedule {
                            junction: id,
                            light,
                            other,
                        });
                    }
                    match polarity.get(&other) {
                        Some(&assigned) if assigned == green_first => {
                            return Err(SimulationError::ConflictingSchedule {
                                junction: id,
                                light,
                                other,
                            })
                        }
                        Some(_) => {}
                        None => stack.push((other, !green_first, light)),
                    }
                }
            }
        }

        for (neighbor, light) in self.stoplights.iter_mut() {
            light.initial_light = match polarity.get(neighbor) {
                Some(&green_first) => green_first,
                None => rng.random_bool(0.5),
            };
        }

        Ok(())
    }

    /// Approaches that must never be green together with `neighbor`'s light,
    /// whichever side declared the dependency.
    pub fn partners_of(&self, neighbor: NodeId) -> BTreeSet<NodeId> {
        let mut partners: BTreeSet<NodeId> = self
            .dependencies
            .get(&neighbor)
            .map(|list| list.iter().copied().collect())
            .unwrap_or_default();
        for (&light, list) in &self.dependencies {
            if list.contains(&neighbor) {
                partners.insert(light);
            }
        }
        partners.remove(&neighbor);
        partners
    }

    /// Schedules new timings on the out light (`approach = None`) or on the
    /// light of one approach. Approach retimes must stay compatible with
    /// every dependency partner.
    pub fn update_stoplight_times(
        &mut self,
        id: NodeId,
        time: u64,
        green_time: u64,
        red_time: u64,
        approach: Option<NodeId>,
    ) -> Result<()> {
        let Some(neighbor) = approach else {
            self.out_stoplight.update_times(time, green_time, red_time);
            return Ok(());
        };

        if !self.stoplights.contains_key(&neighbor) {
            return Err(SimulationError::UnknownStopLight {
                junction: id,
                neighbor,
            });
        }

        let candidate = StopLight::new(green_time, red_time);
        for other in self.partners_of(neighbor) {
            if !candidate.is_compatible(&self.stoplights[&other]) {
                return Err(SimulationError::IncompatibleRetime {
                    junction: id,
                    light: neighbor,
                    other,
                });
            }
        }

        if let Some(light) = self.stoplights.get_mut(&neighbor) {
            light.update_times(time, green_time, red_time);
        }
        Ok(())
    }

    /// Whether a car arriving from `approach` may cross at `time`.
    pub fn allows_passage(&mut self, approach: NodeId, time: u64) -> bool {
        if !self.out_stoplight.is_green(time) {
            return false;
        }
        match self.stoplights.get_mut(&approach) {
            Some(light) => light.is_green(time),
            None => true,
        }
    }
}
