// simulation.rs
//
// The flow engine. Every tick first lets localities emit and dispatch cars,
// then advances cars whose road traversal is complete. Roads are processed in
// index order and cars on a road in arrival order, so a run is reproducible
// from its seed.

use std::collections::{BTreeMap, VecDeque};

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::SimulationConfig;
use crate::control_system::traffic_light_controller::optimize_stoplights;
use crate::error::{Result, SimulationError};
use crate::shared_data::{EdgeSnapshot, NetworkSnapshot};
use crate::simulation_engine::demand::{DemandAccumulator, DemandCurve};
use crate::simulation_engine::network::{EdgeId, NodeId, RoadNetwork};
use crate::simulation_engine::node::NodeKind;
use crate::simulation_engine::route_generation::{choose_destination, find_path};
use crate::simulation_engine::stoplight::StopLight;
use crate::simulation_engine::vehicles::{Car, CarId, TripKind};

/// What happened during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Cars created by the departure curves.
    pub generated: u64,
    /// Cars that left a node onto their first road.
    pub departed: u64,
    /// Cars moved from one road onto the next.
    pub advanced: u64,
    /// Cars that reached their destination and stopped being tracked.
    pub arrived: u64,
    /// Cars dropped because no route to their destination exists.
    pub unroutable: u64,
    /// Stoplight retimes scheduled after the tick.
    pub retimed: u64,
}

/// Outcome of trying to move one car at the end of its road.
enum Step {
    Wait,
    Arrived,
    Moved(EdgeId),
}

/// The whole mutable simulation state.
pub struct Simulation {
    network: RoadNetwork,
    cars: BTreeMap<CarId, Car>,
    /// Cars travelling on each road, in arrival order.
    cars_on_edge: Vec<VecDeque<CarId>>,
    /// Cars waiting to depart from each node, in arrival order.
    cars_at_node: Vec<VecDeque<CarId>>,
    native_demand: Vec<DemandAccumulator>,
    guest_demand: Vec<DemandAccumulator>,
    /// Visitors staying at each locality, counted per home locality.
    guests: Vec<BTreeMap<NodeId, u64>>,
    /// Cars passed through each junction during the current tick.
    junction_passes: Vec<u32>,
    time: u64,
    tick_seconds: u64,
    optimizer_tolerance: Option<f64>,
    next_car_id: u64,
    rng: StdRng,
}

impl Simulation {
    pub fn new(network: RoadNetwork, config: &SimulationConfig) -> Self {
        let nodes = network.node_count();
        let edges = network.edge_count();
        let tick_seconds = config.tick_seconds.max(1);
        for (junction, approach) in phase_locked_lights(&network, tick_seconds) {
            match approach {
                Some(approach) => log::warn!(
                    "junction {}: light for approach {} has a cycle dividing the {}s tick and is seen at one phase only",
                    junction,
                    approach,
                    tick_seconds
                ),
                None => log::warn!(
                    "junction {}: out light has a cycle dividing the {}s tick and is seen at one phase only",
                    junction,
                    tick_seconds
                ),
            }
        }
        Self {
            network,
            cars: BTreeMap::new(),
            cars_on_edge: vec![VecDeque::new(); edges],
            cars_at_node: vec![VecDeque::new(); nodes],
            native_demand: vec![DemandAccumulator::new(); nodes],
            guest_demand: vec![DemandAccumulator::new(); nodes],
            guests: vec![BTreeMap::new(); nodes],
            junction_passes: vec![0; nodes],
            time: config.start_time,
            tick_seconds,
            optimizer_tolerance: config
                .optimize_stoplights
                .then_some(config.optimizer_tolerance),
            next_car_id: 0,
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    /// Simulated seconds since the epoch.
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn tick_seconds(&self) -> u64 {
        self.tick_seconds
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut RoadNetwork {
        &mut self.network
    }

    pub fn car(&self, id: CarId) -> Option<&Car> {
        self.cars.get(&id)
    }

    /// Number of tracked cars, parked or travelling.
    pub fn car_count(&self) -> usize {
        self.cars.len()
    }

    pub fn cars_on(&self, edge: EdgeId) -> impl Iterator<Item = CarId> + '_ {
        self.cars_on_edge[edge.0].iter().copied()
    }

    pub fn cars_at(&self, node: NodeId) -> impl Iterator<Item = CarId> + '_ {
        self.cars_at_node[node.0].iter().copied()
    }

    /// Visitors currently staying at `node`, by home locality.
    pub fn guests_at(&self, node: NodeId) -> &BTreeMap<NodeId, u64> {
        &self.guests[node.0]
    }

    /// Places a new car at `from` bound for `dest`. Its route is computed
    /// when it first tries to depart.
    pub fn spawn_car(&mut self, from: NodeId, dest: NodeId, kind: TripKind) -> CarId {
        let id = CarId(self.next_car_id);
        self.next_car_id += 1;
        self.cars.insert(id, Car::new(id, kind, from, dest));
        self.cars_at_node[from.0].push_back(id);
        log::trace!("car {} ({:?}) spawned at {} bound for {}", id, kind, from, dest);
        id
    }

    /// Runs one tick: generation, then advancement, then optional retiming.
    pub fn tick(&mut self) -> Result<TickReport> {
        let now = self.time;
        let mut report = TickReport::default();
        self.junction_passes.fill(0);

        self.generate(now, &mut report);
        self.advance(now, &mut report)?;

        if let Some(tolerance) = self.optimizer_tolerance {
            report.retimed = optimize_stoplights(&mut self.network, now, tolerance).len() as u64;
        }

        self.time += self.tick_seconds;
        log::trace!("tick at {} done: {:?}", now, report);
        Ok(report)
    }

    fn generate(&mut self, now: u64, report: &mut TickReport) {
        let localities: Vec<(NodeId, f64)> = self
            .network
            .localities()
            .map(|(id, locality)| (id, locality.population * locality.emigration_factor))
            .collect();

        for (id, residents) in localities {
            let expected = residents * DemandCurve::Citizens.leaving_factor(now, self.tick_seconds);
            let natives = self.native_demand[id.0].accumulate(expected);
            for _ in 0..natives {
                let Some(dest) = choose_destination(&self.network, &mut self.rng) else {
                    break;
                };
                self.spawn_car(id, dest, TripKind::Native);
                report.generated += 1;
            }

            let staying: u64 = self.guests[id.0].values().sum();
            let expected = staying as f64 * DemandCurve::Guests.leaving_factor(now, self.tick_seconds);
            let leaving = self.guest_demand[id.0].accumulate_capped(expected, staying);
            for _ in 0..leaving {
                if let Some(home) = self.take_guest(id) {
                    self.spawn_car(id, home, TripKind::Returning);
                    report.generated += 1;
                }
            }

            self.depart(id, now, report);
        }
    }

    /// Removes one visitor from `node`, picking its home weighted by how many
    /// visitors from each home are staying.
    fn take_guest(&mut self, node: NodeId) -> Option<NodeId> {
        let guests = &mut self.guests[node.0];
        let (homes, counts): (Vec<NodeId>, Vec<u64>) = guests.iter().map(|(&h, &c)| (h, c)).unzip();
        let index = WeightedIndex::new(&counts).ok()?;
        let home = homes[index.sample(&mut self.rng)];
        if let Some(count) = guests.get_mut(&home) {
            *count -= 1;
            if *count == 0 {
                guests.remove(&home);
            }
        }
        Some(home)
    }

    /// Tries to put every car waiting at `node` onto the first road of its
    /// route. Cars facing a full road keep their place in the queue.
    fn depart(&mut self, node: NodeId, now: u64, report: &mut TickReport) {
        let queue = std::mem::take(&mut self.cars_at_node[node.0]);
        let mut waiting = VecDeque::with_capacity(queue.len());

        for car_id in queue {
            let Some(car) = self.cars.get_mut(&car_id) else {
                continue;
            };

            if car.cur_path.is_empty() {
                match find_path(&self.network, node, car.dest_node) {
                    Some(path) => car.cur_path = path.into(),
                    None => {
                        log::warn!("car {}: no route from {} to {}, dropped", car_id, node, car.dest_node);
                        self.cars.remove(&car_id);
                        report.unroutable += 1;
                        continue;
                    }
                }
            }

            let Some(edge_id) = car
                .next_node()
                .and_then(|next| self.network.edge_between(node, next))
            else {
                waiting.push_back(car_id);
                continue;
            };

            let edge = self.network.edge_mut(edge_id);
            if !edge.try_admit(1.0) {
                waiting.push_back(car_id);
                continue;
            }

            car.enter_road(node, edge_id, now.saturating_add(travel_seconds(edge.travel_time())));
            self.cars_on_edge[edge_id.0].push_back(car_id);
            report.departed += 1;
        }

        self.cars_at_node[node.0] = waiting;
    }

    fn advance(&mut self, now: u64, report: &mut TickReport) -> Result<()> {
        // Cars moving onto a road are appended after all roads were
        // processed, so nobody crosses two roads in one tick.
        let mut transfers: Vec<(EdgeId, CarId)> = Vec::new();

        for index in 0..self.cars_on_edge.len() {
            if self.cars_on_edge[index].is_empty() {
                continue;
            }

            let edge_id = EdgeId(index);
            let queue = std::mem::take(&mut self.cars_on_edge[index]);
            let mut staying = VecDeque::with_capacity(queue.len());

            for car_id in queue {
                match self.advance_car(edge_id, car_id, now)? {
                    Step::Wait => staying.push_back(car_id),
                    Step::Arrived => report.arrived += 1,
                    Step::Moved(next_edge) => {
                        transfers.push((next_edge, car_id));
                        report.advanced += 1;
                    }
                }
            }

            self.cars_on_edge[index] = staying;
        }

        for (edge_id, car_id) in transfers {
            self.cars_on_edge[edge_id.0].push_back(car_id);
        }
        Ok(())
    }

    fn advance_car(&mut self, edge_id: EdgeId, car_id: CarId, now: u64) -> Result<Step> {
        let (from, at) = self.network.endpoints(edge_id);
        let Some(car) = self.cars.get_mut(&car_id) else {
            return Ok(Step::Arrived);
        };

        if car.time_reaching_node.is_some_and(|arrival| now < arrival) {
            return Ok(Step::Wait);
        }

        if car.cur_path.len() <= 1 {
            self.network.edge_mut(edge_id).release(1.0);
            let reached = car.park().unwrap_or(at);
            if reached != car.dest_node {
                return Err(SimulationError::PathExhausted {
                    car: car_id,
                    node: reached,
                });
            }
            self.finish_trip(car_id);
            return Ok(Step::Arrived);
        }

        let next = car.cur_path[1];

        if let NodeKind::Junction(junction) = &mut self.network.node_mut(at).kind {
            if self.junction_passes[at.0] >= junction.bandwidth {
                return Ok(Step::Wait);
            }
            if !junction.allows_passage(from, now) {
                return Ok(Step::Wait);
            }
        }

        let Some(next_edge) = self.network.edge_between(at, next) else {
            return Err(SimulationError::PathExhausted {
                car: car_id,
                node: at,
            });
        };

        let road = self.network.edge_mut(next_edge);
        if !road.try_admit(1.0) {
            return Ok(Step::Wait);
        }
        let arrival = now.saturating_add(travel_seconds(road.travel_time()));
        self.network.edge_mut(edge_id).release(1.0);

        car.cur_path.pop_front();
        car.enter_road(at, next_edge, arrival);

        if self.network.node(at).is_junction() {
            self.junction_passes[at.0] += 1;
        }
        log::trace!("car {} passed {} towards {}", car_id, at, next);
        Ok(Step::Moved(next_edge))
    }

    /// Stops tracking a car that reached its destination. A resident visiting
    /// another locality stays there as a guest until the guest curve sends it
    /// home.
    fn finish_trip(&mut self, car_id: CarId) {
        let Some(car) = self.cars.remove(&car_id) else {
            return;
        };
        let visiting = car.kind == TripKind::Native
            && car.dest_node != car.from_node
            && self.network.node(car.dest_node).as_locality().is_some();
        if visiting {
            *self.guests[car.dest_node.0].entry(car.from_node).or_insert(0) += 1;
        }
        log::trace!("car {} arrived at {}", car_id, car.dest_node);
    }

    /// Read-only view of the network for renderers and statistics.
    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            time: self.time,
            nodes: self.network.nodes().iter().map(|node| node.id).collect(),
            edges: self
                .network
                .edges()
                .map(|(id, edge)| {
                    let (from, to) = self.network.endpoints(id);
                    EdgeSnapshot {
                        from,
                        to,
                        workload: edge.workload(),
                    }
                })
                .collect(),
        }
    }
}

/// Lights with both phases non-empty whose cycle divides `tick_seconds`.
/// Sampled once per tick, such a light never changes state. `None` stands
/// for a junction's out light.
pub fn phase_locked_lights(network: &RoadNetwork, tick_seconds: u64) -> Vec<(NodeId, Option<NodeId>)> {
    let locked = |light: &StopLight| {
        light.green_time > 0 && light.red_time > 0 && tick_seconds % light.cycle() == 0
    };
    let mut found = Vec::new();
    for node in network.nodes() {
        let Some(junction) = node.as_junction() else {
            continue;
        };
        if locked(&junction.out_stoplight) {
            found.push((node.id, None));
        }
        for (&approach, light) in &junction.stoplights {
            if locked(light) {
                found.push((node.id, Some(approach)));
            }
        }
    }
    found
}

/// Traversal time in whole seconds, at least one.
fn travel_seconds(seconds: f64) -> u64 {
    if !seconds.is_finite() {
        return u64::MAX;
    }
    (seconds.round() as u64).max(1)
}
