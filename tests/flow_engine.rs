use rand::rngs::StdRng;
use rand::SeedableRng;
use road_traffic_sim::config::SimulationConfig;
use road_traffic_sim::global_variables::HOUR;
use road_traffic_sim::simulation_engine::loader::network_from_json;
use road_traffic_sim::simulation_engine::network::{NodeId, RoadNetwork};
use road_traffic_sim::simulation_engine::simulation::Simulation;
use road_traffic_sim::simulation_engine::vehicles::TripKind;

fn build(text: &str) -> RoadNetwork {
    let mut rng = StdRng::seed_from_u64(11);
    network_from_json(text, &mut rng).unwrap()
}

/// One empty locality feeding a single-lane junction whose lights never turn red.
const SINGLE_LANE: &str = r#"{
    "nodes": [
        { "type": "locality", "population": 0, "emigration_factor": 0, "popularity_factor": 1 },
        { "type": "junction", "bandwidth": 1, "out_stoplight": [10, 0], "stoplights": { "0": [10, 0] } }
    ],
    "edges": [[0, 1, 50, 10, 1], [1, 0, 50, 10, 1]]
}"#;

/// Two towns on either side of a signalled crossing.
const TWO_TOWNS: &str = r#"{
    "nodes": [
        { "type": "locality", "population": 30000, "emigration_factor": 0.4, "popularity_factor": 1 },
        { "type": "junction", "bandwidth": 3, "out_stoplight": [40, 0],
          "stoplights": { "0": [20, 20], "2": [20, 20] }, "dependencies": { "0": [2] } },
        { "type": "locality", "population": 5000, "emigration_factor": 0.2, "popularity_factor": 4 }
    ],
    "edges": [
        [0, 1, 50, 150, 1], [1, 0, 50, 150, 1],
        [2, 1, 50, 150, 1], [1, 2, 50, 150, 1]
    ]
}"#;

/// Residents of one town all spend the day at the other.
const DAY_TRIP: &str = r#"{
    "nodes": [
        { "type": "locality", "population": 2000, "emigration_factor": 0.5, "popularity_factor": 0 },
        { "type": "locality", "population": 0, "emigration_factor": 0, "popularity_factor": 1 }
    ],
    "edges": [[0, 1, 50, 1000, 2], [1, 0, 50, 1000, 2]]
}"#;

/// Locality 0 reaches locality 2 through junction 1. The light for cars
/// coming from 0 is red-first, green during [10, 20) of each 20 s cycle.
const RED_FIRST_APPROACH: &str = r#"{
    "nodes": [
        { "type": "locality", "population": 0, "emigration_factor": 0, "popularity_factor": 1 },
        { "type": "junction", "bandwidth": 5, "out_stoplight": [20, 0],
          "stoplights": { "0": [10, 10], "2": [10, 10] }, "dependencies": { "2": [0] } },
        { "type": "locality", "population": 0, "emigration_factor": 0, "popularity_factor": 1 }
    ],
    "edges": [[0, 1, 50, 10, 1], [1, 2, 50, 10, 1]]
}"#;

/// Same layout without approach lights; the out light is green during
/// [0, 10) of each 20 s cycle.
const CYCLING_OUT_LIGHT: &str = r#"{
    "nodes": [
        { "type": "locality", "population": 0, "emigration_factor": 0, "popularity_factor": 1 },
        { "type": "junction", "bandwidth": 5, "out_stoplight": [10, 10] },
        { "type": "locality", "population": 0, "emigration_factor": 0, "popularity_factor": 1 }
    ],
    "edges": [[0, 1, 50, 10, 1], [1, 2, 50, 10, 1]]
}"#;

fn short_ticks(start_time: u64) -> SimulationConfig {
    SimulationConfig {
        tick_seconds: 5,
        start_time,
        optimize_stoplights: false,
        ..SimulationConfig::default()
    }
}

fn morning_config() -> SimulationConfig {
    SimulationConfig {
        start_time: 6 * HOUR,
        ..SimulationConfig::default()
    }
}

#[test]
fn junction_bandwidth_limits_throughput() {
    let network = build(SINGLE_LANE);
    let inbound = network.edge_between(NodeId(0), NodeId(1)).unwrap();
    let outbound = network.edge_between(NodeId(1), NodeId(0)).unwrap();
    let mut simulation = Simulation::new(network, &SimulationConfig::default());

    for _ in 0..3 {
        simulation.spawn_car(NodeId(0), NodeId(0), TripKind::Native);
    }

    let report = simulation.tick().unwrap();
    assert_eq!(report.departed, 3);
    assert_eq!(simulation.cars_on(inbound).count(), 3);

    for waiting in [2, 1, 0] {
        let report = simulation.tick().unwrap();
        assert_eq!(report.advanced, 1);
        assert_eq!(simulation.cars_on(inbound).count(), waiting);
    }

    // Each car finishes its round trip one tick after crossing.
    let report = simulation.tick().unwrap();
    assert_eq!(report.arrived, 1);
    assert_eq!(simulation.cars_on(outbound).count(), 0);
    assert_eq!(simulation.car_count(), 0);
}

#[test]
fn roads_never_exceed_capacity() {
    let mut simulation = Simulation::new(build(TWO_TOWNS), &morning_config());
    let mut peak = 0.0_f64;

    for _ in 0..6 * 60 {
        simulation.tick().unwrap();
        let network = simulation.network();
        for (id, edge) in network.edges() {
            assert!(edge.cars() >= 0.0);
            assert!(edge.cars() <= edge.capacity());
            assert_eq!(simulation.cars_on(id).count() as f64, edge.cars());
            peak = peak.max(edge.workload());
        }
    }
    assert!(peak > 0.5, "morning rush never loaded the roads: {}", peak);
}

#[test]
fn visitors_go_home_in_the_evening() {
    let mut simulation = Simulation::new(build(DAY_TRIP), &morning_config());
    let resort = NodeId(1);
    let guests = |simulation: &Simulation| simulation.guests_at(resort).values().sum::<u64>();

    // 06:00 to 14:00.
    for _ in 0..8 * 60 {
        simulation.tick().unwrap();
    }
    let midday = guests(&simulation);
    assert!(midday > 500, "only {} visitors by midday", midday);
    assert_eq!(simulation.guests_at(resort).keys().collect::<Vec<_>>(), vec![&NodeId(0)]);

    // 14:00 to 23:00.
    for _ in 0..9 * 60 {
        simulation.tick().unwrap();
    }
    assert!(guests(&simulation) < midday / 2);
}

#[test]
fn same_seed_same_run() {
    let trace = |seed: u64| {
        let config = SimulationConfig {
            seed,
            ..morning_config()
        };
        let mut simulation = Simulation::new(build(TWO_TOWNS), &config);
        (0..180)
            .map(|_| {
                simulation.tick().unwrap();
                simulation.snapshot()
            })
            .collect::<Vec<_>>()
    };

    assert_eq!(trace(5), trace(5));
}

#[test]
fn red_approach_light_holds_car_until_green() {
    let network = build(RED_FIRST_APPROACH);
    let junction = network.node(NodeId(1)).as_junction().unwrap();
    assert!(!junction.stoplights[&NodeId(0)].initial_light);
    let inbound = network.edge_between(NodeId(0), NodeId(1)).unwrap();
    let outbound = network.edge_between(NodeId(1), NodeId(2)).unwrap();
    let mut simulation = Simulation::new(network, &short_ticks(0));

    simulation.spawn_car(NodeId(0), NodeId(2), TripKind::Native);

    // t = 0: the car enters the road and reaches the junction after 1 s.
    assert_eq!(simulation.tick().unwrap().departed, 1);

    // t = 5: at the junction, light red.
    let report = simulation.tick().unwrap();
    assert_eq!(report.advanced, 0);
    assert_eq!(simulation.cars_on(inbound).count(), 1);

    // t = 10: light turns green.
    let report = simulation.tick().unwrap();
    assert_eq!(report.advanced, 1);
    assert_eq!(simulation.cars_on(inbound).count(), 0);
    assert_eq!(simulation.cars_on(outbound).count(), 1);

    assert_eq!(simulation.tick().unwrap().arrived, 1);
}

#[test]
fn red_out_light_holds_car_until_green() {
    let network = build(CYCLING_OUT_LIGHT);
    let inbound = network.edge_between(NodeId(0), NodeId(1)).unwrap();
    let outbound = network.edge_between(NodeId(1), NodeId(2)).unwrap();
    let mut simulation = Simulation::new(network, &short_ticks(10));

    simulation.spawn_car(NodeId(0), NodeId(2), TripKind::Native);

    // t = 10: departs while the out light is red.
    assert_eq!(simulation.tick().unwrap().departed, 1);

    // t = 15: still red.
    let report = simulation.tick().unwrap();
    assert_eq!(report.advanced, 0);
    assert_eq!(simulation.cars_on(inbound).count(), 1);

    // t = 20: a new cycle starts green.
    let report = simulation.tick().unwrap();
    assert_eq!(report.advanced, 1);
    assert_eq!(simulation.cars_on(outbound).count(), 1);
}
