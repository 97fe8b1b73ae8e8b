// simulation_main.rs
//
// Usage: simulation_main <graph.json> [config.json]
use rand::rngs::StdRng;
use rand::SeedableRng;
use road_traffic_sim::config::SimulationConfig;
use road_traffic_sim::global_variables::{DAY, HOUR};
use road_traffic_sim::monitoring::traffic_monitoring_system::{plot_hourly_averages, WorkloadMeter};
use road_traffic_sim::simulation_engine::loader::load_network;
use road_traffic_sim::simulation_engine::simulation::Simulation;
use std::process;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let Some(graph_path) = args.get(1) else {
        eprintln!("usage: {} <graph.json> [config.json]", args[0]);
        process::exit(2);
    };

    if let Err(e) = run(graph_path, args.get(2).map(String::as_str)) {
        log::error!("simulation aborted: {}", e);
        process::exit(1);
    }
}

fn run(graph_path: &str, config_path: Option<&str>) -> road_traffic_sim::Result<()> {
    let config = match config_path {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };

    // Stoplight polarities get their own stream.
    let mut build_rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
    let network = load_network(graph_path, &mut build_rng)?;
    log::info!(
        "loaded {} nodes and {} roads from {}",
        network.node_count(),
        network.edge_count(),
        graph_path
    );

    let mut simulation = Simulation::new(network, &config);
    let mut meter = WorkloadMeter::new();
    let ticks = config.days * DAY / simulation.tick_seconds();
    let mut hour_cars = 0u64;

    for _ in 0..ticks {
        let now = simulation.time();
        let report = simulation.tick()?;
        hour_cars += report.generated;
        let average = simulation.network().average_workload();
        meter.record(now, average);

        if (now + simulation.tick_seconds()) % HOUR < simulation.tick_seconds() {
            log::info!(
                "day {} hour {:02}: {} cars generated, {} on the network, average workload {:.4}",
                now / DAY,
                (now % DAY) / HOUR,
                hour_cars,
                simulation.car_count(),
                average
            );
            hour_cars = 0;
        }
    }

    meter.finish_day();
    let run_average = meter.mean_of_finished_days();
    meter.write_csv(&config.stats_path)?;

    if let Some(chart) = &config.chart_path {
        plot_hourly_averages(&[("run".to_string(), run_average)], chart)?;
    }

    Ok(())
}
