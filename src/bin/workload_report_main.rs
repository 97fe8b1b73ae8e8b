// workload_report_main.rs
//
// Usage: workload_report_main <chart.png> <stats.csv>...
//
// Plots the hourly averages of each statistics file and prints how much the
// rush hours improve between the best and the worst run.
use road_traffic_sim::monitoring::traffic_monitoring_system::{
    plot_hourly_averages, read_hourly_averages, reduction_between,
};
use std::path::Path;
use std::process;

const PEAK_HOURS: [usize; 4] = [7, 8, 17, 18];

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: {} <chart.png> <stats.csv>...", args[0]);
        process::exit(2);
    }

    if let Err(e) = run(&args[1], &args[2..]) {
        log::error!("report failed: {}", e);
        process::exit(1);
    }
}

fn run(chart: &str, files: &[String]) -> road_traffic_sim::Result<()> {
    let mut datasets = Vec::with_capacity(files.len());
    for file in files {
        let name = Path::new(file)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.clone());
        datasets.push((name, read_hourly_averages(file)?));
    }

    plot_hourly_averages(&datasets, chart)?;

    let hourly: Vec<_> = datasets.iter().map(|(_, hours)| *hours).collect();
    for (hour, reduction) in reduction_between(&PEAK_HOURS, &hourly) {
        println!("{:02}:00  {:6.2}% lower at best", hour, reduction);
    }
    Ok(())
}
