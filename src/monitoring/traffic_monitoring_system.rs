use crate::error::{Result, SimulationError};
use crate::global_variables::{DAY, HOUR, HOURS_PER_DAY};
use plotters::prelude::*;
use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;

/// Average workload for each hour of a day.
pub type HourlyAverages = [f64; HOURS_PER_DAY];

/// Collects the network's average workload per tick into hourly buckets and
/// turns every completed day into one row of 24 averages.
#[derive(Debug, Clone)]
pub struct WorkloadMeter {
    sums: HourlyAverages,
    samples: [u32; HOURS_PER_DAY],
    day: Option<u64>,
    finished_days: Vec<HourlyAverages>,
}

impl Default for WorkloadMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkloadMeter {
    pub fn new() -> Self {
        Self {
            sums: [0.0; HOURS_PER_DAY],
            samples: [0; HOURS_PER_DAY],
            day: None,
            finished_days: Vec::new(),
        }
    }

    /// Adds one sample taken at simulated `time`. Crossing into a new day
    /// closes the previous one.
    pub fn record(&mut self, time: u64, average_workload: f64) {
        let day = time / DAY;
        if self.day.is_some_and(|current| current != day) {
            self.finish_day();
        }
        self.day = Some(day);

        let hour = ((time % DAY) / HOUR) as usize;
        self.sums[hour] += average_workload;
        self.samples[hour] += 1;
    }

    /// Averages of the day in progress; hours without samples are 0.
    pub fn hourly_averages(&self) -> HourlyAverages {
        let mut averages = [0.0; HOURS_PER_DAY];
        for (hour, average) in averages.iter_mut().enumerate() {
            if self.samples[hour] > 0 {
                *average = self.sums[hour] / self.samples[hour] as f64;
            }
        }
        averages
    }

    /// Closes the day in progress, if it has any samples.
    pub fn finish_day(&mut self) {
        if self.samples.iter().any(|&n| n > 0) {
            self.finished_days.push(self.hourly_averages());
        }
        self.sums = [0.0; HOURS_PER_DAY];
        self.samples = [0; HOURS_PER_DAY];
        self.day = None;
    }

    pub fn finished_days(&self) -> &[HourlyAverages] {
        &self.finished_days
    }

    /// Hour-by-hour mean over all finished days; zeros when there are none.
    pub fn mean_of_finished_days(&self) -> HourlyAverages {
        let mut mean = [0.0; HOURS_PER_DAY];
        if self.finished_days.is_empty() {
            return mean;
        }
        for day in &self.finished_days {
            for (sum, value) in mean.iter_mut().zip(day) {
                *sum += value;
            }
        }
        let days = self.finished_days.len() as f64;
        for value in mean.iter_mut() {
            *value /= days;
        }
        mean
    }

    /// Appends every finished day to `path` and forgets them.
    pub fn write_csv(&mut self, path: impl AsRef<Path>) -> Result<()> {
        for day in &self.finished_days {
            append_row(path.as_ref(), day)?;
        }
        log::info!(
            "{} day(s) of hourly workload written to {}",
            self.finished_days.len(),
            path.as_ref().display()
        );
        self.finished_days.clear();
        Ok(())
    }
}

/// Appends one fixed-width row of hourly values.
fn append_row(path: &Path, day: &HourlyAverages) -> Result<()> {
    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    wtr.write_record(day.iter().map(|value| format!("{:10.6}", value)))?;
    wtr.flush()?;
    Ok(())
}

/// Mean of all rows stored in a statistics file.
pub fn read_hourly_averages(path: impl AsRef<Path>) -> Result<HourlyAverages> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path.as_ref())?;

    let mut sums = [0.0; HOURS_PER_DAY];
    let mut rows = 0usize;
    for result in rdr.deserialize() {
        let row: Vec<f64> = result?;
        for (sum, value) in sums.iter_mut().zip(row) {
            *sum += value;
        }
        rows += 1;
    }

    if rows > 0 {
        for sum in sums.iter_mut() {
            *sum /= rows as f64;
        }
    }
    Ok(sums)
}

/// For each requested hour, how much lower the best dataset's workload is
/// than the worst one's, in percent.
pub fn reduction_between(hours: &[usize], datasets: &[HourlyAverages]) -> Vec<(usize, f64)> {
    hours
        .iter()
        .filter(|&&hour| hour < HOURS_PER_DAY)
        .map(|&hour| {
            let values = datasets.iter().map(|day| day[hour]);
            let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
            let min = values.fold(f64::INFINITY, f64::min);
            let reduction = if max > 0.0 { 100.0 * (1.0 - min / max) } else { 0.0 };
            (hour, reduction)
        })
        .collect()
}

/// Reads each statistics file and compares them at the given hours.
pub fn peak_hour_reduction<P: AsRef<Path>>(hours: &[usize], files: &[P]) -> Result<Vec<(usize, f64)>> {
    let datasets = files
        .iter()
        .map(read_hourly_averages)
        .collect::<Result<Vec<_>>>()?;
    Ok(reduction_between(hours, &datasets))
}

/// Draws one line per named dataset over the 24 hours of a day.
pub fn plot_hourly_averages(datasets: &[(String, HourlyAverages)], out: impl AsRef<Path>) -> Result<()> {
    draw_hourly_chart(datasets, out.as_ref()).map_err(|e| SimulationError::Plot(e.to_string()))?;
    log::info!("hourly workload chart saved to {}", out.as_ref().display());
    Ok(())
}

fn draw_hourly_chart(datasets: &[(String, HourlyAverages)], out: &Path) -> std::result::Result<(), Box<dyn Error>> {
    let max_workload = datasets
        .iter()
        .flat_map(|(_, hours)| hours.iter().copied())
        .fold(0.0_f64, f64::max)
        .max(0.01);

    let backend = BitMapBackend::new(out, (1000, 600));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Average Road Workload by Hour", ("sans-serif", 20))
        .margin(40)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0..(HOURS_PER_DAY as u32 - 1), 0.0..max_workload * 1.1)?;

    chart
        .configure_mesh()
        .x_desc("Hour of day")
        .y_desc("Workload")
        .draw()?;

    for (index, (name, hours)) in datasets.iter().enumerate() {
        let color = Palette99::pick(index).to_rgba();
        chart
            .draw_series(LineSeries::new(
                hours.iter().enumerate().map(|(hour, &w)| (hour as u32, w)),
                color.stroke_width(2),
            ))?
            .label(name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
