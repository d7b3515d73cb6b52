use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;

use crate::error::{SimError, SimResult};
use crate::simulation_engine::environment::Environment;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub time: u64,
    pub cumulative_reward: f64,
    pub total_queue: u32,
    pub pressure_ns: u32,
    pub pressure_ew: u32,
    pub average_wait: f64,
    pub crossed: u64,
    pub crashed: u64,
    pub waited: u64,
    pub learned_states: usize,
}

/// Periodic samples of a run, for the learning-curve chart and CSV export.
#[derive(Debug, Clone)]
pub struct RunReport {
    every: u64,
    rows: Vec<ReportRow>,
}

impl RunReport {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            rows: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    /// Records a row when `env.time` falls on the sampling interval.
    pub fn sample(&mut self, env: &Environment, learned_states: usize) -> bool {
        if env.time % self.every != 0 {
            return false;
        }
        self.rows.push(ReportRow {
            time: env.time,
            cumulative_reward: env.cumulative_reward,
            total_queue: env.stats.total_queue,
            pressure_ns: env.pressure.ns,
            pressure_ew: env.pressure.ew,
            average_wait: env.stats.average_wait,
            crossed: env.emergency_stats.crossed,
            crashed: env.emergency_stats.crashed,
            waited: env.emergency_stats.waited,
            learned_states,
        });
        true
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> SimResult<()> {
        let mut wtr = csv::WriterBuilder::new().has_headers(true).from_path(path)?;
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Draws cumulative reward against time as a PNG.
    pub fn plot_reward_curve<P: AsRef<Path>>(&self, path: P) -> SimResult<()> {
        if self.rows.is_empty() {
            log::warn!("No samples recorded, skipping reward chart");
            return Ok(());
        }
        draw_reward_curve(&self.rows, path.as_ref()).map_err(|e| SimError::Plot(e.to_string()))
    }
}

fn draw_reward_curve(rows: &[ReportRow], path: &Path) -> Result<(), Box<dyn Error>> {
    let first = rows[0].time as f64;
    let mut last = rows[rows.len() - 1].time as f64;
    if last <= first {
        last = first + 1.0;
    }
    let mut low = rows.iter().map(|r| r.cumulative_reward).fold(f64::INFINITY, f64::min);
    let mut high = rows
        .iter()
        .map(|r| r.cumulative_reward)
        .fold(f64::NEG_INFINITY, f64::max);
    if high - low < 1.0 {
        low -= 0.5;
        high += 0.5;
    }

    let root = BitMapBackend::new(path, (960, 540)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Cumulative reward", ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(first..last, low..high)?;
    chart
        .configure_mesh()
        .x_desc("tick")
        .y_desc("reward")
        .draw()?;
    chart.draw_series(LineSeries::new(
        rows.iter().map(|r| (r.time as f64, r.cumulative_reward)),
        &BLUE,
    ))?;

    root.present()?;
    log::info!("Reward chart saved to {}", path.display());
    Ok(())
}
