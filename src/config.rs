use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::control_system::reward_policy::RewardPolicy;
use crate::error::SimResult;
use crate::global_variables::*;

/// All engine tunables. Every field falls back to the matching constant in
/// `global_variables` when absent from a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Ticks per wall-clock second. Never below 1.
    pub sim_speed: u32,
    pub min_green_time: u32,
    pub max_pass: u32,
    pub arrival_probability: f64,
    pub burst_start_probability: f64,
    pub burst_arrival_probability: f64,
    pub burst_min_ticks: u32,
    pub burst_max_ticks: u32,
    pub emergency_spawn_probability: f64,
    pub emergency_initial_ticks: i32,
    pub emergency_failsafe_ticks: i32,
    pub crash_probability: f64,
    pub pressure_threshold: i32,
    pub alpha: f64,
    pub gamma: f64,
    pub epsilon: f64,
    pub extend_log_interval_secs: f64,
    pub rewards: RewardPolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            sim_speed: 1,
            min_green_time: MIN_GREEN_TIME,
            max_pass: MAX_PASS,
            arrival_probability: ARRIVAL_PROBABILITY,
            burst_start_probability: BURST_START_PROBABILITY,
            burst_arrival_probability: BURST_ARRIVAL_PROBABILITY,
            burst_min_ticks: BURST_MIN_TICKS,
            burst_max_ticks: BURST_MAX_TICKS,
            emergency_spawn_probability: EMERGENCY_SPAWN_PROBABILITY,
            emergency_initial_ticks: EMERGENCY_INITIAL_TICKS,
            emergency_failsafe_ticks: EMERGENCY_FAILSAFE_TICKS,
            crash_probability: CRASH_PROBABILITY,
            pressure_threshold: PRESSURE_THRESHOLD,
            alpha: ALPHA,
            gamma: GAMMA,
            epsilon: EPSILON,
            extend_log_interval_secs: EXTEND_LOG_INTERVAL_SECS,
            rewards: RewardPolicy::default(),
        }
    }
}

impl SimConfig {
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Clamps values that would break tick arithmetic.
    pub fn normalized(mut self) -> Self {
        self.sim_speed = self.sim_speed.max(1);
        if self.burst_max_ticks <= self.burst_min_ticks {
            self.burst_max_ticks = self.burst_min_ticks + 1;
        }
        self
    }

    pub fn speed(&self) -> f64 {
        self.sim_speed.max(1) as f64
    }

    /// Converts a per-wall-clock-second probability into a per-tick one.
    pub fn per_tick(&self, per_second: f64) -> f64 {
        per_second / self.speed()
    }
}
