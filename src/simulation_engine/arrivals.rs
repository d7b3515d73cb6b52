// arrivals.rs
//
// Per-lane stochastic arrivals. Each lane is either in steady background traffic or in a
// burst (a platoon), during which almost every tick brings a vehicle.

use crate::config::SimConfig;
use crate::simulation_engine::environment::Environment;
use crate::simulation_engine::random::RandomSource;

#[derive(Debug, Clone, Copy)]
pub struct ArrivalGenerator {
    base_probability: f64,
    burst_start_probability: f64,
    burst_probability: f64,
    burst_min: u32,
    burst_span: u32,
}

impl ArrivalGenerator {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            base_probability: config.per_tick(config.arrival_probability),
            burst_start_probability: config.per_tick(config.burst_start_probability),
            burst_probability: config.burst_arrival_probability,
            burst_min: config.burst_min_ticks,
            burst_span: config.burst_max_ticks.saturating_sub(config.burst_min_ticks).max(1),
        }
    }

    /// Rolls arrivals for every lane, then rebuilds phase pressure.
    pub fn generate<R: RandomSource>(&self, env: &mut Environment, rng: &mut R) -> u32 {
        let mut arrived_total = 0;
        for lane in env.lanes.iter_mut() {
            let in_burst = lane.burst_countdown > 0;
            let probability = if in_burst {
                lane.burst_countdown -= 1;
                self.burst_probability
            } else {
                self.base_probability
            };
            let arrived = rng.chance(probability);

            // A new burst only takes effect from the next tick.
            if !in_burst && rng.chance(self.burst_start_probability) {
                lane.burst_countdown = self.burst_min + rng.pick(self.burst_span as usize) as u32;
                log::debug!("Burst on {} for {} ticks", lane.id, lane.burst_countdown);
            }

            lane.record_arrival(arrived);
            if arrived {
                arrived_total += 1;
            }
        }
        env.recompute_pressure();
        arrived_total
    }
}
