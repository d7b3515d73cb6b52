use serde::Serialize;

use crate::control_system::reward_policy::{RewardEvent, RewardPolicy};
use crate::simulation_engine::intersections::{Phase, PhasePressure};
use crate::simulation_engine::lanes::{Lane, LaneId};

/// The single in-flight emergency episode, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmergencyState {
    pub active: bool,
    /// Set iff `active`.
    pub lane: Option<LaneId>,
    /// Counts down from the initial budget and may go negative until the failsafe fires.
    pub ticks_remaining: i32,
    pub did_wait: bool,
    pub crashed: bool,
    /// The view has not yet acknowledged the spawn request.
    pub awaiting_visual_spawn: bool,
    /// The view reports the emergency vehicle is still drawn.
    pub visually_present: bool,
}

impl EmergencyState {
    pub fn activate(&mut self, lane: LaneId, ticks: i32) {
        *self = EmergencyState {
            active: true,
            lane: Some(lane),
            ticks_remaining: ticks,
            did_wait: false,
            crashed: false,
            awaiting_visual_spawn: true,
            visually_present: false,
        };
    }

    /// Ends the episode. `crashed` and `did_wait` are kept for inspection.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.lane = None;
        self.awaiting_visual_spawn = false;
        self.visually_present = false;
    }
}

/// Monotonic counters, cleared only by a full reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EmergencyStats {
    pub crossed: u64,
    pub crashed: u64,
    pub waited: u64,
}

/// Aggregates recomputed at the end of each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TickStats {
    pub total_queue: u32,
    pub cars_passed: u64,
    pub average_wait: f64,
    /// Reward credited at the most recent decision point.
    pub last_decision_reward: f64,
}

/// The authoritative simulation record. Only engine components mutate it.
#[derive(Debug, Clone)]
pub struct Environment {
    pub phase: Phase,
    pub lanes: [Lane; 4],
    pub time: u64,
    /// Sum over ticks of vehicles left waiting.
    pub queue_time: u64,
    pub ticks_since_switch: u32,
    pub pressure: PhasePressure,
    pub cumulative_reward: f64,
    pub emergency: EmergencyState,
    pub emergency_stats: EmergencyStats,
    pub stats: TickStats,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        let phase = Phase::NorthSouth;
        Self {
            phase,
            lanes: LaneId::ALL.map(|id| Lane::new(id, phase.is_green(id))),
            time: 0,
            queue_time: 0,
            ticks_since_switch: 0,
            pressure: PhasePressure::default(),
            cumulative_reward: 0.0,
            emergency: EmergencyState::default(),
            emergency_stats: EmergencyStats::default(),
            stats: TickStats::default(),
        }
    }

    pub fn lane(&self, id: LaneId) -> &Lane {
        &self.lanes[id.index()]
    }

    pub fn lane_mut(&mut self, id: LaneId) -> &mut Lane {
        &mut self.lanes[id.index()]
    }

    pub fn total_queue(&self) -> u32 {
        self.lanes.iter().map(|l| l.queue).sum()
    }

    pub fn reward(&mut self, amount: f64) {
        self.cumulative_reward += amount;
    }

    /// Sets every lane's signal from the phase membership table.
    pub fn apply_phase_lights(&mut self) {
        let phase = self.phase;
        for lane in self.lanes.iter_mut() {
            lane.green = phase.is_green(lane.id);
        }
    }

    /// Rebuilt from scratch each tick.
    pub fn recompute_pressure(&mut self) {
        let group = |phase: Phase| -> u32 {
            phase
                .lanes()
                .iter()
                .map(|&id| self.lane(id).recent_pressure())
                .sum()
        };
        let ns = group(Phase::NorthSouth);
        let ew = group(Phase::EastWest);
        self.pressure = PhasePressure { ns, ew };
    }

    /// Releases queued vehicles on green lanes and returns how many went through.
    pub fn release_green(&mut self, max_pass: u32) -> u32 {
        self.lanes.iter_mut().map(|lane| lane.release(max_pass)).sum()
    }

    /// Lets vehicles through on green and credits the throughput reward.
    pub fn release_queues(&mut self, max_pass: u32, rewards: &RewardPolicy) -> u32 {
        let released = self.release_green(max_pass);
        self.stats.cars_passed += released as u64;
        self.reward(released as f64 * rewards.weight(RewardEvent::CarPassed));
        released
    }

    /// Charges the per-vehicle waiting penalty for everything still queued.
    pub fn accrue_waiting(&mut self, rewards: &RewardPolicy) {
        let waiting = self.total_queue();
        self.queue_time += waiting as u64;
        self.reward(waiting as f64 * rewards.weight(RewardEvent::CarWaiting));
    }

    pub fn refresh_stats(&mut self) {
        self.stats.total_queue = self.total_queue();
        self.stats.average_wait = if self.time == 0 {
            0.0
        } else {
            self.queue_time as f64 / self.time as f64
        };
    }

    pub fn snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            phase: self.phase,
            lanes: self
                .lanes
                .iter()
                .map(|l| LaneView {
                    id: l.id,
                    queue: l.queue,
                    green: l.green,
                    visual_queue: l.visual_queue,
                })
                .collect(),
            pressure: self.pressure,
            cumulative_reward: self.cumulative_reward,
            emergency: EmergencyView {
                active: self.emergency.active,
                lane: self.emergency.lane,
            },
            emergency_stats: self.emergency_stats,
            stats: self.stats,
            time: self.time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaneView {
    pub id: LaneId,
    pub queue: u32,
    pub green: bool,
    pub visual_queue: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmergencyView {
    pub active: bool,
    pub lane: Option<LaneId>,
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentSnapshot {
    pub phase: Phase,
    pub lanes: Vec<LaneView>,
    pub pressure: PhasePressure,
    pub cumulative_reward: f64,
    pub emergency: EmergencyView,
    pub emergency_stats: EmergencyStats,
    pub stats: TickStats,
    pub time: u64,
}

impl EnvironmentSnapshot {
    pub fn lane(&self, id: LaneId) -> Option<&LaneView> {
        self.lanes.iter().find(|l| l.id == id)
    }
}
