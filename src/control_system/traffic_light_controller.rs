use crate::communication::messages::EngineEvent;
use crate::control_system::reward_policy::{RewardEvent, RewardPolicy};
use crate::monitoring::event_log::{EventLog, LogCategory};
use crate::simulation_engine::environment::Environment;
use crate::simulation_engine::intersections::Phase;

/// Gates and performs phase transitions for the intersection.
#[derive(Debug, Clone, Copy)]
pub struct TrafficLightController {
    pub min_green_time: u32,
}

impl TrafficLightController {
    pub fn new(min_green_time: u32) -> Self {
        Self { min_green_time }
    }

    /// Whether the current phase has been green long enough to change.
    pub fn can_switch(&self, env: &Environment) -> bool {
        env.ticks_since_switch >= self.min_green_time
    }

    /// Switches to `phase` if the minimum green time has elapsed and it is not already
    /// active. A rejected request leaves everything untouched. Returns whether the switch
    /// happened.
    pub fn switch_to(
        &self,
        env: &mut Environment,
        phase: Phase,
        rewards: &RewardPolicy,
        log: &mut EventLog,
        outbox: &mut Vec<EngineEvent>,
    ) -> bool {
        if !self.can_switch(env) || phase == env.phase {
            return false;
        }

        let previous = env.phase;
        env.phase = phase;
        env.ticks_since_switch = 0;
        env.apply_phase_lights();

        // Switching is free while an emergency is in progress.
        if !env.emergency.active {
            env.reward(rewards.weight(RewardEvent::PhaseSwitch));
        }

        log.push(
            env.time,
            format!("Switched {} -> {}", previous, phase),
            LogCategory::Switch,
        );
        outbox.push(EngineEvent::PhaseChanged { phase });
        true
    }
}
