use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::global_variables::{
    AMBULANCE_CRASH_REWARD, AMBULANCE_PASSED_REWARD, AMBULANCE_WAITING_REWARD, CAR_PASSED_REWARD,
    CAR_WAITING_REWARD, PHASE_SWITCH_REWARD,
};

/// Every event the engine can reward or penalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RewardEvent {
    CarPassed,
    CarWaiting,
    PhaseSwitch,
    AmbulancePassed,
    AmbulanceWaiting,
    AmbulanceCrash,
}

impl RewardEvent {
    pub const ALL: [RewardEvent; 6] = [
        RewardEvent::CarPassed,
        RewardEvent::CarWaiting,
        RewardEvent::PhaseSwitch,
        RewardEvent::AmbulancePassed,
        RewardEvent::AmbulanceWaiting,
        RewardEvent::AmbulanceCrash,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RewardEvent::CarPassed => "CAR_PASSED",
            RewardEvent::CarWaiting => "CAR_WAITING",
            RewardEvent::PhaseSwitch => "PHASE_SWITCH",
            RewardEvent::AmbulancePassed => "AMBULANCE_PASSED",
            RewardEvent::AmbulanceWaiting => "AMBULANCE_WAITING",
            RewardEvent::AmbulanceCrash => "AMBULANCE_CRASH",
        }
    }
}

impl fmt::Display for RewardEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for RewardEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        RewardEvent::ALL
            .iter()
            .copied()
            .find(|event| event.name() == wanted)
            .ok_or_else(|| format!("unknown reward event '{}'", s))
    }
}

/// User-adjustable weight for each reward event. Read by reward computation, written only
/// through configuration or overrides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RewardPolicy {
    pub car_passed: f64,
    pub car_waiting: f64,
    pub phase_switch: f64,
    pub ambulance_passed: f64,
    pub ambulance_waiting: f64,
    pub ambulance_crash: f64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            car_passed: CAR_PASSED_REWARD,
            car_waiting: CAR_WAITING_REWARD,
            phase_switch: PHASE_SWITCH_REWARD,
            ambulance_passed: AMBULANCE_PASSED_REWARD,
            ambulance_waiting: AMBULANCE_WAITING_REWARD,
            ambulance_crash: AMBULANCE_CRASH_REWARD,
        }
    }
}

impl RewardPolicy {
    pub fn weight(&self, event: RewardEvent) -> f64 {
        match event {
            RewardEvent::CarPassed => self.car_passed,
            RewardEvent::CarWaiting => self.car_waiting,
            RewardEvent::PhaseSwitch => self.phase_switch,
            RewardEvent::AmbulancePassed => self.ambulance_passed,
            RewardEvent::AmbulanceWaiting => self.ambulance_waiting,
            RewardEvent::AmbulanceCrash => self.ambulance_crash,
        }
    }

    pub fn set(&mut self, event: RewardEvent, value: f64) {
        let slot = match event {
            RewardEvent::CarPassed => &mut self.car_passed,
            RewardEvent::CarWaiting => &mut self.car_waiting,
            RewardEvent::PhaseSwitch => &mut self.phase_switch,
            RewardEvent::AmbulancePassed => &mut self.ambulance_passed,
            RewardEvent::AmbulanceWaiting => &mut self.ambulance_waiting,
            RewardEvent::AmbulanceCrash => &mut self.ambulance_crash,
        };
        *slot = value;
    }

    /// Applies a raw override coming from the presentation layer. Values that do not parse
    /// as a number become 0. Returns false when the event name is unknown.
    pub fn apply_override(&mut self, event_name: &str, raw_value: &str) -> bool {
        match event_name.parse::<RewardEvent>() {
            Ok(event) => {
                let value = raw_value.trim().parse::<f64>().unwrap_or(0.0);
                let value = if value.is_finite() { value } else { 0.0 };
                log::info!("Reward weight {} set to {}", event, value);
                self.set(event, value);
                true
            }
            Err(e) => {
                log::warn!("Ignoring reward override: {}", e);
                false
            }
        }
    }
}
