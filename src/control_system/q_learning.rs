//! Tabular Q-learning over a small discretized view of the intersection.
//!
//! The state is `(phase, pressure class, emergency flag)`, 12 keys in total. The agent only
//! decides at decision points (after the minimum green time), and credits each decision with
//! all reward accrued until the next one.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::communication::messages::EngineEvent;
use crate::config::SimConfig;
use crate::control_system::reward_policy::RewardPolicy;
use crate::control_system::traffic_light_controller::TrafficLightController;
use crate::error::SimResult;
use crate::monitoring::event_log::{EventLog, LogCategory};
use crate::simulation_engine::environment::Environment;
use crate::simulation_engine::intersections::Phase;
use crate::simulation_engine::random::RandomSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PressureClass {
    HighNs,
    HighEw,
    Balanced,
}

impl PressureClass {
    /// Classifies `pressure(NS) - pressure(EW)` against `±threshold` (strict).
    pub fn classify(difference: i32, threshold: i32) -> Self {
        if difference > threshold {
            PressureClass::HighNs
        } else if difference < -threshold {
            PressureClass::HighEw
        } else {
            PressureClass::Balanced
        }
    }

    fn code(self) -> &'static str {
        match self {
            PressureClass::HighNs => "HIGH_NS",
            PressureClass::HighEw => "HIGH_EW",
            PressureClass::Balanced => "BALANCED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EmergencyFlag {
    Amb,
    None,
}

impl EmergencyFlag {
    fn code(self) -> &'static str {
        match self {
            EmergencyFlag::Amb => "AMB",
            EmergencyFlag::None => "NONE",
        }
    }
}

/// Discretized agent state. Persisted as `"PHASE:PRESSURE:FLAG"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub phase: Phase,
    pub pressure: PressureClass,
    pub emergency: EmergencyFlag,
}

impl StateKey {
    pub fn observe(env: &Environment, threshold: i32) -> Self {
        Self {
            phase: env.phase,
            pressure: PressureClass::classify(env.pressure.difference(), threshold),
            emergency: if env.emergency.active {
                EmergencyFlag::Amb
            } else {
                EmergencyFlag::None
            },
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.phase,
            self.pressure.code(),
            self.emergency.code()
        )
    }
}

impl FromStr for StateKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(format!("state key '{}' must have three parts", s));
        }
        let phase = parts[0].parse::<Phase>()?;
        let pressure = match parts[1] {
            "HIGH_NS" => PressureClass::HighNs,
            "HIGH_EW" => PressureClass::HighEw,
            "BALANCED" => PressureClass::Balanced,
            other => return Err(format!("unknown pressure class '{}'", other)),
        };
        let emergency = match parts[2] {
            "AMB" => EmergencyFlag::Amb,
            "NONE" => EmergencyFlag::None,
            other => return Err(format!("unknown emergency flag '{}'", other)),
        };
        Ok(Self {
            phase,
            pressure,
            emergency,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Keep the current phase.
    Extend,
    /// Request the opposite phase.
    Switch,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionValues {
    #[serde(rename = "EXTEND")]
    pub extend: f64,
    #[serde(rename = "SWITCH")]
    pub switch: f64,
}

impl ActionValues {
    pub fn get(&self, action: Action) -> f64 {
        match action {
            Action::Extend => self.extend,
            Action::Switch => self.switch,
        }
    }

    fn slot(&mut self, action: Action) -> &mut f64 {
        match action {
            Action::Extend => &mut self.extend,
            Action::Switch => &mut self.switch,
        }
    }

    pub fn max(&self) -> f64 {
        self.extend.max(self.switch)
    }

    /// Ties go to `Extend`.
    pub fn best(&self) -> Action {
        if self.switch > self.extend {
            Action::Switch
        } else {
            Action::Extend
        }
    }
}

/// Action values per state, zero-initialized on first access.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QTable {
    entries: HashMap<StateKey, ActionValues>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read without inserting.
    pub fn get(&self, key: &StateKey) -> ActionValues {
        self.entries.get(key).copied().unwrap_or_default()
    }

    pub fn entry(&mut self, key: StateKey) -> &mut ActionValues {
        self.entries.entry(key).or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, &ActionValues)> {
        self.entries.iter()
    }

    /// Flat JSON object keyed by the string form of each state, sorted for stable output.
    pub fn to_json(&self) -> SimResult<String> {
        let flat: BTreeMap<String, ActionValues> = self
            .entries
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        Ok(serde_json::to_string(&flat)?)
    }

    /// Merges persisted entries, replacing any existing values for the same state.
    /// Unrecognized keys are skipped. Returns the number of merged entries.
    pub fn merge_json(&mut self, json: &str) -> SimResult<usize> {
        let flat: HashMap<String, ActionValues> = serde_json::from_str(json)?;
        let mut merged = 0;
        for (raw_key, values) in flat {
            match raw_key.parse::<StateKey>() {
                Ok(key) => {
                    self.entries.insert(key, values);
                    merged += 1;
                }
                Err(e) => log::warn!("Skipping persisted Q entry: {}", e),
            }
        }
        Ok(merged)
    }
}

/// The decision the next update will credit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub state: StateKey,
    pub action: Action,
    /// Cumulative reward when the decision was taken.
    pub reward_mark: f64,
}

#[derive(Debug, Clone)]
pub struct QLearningAgent {
    pub alpha: f64,
    pub gamma: f64,
    pub epsilon: f64,
    pub pressure_threshold: i32,
    pub table: QTable,
    previous: Option<Decision>,
    updates: u64,
}

impl QLearningAgent {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            alpha: config.alpha,
            gamma: config.gamma,
            epsilon: config.epsilon,
            pressure_threshold: config.pressure_threshold,
            table: QTable::new(),
            previous: None,
            updates: 0,
        }
    }

    pub fn previous(&self) -> Option<Decision> {
        self.previous
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Forgets the in-flight decision; learned values stay.
    pub fn clear_episode(&mut self) {
        self.previous = None;
    }

    pub fn observe(&self, env: &Environment) -> StateKey {
        StateKey::observe(env, self.pressure_threshold)
    }

    /// Epsilon-greedy choice.
    pub fn select_action<R: RandomSource>(&mut self, state: StateKey, rng: &mut R) -> Action {
        if self.epsilon > 0.0 && rng.chance(self.epsilon) {
            return if rng.pick(2) == 0 {
                Action::Extend
            } else {
                Action::Switch
            };
        }
        self.table.entry(state).best()
    }

    /// One-step Q-learning backup for the previous decision.
    pub fn learn(&mut self, previous: Decision, reward: f64, current: StateKey) {
        let next_max = self.table.entry(current).max();
        let (alpha, gamma) = (self.alpha, self.gamma);
        let q = self.table.entry(previous.state).slot(previous.action);
        let current = *q;
        *q = current + alpha * (reward + gamma * next_max - current);
        self.updates += 1;
    }

    /// Runs one decision point if the phase has been green long enough. Returns the action
    /// taken, or `None` when gated.
    pub fn act<R: RandomSource>(
        &mut self,
        env: &mut Environment,
        controller: &TrafficLightController,
        rewards: &RewardPolicy,
        rng: &mut R,
        log: &mut EventLog,
        outbox: &mut Vec<EngineEvent>,
    ) -> Option<Action> {
        if !controller.can_switch(env) {
            return None;
        }

        let state = self.observe(env);
        if let Some(previous) = self.previous {
            let reward = env.cumulative_reward - previous.reward_mark;
            env.stats.last_decision_reward = reward;
            self.learn(previous, reward, state);
        }

        let action = self.select_action(state, rng);
        // Marked before acting so a switch penalty is credited to the switch.
        self.previous = Some(Decision {
            state,
            action,
            reward_mark: env.cumulative_reward,
        });

        match action {
            Action::Switch => {
                let target = env.phase.opposite();
                controller.switch_to(env, target, rewards, log, outbox);
            }
            Action::Extend => {
                log.push(
                    env.time,
                    format!(
                        "Extending {} (pressure NS {} / EW {})",
                        env.phase, env.pressure.ns, env.pressure.ew
                    ),
                    LogCategory::Extend,
                );
            }
        }
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_engine::random::ScriptedRolls;

    fn key(phase: Phase, pressure: PressureClass, emergency: EmergencyFlag) -> StateKey {
        StateKey {
            phase,
            pressure,
            emergency,
        }
    }

    #[test]
    fn pressure_class_thresholds() {
        assert_eq!(PressureClass::classify(4, 3), PressureClass::HighNs);
        assert_eq!(PressureClass::classify(3, 3), PressureClass::Balanced);
        assert_eq!(PressureClass::classify(-3, 3), PressureClass::Balanced);
        assert_eq!(PressureClass::classify(-4, 3), PressureClass::HighEw);
    }

    #[test]
    fn state_key_string_form_parses_back() {
        let k = key(Phase::EastWest, PressureClass::HighNs, EmergencyFlag::Amb);
        assert_eq!(k.to_string(), "EW:HIGH_NS:AMB");
        assert_eq!("EW:HIGH_NS:AMB".parse::<StateKey>(), Ok(k));
        assert!("EW:HIGH:AMB".parse::<StateKey>().is_err());
        assert!("EW:HIGH_NS".parse::<StateKey>().is_err());
    }

    #[test]
    fn greedy_prefers_extend_on_ties() {
        let mut agent = QLearningAgent::new(&SimConfig {
            epsilon: 0.0,
            ..SimConfig::default()
        });
        let s = key(Phase::NorthSouth, PressureClass::Balanced, EmergencyFlag::None);
        let mut rng = ScriptedRolls::never();
        assert_eq!(agent.select_action(s, &mut rng), Action::Extend);
        assert_eq!(agent.table.len(), 1);

        agent.table.entry(s).switch = 0.5;
        assert_eq!(agent.select_action(s, &mut rng), Action::Switch);
    }

    #[test]
    fn exploration_picks_uniformly() {
        let mut agent = QLearningAgent::new(&SimConfig::default());
        let s = key(Phase::NorthSouth, PressureClass::Balanced, EmergencyFlag::None);
        // Explore roll 0.05 < 0.1, then pick 0.7 -> Switch.
        let mut rng = ScriptedRolls::new([0.05, 0.7], 0.99);
        assert_eq!(agent.select_action(s, &mut rng), Action::Switch);
    }

    #[test]
    fn bellman_backup_matches_formula() {
        let mut agent = QLearningAgent::new(&SimConfig::default());
        let s = key(Phase::NorthSouth, PressureClass::HighEw, EmergencyFlag::None);
        let next = key(Phase::EastWest, PressureClass::Balanced, EmergencyFlag::None);
        agent.table.entry(s).switch = 1.0;
        agent.table.entry(next).extend = 2.0;
        agent.table.entry(next).switch = 4.0;
        let decision = Decision {
            state: s,
            action: Action::Switch,
            reward_mark: 0.0,
        };
        agent.learn(decision, 3.0, next);
        // 1 + 0.1 * (3 + 0.9 * 4 - 1)
        assert!((agent.table.get(&s).switch - 1.56).abs() < 1e-9);
        assert_eq!(agent.table.get(&s).extend, 0.0);
        assert_eq!(agent.updates(), 1);
    }

    #[test]
    fn act_is_gated_by_min_green() {
        let config = SimConfig {
            min_green_time: 20,
            ..SimConfig::default()
        };
        let mut agent = QLearningAgent::new(&config);
        let controller = TrafficLightController::new(config.min_green_time);
        let mut env = Environment::new();
        env.ticks_since_switch = 19;
        let mut log = EventLog::default();
        let mut outbox = Vec::new();
        let mut rng = ScriptedRolls::never();
        let action = agent.act(
            &mut env,
            &controller,
            &config.rewards,
            &mut rng,
            &mut log,
            &mut outbox,
        );
        assert_eq!(action, None);
        assert!(agent.table.is_empty());
        assert_eq!(agent.previous(), None);
    }

    #[test]
    fn reward_since_last_decision_is_credited() {
        let config = SimConfig {
            min_green_time: 0,
            epsilon: 0.0,
            ..SimConfig::default()
        };
        let mut agent = QLearningAgent::new(&config);
        let controller = TrafficLightController::new(0);
        let mut env = Environment::new();
        let mut log = EventLog::default();
        let mut outbox = Vec::new();
        let mut rng = ScriptedRolls::never();

        let first = agent.act(&mut env, &controller, &config.rewards, &mut rng, &mut log, &mut outbox);
        assert_eq!(first, Some(Action::Extend));
        let s = agent.previous().unwrap().state;

        env.reward(10.0);
        agent.act(&mut env, &controller, &config.rewards, &mut rng, &mut log, &mut outbox);
        // 0 + 0.1 * (10 + 0.9 * 0 - 0)
        assert!((agent.table.get(&s).extend - 1.0).abs() < 1e-9);
        assert_eq!(env.stats.last_decision_reward, 10.0);
        assert_eq!(agent.previous().unwrap().reward_mark, 10.0);
    }

    #[test]
    fn switch_penalty_lands_in_the_next_update() {
        let config = SimConfig {
            min_green_time: 0,
            epsilon: 0.0,
            ..SimConfig::default()
        };
        let mut agent = QLearningAgent::new(&config);
        let controller = TrafficLightController::new(0);
        let mut env = Environment::new();
        let mut log = EventLog::default();
        let mut outbox = Vec::new();
        let mut rng = ScriptedRolls::never();
        let s = key(Phase::NorthSouth, PressureClass::Balanced, EmergencyFlag::None);
        agent.table.entry(s).switch = 1.0;

        let first = agent.act(&mut env, &controller, &config.rewards, &mut rng, &mut log, &mut outbox);
        assert_eq!(first, Some(Action::Switch));
        assert_eq!(env.phase, Phase::EastWest);
        assert_eq!(agent.previous().unwrap().reward_mark, 0.0);

        agent.act(&mut env, &controller, &config.rewards, &mut rng, &mut log, &mut outbox);
        let penalty = config.rewards.phase_switch;
        assert_eq!(env.stats.last_decision_reward, penalty);
        // 1 + 0.1 * (penalty + 0.9 * 0 - 1)
        let expected = 1.0 + config.alpha * (penalty - 1.0);
        assert!((agent.table.get(&s).switch - expected).abs() < 1e-9);
    }

    #[test]
    fn json_merge_replaces_and_skips_bad_keys() {
        let mut table = QTable::new();
        let s = key(Phase::NorthSouth, PressureClass::Balanced, EmergencyFlag::None);
        table.entry(s).extend = 9.0;
        let json = r#"{"NS:BALANCED:NONE": {"EXTEND": 1.5, "SWITCH": -2.0}, "bogus": {"EXTEND": 0, "SWITCH": 0}}"#;
        assert_eq!(table.merge_json(json).unwrap(), 1);
        assert_eq!(
            table.get(&s),
            ActionValues {
                extend: 1.5,
                switch: -2.0
            }
        );

        let out = table.to_json().unwrap();
        assert_eq!(out, r#"{"NS:BALANCED:NONE":{"EXTEND":1.5,"SWITCH":-2.0}}"#);
    }
}
