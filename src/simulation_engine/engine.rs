use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::communication::messages::{ControlCommand, EngineEvent, PresentationSignal};
use crate::config::SimConfig;
use crate::control_system::q_learning::{Action, QLearningAgent};
use crate::control_system::traffic_light_controller::TrafficLightController;
use crate::monitoring::event_log::{EventLog, LogCategory};
use crate::monitoring::persistence::{self, KeyValueStore, LoadOutcome};
use crate::simulation_engine::arrivals::ArrivalGenerator;
use crate::simulation_engine::emergency::{EmergencyManager, EmergencyOutcome};
use crate::simulation_engine::environment::{Environment, EnvironmentSnapshot};
use crate::simulation_engine::random::RandomSource;

/// What one call to `step` did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub time: u64,
    pub emergency: EmergencyOutcome,
    pub arrivals: u32,
    pub released: u32,
    pub action: Option<Action>,
}

/// Owns the environment, the agent and the random source, and advances them one logical
/// tick at a time. Everything runs on the caller's thread.
pub struct Engine<R: RandomSource = SmallRng> {
    config: SimConfig,
    env: Environment,
    agent: QLearningAgent,
    rng: R,
    log: EventLog,
    outbox: Vec<EngineEvent>,
    paused: bool,
    session_seconds: u64,
    session_fraction: f64,
}

impl Engine<SmallRng> {
    pub fn seeded(config: SimConfig, seed: u64) -> Self {
        Self::new(config, SmallRng::seed_from_u64(seed))
    }

    pub fn from_entropy(config: SimConfig) -> Self {
        Self::new(config, SmallRng::from_os_rng())
    }
}

impl<R: RandomSource> Engine<R> {
    pub fn new(config: SimConfig, rng: R) -> Self {
        let config = config.normalized();
        let mut log = EventLog::default();
        log.set_extend_interval(config.extend_log_interval_secs);
        Self {
            agent: QLearningAgent::new(&config),
            env: Environment::new(),
            config,
            rng,
            log,
            outbox: Vec::new(),
            paused: false,
            session_seconds: 0,
            session_fraction: 0.0,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Direct access for scenario setup; normal operation goes through `step` and the
    /// control/signal inputs.
    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn agent(&self) -> &QLearningAgent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut QLearningAgent {
        &mut self.agent
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    pub fn snapshot(&self) -> EnvironmentSnapshot {
        self.env.snapshot()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn session_seconds(&self) -> u64 {
        self.session_seconds
    }

    pub fn controller(&self) -> TrafficLightController {
        TrafficLightController::new(self.config.min_green_time)
    }

    /// Events emitted since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Advances one tick. A paused engine is left completely untouched and `None` is
    /// returned.
    pub fn step(&mut self) -> Option<TickReport> {
        if self.paused {
            return None;
        }

        let tick_seconds = 1.0 / self.config.speed();
        self.env.time += 1;
        self.env.ticks_since_switch = self.env.ticks_since_switch.saturating_add(1);
        self.advance_session_clock(tick_seconds);
        self.log.advance_clock(tick_seconds);

        let rewards = self.config.rewards;
        let emergency = EmergencyManager::new(&self.config).tick(
            &mut self.env,
            &rewards,
            &mut self.rng,
            &mut self.log,
            &mut self.outbox,
        );

        let arrivals = ArrivalGenerator::new(&self.config).generate(&mut self.env, &mut self.rng);
        let released = self.env.release_queues(self.config.max_pass, &rewards);
        self.env.accrue_waiting(&rewards);

        let controller = self.controller();
        let action = self.agent.act(
            &mut self.env,
            &controller,
            &rewards,
            &mut self.rng,
            &mut self.log,
            &mut self.outbox,
        );

        self.env.refresh_stats();
        self.outbox.push(EngineEvent::Refreshed {
            time: self.env.time,
        });

        Some(TickReport {
            time: self.env.time,
            emergency,
            arrivals,
            released,
            action,
        })
    }

    fn advance_session_clock(&mut self, seconds: f64) {
        self.session_fraction += seconds;
        while self.session_fraction >= 1.0 - 1e-9 {
            self.session_fraction -= 1.0;
            self.session_seconds += 1;
        }
        if self.session_fraction < 0.0 {
            self.session_fraction = 0.0;
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            self.paused = paused;
            let message = if paused { "Paused" } else { "Resumed" };
            self.log.push(self.env.time, message, LogCategory::Normal);
        }
    }

    pub fn set_speed(&mut self, speed: u32) {
        let speed = speed.max(1);
        if self.config.sim_speed != speed {
            self.config.sim_speed = speed;
            self.log.push(
                self.env.time,
                format!("Speed set to {}x", speed),
                LogCategory::Normal,
            );
        }
    }

    pub fn override_reward(&mut self, event: &str, value: &str) -> bool {
        self.config.rewards.apply_override(event, value)
    }

    /// Rebuilds the environment and forgets the in-flight decision. Learned values and the
    /// session timer survive.
    pub fn reset(&mut self) {
        if let Some(lane) = self.env.emergency.lane {
            self.outbox.push(EngineEvent::RemoveEmergencyVehicle { lane });
        }
        self.env = Environment::new();
        self.agent.clear_episode();
        self.log.push(0, "Environment reset", LogCategory::Normal);
        self.outbox.push(EngineEvent::Refreshed { time: 0 });
    }

    pub fn clear_session_time(&mut self) {
        self.session_seconds = 0;
        self.session_fraction = 0.0;
    }

    pub fn apply_command(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::SetPaused(paused) => self.set_paused(paused),
            ControlCommand::TogglePause => self.set_paused(!self.paused),
            ControlCommand::SetSpeed(speed) => self.set_speed(speed),
            ControlCommand::OverrideReward { event, value } => {
                self.override_reward(&event, &value);
            }
            ControlCommand::Reset => self.reset(),
            ControlCommand::ClearSessionTime => self.clear_session_time(),
        }
    }

    pub fn apply_signal(&mut self, signal: PresentationSignal) {
        match signal {
            PresentationSignal::EmergencyVehicleShown => {
                let emergency = &mut self.env.emergency;
                if emergency.active && emergency.awaiting_visual_spawn {
                    emergency.awaiting_visual_spawn = false;
                    emergency.visually_present = true;
                }
            }
            PresentationSignal::EmergencyVehicleCleared => {
                // Only a vehicle the view has actually shown can clear.
                let emergency = &mut self.env.emergency;
                if emergency.active && !emergency.awaiting_visual_spawn {
                    emergency.visually_present = false;
                }
            }
            PresentationSignal::CosmeticVehicleSpawned(lane) => {
                self.env.lane_mut(lane).consume_visual();
            }
        }
    }

    /// Merges stored learning into the agent. Never fails; problems are logged.
    pub fn load_from(&mut self, store: &dyn KeyValueStore) -> LoadOutcome {
        let outcome = persistence::load_learning(store, &mut self.agent.table);
        if let Some(seconds) = outcome.session_seconds {
            self.session_seconds = seconds;
        }
        outcome
    }

    pub fn save_to(&self, store: &mut dyn KeyValueStore) -> bool {
        persistence::save_learning(store, &self.agent.table, self.session_seconds)
    }
}
