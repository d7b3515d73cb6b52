use crate::communication::messages::EngineEvent;
use crate::config::SimConfig;
use crate::control_system::reward_policy::{RewardEvent, RewardPolicy};
use crate::monitoring::event_log::{EventLog, LogCategory};
use crate::simulation_engine::environment::Environment;
use crate::simulation_engine::lanes::LaneId;
use crate::simulation_engine::random::RandomSource;

/// What happened to the emergency episode during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyOutcome {
    Idle,
    Spawned(LaneId),
    /// The vehicle had green this tick.
    Passing,
    /// The vehicle sat at red this tick and did not crash.
    Waiting,
    Crossed,
    Crashed,
    TimedOut,
}

/// Spawns, tracks and resolves emergency-vehicle episodes. The crash model is a tunable
/// risk signal (red light + cross traffic queued), not a collision simulation.
#[derive(Debug, Clone, Copy)]
pub struct EmergencyManager {
    spawn_probability: f64,
    initial_ticks: i32,
    failsafe_ticks: i32,
    crash_probability: f64,
}

impl EmergencyManager {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            spawn_probability: config.per_tick(config.emergency_spawn_probability),
            initial_ticks: config.emergency_initial_ticks,
            failsafe_ticks: config.emergency_failsafe_ticks,
            crash_probability: config.crash_probability,
        }
    }

    pub fn tick<R: RandomSource>(
        &self,
        env: &mut Environment,
        rewards: &RewardPolicy,
        rng: &mut R,
        log: &mut EventLog,
        outbox: &mut Vec<EngineEvent>,
    ) -> EmergencyOutcome {
        if !env.emergency.active {
            return self.try_spawn(env, rng, log, outbox);
        }
        let lane = match env.emergency.lane {
            Some(lane) => lane,
            None => {
                // Inconsistent record; drop it rather than act on a missing lane.
                env.emergency.deactivate();
                return EmergencyOutcome::Idle;
            }
        };

        // Resolved once the view has shown the vehicle and no longer draws it.
        if !env.emergency.awaiting_visual_spawn && !env.emergency.visually_present {
            if !env.emergency.crashed {
                env.emergency_stats.crossed += 1;
                if env.emergency.did_wait {
                    env.emergency_stats.waited += 1;
                }
            }
            let waited = env.emergency.did_wait;
            env.emergency.deactivate();
            log.push(
                env.time,
                format!(
                    "Emergency vehicle cleared the {} approach{}",
                    lane,
                    if waited { " after waiting" } else { "" }
                ),
                LogCategory::Normal,
            );
            return EmergencyOutcome::Crossed;
        }

        let mut outcome = if env.lane(lane).green {
            env.reward(rewards.weight(RewardEvent::AmbulancePassed));
            EmergencyOutcome::Passing
        } else {
            env.emergency.did_wait = true;
            env.reward(rewards.weight(RewardEvent::AmbulanceWaiting));

            let cross_traffic = lane.crossing().iter().any(|&id| env.lane(id).queue > 0);
            if cross_traffic && rng.chance(self.crash_probability) {
                env.reward(rewards.weight(RewardEvent::AmbulanceCrash));
                env.emergency.crashed = true;
                env.emergency_stats.crashed += 1;
                env.emergency.deactivate();
                outbox.push(EngineEvent::RemoveEmergencyVehicle { lane });
                log.push(
                    env.time,
                    format!("Emergency vehicle crashed running the red on {}", lane),
                    LogCategory::Alert,
                );
                return EmergencyOutcome::Crashed;
            }
            EmergencyOutcome::Waiting
        };

        env.emergency.ticks_remaining -= 1;
        if env.emergency.ticks_remaining <= self.failsafe_ticks {
            env.emergency.deactivate();
            outbox.push(EngineEvent::RemoveEmergencyVehicle { lane });
            log.push(
                env.time,
                format!("Emergency on {} timed out; forcing cleanup", lane),
                LogCategory::Alert,
            );
            outcome = EmergencyOutcome::TimedOut;
        }
        outcome
    }

    fn try_spawn<R: RandomSource>(
        &self,
        env: &mut Environment,
        rng: &mut R,
        log: &mut EventLog,
        outbox: &mut Vec<EngineEvent>,
    ) -> EmergencyOutcome {
        if !rng.chance(self.spawn_probability) {
            return EmergencyOutcome::Idle;
        }
        let lane = LaneId::ALL[rng.pick(LaneId::ALL.len())];
        env.emergency.activate(lane, self.initial_ticks);
        outbox.push(EngineEvent::SpawnEmergencyVehicle { lane });
        log.push(
            env.time,
            format!("Emergency vehicle approaching from {}", lane),
            LogCategory::Alert,
        );
        EmergencyOutcome::Spawned(lane)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_engine::random::ScriptedRolls;

    struct Fixture {
        env: Environment,
        rewards: RewardPolicy,
        log: EventLog,
        outbox: Vec<EngineEvent>,
        manager: EmergencyManager,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                env: Environment::new(),
                rewards: RewardPolicy::default(),
                log: EventLog::default(),
                outbox: Vec::new(),
                manager: EmergencyManager::new(&SimConfig::default()),
            }
        }

        fn tick(&mut self, rng: &mut ScriptedRolls) -> EmergencyOutcome {
            self.manager.tick(
                &mut self.env,
                &self.rewards,
                rng,
                &mut self.log,
                &mut self.outbox,
            )
        }
    }

    #[test]
    fn spawn_picks_lane_and_requests_vehicle() {
        let mut fx = Fixture::new();
        // Spawn roll succeeds, lane pick 0.6 -> East.
        let mut rolls = ScriptedRolls::new([0.0, 0.6], 0.99);
        assert_eq!(fx.tick(&mut rolls), EmergencyOutcome::Spawned(LaneId::East));
        assert!(fx.env.emergency.active);
        assert_eq!(fx.env.emergency.lane, Some(LaneId::East));
        assert_eq!(fx.env.emergency.ticks_remaining, 5);
        assert!(fx.env.emergency.awaiting_visual_spawn);
        assert_eq!(
            fx.outbox,
            vec![EngineEvent::SpawnEmergencyVehicle { lane: LaneId::East }]
        );
    }

    #[test]
    fn waiting_on_red_accrues_penalty_each_tick() {
        let mut fx = Fixture::new();
        fx.env.emergency.activate(LaneId::East, 5);
        let before = fx.env.cumulative_reward;
        let mut rolls = ScriptedRolls::never();
        for _ in 0..3 {
            assert_eq!(fx.tick(&mut rolls), EmergencyOutcome::Waiting);
        }
        assert!(fx.env.emergency.did_wait);
        let expected = 3.0 * fx.rewards.ambulance_waiting;
        assert!((fx.env.cumulative_reward - before - expected).abs() < 1e-9);
        assert_eq!(fx.env.emergency.ticks_remaining, 2);
    }

    #[test]
    fn green_lane_earns_passing_reward() {
        let mut fx = Fixture::new();
        fx.env.emergency.activate(LaneId::North, 5);
        let mut rolls = ScriptedRolls::never();
        assert_eq!(fx.tick(&mut rolls), EmergencyOutcome::Passing);
        assert_eq!(fx.env.cumulative_reward, fx.rewards.ambulance_passed);
        assert!(!fx.env.emergency.did_wait);
    }

    #[test]
    fn red_with_cross_traffic_can_crash() {
        let mut fx = Fixture::new();
        fx.env.emergency.activate(LaneId::East, 5);
        fx.env.lane_mut(LaneId::North).queue = 2;
        let mut rolls = ScriptedRolls::always();
        assert_eq!(fx.tick(&mut rolls), EmergencyOutcome::Crashed);
        assert!(!fx.env.emergency.active);
        assert_eq!(fx.env.emergency.lane, None);
        assert_eq!(fx.env.emergency_stats.crashed, 1);
        assert_eq!(fx.env.emergency_stats.crossed, 0);
        let expected = fx.rewards.ambulance_waiting + fx.rewards.ambulance_crash;
        assert!((fx.env.cumulative_reward - expected).abs() < 1e-9);
        assert_eq!(
            fx.outbox,
            vec![EngineEvent::RemoveEmergencyVehicle { lane: LaneId::East }]
        );
    }

    #[test]
    fn no_crash_roll_without_cross_traffic() {
        let mut fx = Fixture::new();
        fx.env.emergency.activate(LaneId::East, 5);
        let mut rolls = ScriptedRolls::always();
        assert_eq!(fx.tick(&mut rolls), EmergencyOutcome::Waiting);
        assert_eq!(fx.env.emergency_stats.crashed, 0);
    }

    #[test]
    fn resolves_after_vehicle_leaves_the_view() {
        let mut fx = Fixture::new();
        fx.env.emergency.activate(LaneId::East, 5);
        let mut rolls = ScriptedRolls::never();
        fx.tick(&mut rolls);

        fx.env.emergency.awaiting_visual_spawn = false;
        fx.env.emergency.visually_present = true;
        assert_eq!(fx.tick(&mut rolls), EmergencyOutcome::Waiting);

        fx.env.emergency.visually_present = false;
        let reward_before = fx.env.cumulative_reward;
        assert_eq!(fx.tick(&mut rolls), EmergencyOutcome::Crossed);
        assert_eq!(fx.env.cumulative_reward, reward_before);
        assert_eq!(fx.env.emergency_stats.crossed, 1);
        assert_eq!(fx.env.emergency_stats.waited, 1);
        assert!(!fx.env.emergency.active);
    }

    #[test]
    fn failsafe_forces_cleanup() {
        let mut fx = Fixture::new();
        fx.env.emergency.activate(LaneId::North, 5);
        let mut rolls = ScriptedRolls::never();
        let mut ticks = 0;
        let outcome = loop {
            ticks += 1;
            let outcome = fx.tick(&mut rolls);
            if !fx.env.emergency.active {
                break outcome;
            }
        };
        assert_eq!(outcome, EmergencyOutcome::TimedOut);
        assert_eq!(ticks, 60);
        assert_eq!(fx.env.emergency_stats.crossed, 0);
        assert_eq!(
            fx.outbox.last(),
            Some(&EngineEvent::RemoveEmergencyVehicle {
                lane: LaneId::North
            })
        );
    }

    #[test]
    fn spawn_rate_is_scaled_by_speed() {
        let manager = EmergencyManager::new(&SimConfig {
            sim_speed: 4,
            ..SimConfig::default()
        });
        assert!((manager.spawn_probability - 0.0075).abs() < 1e-12);
        assert_eq!(manager.crash_probability, 0.3);
    }
}
