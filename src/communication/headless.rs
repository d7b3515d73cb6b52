use crate::communication::messages::{EngineEvent, PresentationSignal};
use crate::simulation_engine::engine::Engine;
use crate::simulation_engine::lanes::LaneId;
use crate::simulation_engine::random::RandomSource;

/// Green ticks an emergency vehicle needs before it has driven off screen.
pub const CLEAR_AFTER_GREEN_TICKS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EmergencyVehicle {
    lane: LaneId,
    green_ticks: u32,
}

/// Stand-in for the renderer when running without a display. It only answers the engine's
/// requests through the presentation signals, the same way a real view would.
#[derive(Debug, Default)]
pub struct HeadlessPresenter {
    emergency: Option<EmergencyVehicle>,
    pub frames: u64,
    pub phase_changes: u64,
    pub cosmetic_spawned: u64,
}

impl HeadlessPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_emergency_vehicle(&self) -> bool {
        self.emergency.is_some()
    }

    /// Consumes pending engine events and sends back whatever the view would report.
    pub fn sync<R: RandomSource>(&mut self, engine: &mut Engine<R>) {
        for event in engine.drain_events() {
            match event {
                EngineEvent::SpawnEmergencyVehicle { lane } => {
                    self.emergency = Some(EmergencyVehicle {
                        lane,
                        green_ticks: 0,
                    });
                    engine.apply_signal(PresentationSignal::EmergencyVehicleShown);
                }
                EngineEvent::RemoveEmergencyVehicle { .. } => self.emergency = None,
                EngineEvent::PhaseChanged { .. } => self.phase_changes += 1,
                EngineEvent::Refreshed { .. } => self.frames += 1,
            }
        }

        let snapshot = engine.snapshot();
        if let Some(vehicle) = self.emergency.as_mut() {
            let green = snapshot.lane(vehicle.lane).map(|l| l.green).unwrap_or(false);
            if green {
                vehicle.green_ticks += 1;
            }
            if vehicle.green_ticks >= CLEAR_AFTER_GREEN_TICKS {
                self.emergency = None;
                engine.apply_signal(PresentationSignal::EmergencyVehicleCleared);
            }
        }

        for lane in snapshot.lanes.iter().filter(|l| l.visual_queue > 0) {
            engine.apply_signal(PresentationSignal::CosmeticVehicleSpawned(lane.id));
            self.cosmetic_spawned += 1;
        }
    }
}
