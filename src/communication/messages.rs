use serde::{Deserialize, Serialize};

use crate::simulation_engine::intersections::Phase;
use crate::simulation_engine::lanes::LaneId;

/// Emitted by the engine for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// An emergency episode started; the view should put a vehicle on `lane`.
    SpawnEmergencyVehicle { lane: LaneId },
    /// The emergency vehicle must disappear (crash or failsafe timeout).
    RemoveEmergencyVehicle { lane: LaneId },
    PhaseChanged { phase: Phase },
    /// A tick finished and the snapshot changed.
    Refreshed { time: u64 },
}

/// Sent back by the presentation layer. These are the only view-originated inputs that
/// touch simulation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentationSignal {
    /// The pending emergency vehicle is now on screen.
    EmergencyVehicleShown,
    /// The emergency vehicle has left the screen.
    EmergencyVehicleCleared,
    /// A cosmetic car was drawn for one queued unit on this lane.
    CosmeticVehicleSpawned(LaneId),
}

/// User controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlCommand {
    SetPaused(bool),
    TogglePause,
    SetSpeed(u32),
    /// Raw values are parsed leniently; anything unparsable counts as 0.
    OverrideReward { event: String, value: String },
    Reset,
    ClearSessionTime,
}
