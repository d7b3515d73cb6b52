//! Single-intersection traffic simulation with an online tabular Q-learning signal
//! controller.
//!
//! Each logical tick runs, in order: emergency handling, arrivals, queue release, the
//! agent's decision, and statistics. Rendering is not part of this crate; a view reads
//! [`EnvironmentSnapshot`]s and talks back through [`PresentationSignal`]s.

pub mod communication;
pub mod config;
pub mod control_system;
pub mod error;
pub mod global_variables;
pub mod monitoring;
pub mod simulation_engine;

pub use communication::messages::{ControlCommand, EngineEvent, PresentationSignal};
pub use config::SimConfig;
pub use error::{SimError, SimResult};
pub use simulation_engine::engine::{Engine, TickReport};
pub use simulation_engine::environment::{Environment, EnvironmentSnapshot};
