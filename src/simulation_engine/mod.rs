// simulation_engine/mod.rs
pub mod arrivals;
pub mod emergency;
pub mod engine;
pub mod environment;
pub mod intersections;
pub mod lanes;
pub mod random;
pub mod simulation;
