// simulation_engine/mod.rs
pub mod demand;
pub mod edge;
pub mod junction;
pub mod loader;
pub mod network;
pub mod node;
pub mod route_generation;
pub mod simulation;
pub mod stoplight;
pub mod vehicles;
