//! Tick scheduler for the simulation: state machine, background tick-driver,
//! bounded statistics history, and listener fan-out.

pub mod engine;
pub mod listener;

pub use engine::{SimulationEngine, SimulationState};
pub use listener::SimulationListener;
