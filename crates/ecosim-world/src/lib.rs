//! Simulation core: the entity model, the spatial grid, and the world that
//! advances them one tick at a time.

pub mod grid;
pub mod organism;
pub mod world;

pub use grid::{Cell, Grid};
pub use organism::{KindState, Organism};
pub use world::World;
