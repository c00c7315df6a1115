//! Observer contract exposed to rendering/UI collaborators.

use crate::engine::SimulationState;
use ecosim_core::EcosystemStats;

/// Receives engine notifications. Implementations must be `Send + Sync`;
/// callbacks run on whichever thread drives the tick (the background driver,
/// or the caller of a manual `step`).
pub trait SimulationListener: Send + Sync {
    /// Called after every tick with the fresh statistics snapshot.
    fn on_update(&self, stats: &EcosystemStats);

    /// Called on every engine state transition.
    fn on_state_changed(&self, new_state: SimulationState);

    /// Called exactly once when the simulation finishes, with the reason and
    /// the final snapshot.
    fn on_simulation_ended(&self, reason: &str, stats: &EcosystemStats);
}
