//! Organism entity model: shared base state plus per-kind parameters.

use ecosim_core::{EcosystemConfig, OrganismId, OrganismKind, Position};
use serde::{Deserialize, Serialize};

/// Per-kind numeric parameters, loaded from the configuration at
/// construction. Kinds form a closed variant set; adding one means touching
/// every match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KindState {
    Producer {
        photosynthesis_rate: f64,
        max_energy: f64,
    },
    Herbivore {
        hunger_rate: f64,
        vision: i32,
        speed: i32,
    },
    Carnivore {
        hunger_rate: f64,
        vision: i32,
        speed: i32,
        hunt_success_rate: f64,
    },
}

/// An organism in the simulation.
///
/// Invariant: `energy <= 0.0` implies `alive == false` and energy clamped to
/// zero. Every mutation goes through [`lose_energy`]/[`gain_energy`]/
/// [`be_consumed`] to keep that true.
///
/// [`lose_energy`]: Organism::lose_energy
/// [`gain_energy`]: Organism::gain_energy
/// [`be_consumed`]: Organism::be_consumed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organism {
    pub id: OrganismId,
    pub kind: OrganismKind,
    pub energy: f64,
    pub position: Position,
    pub alive: bool,
    pub age: u64,
    pub reproduction_threshold: f64,
    pub reproduction_cost: f64,
    pub state: KindState,
}

impl Organism {
    /// Build an organism of `kind` at `position` with parameters from the
    /// configuration. `energy` overrides the configured initial energy (used
    /// for offspring, which start at half the reproduction cost).
    pub fn new(
        id: OrganismId,
        kind: OrganismKind,
        position: Position,
        energy: Option<f64>,
        config: &EcosystemConfig,
    ) -> Self {
        let (initial_energy, threshold, cost, state) = match kind {
            OrganismKind::Producer => (
                config.energy.producer_initial,
                config.reproduction.producer_threshold,
                config.reproduction.producer_cost,
                KindState::Producer {
                    photosynthesis_rate: config.energy.producer_photosynthesis,
                    max_energy: config.energy.producer_max,
                },
            ),
            OrganismKind::Herbivore => (
                config.energy.herbivore_initial,
                config.reproduction.herbivore_threshold,
                config.reproduction.herbivore_cost,
                KindState::Herbivore {
                    hunger_rate: config.energy.herbivore_hunger_rate,
                    vision: config.movement.herbivore_vision,
                    speed: config.movement.herbivore_speed,
                },
            ),
            OrganismKind::Carnivore => (
                config.energy.carnivore_initial,
                config.reproduction.carnivore_threshold,
                config.reproduction.carnivore_cost,
                KindState::Carnivore {
                    hunger_rate: config.energy.carnivore_hunger_rate,
                    vision: config.movement.carnivore_vision,
                    speed: config.movement.carnivore_speed,
                    hunt_success_rate: config.reproduction.carnivore_hunt_success_rate,
                },
            ),
        };

        Self {
            id,
            kind,
            energy: energy.unwrap_or(initial_energy),
            position,
            alive: true,
            age: 0,
            reproduction_threshold: threshold,
            reproduction_cost: cost,
            state,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// An organism can be eaten while it is alive with positive energy.
    pub fn is_edible(&self) -> bool {
        self.alive && self.energy > 0.0
    }

    /// Energy granted to a consumer eating this organism: the configured
    /// fraction of current energy, applied uniformly at every trophic
    /// transfer.
    pub fn energy_value(&self, transfer_rate: f64) -> f64 {
        self.energy * transfer_rate
    }

    /// Increase energy. Caps are kind-specific and enforced by the kind's
    /// own update (photosynthesis), not here.
    pub fn gain_energy(&mut self, amount: f64) {
        self.energy += amount;
    }

    /// Reduce energy, transitioning to dead when it reaches zero.
    pub fn lose_energy(&mut self, amount: f64) {
        self.energy -= amount;
        if self.energy <= 0.0 {
            self.die();
        }
    }

    /// Terminal state after being eaten, regardless of remaining energy.
    pub fn be_consumed(&mut self) {
        self.die();
    }

    pub fn die(&mut self) {
        self.alive = false;
        self.energy = 0.0;
    }

    pub fn increment_age(&mut self) {
        self.age += 1;
    }

    /// Photosynthesis, capped at the producer's max energy. No-op for other
    /// kinds and for dead organisms.
    pub fn photosynthesize(&mut self) {
        if !self.alive {
            return;
        }
        if let KindState::Producer {
            photosynthesis_rate,
            max_energy,
        } = self.state
        {
            self.energy = (self.energy + photosynthesis_rate).min(max_energy);
        }
    }

    pub fn can_reproduce(&self) -> bool {
        self.alive && self.energy >= self.reproduction_threshold
    }

    /// Deduct the reproduction cost and return a same-kind offspring with
    /// half that cost as initial energy, positioned at the parent's cell.
    /// Final placement is decided by the caller. Returns `None` when the
    /// preconditions do not hold; nothing is deducted in that case.
    pub fn reproduce(&mut self, child_id: OrganismId) -> Option<Organism> {
        if !self.can_reproduce() {
            return None;
        }

        self.lose_energy(self.reproduction_cost);

        Some(Organism {
            id: child_id,
            kind: self.kind,
            energy: self.reproduction_cost / 2.0,
            position: self.position,
            alive: true,
            age: 0,
            reproduction_threshold: self.reproduction_threshold,
            reproduction_cost: self.reproduction_cost,
            state: self.state.clone(),
        })
    }

    /// Energy lost per tick independent of actions. Zero for producers.
    pub fn hunger_rate(&self) -> f64 {
        match self.state {
            KindState::Producer { .. } => 0.0,
            KindState::Herbivore { hunger_rate, .. }
            | KindState::Carnivore { hunger_rate, .. } => hunger_rate,
        }
    }

    /// Manhattan radius within which a consumer detects food.
    pub fn vision(&self) -> i32 {
        match self.state {
            KindState::Producer { .. } => 0,
            KindState::Herbivore { vision, .. } | KindState::Carnivore { vision, .. } => vision,
        }
    }

    /// Cells traversable per tick.
    pub fn speed(&self) -> i32 {
        match self.state {
            KindState::Producer { .. } => 0,
            KindState::Herbivore { speed, .. } | KindState::Carnivore { speed, .. } => speed,
        }
    }

    /// What this organism eats, if anything.
    pub fn prey_kind(&self) -> Option<OrganismKind> {
        match self.kind {
            OrganismKind::Producer => None,
            OrganismKind::Herbivore => Some(OrganismKind::Producer),
            OrganismKind::Carnivore => Some(OrganismKind::Herbivore),
        }
    }
}
