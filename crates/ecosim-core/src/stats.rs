//! Aggregate statistics snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable record of world state at one tick. Derived by the world, never
/// mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcosystemStats {
    pub generation: u64,
    pub producer_count: usize,
    pub herbivore_count: usize,
    pub carnivore_count: usize,
    pub producer_energy: f64,
    pub herbivore_energy: f64,
    pub carnivore_energy: f64,
    pub total_energy: f64,
    pub avg_producer_energy: f64,
    pub avg_herbivore_energy: f64,
    pub avg_carnivore_energy: f64,
}

impl EcosystemStats {
    pub fn total_organisms(&self) -> usize {
        self.producer_count + self.herbivore_count + self.carnivore_count
    }

    /// The ecosystem counts as alive while any mobile kind remains.
    pub fn is_ecosystem_alive(&self) -> bool {
        self.herbivore_count > 0 || self.carnivore_count > 0
    }

    /// Rough balance heuristic: carnivore/herbivore < 0.5 and
    /// herbivore/producer < 0.5.
    pub fn is_balanced(&self) -> bool {
        if self.herbivore_count == 0 {
            return false;
        }
        let carnivore_ratio = self.carnivore_count as f64 / self.herbivore_count as f64;
        let herbivore_ratio = if self.producer_count > 0 {
            self.herbivore_count as f64 / self.producer_count as f64
        } else {
            0.0
        };
        carnivore_ratio < 0.5 && herbivore_ratio < 0.5
    }
}

impl fmt::Display for EcosystemStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gen {} | producers: {} (avg {:.1}) | herbivores: {} (avg {:.1}) | \
             carnivores: {} (avg {:.1}) | total energy: {:.1}",
            self.generation,
            self.producer_count,
            self.avg_producer_energy,
            self.herbivore_count,
            self.avg_herbivore_energy,
            self.carnivore_count,
            self.avg_carnivore_energy,
            self.total_energy,
        )
    }
}
