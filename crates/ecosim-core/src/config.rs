//! Configuration types for the simulation.
//!
//! Every section has a complete set of defaults; a section missing from the
//! input falls back entirely to its defaults rather than being partially
//! merged. The record is format-agnostic through serde; tests and embedders
//! use the JSON front-end, richer formats are a collaborator concern.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Grid dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub width: i32,
    pub height: i32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 50,
            height: 30,
        }
    }
}

/// Energy parameters per kind, plus the trophic transfer efficiency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyConfig {
    /// Fraction of a consumed organism's energy granted to its consumer
    /// (the "10% rule").
    pub transfer_rate: f64,
    pub producer_initial: f64,
    pub producer_max: f64,
    /// Energy a producer gains per tick from photosynthesis.
    pub producer_photosynthesis: f64,
    pub herbivore_initial: f64,
    /// Energy a herbivore loses per tick regardless of actions.
    pub herbivore_hunger_rate: f64,
    pub carnivore_initial: f64,
    pub carnivore_hunger_rate: f64,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            transfer_rate: 0.10,
            producer_initial: 30.0,
            producer_max: 100.0,
            producer_photosynthesis: 5.0,
            herbivore_initial: 50.0,
            herbivore_hunger_rate: 2.0,
            carnivore_initial: 80.0,
            carnivore_hunger_rate: 3.0,
        }
    }
}

/// Vision ranges (Manhattan radius) and speeds (cells per tick).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementConfig {
    pub herbivore_vision: i32,
    pub herbivore_speed: i32,
    pub carnivore_vision: i32,
    pub carnivore_speed: i32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            herbivore_vision: 5,
            herbivore_speed: 1,
            carnivore_vision: 7,
            carnivore_speed: 2,
        }
    }
}

/// Reproduction thresholds and costs per kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReproductionConfig {
    pub producer_threshold: f64,
    pub producer_cost: f64,
    pub herbivore_threshold: f64,
    pub herbivore_cost: f64,
    pub carnivore_threshold: f64,
    pub carnivore_cost: f64,
    /// Probability per tick of a fresh producer appearing on a random empty
    /// cell.
    pub producer_spawn_rate: f64,
    /// Probability that an adjacent hunt succeeds.
    pub carnivore_hunt_success_rate: f64,
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            producer_threshold: 80.0,
            producer_cost: 40.0,
            herbivore_threshold: 100.0,
            herbivore_cost: 50.0,
            carnivore_threshold: 150.0,
            carnivore_cost: 75.0,
            producer_spawn_rate: 0.02,
            carnivore_hunt_success_rate: 0.8,
        }
    }
}

/// Scheduling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub tick_interval_ms: u64,
    pub max_generations: u64,
    /// RNG seed; seeded from entropy when absent. Fixed seeds are offered
    /// for tests, not promised portable across platforms.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 200,
            max_generations: 10_000,
            seed: None,
        }
    }
}

/// Initial population counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    pub producers: usize,
    pub herbivores: usize,
    pub carnivores: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            producers: 100,
            herbivores: 30,
            carnivores: 10,
        }
    }
}

/// A scenario overrides only the three initial-population counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub producers: Option<usize>,
    #[serde(default)]
    pub herbivores: Option<usize>,
    #[serde(default)]
    pub carnivores: Option<usize>,
}

/// Full configuration record consumed by the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EcosystemConfig {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub energy: EnergyConfig,
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub reproduction: ReproductionConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub initial_population: PopulationConfig,
    /// Named scenario overlays, applied on demand via [`apply_scenario`].
    ///
    /// [`apply_scenario`]: EcosystemConfig::apply_scenario
    #[serde(default)]
    pub scenarios: HashMap<String, Scenario>,
}

impl EcosystemConfig {
    /// Parse a configuration from JSON. Malformed input is recoverable: the
    /// caller is expected to fall back to `EcosystemConfig::default()`.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let config = serde_json::from_str(input)?;
        Ok(config)
    }

    /// Parse a configuration from JSON, falling back to defaults (with a
    /// logged warning) when the input is malformed.
    pub fn from_json_str_or_default(input: &str) -> Self {
        match Self::from_json_str(input) {
            Ok(config) => config,
            Err(err) => {
                warn!("malformed configuration, using defaults: {err}");
                Self::default()
            }
        }
    }

    /// Overlay the named scenario onto the initial-population counts.
    /// Unknown scenario names leave the configuration untouched.
    pub fn apply_scenario(&mut self, name: &str) {
        let Some(scenario) = self.scenarios.get(name).cloned() else {
            warn!(scenario = name, "unknown scenario, keeping base populations");
            return;
        };
        if let Some(producers) = scenario.producers {
            self.initial_population.producers = producers;
        }
        if let Some(herbivores) = scenario.herbivores {
            self.initial_population.herbivores = herbivores;
        }
        if let Some(carnivores) = scenario.carnivores {
            self.initial_population.carnivores = carnivores;
        }
    }
}
