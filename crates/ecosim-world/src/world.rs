//! The world: grid, per-kind registries, and the per-tick update algorithm.

use crate::grid::{Cell, Grid};
use crate::organism::{KindState, Organism};
use ecosim_core::{EcosystemConfig, EcosystemStats, OrganismId, OrganismKind, Position, NEIGHBOR_OFFSETS};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, trace};

/// The world owns all entities by id; entities hold only coordinates. All
/// behavior runs as two-argument operations `(world, id)` so there is no
/// cyclic ownership between organisms and the grid.
pub struct World {
    grid: Grid,
    organisms: HashMap<OrganismId, Organism>,
    // Per-kind registries, ascending by id (ids are issued monotonically and
    // appended in creation order). `find_food` relies on that order for its
    // lowest-id tie-break.
    producers: Vec<OrganismId>,
    herbivores: Vec<OrganismId>,
    carnivores: Vec<OrganismId>,
    config: EcosystemConfig,
    rng: ChaCha8Rng,
    next_id: u64,
    generation: u64,
}

impl World {
    pub fn new(config: EcosystemConfig) -> Self {
        let rng = match config.simulation.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let grid = Grid::new(config.grid.width, config.grid.height);
        Self {
            grid,
            organisms: HashMap::new(),
            producers: Vec::new(),
            herbivores: Vec::new(),
            carnivores: Vec::new(),
            config,
            rng,
            next_id: 0,
            generation: 0,
        }
    }

    /// Clear the world and spawn the configured initial populations at
    /// uniformly random empty cells.
    pub fn initialize(&mut self) {
        self.clear();

        let population = self.config.initial_population.clone();
        for _ in 0..population.producers {
            self.spawn_random(OrganismKind::Producer);
        }
        for _ in 0..population.herbivores {
            self.spawn_random(OrganismKind::Herbivore);
        }
        for _ in 0..population.carnivores {
            self.spawn_random(OrganismKind::Carnivore);
        }

        info!(
            producers = self.producers.len(),
            herbivores = self.herbivores.len(),
            carnivores = self.carnivores.len(),
            "world initialized"
        );
    }

    /// Remove every organism and reset the tick counter.
    pub fn clear(&mut self) {
        self.grid = Grid::new(self.config.grid.width, self.config.grid.height);
        self.organisms.clear();
        self.producers.clear();
        self.herbivores.clear();
        self.carnivores.clear();
        self.generation = 0;
    }

    fn issue_id(&mut self) -> OrganismId {
        self.next_id += 1;
        OrganismId(self.next_id)
    }

    fn registry(&self, kind: OrganismKind) -> &Vec<OrganismId> {
        match kind {
            OrganismKind::Producer => &self.producers,
            OrganismKind::Herbivore => &self.herbivores,
            OrganismKind::Carnivore => &self.carnivores,
        }
    }

    /// Spawn an organism of `kind` at a uniformly random empty cell. Fails
    /// when the grid is full.
    pub fn spawn_random(&mut self, kind: OrganismKind) -> bool {
        let empty = self.empty_cells();
        if empty.is_empty() {
            return false;
        }
        let position = empty[self.rng.gen_range(0..empty.len())];
        self.spawn_at(kind, position).is_some()
    }

    /// Spawn an organism of `kind` at `position` with configured initial
    /// energy. Fails on out-of-bounds or occupied cells.
    pub fn spawn_at(&mut self, kind: OrganismKind, position: Position) -> Option<OrganismId> {
        let id = self.issue_id();
        let organism = Organism::new(id, kind, position, None, &self.config);
        self.add_organism(organism).then_some(id)
    }

    /// Insert an already-built organism. Fails (no state change) when the
    /// target cell is out of bounds or occupied by a living organism.
    pub fn add_organism(&mut self, organism: Organism) -> bool {
        let position = organism.position;
        if !position.in_bounds(self.grid.width(), self.grid.height()) {
            return false;
        }
        if !self.cell_is_empty(position) {
            return false;
        }

        trace!(organism = %organism.id, kind = %organism.kind, %position, "organism added");
        self.grid.set_occupant(position, organism.id);
        match organism.kind {
            OrganismKind::Producer => self.producers.push(organism.id),
            OrganismKind::Herbivore => self.herbivores.push(organism.id),
            OrganismKind::Carnivore => self.carnivores.push(organism.id),
        }
        self.organisms.insert(organism.id, organism);
        true
    }

    /// "Empty" means vacant, or occupied by an organism that is no longer
    /// alive (the dead occupant is evicted by the end-of-tick sweep).
    fn cell_is_empty(&self, position: Position) -> bool {
        if !position.in_bounds(self.grid.width(), self.grid.height()) {
            return false;
        }
        match self.grid.occupant_at(position) {
            None => true,
            Some(id) => !self
                .organisms
                .get(&id)
                .map_or(false, Organism::is_alive),
        }
    }

    // === One tick ===

    /// Advance the world by one tick and return the statistics snapshot.
    pub fn step(&mut self) -> EcosystemStats {
        self.generation += 1;

        // Natural producer influx.
        if self.rng.gen::<f64>() < self.config.reproduction.producer_spawn_rate {
            self.spawn_random(OrganismKind::Producer);
        }

        // Randomized turn order prevents a systematic first-mover advantage.
        let mut order: Vec<OrganismId> = self
            .producers
            .iter()
            .chain(self.herbivores.iter())
            .chain(self.carnivores.iter())
            .copied()
            .collect();
        order.shuffle(&mut self.rng);

        for id in order {
            let kind = match self.organisms.get(&id) {
                Some(organism) if organism.is_alive() => organism.kind,
                _ => continue,
            };
            match kind {
                OrganismKind::Producer => self.update_producer(id),
                OrganismKind::Herbivore => self.update_herbivore(id),
                OrganismKind::Carnivore => self.update_carnivore(id),
            }
        }

        self.cleanup_dead();
        self.statistics()
    }

    fn update_producer(&mut self, id: OrganismId) {
        if let Some(organism) = self.organisms.get_mut(&id) {
            if !organism.is_alive() {
                return;
            }
            organism.photosynthesize();
            organism.increment_age();
        }
        self.try_reproduce(id);
    }

    fn update_herbivore(&mut self, id: OrganismId) {
        if !self.apply_hunger(id) {
            return;
        }

        match self.find_food(id) {
            Some(food_id) => {
                let adjacent = self.distance_between(id, food_id) <= 1;
                if adjacent {
                    self.eat(id, food_id);
                } else if let Some(target) = self.position_of(food_id) {
                    self.move_towards(id, target);
                }
            }
            None => {
                self.move_randomly(id);
            }
        }

        if let Some(organism) = self.organisms.get_mut(&id) {
            organism.increment_age();
        }
        self.try_reproduce(id);
    }

    fn update_carnivore(&mut self, id: OrganismId) {
        if !self.apply_hunger(id) {
            return;
        }

        match self.find_food(id) {
            Some(prey_id) => {
                let adjacent = self.distance_between(id, prey_id) <= 1;
                if adjacent {
                    self.hunt(id, prey_id);
                } else {
                    self.pursue(id);
                }
            }
            None => {
                self.move_randomly(id);
            }
        }

        if let Some(organism) = self.organisms.get_mut(&id) {
            organism.increment_age();
        }
        self.try_reproduce(id);
    }

    /// Apply the per-tick hunger loss. Returns false when the organism is
    /// gone or the loss killed it.
    fn apply_hunger(&mut self, id: OrganismId) -> bool {
        let Some(organism) = self.organisms.get_mut(&id) else {
            return false;
        };
        if !organism.is_alive() {
            return false;
        }
        let hunger = organism.hunger_rate();
        organism.lose_energy(hunger);
        organism.is_alive()
    }

    /// Up to `speed` single steps, re-evaluating the nearest prey before each
    /// one and stopping early once adjacent.
    fn pursue(&mut self, id: OrganismId) {
        let speed = self
            .organisms
            .get(&id)
            .map_or(0, Organism::speed);

        for _ in 0..speed {
            match self.find_food(id) {
                Some(prey_id) => {
                    if self.distance_between(id, prey_id) <= 1 {
                        break;
                    }
                    if let Some(target) = self.position_of(prey_id) {
                        self.move_towards(id, target);
                    }
                }
                None => {
                    self.move_randomly(id);
                }
            }
        }
    }

    // === Feeding ===

    /// Linear scan of the prey registry for the nearest alive, edible member
    /// within vision range. Ties on Manhattan distance are broken by lowest
    /// id, which the ascending-id registry order gives for free.
    fn find_food(&self, id: OrganismId) -> Option<OrganismId> {
        let organism = self.organisms.get(&id)?;
        let prey_kind = organism.prey_kind()?;
        let vision = organism.vision();
        let origin = organism.position;

        let mut best: Option<(i32, OrganismId)> = None;
        for &prey_id in self.registry(prey_kind) {
            let Some(prey) = self.organisms.get(&prey_id) else {
                continue;
            };
            if !prey.is_edible() {
                continue;
            }
            let distance = origin.manhattan_distance(&prey.position);
            if distance > vision {
                continue;
            }
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, prey_id));
            }
        }
        best.map(|(_, prey_id)| prey_id)
    }

    /// Transfer energy from prey to eater and put the prey in its terminal
    /// consumed state. The prey's cell is released immediately; its registry
    /// entry waits for the end-of-tick sweep.
    fn eat(&mut self, eater_id: OrganismId, prey_id: OrganismId) {
        let transfer_rate = self.config.energy.transfer_rate;
        let Some(prey) = self.organisms.get_mut(&prey_id) else {
            return;
        };
        if !prey.is_edible() {
            return;
        }
        let gained = prey.energy_value(transfer_rate);
        let prey_position = prey.position;
        prey.be_consumed();
        self.grid.clear_if_owner(prey_position, prey_id);

        if let Some(eater) = self.organisms.get_mut(&eater_id) {
            eater.gain_energy(gained);
            trace!(
                eater = %eater_id,
                prey = %prey_id,
                gained,
                "consumed"
            );
        }
    }

    /// Probabilistic hunt on an adjacent prey. On failure the hunter pays
    /// half its hunger rate for the attempt.
    fn hunt(&mut self, hunter_id: OrganismId, prey_id: OrganismId) -> bool {
        let Some(hunter) = self.organisms.get(&hunter_id) else {
            return false;
        };
        let KindState::Carnivore {
            hunt_success_rate, ..
        } = hunter.state
        else {
            return false;
        };
        let edible = self
            .organisms
            .get(&prey_id)
            .map_or(false, Organism::is_edible);
        if !edible {
            return false;
        }

        if self.rng.gen::<f64>() < hunt_success_rate {
            self.eat(hunter_id, prey_id);
            true
        } else {
            if let Some(hunter) = self.organisms.get_mut(&hunter_id) {
                let penalty = hunter.hunger_rate() * 0.5;
                hunter.lose_energy(penalty);
                trace!(hunter = %hunter_id, prey = %prey_id, penalty, "hunt failed");
            }
            false
        }
    }

    // === Movement ===

    /// Single-step move along the sign of the delta on both axes. Succeeds
    /// only into in-bounds cells that are empty or hold this consumer's prey;
    /// stepping onto prey consumes it so the cell never holds two live
    /// organisms.
    fn move_towards(&mut self, id: OrganismId, target: Position) -> bool {
        let Some(organism) = self.organisms.get(&id) else {
            return false;
        };
        let from = organism.position;
        let prey_kind = organism.prey_kind();
        let destination = from.step_towards(&target);

        if destination == from
            || !destination.in_bounds(self.grid.width(), self.grid.height())
        {
            return false;
        }

        if self.cell_is_empty(destination) {
            self.relocate(id, from, destination);
            return true;
        }

        let Some(occupant_id) = self.grid.occupant_at(destination) else {
            return false;
        };
        let occupant_is_prey = self
            .organisms
            .get(&occupant_id)
            .map_or(false, |occupant| {
                Some(occupant.kind) == prey_kind && occupant.is_edible()
            });
        if occupant_is_prey {
            // Opportunistic feeding: entering a prey's cell consumes it.
            self.eat(id, occupant_id);
            self.relocate(id, from, destination);
            true
        } else {
            false
        }
    }

    /// Try the 8 neighbor offsets in a randomly shuffled order and move into
    /// the first empty one. No movement occurs when all are blocked.
    fn move_randomly(&mut self, id: OrganismId) -> bool {
        let Some(organism) = self.organisms.get(&id) else {
            return false;
        };
        let from = organism.position;

        let mut offsets = NEIGHBOR_OFFSETS;
        offsets.shuffle(&mut self.rng);

        for (dx, dy) in offsets {
            let destination = from.offset(dx, dy);
            if destination.in_bounds(self.grid.width(), self.grid.height())
                && self.cell_is_empty(destination)
            {
                self.relocate(id, from, destination);
                return true;
            }
        }
        false
    }

    /// Move occupancy and position together; they must never disagree.
    fn relocate(&mut self, id: OrganismId, from: Position, to: Position) {
        self.grid.clear_if_owner(from, id);
        self.grid.set_occupant(to, id);
        if let Some(organism) = self.organisms.get_mut(&id) {
            organism.position = to;
        }
    }

    // === Reproduction ===

    /// Reproduce if the threshold is met, placing the offspring at a
    /// uniformly random empty neighbor of the parent. With no empty neighbor
    /// the offspring is discarded (the cost stays paid).
    fn try_reproduce(&mut self, id: OrganismId) {
        let can = self
            .organisms
            .get(&id)
            .map_or(false, Organism::can_reproduce);
        if !can {
            return;
        }

        let child_id = self.issue_id();
        let Some(parent) = self.organisms.get_mut(&id) else {
            return;
        };
        let Some(mut offspring) = parent.reproduce(child_id) else {
            return;
        };

        let neighbors = self.empty_neighbors(offspring.position);
        if neighbors.is_empty() {
            trace!(parent = %id, "no empty neighbor, offspring discarded");
            return;
        }
        offspring.position = neighbors[self.rng.gen_range(0..neighbors.len())];
        debug!(
            parent = %id,
            child = %child_id,
            kind = %offspring.kind,
            position = %offspring.position,
            "offspring born"
        );
        self.add_organism(offspring);
    }

    // === Cleanup ===

    /// Evict every dead organism from the registries and release its cell if
    /// it still owns it (the cell may already belong to whoever ate it).
    fn cleanup_dead(&mut self) {
        let dead: HashSet<OrganismId> = self
            .organisms
            .values()
            .filter(|organism| !organism.is_alive())
            .map(|organism| organism.id)
            .collect();
        if dead.is_empty() {
            return;
        }

        for id in &dead {
            if let Some(organism) = self.organisms.remove(id) {
                self.grid.clear_if_owner(organism.position, organism.id);
                debug!(organism = %organism.id, kind = %organism.kind, age = organism.age, "organism removed");
            }
        }
        self.producers.retain(|id| !dead.contains(id));
        self.herbivores.retain(|id| !dead.contains(id));
        self.carnivores.retain(|id| !dead.contains(id));
    }

    // === Read-only queries ===

    pub fn width(&self) -> i32 {
        self.grid.width()
    }

    pub fn height(&self) -> i32 {
        self.grid.height()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &EcosystemConfig {
        &self.config
    }

    /// Cell at (x, y); absent outside the grid.
    pub fn cell(&self, x: i32, y: i32) -> Option<Cell> {
        self.grid.get(Position::new(x, y)).copied()
    }

    pub fn organism(&self, id: OrganismId) -> Option<&Organism> {
        self.organisms.get(&id)
    }

    /// Positions of every empty cell.
    pub fn empty_cells(&self) -> Vec<Position> {
        self.grid
            .iter()
            .map(|cell| cell.position)
            .filter(|&position| self.cell_is_empty(position))
            .collect()
    }

    /// Empty cells among the 8 neighbors of `center`.
    pub fn empty_neighbors(&self, center: Position) -> Vec<Position> {
        self.grid
            .neighbor_positions(center)
            .into_iter()
            .filter(|&position| self.cell_is_empty(position))
            .collect()
    }

    /// Copy-on-read snapshot of the alive organisms of one kind, safe for
    /// external consumers to iterate while ticks continue.
    pub fn organisms_of_kind(&self, kind: OrganismKind) -> Vec<Organism> {
        self.registry(kind)
            .iter()
            .filter_map(|id| self.organisms.get(id))
            .filter(|organism| organism.is_alive())
            .cloned()
            .collect()
    }

    /// Aggregate statistics for the current state.
    pub fn statistics(&self) -> EcosystemStats {
        let (producer_count, producer_energy) = self.kind_totals(&self.producers);
        let (herbivore_count, herbivore_energy) = self.kind_totals(&self.herbivores);
        let (carnivore_count, carnivore_energy) = self.kind_totals(&self.carnivores);

        let average = |energy: f64, count: usize| {
            if count == 0 {
                0.0
            } else {
                energy / count as f64
            }
        };

        EcosystemStats {
            generation: self.generation,
            producer_count,
            herbivore_count,
            carnivore_count,
            producer_energy,
            herbivore_energy,
            carnivore_energy,
            total_energy: producer_energy + herbivore_energy + carnivore_energy,
            avg_producer_energy: average(producer_energy, producer_count),
            avg_herbivore_energy: average(herbivore_energy, herbivore_count),
            avg_carnivore_energy: average(carnivore_energy, carnivore_count),
        }
    }

    fn kind_totals(&self, registry: &[OrganismId]) -> (usize, f64) {
        let mut count = 0;
        let mut energy = 0.0;
        for id in registry {
            if let Some(organism) = self.organisms.get(id) {
                if organism.is_alive() {
                    count += 1;
                    energy += organism.energy;
                }
            }
        }
        (count, energy)
    }

    // === Helpers ===

    fn position_of(&self, id: OrganismId) -> Option<Position> {
        self.organisms.get(&id).map(|organism| organism.position)
    }

    fn distance_between(&self, a: OrganismId, b: OrganismId) -> i32 {
        match (self.position_of(a), self.position_of(b)) {
            (Some(pa), Some(pb)) => pa.manhattan_distance(&pb),
            _ => i32::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic config for behavioral tests: no spontaneous producer
    /// spawns, no reproduction unless a test raises energy past the (huge)
    /// thresholds, fixed seed.
    fn quiet_config(width: i32, height: i32) -> EcosystemConfig {
        let mut config = EcosystemConfig::default();
        config.grid.width = width;
        config.grid.height = height;
        config.reproduction.producer_spawn_rate = 0.0;
        config.reproduction.producer_threshold = 1e9;
        config.reproduction.herbivore_threshold = 1e9;
        config.reproduction.carnivore_threshold = 1e9;
        config.simulation.seed = Some(42);
        config
    }

    fn set_energy(world: &mut World, id: OrganismId, energy: f64) {
        world.organisms.get_mut(&id).unwrap().energy = energy;
    }

    /// Every registry entry must be alive, own its cell, and agree with the
    /// grid about where it lives; every occupied cell must map back to a
    /// living organism at that position.
    fn assert_consistent(world: &World) {
        for registry in [&world.producers, &world.herbivores, &world.carnivores] {
            for id in registry {
                let organism = world.organisms.get(id).expect("registered organism exists");
                assert!(organism.is_alive(), "{id} is dead but still registered");
                assert_eq!(
                    world.grid.occupant_at(organism.position),
                    Some(*id),
                    "{id} does not own its cell"
                );
            }
        }
        for cell in world.grid.iter() {
            if let Some(id) = cell.occupant() {
                let organism = world.organisms.get(&id).expect("occupant exists");
                assert!(organism.is_alive());
                assert_eq!(organism.position, cell.position);
            }
        }
    }

    #[test]
    fn test_add_organism_rejects_occupied_cell() {
        let mut world = World::new(quiet_config(10, 10));
        let position = Position::new(5, 5);
        assert!(world.spawn_at(OrganismKind::Producer, position).is_some());
        assert!(world.spawn_at(OrganismKind::Producer, position).is_none());
        assert_eq!(world.producers.len(), 1);
    }

    #[test]
    fn test_add_organism_rejects_out_of_bounds() {
        let mut world = World::new(quiet_config(10, 10));
        assert!(world.spawn_at(OrganismKind::Herbivore, Position::new(10, 0)).is_none());
        assert!(world.spawn_at(OrganismKind::Herbivore, Position::new(0, -1)).is_none());
        assert!(world.herbivores.is_empty());
    }

    #[test]
    fn test_spawn_random_fails_on_full_grid() {
        let mut world = World::new(quiet_config(2, 2));
        for _ in 0..4 {
            assert!(world.spawn_random(OrganismKind::Producer));
        }
        assert!(!world.spawn_random(OrganismKind::Producer));
        assert_eq!(world.producers.len(), 4);
    }

    #[test]
    fn test_initialize_spawns_configured_populations() {
        let mut config = quiet_config(50, 30);
        config.initial_population.producers = 100;
        config.initial_population.herbivores = 30;
        config.initial_population.carnivores = 10;
        let mut world = World::new(config);
        world.initialize();

        let stats = world.statistics();
        assert_eq!(stats.producer_count, 100);
        assert_eq!(stats.herbivore_count, 30);
        assert_eq!(stats.carnivore_count, 10);
        assert_eq!(world.generation(), 0);
        assert_consistent(&world);
    }

    #[test]
    fn test_herbivore_eats_adjacent_producer() {
        // Grid 10x10, producer at (2,2) with energy 100, herbivore at (2,3)
        // with hunger 2 and vision 5: one tick leaves the herbivore at
        // 50 - 2 + 10 = 58 and removes the producer.
        let mut world = World::new(quiet_config(10, 10));
        let producer = world.spawn_at(OrganismKind::Producer, Position::new(2, 2)).unwrap();
        let herbivore = world.spawn_at(OrganismKind::Herbivore, Position::new(2, 3)).unwrap();
        set_energy(&mut world, producer, 100.0);

        world.step();

        let herbivore = world.organism(herbivore).unwrap();
        assert!((herbivore.energy - 58.0).abs() < 1e-9);
        assert!(world.organism(producer).is_none());
        assert!(world.organisms_of_kind(OrganismKind::Producer).is_empty());
        assert_eq!(world.cell(2, 2).unwrap().occupant(), None);
        assert_consistent(&world);
    }

    #[test]
    fn test_hunt_at_rate_zero_always_fails() {
        // A forced-failure hunt costs the carnivore hunger + hunger/2 and the
        // herbivore survives. The 1x2 grid pins both in place.
        let mut config = quiet_config(2, 1);
        config.reproduction.carnivore_hunt_success_rate = 0.0;
        let mut world = World::new(config);
        let carnivore = world.spawn_at(OrganismKind::Carnivore, Position::new(0, 0)).unwrap();
        let herbivore = world.spawn_at(OrganismKind::Herbivore, Position::new(1, 0)).unwrap();

        for _ in 0..3 {
            world.step();
            assert!(world.organism(herbivore).unwrap().is_alive());
        }
        // 3 ticks at 3.0 hunger + 1.5 failed-hunt penalty each.
        let carnivore = world.organism(carnivore).unwrap();
        assert!((carnivore.energy - (80.0 - 3.0 * 4.5)).abs() < 1e-9);
    }

    #[test]
    fn test_hunt_at_rate_one_eats_prey() {
        let mut config = quiet_config(2, 1);
        config.reproduction.carnivore_hunt_success_rate = 1.0;
        config.energy.herbivore_hunger_rate = 0.0;
        let mut world = World::new(config);
        let carnivore = world.spawn_at(OrganismKind::Carnivore, Position::new(0, 0)).unwrap();
        let herbivore = world.spawn_at(OrganismKind::Herbivore, Position::new(1, 0)).unwrap();

        world.step();

        // 80 - 3 hunger + 10% of the herbivore's 50.
        let carnivore = world.organism(carnivore).unwrap();
        assert!((carnivore.energy - 82.0).abs() < 1e-9);
        assert!(world.organism(herbivore).is_none());
        assert!(world.organisms_of_kind(OrganismKind::Herbivore).is_empty());
        assert_consistent(&world);
    }

    #[test]
    fn test_find_food_breaks_ties_by_lowest_id() {
        let mut world = World::new(quiet_config(10, 10));
        let herbivore = world.spawn_at(OrganismKind::Herbivore, Position::new(5, 5)).unwrap();
        let first = world.spawn_at(OrganismKind::Producer, Position::new(5, 7)).unwrap();
        let second = world.spawn_at(OrganismKind::Producer, Position::new(7, 5)).unwrap();
        assert!(first < second);

        // Both producers sit at Manhattan distance 2.
        assert_eq!(world.find_food(herbivore), Some(first));
    }

    #[test]
    fn test_find_food_respects_vision_range() {
        let mut world = World::new(quiet_config(20, 20));
        let herbivore = world.spawn_at(OrganismKind::Herbivore, Position::new(0, 0)).unwrap();
        world.spawn_at(OrganismKind::Producer, Position::new(3, 3)).unwrap();

        // Distance 6 exceeds the default vision of 5.
        assert_eq!(world.find_food(herbivore), None);

        let near = world.spawn_at(OrganismKind::Producer, Position::new(2, 2)).unwrap();
        assert_eq!(world.find_food(herbivore), Some(near));
    }

    #[test]
    fn test_move_towards_takes_diagonal_steps() {
        let mut world = World::new(quiet_config(10, 10));
        let herbivore = world.spawn_at(OrganismKind::Herbivore, Position::new(0, 0)).unwrap();

        assert!(world.move_towards(herbivore, Position::new(4, 4)));
        assert_eq!(world.organism(herbivore).unwrap().position, Position::new(1, 1));
        assert_consistent(&world);
    }

    #[test]
    fn test_move_towards_blocked_by_non_prey() {
        let mut world = World::new(quiet_config(10, 10));
        let carnivore = world.spawn_at(OrganismKind::Carnivore, Position::new(0, 0)).unwrap();
        world.spawn_at(OrganismKind::Producer, Position::new(1, 1)).unwrap();

        // Carnivores never enter producer cells.
        assert!(!world.move_towards(carnivore, Position::new(4, 4)));
        assert_eq!(world.organism(carnivore).unwrap().position, Position::new(0, 0));
    }

    #[test]
    fn test_move_onto_prey_consumes_it() {
        let mut world = World::new(quiet_config(10, 10));
        let carnivore = world.spawn_at(OrganismKind::Carnivore, Position::new(0, 0)).unwrap();
        let herbivore = world.spawn_at(OrganismKind::Herbivore, Position::new(1, 1)).unwrap();

        assert!(world.move_towards(carnivore, Position::new(4, 4)));
        let carnivore_org = world.organism(carnivore).unwrap();
        assert_eq!(carnivore_org.position, Position::new(1, 1));
        assert!((carnivore_org.energy - 85.0).abs() < 1e-9);
        assert!(!world.organism(herbivore).unwrap().is_alive());
        // The cell belongs to the carnivore now; the sweep must not clear it.
        world.cleanup_dead();
        assert_eq!(world.cell(1, 1).unwrap().occupant(), Some(carnivore));
        assert_consistent(&world);
    }

    #[test]
    fn test_move_randomly_stays_put_when_surrounded() {
        let mut world = World::new(quiet_config(3, 3));
        let herbivore = world.spawn_at(OrganismKind::Herbivore, Position::new(1, 1)).unwrap();
        for position in world.grid.neighbor_positions(Position::new(1, 1)) {
            world.spawn_at(OrganismKind::Carnivore, position).unwrap();
        }

        assert!(!world.move_randomly(herbivore));
        assert_eq!(world.organism(herbivore).unwrap().position, Position::new(1, 1));
    }

    #[test]
    fn test_producer_reproduces_into_empty_neighbor() {
        let mut config = quiet_config(10, 10);
        config.reproduction.producer_threshold = 80.0;
        let mut world = World::new(config);
        let producer = world.spawn_at(OrganismKind::Producer, Position::new(5, 5)).unwrap();
        set_energy(&mut world, producer, 100.0);

        world.step();

        let stats = world.statistics();
        assert_eq!(stats.producer_count, 2);
        // Photosynthesis capped at 100, then the cost of 40 deducted.
        assert!((world.organism(producer).unwrap().energy - 60.0).abs() < 1e-9);
        let offspring = world
            .organisms_of_kind(OrganismKind::Producer)
            .into_iter()
            .find(|organism| organism.id != producer)
            .unwrap();
        assert!((offspring.energy - 20.0).abs() < 1e-9);
        assert!(offspring.position.manhattan_distance(&Position::new(5, 5)) <= 2);
        assert_consistent(&world);
    }

    #[test]
    fn test_crowded_reproduction_discards_offspring_but_keeps_cost() {
        let mut config = quiet_config(3, 3);
        config.reproduction.producer_threshold = 80.0;
        let mut world = World::new(config);
        let center = world.spawn_at(OrganismKind::Producer, Position::new(1, 1)).unwrap();
        for position in world.grid.neighbor_positions(Position::new(1, 1)) {
            let neighbor = world.spawn_at(OrganismKind::Producer, position).unwrap();
            set_energy(&mut world, neighbor, 1.0);
        }
        set_energy(&mut world, center, 100.0);

        world.step();

        assert_eq!(world.statistics().producer_count, 9);
        assert!((world.organism(center).unwrap().energy - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_producer_spawn_rate_one_adds_a_producer_each_tick() {
        let mut config = quiet_config(10, 10);
        config.reproduction.producer_spawn_rate = 1.0;
        let mut world = World::new(config);

        for tick in 1..=5 {
            world.step();
            assert_eq!(world.generation(), tick);
            assert_eq!(world.statistics().producer_count, tick as usize);
        }
    }

    #[test]
    fn test_step_sweeps_all_dead_organisms() {
        let mut config = quiet_config(8, 8);
        config.energy.herbivore_hunger_rate = 100.0; // starves in one tick
        let mut world = World::new(config);
        for x in 0..4 {
            world.spawn_at(OrganismKind::Herbivore, Position::new(x, 0)).unwrap();
        }

        world.step();

        assert!(world.organisms_of_kind(OrganismKind::Herbivore).is_empty());
        assert!(world.organisms.is_empty());
        assert_consistent(&world);
    }

    #[test]
    fn test_statistics_aggregation() {
        let mut world = World::new(quiet_config(10, 10));
        world.spawn_at(OrganismKind::Producer, Position::new(0, 0)).unwrap();
        world.spawn_at(OrganismKind::Producer, Position::new(1, 1)).unwrap();
        world.spawn_at(OrganismKind::Herbivore, Position::new(2, 2)).unwrap();
        world.spawn_at(OrganismKind::Carnivore, Position::new(3, 3)).unwrap();

        let stats = world.statistics();
        assert_eq!(stats.producer_count, 2);
        assert_eq!(stats.herbivore_count, 1);
        assert_eq!(stats.carnivore_count, 1);
        assert!((stats.producer_energy - 60.0).abs() < 1e-9);
        assert!((stats.avg_producer_energy - 30.0).abs() < 1e-9);
        assert!((stats.total_energy - 190.0).abs() < 1e-9);
        assert_eq!(stats.total_organisms(), 4);
        assert!(stats.is_ecosystem_alive());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut world = World::new(quiet_config(10, 10));
        world.initialize();
        world.step();
        world.clear();

        assert_eq!(world.generation(), 0);
        assert_eq!(world.statistics().total_organisms(), 0);
        assert!(world.empty_cells().len() == 100);
    }

    #[test]
    fn test_empty_neighbors_excludes_living_occupants() {
        let mut world = World::new(quiet_config(10, 10));
        world.spawn_at(OrganismKind::Producer, Position::new(5, 6)).unwrap();

        let neighbors = world.empty_neighbors(Position::new(5, 5));
        assert_eq!(neighbors.len(), 7);
        assert!(!neighbors.contains(&Position::new(5, 6)));
    }

    #[test]
    fn test_cell_query_is_bounds_checked() {
        let world = World::new(quiet_config(10, 10));
        assert!(world.cell(0, 0).is_some());
        assert!(world.cell(10, 0).is_none());
        assert!(world.cell(-1, 5).is_none());
    }
}
