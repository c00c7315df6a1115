//! 2D grid of cells, each holding at most one occupant.

use ecosim_core::{OrganismId, Position, NEIGHBOR_OFFSETS};
use serde::{Deserialize, Serialize};

/// A single grid cell: coordinates plus an optional occupant.
///
/// The cell stores only the occupant's id; liveness lives in the world's
/// registry, so "empty" at the world level also covers a dead occupant that
/// has not been swept yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub position: Position,
    occupant: Option<OrganismId>,
}

impl Cell {
    fn new(position: Position) -> Self {
        Self {
            position,
            occupant: None,
        }
    }

    pub fn occupant(&self) -> Option<OrganismId> {
        self.occupant
    }

    pub fn is_vacant(&self) -> bool {
        self.occupant.is_none()
    }
}

/// Fixed-size bounded grid, row-major.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let mut cells = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(Cell::new(Position::new(x, y)));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    fn index(&self, pos: Position) -> usize {
        (pos.y * self.width + pos.x) as usize
    }

    /// Cell at `pos`, bounds-checked.
    pub fn get(&self, pos: Position) -> Option<&Cell> {
        pos.in_bounds(self.width, self.height)
            .then(|| &self.cells[self.index(pos)])
    }

    /// Occupant id at `pos`, if any. Out-of-bounds reads as unoccupied.
    pub fn occupant_at(&self, pos: Position) -> Option<OrganismId> {
        self.get(pos).and_then(Cell::occupant)
    }

    /// Place `id` at `pos`, overwriting whatever occupancy was recorded.
    /// Callers enforce the one-live-occupant rule.
    pub fn set_occupant(&mut self, pos: Position, id: OrganismId) {
        if pos.in_bounds(self.width, self.height) {
            let index = self.index(pos);
            self.cells[index].occupant = Some(id);
        }
    }

    pub fn clear_occupant(&mut self, pos: Position) {
        if pos.in_bounds(self.width, self.height) {
            let index = self.index(pos);
            self.cells[index].occupant = None;
        }
    }

    /// Clear the cell only if `id` still owns it. Guards against a cell that
    /// has already been reassigned to another organism.
    pub fn clear_if_owner(&mut self, pos: Position, id: OrganismId) {
        if self.occupant_at(pos) == Some(id) {
            self.clear_occupant(pos);
        }
    }

    /// In-bounds positions of the 8 cells surrounding `center`.
    pub fn neighbor_positions(&self, center: Position) -> Vec<Position> {
        NEIGHBOR_OFFSETS
            .iter()
            .map(|&(dx, dy)| center.offset(dx, dy))
            .filter(|pos| pos.in_bounds(self.width, self.height))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.iter()
    }
}
