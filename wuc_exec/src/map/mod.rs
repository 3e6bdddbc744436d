//! # World map
//!
//! The world map is a cost grid assembled from the local grid patches reported by each unit. Cells
//! are keyed in a ground-fixed system: the row of a carrier-frame position is offset by the total
//! distance the carrier has travelled, so the grid never needs rewriting when the carrier moves.
//! Converting a cell back to a position subtracts the same offset, giving a carrier-frame
//! [`Location`].
//!
//! The map also tracks the exploration frontier, the set of discovered cells bordering unexplored
//! ground, according to the configured [`FrontierPolicy`].

// ------------------------------------------------------------------------------------------------
// MODS
// ------------------------------------------------------------------------------------------------

mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::{hash_map::Entry, BTreeSet, HashMap},
    fmt,
};

use comms_if::{
    geom::{Location, Pose},
    tick::{CostVector, LocalCell},
};
use log::trace;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use params::{FrontierPolicy, MapParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Ground-fixed index of a grid cell.
///
/// Cells order row-major, so iterating a sorted set of cells walks the rows nearest the carrier's
/// starting point first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Cell {
    pub row: i64,
    pub col: i64,
}

#[derive(Debug, Clone)]
pub struct WorldMap {
    params: MapParams,

    grid: HashMap<Cell, CostVector>,

    frontier: BTreeSet<Cell>,

    /// Cumulative carrier displacement along its forward axis since the start.
    ///
    /// Units: millimeters
    carrier_offset_mm: i64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Cell {
    pub fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }

    /// All 8-connected neighbours of this cell, whether discovered or not.
    pub fn all_possible_neighbors(&self) -> [Cell; 8] {
        [
            Cell::new(self.row - 1, self.col - 1),
            Cell::new(self.row - 1, self.col),
            Cell::new(self.row - 1, self.col + 1),
            Cell::new(self.row, self.col - 1),
            Cell::new(self.row, self.col + 1),
            Cell::new(self.row + 1, self.col - 1),
            Cell::new(self.row + 1, self.col),
            Cell::new(self.row + 1, self.col + 1),
        ]
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.row, self.col)
    }
}

impl WorldMap {
    /// Create a new empty map.
    ///
    /// `params.grid_resolution_mm` must be positive.
    pub fn new(params: MapParams) -> Self {
        Self {
            params,
            grid: HashMap::new(),
            frontier: BTreeSet::new(),
            carrier_offset_mm: 0,
        }
    }

    /// Notify the map that the carrier has moved forward by `dy_mm`.
    ///
    /// This must be called before expanding the map with poses sampled after the motion.
    pub fn notify_movement(&mut self, dy_mm: i64) {
        self.carrier_offset_mm += dy_mm;
    }

    /// Merge a unit's local grid patch into the map.
    ///
    /// Cells already in the map keep their original costs. Returns the newly discovered cells.
    pub fn expand(&mut self, unit_pose: &Pose, local_grid: &[LocalCell]) -> Vec<Cell> {
        let origin = self.get_containing_cell(&unit_pose.location());

        let mut candidates = Vec::new();

        for local in local_grid {
            let cell = Cell::new(origin.row + local.offset.row, origin.col + local.offset.col);

            if let Entry::Vacant(e) = self.grid.entry(cell) {
                e.insert(local.costs);
                candidates.push(cell);
            }
        }

        match self.params.frontier_policy {
            FrontierPolicy::Sweep { tolerance_rows } => {
                self.sweep_frontier(&candidates, tolerance_rows)
            }
            FrontierPolicy::NeighborCount => self.count_frontier(&candidates),
        }

        trace!(
            "Map expanded around {} by {} cells, frontier has {} cells",
            origin,
            candidates.len(),
            self.frontier.len()
        );

        candidates
    }

    /// Get the cell containing the given carrier-frame location.
    pub fn get_containing_cell(&self, location: &Location) -> Cell {
        let res = self.params.grid_resolution_mm;

        Cell::new(
            (location.y + self.carrier_offset_mm).div_euclid(res),
            location.x.div_euclid(res),
        )
    }

    /// Get the carrier-frame location of the centre of the given cell.
    pub fn get_center_location(&self, cell: &Cell) -> Location {
        let res = self.params.grid_resolution_mm;

        Location::new(
            cell.col * res + res / 2,
            cell.row * res + res / 2 - self.carrier_offset_mm,
        )
    }

    /// Get the discovered 8-connected neighbours of the given cell.
    pub fn get_all_neighbors(&self, cell: &Cell) -> Vec<Cell> {
        cell.all_possible_neighbors()
            .iter()
            .filter(|n| self.grid.contains_key(n))
            .copied()
            .collect()
    }

    /// Get all 8-connected neighbours of the given cell, discovered or not.
    pub fn get_all_possible_neighbors(&self, cell: &Cell) -> [Cell; 8] {
        cell.all_possible_neighbors()
    }

    /// Get the traversal costs of a discovered cell.
    pub fn costs(&self, cell: &Cell) -> Option<&CostVector> {
        self.grid.get(cell)
    }

    pub fn is_discovered(&self, cell: &Cell) -> bool {
        self.grid.contains_key(cell)
    }

    /// Iterate over all discovered cells and their costs, in no particular order.
    pub fn cells(&self) -> impl Iterator<Item = (&Cell, &CostVector)> {
        self.grid.iter()
    }

    pub fn num_cells(&self) -> usize {
        self.grid.len()
    }

    /// The current frontier, in row-major order.
    pub fn frontier(&self) -> &BTreeSet<Cell> {
        &self.frontier
    }

    pub fn resolution_mm(&self) -> i64 {
        self.params.grid_resolution_mm
    }

    pub fn carrier_offset_mm(&self) -> i64 {
        self.carrier_offset_mm
    }

    /// Greatest row in the frontier, `None` if the frontier is empty.
    fn frontier_max_row(&self) -> Option<i64> {
        self.frontier.iter().next_back().map(|c| c.row)
    }

    /// Monotonic sweep: candidates beyond the leading row join the frontier, then everything
    /// further than the tolerance behind the (new) leading row is dropped.
    ///
    /// While the frontier is empty every candidate is beyond the leading row, wherever it lies.
    fn sweep_frontier(&mut self, candidates: &[Cell], tolerance_rows: i64) {
        let old_max = self.frontier_max_row();

        for cell in candidates {
            if old_max.map_or(true, |max| cell.row > max) {
                self.frontier.insert(*cell);
            }
        }

        if let Some(max) = self.frontier_max_row() {
            self.frontier.retain(|c| c.row >= max - tolerance_rows);
        }
    }

    fn count_frontier(&mut self, candidates: &[Cell]) {
        for cell in candidates {
            if self.get_all_neighbors(cell).len() < 8 {
                self.frontier.insert(*cell);
            }
        }

        for cell in candidates {
            for c in std::iter::once(*cell).chain(cell.all_possible_neighbors()) {
                if self.frontier.contains(&c) && self.get_all_neighbors(&c).len() > 6 {
                    self.frontier.remove(&c);
                }
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::tick::CellOffset;

    /// A square patch of `(2 * half + 1)^2` cells centred on the unit.
    fn patch(half: i64, cost: f64) -> Vec<LocalCell> {
        let mut cells = Vec::new();
        for row in -half..=half {
            for col in -half..=half {
                cells.push(LocalCell {
                    offset: CellOffset::new(row, col),
                    costs: CostVector::uniform(cost),
                });
            }
        }
        cells
    }

    fn sweep_map(tolerance_rows: i64) -> WorldMap {
        WorldMap::new(MapParams {
            grid_resolution_mm: 1000,
            frontier_policy: FrontierPolicy::Sweep { tolerance_rows },
        })
    }

    #[test]
    fn test_cell_mapping() {
        let mut map = sweep_map(0);

        assert_eq!(map.get_containing_cell(&Location::new(0, 0)), Cell::new(0, 0));
        assert_eq!(map.get_containing_cell(&Location::new(999, 1999)), Cell::new(1, 0));
        assert_eq!(map.get_containing_cell(&Location::new(-1, -1)), Cell::new(-1, -1));
        assert_eq!(map.get_center_location(&Cell::new(2, 3)), Location::new(3500, 2500));

        // A ground-fixed point keeps its cell as the carrier moves past it
        let ground = Location::new(4200, 5100);
        let cell = map.get_containing_cell(&ground);
        map.notify_movement(1000);
        assert_eq!(map.carrier_offset_mm(), 1000);
        assert_eq!(map.get_containing_cell(&Location::new(4200, 4100)), cell);
        assert_eq!(map.get_center_location(&cell), Location::new(4500, 4500));
    }

    #[test]
    fn test_center_round_trip() {
        let mut map = sweep_map(0);
        map.notify_movement(-2750);

        for row in -3..3 {
            for col in -3..3 {
                let cell = Cell::new(row, col);
                assert_eq!(map.get_containing_cell(&map.get_center_location(&cell)), cell);
            }
        }
    }

    #[test]
    fn test_expand() {
        let mut map = sweep_map(0);

        let new_cells = map.expand(&Pose::new(1500, 1500, 90.0), &patch(1, 1.0));
        assert_eq!(new_cells.len(), 9);
        assert_eq!(map.num_cells(), 9);
        assert!(map.is_discovered(&Cell::new(0, 0)));
        assert!(map.is_discovered(&Cell::new(2, 2)));
        assert!(!map.is_discovered(&Cell::new(3, 3)));

        // Already known cells keep their original costs
        let new_cells = map.expand(&Pose::new(2500, 1500, 0.0), &patch(1, 5.0));
        assert_eq!(new_cells.len(), 3);
        assert_eq!(map.costs(&Cell::new(1, 1)), Some(&CostVector::uniform(1.0)));
        assert_eq!(map.costs(&Cell::new(1, 3)), Some(&CostVector::uniform(5.0)));
    }

    #[test]
    fn test_sweep_first_scan_behind_origin() {
        let mut map = sweep_map(0);

        map.expand(&Pose::new(1500, -3500, 90.0), &patch(1, 1.0));

        assert_eq!(
            map.frontier().iter().copied().collect::<Vec<_>>(),
            vec![Cell::new(-3, 0), Cell::new(-3, 1), Cell::new(-3, 2)]
        );
    }

    #[test]
    fn test_neighbors() {
        let mut map = sweep_map(0);
        map.expand(&Pose::new(500, 500, 0.0), &patch(1, 1.0));

        assert_eq!(map.get_all_neighbors(&Cell::new(0, 0)).len(), 8);
        assert_eq!(map.get_all_neighbors(&Cell::new(1, 1)).len(), 3);
        assert_eq!(map.get_all_neighbors(&Cell::new(5, 5)).len(), 0);
        assert!(!map.get_all_neighbors(&Cell::new(0, 0)).contains(&Cell::new(0, 0)));
        assert_eq!(map.get_all_possible_neighbors(&Cell::new(5, 5)).len(), 8);
    }

    #[test]
    fn test_sweep_frontier_monotonic() {
        for tolerance in 0..3 {
            let mut map = sweep_map(tolerance);

            for step in 0..10 {
                map.expand(&Pose::new(500, 500 + step * 700, 90.0), &patch(2, 1.0));

                let max_row = map.cells().map(|(c, _)| c.row).max().unwrap();

                assert!(!map.frontier().is_empty());
                assert!(map.frontier().iter().all(|c| c.row >= max_row - tolerance));
                assert!(map.frontier().iter().all(|c| map.is_discovered(c)));
            }
        }
    }

    #[test]
    fn test_sweep_frontier_never_revisits() {
        let mut map = sweep_map(0);

        map.expand(&Pose::new(500, 4500, 90.0), &patch(1, 1.0));
        assert!(map.frontier().iter().all(|c| c.row == 5));

        // Discovering ground behind the leading edge doesn't bring it back into the frontier
        map.expand(&Pose::new(500, 500, 90.0), &patch(1, 1.0));
        assert!(map.frontier().iter().all(|c| c.row == 5));
        assert_eq!(map.frontier().len(), 3);
    }

    #[test]
    fn test_neighbor_count_frontier() {
        let mut map = WorldMap::new(MapParams {
            grid_resolution_mm: 1000,
            frontier_policy: FrontierPolicy::NeighborCount,
        });

        map.expand(&Pose::new(500, 500, 0.0), &patch(1, 1.0));
        assert_eq!(map.frontier().len(), 8);
        assert!(!map.frontier().contains(&Cell::new(0, 0)));

        // Growing the patch resolves the inner ring
        map.expand(&Pose::new(500, 500, 0.0), &patch(2, 1.0));
        assert_eq!(map.frontier().len(), 16);
        assert!(map.frontier().iter().all(|c| c.row.abs() == 2 || c.col.abs() == 2));
    }
}
