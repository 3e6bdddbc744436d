//! Plans minimum cost paths through the [`WorldMap`], using an A* algorithm.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet},
};

use comms_if::{
    geom::{Location, Pose},
    tick::CostVector,
};
use log::{trace, warn};
use ordered_float::OrderedFloat;

use crate::map::{Cell, WorldMap};

use super::{EdgeCostMode, Lanes, NavError, PathPlannerParams};

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PathPlanner {
    params: PathPlannerParams,

    lanes: Lanes,
}

/// An entry in the A* open set.
///
/// Entries are ordered by their f-score, and then by insertion order so that equal scores are
/// popped first in first out.
#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    f: OrderedFloat<f64>,
    counter: u64,
    cell: Cell,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl PathPlanner {
    pub fn new(params: PathPlannerParams) -> Self {
        let lanes = Lanes::new(params.lane_spans.clone());
        Self { params, lanes }
    }

    pub fn lanes(&self) -> &Lanes {
        &self.lanes
    }

    /// Lane aware travel distance between two carrier-frame locations.
    ///
    /// Returns `None` if the locations are not in the same lane, since no path can exist between
    /// them. Travel against the carrier's forward direction (decreasing Y) is penalised by the
    /// `reverse_travel_penalty` factor.
    pub fn distance(&self, start: &Location, goal: &Location) -> Option<f64> {
        self.lanes.common_lane(start.x, goal.x)?;

        let penalty = if goal.y < start.y {
            self.params.reverse_travel_penalty
        } else {
            1.0
        };

        Some(penalty * start.distance(goal))
    }

    /// Plan a path from the start pose to the goal location.
    ///
    /// The returned path begins with the start pose itself, passes through the centres of the
    /// cells along the minimum cost route, and ends at the goal. Each pose after the first faces
    /// along the segment leading into it. The path never leaves the start's lane.
    pub fn plan(
        &self,
        map: &WorldMap,
        start: &Pose,
        goal: &Location,
    ) -> Result<Vec<Pose>, NavError> {
        let lane = self
            .lanes
            .common_lane(start.x, goal.x)
            .ok_or_else(|| NavError::DifferentLanes(start.location(), *goal))?;

        self.search(map, start, goal, Some(lane))
    }

    /// Plan a path as [`PathPlanner::plan`] does, but free to cross between lanes.
    ///
    /// Used for trips to the service point, which serves every lane.
    pub fn plan_across_lanes(
        &self,
        map: &WorldMap,
        start: &Pose,
        goal: &Location,
    ) -> Result<Vec<Pose>, NavError> {
        self.search(map, start, goal, None)
    }

    /// A* search from the start to the goal, keeping intermediate cells inside `lane` if given.
    fn search(
        &self,
        map: &WorldMap,
        start: &Pose,
        goal: &Location,
        lane: Option<usize>,
    ) -> Result<Vec<Pose>, NavError> {
        let start_loc = start.location();

        let start_cell = map.get_containing_cell(&start_loc);
        let goal_cell = map.get_containing_cell(goal);

        // No search needed within a single cell
        if start_cell == goal_cell {
            return Ok(vec![
                *start,
                Pose::new(goal.x, goal.y, start_loc.heading_to(goal)),
            ]);
        }

        if !map.is_discovered(&start_cell) {
            return Err(NavError::StartOutsideMap(start_cell));
        }
        if !map.is_discovered(&goal_cell) {
            return Err(NavError::GoalOutsideMap(goal_cell));
        }

        let goal_centre = map.get_center_location(&goal_cell);

        // Create the priority queue (binary heap) for the open set
        let mut open = BinaryHeap::new();

        let mut parents: HashMap<Cell, Cell> = HashMap::new();
        let mut g_score: HashMap<Cell, f64> = HashMap::new();
        let mut f_score: HashMap<Cell, OrderedFloat<f64>> = HashMap::new();

        let mut counter = 0u64;
        let mut num_expansions = 0usize;

        let start_f = OrderedFloat(goal_centre.distance(&map.get_center_location(&start_cell)));
        g_score.insert(start_cell, 0.0);
        f_score.insert(start_cell, start_f);
        open.push(OpenEntry {
            f: start_f,
            counter,
            cell: start_cell,
        });

        while let Some(entry) = open.pop() {
            let current = entry.cell;

            // Skip entries superseded by a cheaper route to the same cell
            if f_score.get(&current).map_or(false, |best| entry.f > *best) {
                continue;
            }

            if current == goal_cell {
                trace!(
                    "Path to {} found after {} expansions",
                    goal_cell,
                    num_expansions
                );

                let cells = reconstruct_path(&parents, start_cell, goal_cell)
                    .ok_or(NavError::NoPathToTarget(goal_cell))?;

                return Ok(build_waypoints(map, start, goal, &cells));
            }

            num_expansions += 1;
            if num_expansions > self.params.max_expansions {
                warn!(
                    "Search from {} to {} stopped after {} expansions",
                    start_cell, goal_cell, self.params.max_expansions
                );
                return Err(NavError::SearchLimitReached(
                    goal_cell,
                    self.params.max_expansions,
                ));
            }

            let current_g = match g_score.get(&current) {
                Some(g) => *g,
                None => continue,
            };

            for neighbor in map.get_all_neighbors(&current) {
                if neighbor == start_cell {
                    continue;
                }

                // Intermediate cells must stay inside the start lane
                if let Some(lane) = lane {
                    if neighbor != goal_cell
                        && self.lanes.lane_of(map.get_center_location(&neighbor).x) != Some(lane)
                    {
                        continue;
                    }
                }

                let cost = match self.traversal_cost(map, &current, &neighbor) {
                    Some(c) => c,
                    None => continue,
                };

                let tentative_g = current_g + cost;

                if g_score.get(&neighbor).map_or(true, |g| tentative_g < *g) {
                    // Don't step straight back to where we came from
                    if parents.get(&current) == Some(&neighbor) {
                        continue;
                    }

                    let f = OrderedFloat(
                        tentative_g + goal_centre.distance(&map.get_center_location(&neighbor)),
                    );

                    parents.insert(neighbor, current);
                    g_score.insert(neighbor, tentative_g);
                    f_score.insert(neighbor, f);

                    counter += 1;
                    open.push(OpenEntry {
                        f,
                        counter,
                        cell: neighbor,
                    });
                }
            }
        }

        Err(NavError::NoPathToTarget(goal_cell))
    }

    /// Cost of moving from `current` into the adjacent `neighbor` cell.
    ///
    /// The cost is taken from the current cell's cost vector, using the component matching the
    /// direction of the move. In [`EdgeCostMode::Signed`] the cost takes the sign of the row
    /// displacement, or of the column displacement for east-west moves.
    fn traversal_cost(&self, map: &WorldMap, current: &Cell, neighbor: &Cell) -> Option<f64> {
        let costs = map.costs(current)?;

        let dr = neighbor.row - current.row;
        let dc = neighbor.col - current.col;

        let (component, direction) = match (dr + dc).abs() {
            0 => (CostVector::NW_SE, dr),
            2 => (CostVector::NE_SW, dr),
            _ if dc == 0 => (CostVector::NORTH_SOUTH, dr),
            _ => (CostVector::EAST_WEST, dc),
        };

        let magnitude = costs.0[component];

        Some(match self.params.edge_cost_mode {
            EdgeCostMode::Signed => magnitude.copysign(direction as f64),
            EdgeCostMode::Magnitude => magnitude.abs(),
        })
    }
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.counter == other.counter
    }
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Note that we flip the order here so that the heap will be a min-heap, not a max-heap
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.counter.cmp(&self.counter))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Walk the parent links back from the goal, returning the cells from start to goal.
///
/// Returns `None` if the links loop before reaching the start, which can only happen when signed
/// costs form a negative cycle.
fn reconstruct_path(
    parents: &HashMap<Cell, Cell>,
    start_cell: Cell,
    goal_cell: Cell,
) -> Option<Vec<Cell>> {
    let mut path = vec![goal_cell];
    let mut seen = HashSet::new();
    seen.insert(goal_cell);

    let mut current = goal_cell;

    while current != start_cell {
        current = *parents.get(&current)?;

        if !seen.insert(current) {
            warn!("Parent links towards {} contain a cycle", goal_cell);
            return None;
        }

        path.push(current);
    }

    path.reverse();
    Some(path)
}

/// Convert a sequence of cells (start cell first, goal cell last) into oriented waypoints.
///
/// The start and goal cell centres are replaced by the literal start pose and goal location.
fn build_waypoints(map: &WorldMap, start: &Pose, goal: &Location, cells: &[Cell]) -> Vec<Pose> {
    let mut waypoints = Vec::with_capacity(cells.len() + 1);

    let mut previous = match cells.first() {
        Some(c) => map.get_center_location(c),
        None => start.location(),
    };

    for cell in cells.iter().skip(1) {
        let centre = map.get_center_location(cell);
        waypoints.push(Pose::new(centre.x, centre.y, previous.heading_to(&centre)));
        previous = centre;
    }

    if let Some(first) = waypoints.first_mut() {
        first.a = start.location().heading_to(&first.location());
    }

    waypoints.insert(0, *start);

    // Replace the goal cell's centre with the goal itself
    if waypoints.len() > 1 {
        waypoints.pop();
    }

    let last = waypoints
        .last()
        .map(|p| p.location())
        .unwrap_or_else(|| start.location());

    waypoints.push(Pose::new(goal.x, goal.y, last.heading_to(goal)));

    waypoints
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
