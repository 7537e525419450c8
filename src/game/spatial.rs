//! Spatial hash grids
//!
//! `AgentGrid` buckets moving circles for the crowd separation broadphase.
//! `ObstacleGrid` buckets static rectangles so movement queries only test
//! obstacles near the mover instead of the whole city.
//!
//! Bucket iteration order carries no meaning: `AgentGrid::sorted_pairs`
//! and `ObstacleGrid::query` sort their output, which is what keeps
//! resolution order reproducible.

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;

use crate::game::collision::Aabb;
use crate::game::constants::crowd::GRID_CELL_SIZE;
use crate::game::world::ObstacleId;
use crate::util::vec2::Vec2;

/// Grid cell key - (x, y) cell coordinates
pub type CellKey = (i32, i32);

/// Initial capacity for agent grid cells (number of expected non-empty cells)
const AGENT_GRID_INITIAL_CAPACITY: usize = 256;

/// Initial capacity for agent vectors within cells
const AGENT_CELL_INITIAL_CAPACITY: usize = 8;

/// Obstacle grid cell size; buildings are large so cells are coarse
pub const OBSTACLE_GRID_CELL_SIZE: f32 = 256.0;

/// Inline capacity for obstacle query results
pub type ObstacleHits = SmallVec<[ObstacleId; 16]>;

#[inline]
fn position_to_cell(position: Vec2, inv_cell_size: f32) -> CellKey {
    (
        (position.x * inv_cell_size).floor() as i32,
        (position.y * inv_cell_size).floor() as i32,
    )
}

/// Agent entry stored in the grid (index into the agent list)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridAgent {
    pub index: usize,
    pub position: Vec2,
}

/// Spatial hash grid over agent circles
pub struct AgentGrid {
    inv_cell_size: f32,
    cells: HashMap<CellKey, Vec<GridAgent>, FxBuildHasher>,
}

impl AgentGrid {
    /// Cell size must be at least the largest agent diameter so every
    /// touching pair lands in the same or an adjacent cell
    pub fn new(cell_size: f32) -> Self {
        Self {
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::with_capacity_and_hasher(
                AGENT_GRID_INITIAL_CAPACITY,
                FxBuildHasher,
            ),
        }
    }

    /// Clear all entries, keeping cell allocations
    #[inline]
    pub fn clear(&mut self) {
        for cell in self.cells.values_mut() {
            cell.clear();
        }
    }

    #[inline]
    pub fn insert(&mut self, agent: GridAgent) {
        let cell_key = position_to_cell(agent.position, self.inv_cell_size);
        self.cells
            .entry(cell_key)
            .or_insert_with(|| Vec::with_capacity(AGENT_CELL_INITIAL_CAPACITY))
            .push(agent);
    }

    /// Process each candidate pair once, in hash-map order
    ///
    /// Checks each cell against itself and its right, bottom, bottom-right
    /// and bottom-left neighbours so no pair is visited twice.
    #[inline]
    pub fn for_each_potential_pair<F>(&self, mut callback: F)
    where
        F: FnMut(GridAgent, GridAgent),
    {
        for (&(cx, cy), entries) in &self.cells {
            for i in 0..entries.len() {
                for j in (i + 1)..entries.len() {
                    callback(entries[i], entries[j]);
                }
            }

            for offset in [(1, 0), (0, 1), (1, 1), (-1, 1)] {
                if let Some(other_cell) = self.cells.get(&(cx + offset.0, cy + offset.1)) {
                    for entry in entries {
                        for other in other_cell {
                            callback(*entry, *other);
                        }
                    }
                }
            }
        }
    }

    /// Candidate pairs as `(lower index, higher index)`, sorted so the
    /// resolution pass walks them in agent order whatever the bucket order
    pub fn sorted_pairs(&self, out: &mut Vec<(usize, usize)>) {
        out.clear();
        self.for_each_potential_pair(|a, b| {
            out.push((a.index.min(b.index), a.index.max(b.index)));
        });
        out.sort_unstable();
    }
}

impl Default for AgentGrid {
    fn default() -> Self {
        Self::new(GRID_CELL_SIZE)
    }
}

// ============================================================================
// Obstacle Grid - static rectangles, rebuilt when an obstacle is removed
// ============================================================================

/// Spatial hash grid over static obstacles
///
/// Each obstacle is registered in every cell its rectangle touches.
#[derive(Debug, Clone)]
pub struct ObstacleGrid {
    inv_cell_size: f32,
    cells: HashMap<CellKey, Vec<ObstacleId>, FxBuildHasher>,
}

impl ObstacleGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::with_hasher(FxBuildHasher),
        }
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    fn cell_span(&self, rect: &Aabb) -> (CellKey, CellKey) {
        (
            position_to_cell(rect.min, self.inv_cell_size),
            position_to_cell(rect.max, self.inv_cell_size),
        )
    }

    pub fn insert(&mut self, id: ObstacleId, rect: &Aabb) {
        let ((x0, y0), (x1, y1)) = self.cell_span(rect);
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                self.cells.entry((cx, cy)).or_default().push(id);
            }
        }
    }

    /// Obstacle ids whose cells touch `rect`, ascending and without duplicates
    pub fn query(&self, rect: &Aabb) -> ObstacleHits {
        let ((x0, y0), (x1, y1)) = self.cell_span(rect);
        let mut hits = ObstacleHits::new();
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                if let Some(cell) = self.cells.get(&(cx, cy)) {
                    hits.extend(cell.iter().copied());
                }
            }
        }
        hits.sort_unstable();
        hits.dedup();
        hits
    }

    /// Rebuild the grid from a collection of obstacles
    pub fn rebuild<'a>(&mut self, obstacles: impl Iterator<Item = (ObstacleId, &'a Aabb)>) {
        self.clear();
        for (id, rect) in obstacles {
            self.insert(id, rect);
        }
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

impl Default for ObstacleGrid {
    fn default() -> Self {
        Self::new(OBSTACLE_GRID_CELL_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_grid_agent(index: usize, x: f32, y: f32) -> GridAgent {
        GridAgent {
            index,
            position: Vec2::new(x, y),
        }
    }

    #[test]
    fn test_adjacent_cells_pair_up() {
        let mut grid = AgentGrid::new(64.0);
        grid.insert(create_grid_agent(0, 80.0, 80.0));
        grid.insert(create_grid_agent(1, 130.0, 80.0));

        let mut pairs = Vec::new();
        grid.sorted_pairs(&mut pairs);
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn test_distant_cells_do_not_pair() {
        let mut grid = AgentGrid::new(64.0);
        grid.insert(create_grid_agent(0, 0.0, 0.0));
        grid.insert(create_grid_agent(1, 200.0, 0.0));

        let mut pairs = Vec::new();
        grid.sorted_pairs(&mut pairs);
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut grid = AgentGrid::new(64.0);
        grid.insert(create_grid_agent(0, 100.0, 100.0));
        grid.insert(create_grid_agent(1, 110.0, 100.0));
        grid.clear();

        let mut pairs = Vec::new();
        grid.sorted_pairs(&mut pairs);
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_for_each_potential_pair() {
        let mut grid = AgentGrid::new(64.0);

        // Two entries in same cell
        grid.insert(create_grid_agent(0, 100.0, 100.0));
        grid.insert(create_grid_agent(1, 110.0, 100.0));
        // Third entry in neighboring cell
        grid.insert(create_grid_agent(2, 165.0, 100.0));

        let mut pair_count = 0;
        grid.for_each_potential_pair(|_a, _b| {
            pair_count += 1;
        });

        // (0,1) in same cell + (0,2) and (1,2) from neighbor
        assert_eq!(pair_count, 3, "Should find 3 pairs");
    }

    #[test]
    fn test_sorted_pairs_are_ordered() {
        let mut grid = AgentGrid::new(64.0);
        grid.insert(create_grid_agent(5, 165.0, 100.0));
        grid.insert(create_grid_agent(3, 100.0, 100.0));
        grid.insert(create_grid_agent(1, 110.0, 100.0));

        let mut pairs = Vec::new();
        grid.sorted_pairs(&mut pairs);
        assert_eq!(pairs, vec![(1, 3), (1, 5), (3, 5)]);
    }

    #[test]
    fn test_negative_coordinates_bucket_separately() {
        let mut grid = AgentGrid::new(64.0);
        grid.insert(create_grid_agent(0, -10.0, -10.0));
        grid.insert(create_grid_agent(1, 10.0, 10.0));

        // Cells (-1,-1) and (0,0) are diagonal neighbours
        let mut pairs = Vec::new();
        grid.sorted_pairs(&mut pairs);
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn test_obstacle_grid_spanning_rect() {
        let mut grid = ObstacleGrid::new(100.0);
        // Spans cells x 0..=2, y 0..=0
        grid.insert(4, &Aabb::from_xywh(10.0, 10.0, 250.0, 50.0));

        assert_eq!(grid.cell_count(), 3);
        for x in [20.0, 120.0, 220.0] {
            let hits = grid.query(&Aabb::from_xywh(x, 20.0, 5.0, 5.0));
            assert_eq!(hits.as_slice(), &[4]);
        }
        assert!(grid.query(&Aabb::from_xywh(320.0, 20.0, 5.0, 5.0)).is_empty());
    }

    #[test]
    fn test_obstacle_grid_query_dedups() {
        let mut grid = ObstacleGrid::new(100.0);
        grid.insert(2, &Aabb::from_xywh(0.0, 0.0, 300.0, 300.0));
        grid.insert(1, &Aabb::from_xywh(50.0, 50.0, 10.0, 10.0));

        let hits = grid.query(&Aabb::from_xywh(0.0, 0.0, 250.0, 250.0));
        assert_eq!(hits.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_obstacle_grid_rebuild() {
        let a = Aabb::from_xywh(0.0, 0.0, 10.0, 10.0);
        let b = Aabb::from_xywh(1000.0, 1000.0, 10.0, 10.0);
        let mut grid = ObstacleGrid::new(100.0);
        grid.rebuild([(0, &a), (1, &b)].into_iter());
        assert_eq!(grid.query(&b).as_slice(), &[1]);

        grid.rebuild([(0, &a)].into_iter());
        assert!(grid.query(&b).is_empty());
    }
}
