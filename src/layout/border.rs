use std::collections::{BTreeMap, BTreeSet, VecDeque};

use petgraph::unionfind::UnionFind;
use serde::Serialize;

use crate::ir::{Direction, SocketId};

use super::error::{LayoutError, OuterTarget};
use super::grid::{Bounds, Cell, GridView, step};

/// A finished diagram as a dense matrix. Row index is x, column index is y.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramGrid {
    cells: Vec<Vec<i32>>,
}

impl DiagramGrid {
    pub fn new(cells: Vec<Vec<i32>>) -> Result<Self, LayoutError> {
        let cols = cells.first().map_or(0, Vec::len);
        if cells.is_empty() || cols == 0 {
            return Err(LayoutError::internal("diagram grid is empty"));
        }
        if cells.iter().any(|row| row.len() != cols) {
            return Err(LayoutError::internal("diagram grid rows differ in length"));
        }
        Ok(Self { cells })
    }

    /// Copies the non-empty part of `view` with one empty cell of padding on
    /// every side.
    pub fn from_view<G: GridView + ?Sized>(view: &G) -> Result<Self, LayoutError> {
        let bounds = view
            .bounds()
            .ok_or_else(|| LayoutError::internal("cannot export an empty diagram"))?
            .expand(1);
        let cells = (bounds.min_x..=bounds.max_x)
            .map(|x| {
                (bounds.min_y..=bounds.max_y)
                    .map(|y| view.get((x, y)))
                    .collect()
            })
            .collect();
        Self::new(cells)
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    pub fn as_rows(&self) -> &[Vec<i32>] {
        &self.cells
    }

    pub fn max_value(&self) -> i32 {
        self.cells.iter().flatten().copied().max().unwrap_or(0)
    }

    fn slot(&self, cell: Cell) -> Option<(usize, usize)> {
        let row = usize::try_from(cell.0).ok()?;
        let col = usize::try_from(cell.1).ok()?;
        (row < self.rows() && col < self.cols()).then_some((row, col))
    }
}

impl GridView for DiagramGrid {
    fn get(&self, cell: Cell) -> i32 {
        self.slot(cell).map_or(0, |(row, col)| self.cells[row][col])
    }

    fn bounds(&self) -> Option<Bounds> {
        let mut found: Option<Bounds> = None;
        for (row, values) in self.cells.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                if *value != 0 {
                    let cell = (row as i32, col as i32);
                    match found.as_mut() {
                        Some(bounds) => bounds.include(cell),
                        None => found = Some(Bounds::point(cell)),
                    }
                }
            }
        }
        found
    }

    fn negative_cells(&self) -> Vec<Cell> {
        let mut cells = Vec::new();
        for (row, values) in self.cells.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                if *value < 0 {
                    cells.push((row as i32, col as i32));
                }
            }
        }
        cells
    }
}

/// Empty cells reachable from outside the drawing, searched from a virtual
/// empty ring one cell beyond the matrix.
fn outside_region(grid: &DiagramGrid) -> BTreeSet<Cell> {
    let rows = grid.rows() as i32;
    let cols = grid.cols() as i32;
    let ring = Bounds::new(-1, rows, -1, cols);
    let start = (-1, -1);
    let mut visited = BTreeSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(cell) = queue.pop_front() {
        for dir in Direction::ALL {
            let next = step(cell, dir);
            if !ring.contains(next) || grid.get(next) != 0 {
                continue;
            }
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }
    visited
}

/// Ids of every strand cell that touches the outside region.
pub fn border_ids(grid: &DiagramGrid) -> BTreeSet<SocketId> {
    let outside = outside_region(grid);
    let mut ids = BTreeSet::new();
    for cell in &outside {
        for dir in Direction::ALL {
            let value = grid.get(step(*cell, dir));
            if value > 0 {
                ids.insert(value);
            }
        }
    }
    ids
}

/// Groups ids `1..=max_id` joined by `pairs`. Each group is sorted and the
/// groups are ordered by their smallest id.
pub(crate) fn connected_components(
    max_id: SocketId,
    pairs: &[(SocketId, SocketId)],
) -> Vec<BTreeSet<SocketId>> {
    let size = max_id.max(0) as usize + 1;
    let mut union_find = UnionFind::<usize>::new(size);
    for (a, b) in pairs {
        if (1..=max_id).contains(a) && (1..=max_id).contains(b) {
            union_find.union(*a as usize, *b as usize);
        }
    }
    let mut groups: BTreeMap<usize, BTreeSet<SocketId>> = BTreeMap::new();
    for id in 1..=max_id {
        groups
            .entry(union_find.find_mut(id as usize))
            .or_default()
            .insert(id);
    }
    let mut components: Vec<BTreeSet<SocketId>> = groups.into_values().collect();
    components.sort_by_key(|component| component.first().copied());
    components
}

/// Strand components read back from a finished diagram: the two cells on
/// opposite sides of a crossing belong to the same strand.
pub fn diagram_components(grid: &DiagramGrid) -> Vec<BTreeSet<SocketId>> {
    let mut pairs = Vec::new();
    for (x, y) in grid.negative_cells() {
        for (a, b) in [((x, y + 1), (x, y - 1)), ((x - 1, y), (x + 1, y))] {
            let (va, vb) = (grid.get(a), grid.get(b));
            if va > 0 && vb > 0 {
                pairs.push((va, vb));
            }
        }
    }
    let present: BTreeSet<SocketId> = grid
        .as_rows()
        .iter()
        .flatten()
        .copied()
        .filter(|value| *value > 0)
        .collect();
    connected_components(grid.max_value(), &pairs)
        .into_iter()
        .filter(|component| component.iter().any(|id| present.contains(id)))
        .collect()
}

/// Whether the strand component holding `target` reaches the outer face.
pub fn touches_border(grid: &DiagramGrid, target: OuterTarget) -> bool {
    let id = match target {
        OuterTarget::Socket(id) => id,
        OuterTarget::LargestId => grid.max_value(),
    };
    if id <= 0 {
        return false;
    }
    let Some(component) = diagram_components(grid)
        .into_iter()
        .find(|component| component.contains(&id))
    else {
        return false;
    };
    let outer = border_ids(grid);
    !component.is_disjoint(&outer)
}
