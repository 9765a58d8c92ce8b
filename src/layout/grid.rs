use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::ir::Direction;

use super::compact::{CoordRanks, CoordSet};
use super::error::LayoutError;

/// Integer grid coordinate `(x, y)`.
pub type Cell = (i32, i32);

pub fn step(cell: Cell, direction: Direction) -> Cell {
    let (dx, dy) = direction.delta();
    (cell.0 + dx, cell.1 + dy)
}

/// Inclusive bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl Bounds {
    pub fn new(min_x: i32, max_x: i32, min_y: i32, max_y: i32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn point(cell: Cell) -> Self {
        Self::new(cell.0, cell.0, cell.1, cell.1)
    }

    pub fn include(&mut self, cell: Cell) {
        self.min_x = self.min_x.min(cell.0);
        self.max_x = self.max_x.max(cell.0);
        self.min_y = self.min_y.min(cell.1);
        self.max_y = self.max_y.max(cell.1);
    }

    pub fn union(self, other: Bounds) -> Bounds {
        Bounds::new(
            self.min_x.min(other.min_x),
            self.max_x.max(other.max_x),
            self.min_y.min(other.min_y),
            self.max_y.max(other.max_y),
        )
    }

    pub fn expand(self, margin: i32) -> Bounds {
        Bounds::new(
            self.min_x - margin,
            self.max_x + margin,
            self.min_y - margin,
            self.max_y + margin,
        )
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.0 >= self.min_x && cell.0 <= self.max_x && cell.1 >= self.min_y && cell.1 <= self.max_y
    }

    pub fn width(&self) -> usize {
        (self.max_x - self.min_x + 1).max(0) as usize
    }

    pub fn height(&self) -> usize {
        (self.max_y - self.min_y + 1).max(0) as usize
    }
}

fn union_bounds(a: Option<Bounds>, b: Option<Bounds>) -> Option<Bounds> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Segment between two cells carrying a tag value. Only axis-aligned
/// segments can be written into a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Line {
    pub from: Cell,
    pub to: Cell,
    pub tag: i32,
}

impl Line {
    pub fn new(from: Cell, to: Cell, tag: i32) -> Self {
        Self { from, to, tag }
    }

    pub fn point(cell: Cell, tag: i32) -> Self {
        Self::new(cell, cell, tag)
    }

    pub fn is_axis_aligned(&self) -> bool {
        self.from.0 == self.to.0 || self.from.1 == self.to.1
    }

    pub fn with_tag(self, tag: i32) -> Self {
        Self { tag, ..self }
    }

    /// Manhattan length; 0 for a single point.
    pub fn length(&self) -> i32 {
        (self.to.0 - self.from.0).abs() + (self.to.1 - self.from.1).abs()
    }

    /// Cells from `from` to `to`, both ends included. Callers must check
    /// `is_axis_aligned` first.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let dx = (self.to.0 - self.from.0).signum();
        let dy = (self.to.1 - self.from.1).signum();
        let from = self.from;
        (0..=self.length()).map(move |i| (from.0 + dx * i, from.1 + dy * i))
    }
}

// ── View contract ───────────────────────────────────────────────────

/// Read access to a sparse integer grid. Unset cells read 0.
pub trait GridView {
    fn get(&self, cell: Cell) -> i32;

    /// Bounding box of the non-zero cells, `None` when there are none.
    fn bounds(&self) -> Option<Bounds>;

    /// Cells holding crossing markers, sorted.
    fn negative_cells(&self) -> Vec<Cell> {
        Vec::new()
    }
}

pub trait GridViewMut: GridView {
    fn set(&mut self, cell: Cell, value: i32);

    fn set_line(&mut self, line: Line) -> Result<(), LayoutError>;
}

impl<T: GridView + ?Sized> GridView for &T {
    fn get(&self, cell: Cell) -> i32 {
        (**self).get(cell)
    }

    fn bounds(&self) -> Option<Bounds> {
        (**self).bounds()
    }

    fn negative_cells(&self) -> Vec<Cell> {
        (**self).negative_cells()
    }
}

// ── Pixel store ─────────────────────────────────────────────────────

/// The owning grid: painted pixels plus the ordered list of lines that
/// produced them, so the whole store can be remapped onto new coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelStore {
    pixels: BTreeMap<Cell, i32>,
    lines: Vec<Line>,
}

impl PixelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn coord_set(&self) -> CoordSet {
        let mut set = CoordSet::new();
        for line in &self.lines {
            set.add(line.from);
            set.add(line.to);
        }
        set
    }

    /// Replace every line endpoint by its scaled rank and repaint.
    pub fn remap(&self, ranks: &CoordRanks) -> Result<PixelStore, LayoutError> {
        let mut remapped = PixelStore::new();
        for line in &self.lines {
            let from = ranks.rank_cell(line.from)?;
            let to = ranks.rank_cell(line.to)?;
            remapped.set_line(Line::new(from, to, line.tag))?;
        }
        Ok(remapped)
    }

    fn paint(&mut self, line: &Line) {
        for cell in line.cells() {
            if line.tag != 0 {
                self.pixels.insert(cell, line.tag);
            } else {
                self.pixels.remove(&cell);
            }
        }
    }
}

impl GridView for PixelStore {
    fn get(&self, cell: Cell) -> i32 {
        self.pixels.get(&cell).copied().unwrap_or(0)
    }

    fn bounds(&self) -> Option<Bounds> {
        let mut cells = self.pixels.keys().copied();
        let mut bounds = Bounds::point(cells.next()?);
        for cell in cells {
            bounds.include(cell);
        }
        Some(bounds)
    }

    fn negative_cells(&self) -> Vec<Cell> {
        self.pixels
            .iter()
            .filter(|(_, value)| **value < 0)
            .map(|(cell, _)| *cell)
            .collect()
    }
}

impl GridViewMut for PixelStore {
    fn set(&mut self, cell: Cell, value: i32) {
        let line = Line::point(cell, value);
        self.paint(&line);
        self.lines.push(line);
    }

    fn set_line(&mut self, line: Line) -> Result<(), LayoutError> {
        if !line.is_axis_aligned() {
            return Err(LayoutError::internal(format!(
                "segment {:?} -> {:?} is not axis-aligned",
                line.from, line.to
            )));
        }
        self.paint(&line);
        self.lines.push(line);
        Ok(())
    }
}

// ── Read-only wrappers ──────────────────────────────────────────────

/// Front value unless it is 0, then the back value.
pub struct Merge<'a, F: ?Sized, B: ?Sized> {
    front: &'a F,
    back: &'a B,
}

impl<'a, F: GridView + ?Sized, B: GridView + ?Sized> Merge<'a, F, B> {
    pub fn new(front: &'a F, back: &'a B) -> Self {
        Self { front, back }
    }
}

impl<F: GridView + ?Sized, B: GridView + ?Sized> GridView for Merge<'_, F, B> {
    fn get(&self, cell: Cell) -> i32 {
        match self.front.get(cell) {
            0 => self.back.get(cell),
            value => value,
        }
    }

    fn bounds(&self) -> Option<Bounds> {
        union_bounds(self.front.bounds(), self.back.bounds())
    }

    fn negative_cells(&self) -> Vec<Cell> {
        let cells: BTreeSet<Cell> = self
            .front
            .negative_cells()
            .into_iter()
            .chain(self.back.negative_cells())
            .filter(|cell| self.get(*cell) < 0)
            .collect();
        cells.into_iter().collect()
    }
}

/// Inflates every non-zero cell by one step in the four axis directions.
/// Reads the maximum non-zero value among a cell and its neighbours.
pub struct Span<'a, G: ?Sized> {
    base: &'a G,
}

impl<'a, G: GridView + ?Sized> Span<'a, G> {
    pub fn new(base: &'a G) -> Self {
        Self { base }
    }
}

impl<G: GridView + ?Sized> GridView for Span<'_, G> {
    fn get(&self, cell: Cell) -> i32 {
        std::iter::once(cell)
            .chain(Direction::ALL.iter().map(|dir| step(cell, *dir)))
            .map(|near| self.base.get(near))
            .filter(|value| *value != 0)
            .max()
            .unwrap_or(0)
    }

    fn bounds(&self) -> Option<Bounds> {
        self.base.bounds().map(|bounds| bounds.expand(1))
    }
}

/// Forces a handful of cells to read empty: a socket's crossing cells and
/// the exit cell in front of each plug.
pub struct ErasePoint<'a, G: ?Sized> {
    base: &'a G,
    erased: BTreeSet<Cell>,
}

impl<'a, G: GridView + ?Sized> ErasePoint<'a, G> {
    pub fn new(
        base: &'a G,
        cells: impl IntoIterator<Item = Cell>,
    ) -> Result<Self, LayoutError> {
        let erased: BTreeSet<Cell> = cells.into_iter().collect();
        if erased.len() != 3 && erased.len() != 4 {
            return Err(LayoutError::internal(format!(
                "erase set must hold 3 or 4 cells, got {}",
                erased.len()
            )));
        }
        Ok(Self { base, erased })
    }
}

impl<G: GridView + ?Sized> GridView for ErasePoint<'_, G> {
    fn get(&self, cell: Cell) -> i32 {
        if self.erased.contains(&cell) {
            0
        } else {
            self.base.get(cell)
        }
    }

    fn bounds(&self) -> Option<Bounds> {
        self.base.bounds()
    }

    fn negative_cells(&self) -> Vec<Cell> {
        self.base
            .negative_cells()
            .into_iter()
            .filter(|cell| !self.erased.contains(cell))
            .collect()
    }
}

/// Walls off everything outside `rect` and keeps two cells open so a
/// search can start and end on otherwise occupied cells.
pub struct Margin<'a, G: ?Sized> {
    base: &'a G,
    rect: Bounds,
    wall: i32,
    open: [Cell; 2],
}

impl<'a, G: GridView + ?Sized> Margin<'a, G> {
    pub fn new(base: &'a G, rect: Bounds, wall: i32, open: [Cell; 2]) -> Result<Self, LayoutError> {
        if wall == 0 {
            return Err(LayoutError::internal("margin wall value must be non-zero"));
        }
        Ok(Self {
            base,
            rect,
            wall,
            open,
        })
    }
}

impl<G: GridView + ?Sized> GridView for Margin<'_, G> {
    fn get(&self, cell: Cell) -> i32 {
        if self.open.contains(&cell) {
            0
        } else if !self.rect.contains(cell) {
            self.wall
        } else {
            self.base.get(cell)
        }
    }

    fn bounds(&self) -> Option<Bounds> {
        Some(self.rect)
    }

    fn negative_cells(&self) -> Vec<Cell> {
        self.base
            .negative_cells()
            .into_iter()
            .filter(|cell| self.rect.contains(*cell) && !self.open.contains(cell))
            .collect()
    }
}
