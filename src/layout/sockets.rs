use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::ir::{Direction, SocketId};

use super::compact::{CoordRanks, CoordSet};
use super::error::LayoutError;
use super::grid::{Cell, GridViewMut, Line, PixelStore, step};

/// Marker for a crossing whose under-strand runs east-west.
pub const HORIZONTAL_CROSSING: i32 = -2;
/// Marker for a crossing whose under-strand runs north-south.
pub const VERTICAL_CROSSING: i32 = -1;

pub fn crossing_marker(base: Direction) -> i32 {
    if base.is_horizontal() {
        HORIZONTAL_CROSSING
    } else {
        VERTICAL_CROSSING
    }
}

/// One end of a strand segment: the crossing cell it leaves and the side
/// it leaves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Plug {
    pub cell: Cell,
    pub direction: Direction,
}

impl Plug {
    pub fn new(cell: Cell, direction: Direction) -> Self {
        Self { cell, direction }
    }

    /// The empty cell directly in front of the plug.
    pub fn exit_cell(&self) -> Cell {
        step(self.cell, self.direction)
    }
}

/// Plug positions for every socket, the base direction of every crossing
/// cell, and which sockets are already drawn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocketRegistry {
    plugs: BTreeMap<SocketId, Vec<Plug>>,
    bases: BTreeMap<Cell, Direction>,
    used: BTreeSet<SocketId>,
    checked: bool,
}

impl SocketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_plug(&mut self, socket: SocketId, plug: Plug) -> Result<(), LayoutError> {
        if self.checked {
            return Err(LayoutError::internal(format!(
                "plug for socket {socket} added after the registry was checked"
            )));
        }
        self.plugs.entry(socket).or_default().push(plug);
        Ok(())
    }

    pub fn set_base(&mut self, cell: Cell, base: Direction) {
        self.bases.insert(cell, base);
    }

    pub fn set_used(&mut self, socket: SocketId) {
        self.used.insert(socket);
    }

    pub fn is_used(&self, socket: SocketId) -> bool {
        self.used.contains(&socket)
    }

    pub fn used_count(&self) -> usize {
        self.used.len()
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    /// Unused socket ids in `1..=max_socket`, ascending.
    pub fn unused(&self, max_socket: SocketId) -> Vec<SocketId> {
        (1..=max_socket).filter(|id| !self.is_used(*id)).collect()
    }

    pub fn plugs(&self, socket: SocketId) -> Option<[Plug; 2]> {
        match self.plugs.get(&socket)?.as_slice() {
            [first, second] => Some([*first, *second]),
            _ => None,
        }
    }

    /// Verifies the registry derived from a placement. A failure here is a
    /// builder bug, never bad luck.
    pub fn check(&mut self, crossing_count: usize, piece_count: usize) -> Result<(), LayoutError> {
        let max_socket = 2 * crossing_count as SocketId;
        for socket in 1..=max_socket {
            let found = self.plugs.get(&socket).map_or(0, Vec::len);
            if found != 2 {
                return Err(LayoutError::internal(format!(
                    "socket {socket} has {found} plugs, expected 2"
                )));
            }
        }
        if let Some(socket) = self.plugs.keys().find(|id| **id < 1 || **id > max_socket) {
            return Err(LayoutError::internal(format!(
                "unexpected socket {socket} in registry"
            )));
        }
        for plug in self.plugs.values().flatten() {
            if !self.bases.contains_key(&plug.cell) {
                return Err(LayoutError::internal(format!(
                    "no base direction recorded at {:?}",
                    plug.cell
                )));
            }
        }
        let expected = crossing_count.saturating_sub(piece_count);
        if self.used.len() != expected {
            return Err(LayoutError::internal(format!(
                "{} sockets used by the placement, expected {expected}",
                self.used.len()
            )));
        }
        self.checked = true;
        Ok(())
    }

    /// Every plug cell and crossing cell.
    pub fn coord_set(&self) -> CoordSet {
        let mut set = CoordSet::new();
        for plug in self.plugs.values().flatten() {
            set.add(plug.cell);
        }
        for cell in self.bases.keys() {
            set.add(*cell);
        }
        set
    }

    /// A new registry with every coordinate replaced by its scaled rank.
    pub fn commit_coord_map(&self, ranks: &CoordRanks) -> Result<SocketRegistry, LayoutError> {
        if !self.checked {
            return Err(LayoutError::internal(
                "coordinate map committed before the registry was checked",
            ));
        }
        let mut plugs = BTreeMap::new();
        for (socket, list) in &self.plugs {
            let remapped = list
                .iter()
                .map(|plug| Ok(Plug::new(ranks.rank_cell(plug.cell)?, plug.direction)))
                .collect::<Result<Vec<_>, LayoutError>>()?;
            plugs.insert(*socket, remapped);
        }
        let mut bases = BTreeMap::new();
        for (cell, base) in &self.bases {
            bases.insert(ranks.rank_cell(*cell)?, *base);
        }
        Ok(SocketRegistry {
            plugs,
            bases,
            used: self.used.clone(),
            checked: true,
        })
    }

    /// One segment per used socket, joining its two plug cells.
    pub fn tree_edge_view(&self) -> Result<PixelStore, LayoutError> {
        let mut store = PixelStore::new();
        for socket in &self.used {
            let [first, second] = self.plugs(*socket).ok_or_else(|| {
                LayoutError::internal(format!("used socket {socket} lacks two plugs"))
            })?;
            store.set_line(Line::new(first.cell, second.cell, *socket))?;
        }
        Ok(store)
    }

    pub fn crossing_view(&self) -> PixelStore {
        let mut store = PixelStore::new();
        for (cell, base) in &self.bases {
            store.set(*cell, crossing_marker(*base));
        }
        store
    }
}
