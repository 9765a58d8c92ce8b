use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::ir::{Direction, PdCode, SocketId};

use super::error::LayoutError;
use super::grid::{Bounds, Cell, step};
use super::sockets::{Plug, SocketRegistry};

// ── Placement scoring ───────────────────────────────────────────────
/// Weight of the alignment between the growth direction and the ray from
/// the origin to the parent crossing.
const ALIGNMENT_WEIGHT: f64 = 0.5;
/// Distance under which another crossing counts as crowding the new cell.
const CROWDING_RADIUS: f64 = 1.0 + 1e-7;
/// Scores closer than this are treated as ties.
const SCORE_EPSILON: f64 = 1e-9;
/// Horizontal gap between the pieces of a split diagram.
const PIECE_GAP: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    /// Index into the PD code's crossing list.
    pub crossing: usize,
    pub cell: Cell,
    pub base: Direction,
    /// Neighbouring node per compass direction, indexed by `Direction::index`.
    pub links: [Option<usize>; 4],
}

/// A free plug found while walking the placed crossings.
#[derive(Debug, Clone, Copy)]
struct FreePlug {
    node: usize,
    direction: Direction,
}

/// Spanning forest over the crossings, each crossing on a grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdTree {
    nodes: Vec<TreeNode>,
    tree_sockets: BTreeSet<SocketId>,
    pieces: usize,
}

impl PdTree {
    /// Grows one placement. Crossings can still end up sharing a cell, see
    /// `build_non_overlapping`.
    pub fn build(pd: &PdCode, rng: &mut SmallRng) -> Result<Self, LayoutError> {
        let mut tree = PdTree {
            nodes: Vec::with_capacity(pd.crossing_count()),
            tree_sockets: BTreeSet::new(),
            pieces: 0,
        };
        let mut unplaced: BTreeSet<usize> = (0..pd.crossing_count()).collect();
        let penalty_scale = (pd.crossing_count() + 1) as f64;

        while !unplaced.is_empty() {
            let free = tree.free_plugs(pd);
            if free.is_empty() {
                let root_cell = match tree.bounds() {
                    Some(bounds) => (bounds.max_x + PIECE_GAP, 0),
                    None => (0, 0),
                };
                let crossing = pick_random(&unplaced, rng)?;
                unplaced.remove(&crossing);
                tree.place_root(crossing, root_cell);
                continue;
            }

            let scored: Vec<(SocketId, FreePlug, f64)> = free
                .iter()
                .map(|(socket, plug)| (*socket, *plug, tree.score(*plug, penalty_scale)))
                .collect();
            let best = scored
                .iter()
                .map(|(_, _, score)| *score)
                .fold(f64::NEG_INFINITY, f64::max);
            let ties: Vec<&(SocketId, FreePlug, f64)> = scored
                .iter()
                .filter(|(_, _, score)| (best - *score).abs() < SCORE_EPSILON)
                .collect();
            let pick = if ties.len() > 1 {
                rng.random_range(0..ties.len())
            } else {
                0
            };
            let (socket, plug, _) = *ties[pick];

            let child = unplaced
                .iter()
                .copied()
                .find(|idx| pd.crossings()[*idx].has_socket(socket))
                .ok_or_else(|| {
                    LayoutError::internal(format!("socket {socket} has no unplaced partner"))
                })?;
            unplaced.remove(&child);
            tree.attach(pd, plug, socket, child)?;
        }
        Ok(tree)
    }

    /// Rebuilds with fresh randomness until no two crossings share a cell.
    pub fn build_non_overlapping(
        pd: &PdCode,
        rng: &mut SmallRng,
        max_rebuilds: usize,
    ) -> Result<Self, LayoutError> {
        let first = Self::build(pd, rng)?;
        rebuild_while_overlapping(first, max_rebuilds, || {
            let mut fresh = SmallRng::seed_from_u64(rng.random());
            Self::build(pd, &mut fresh)
        })
    }

    pub fn has_overlap(&self) -> bool {
        let mut seen = BTreeSet::new();
        self.nodes.iter().any(|node| !seen.insert(node.cell))
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Number of disconnected pieces the placement grew from.
    pub fn piece_count(&self) -> usize {
        self.pieces
    }

    /// Sockets drawn as parent/child links.
    pub fn tree_sockets(&self) -> &BTreeSet<SocketId> {
        &self.tree_sockets
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let mut cells = self.nodes.iter().map(|node| node.cell);
        let mut bounds = Bounds::point(cells.next()?);
        for cell in cells {
            bounds.include(cell);
        }
        Some(bounds)
    }

    /// Plug records for every socket side of every placed crossing.
    pub fn socket_registry(&self, pd: &PdCode) -> Result<SocketRegistry, LayoutError> {
        let mut registry = SocketRegistry::new();
        for node in &self.nodes {
            let crossing = pd.crossings()[node.crossing];
            registry.set_base(node.cell, node.base);
            for aim in Direction::ALL {
                let socket = crossing.socket_on(node.base, aim);
                registry.add_plug(socket, Plug::new(node.cell, aim))?;
            }
        }
        for socket in &self.tree_sockets {
            registry.set_used(*socket);
        }
        Ok(registry)
    }

    fn place_root(&mut self, crossing: usize, cell: Cell) {
        self.nodes.push(TreeNode {
            crossing,
            cell,
            base: Direction::East,
            links: [None; 4],
        });
        self.pieces += 1;
    }

    fn attach(
        &mut self,
        pd: &PdCode,
        plug: FreePlug,
        socket: SocketId,
        crossing: usize,
    ) -> Result<(), LayoutError> {
        let facing = plug.direction.opposite();
        let base = pd.crossings()[crossing]
            .base_for(socket, facing)
            .ok_or_else(|| LayoutError::internal(format!("crossing {crossing} lacks socket {socket}")))?;
        let mut links = [None; 4];
        links[facing.index()] = Some(plug.node);
        let child = self.nodes.len();
        let cell = step(self.nodes[plug.node].cell, plug.direction);
        self.nodes.push(TreeNode {
            crossing,
            cell,
            base,
            links,
        });
        self.nodes[plug.node].links[plug.direction.index()] = Some(child);
        self.tree_sockets.insert(socket);
        Ok(())
    }

    /// Sockets exposed exactly once on an unlinked side of a placed crossing.
    /// A socket exposed twice already has both ends placed.
    fn free_plugs(&self, pd: &PdCode) -> BTreeMap<SocketId, FreePlug> {
        let mut free = BTreeMap::new();
        let mut closed = BTreeSet::new();
        for (idx, node) in self.nodes.iter().enumerate() {
            let crossing = pd.crossings()[node.crossing];
            for direction in Direction::ALL {
                if node.links[direction.index()].is_some() {
                    continue;
                }
                let socket = crossing.socket_on(node.base, direction);
                if closed.contains(&socket) {
                    continue;
                }
                if free.remove(&socket).is_some() {
                    closed.insert(socket);
                } else {
                    free.insert(socket, FreePlug { node: idx, direction });
                }
            }
        }
        free
    }

    /// Prefers growing outward along the ray from the origin; punishes
    /// landing on or next to another crossing.
    fn score(&self, plug: FreePlug, penalty_scale: f64) -> f64 {
        let parent = self.nodes[plug.node].cell;
        let (px, py) = (parent.0 as f64, parent.1 as f64);
        let (dx, dy) = plug.direction.delta();
        let norm = px.hypot(py);
        let alignment = if norm > 0.0 {
            (px * dx as f64 + py * dy as f64) / norm
        } else {
            0.0
        };
        let mut score = norm + ALIGNMENT_WEIGHT * alignment;

        let target = step(parent, plug.direction);
        if self.nodes.iter().any(|node| node.cell == target) {
            score -= penalty_scale * penalty_scale;
        }
        let crowded = self.nodes.iter().enumerate().any(|(idx, node)| {
            if idx == plug.node {
                return false;
            }
            let ddx = (node.cell.0 - target.0) as f64;
            let ddy = (node.cell.1 - target.1) as f64;
            ddx.hypot(ddy) <= CROWDING_RADIUS
        });
        if crowded {
            score -= 2.0 * penalty_scale;
        }
        score
    }
}

fn rebuild_while_overlapping(
    mut tree: PdTree,
    max_rebuilds: usize,
    mut rebuild: impl FnMut() -> Result<PdTree, LayoutError>,
) -> Result<PdTree, LayoutError> {
    let mut rebuilds = 0;
    while tree.has_overlap() {
        if rebuilds >= max_rebuilds {
            return Err(LayoutError::CrossingOverlap { rebuilds });
        }
        rebuilds += 1;
        tracing::trace!(rebuilds, "crossings overlap, rebuilding placement");
        tree = rebuild()?;
    }
    Ok(tree)
}

fn pick_random(set: &BTreeSet<usize>, rng: &mut SmallRng) -> Result<usize, LayoutError> {
    if set.is_empty() {
        return Err(LayoutError::internal("no crossing left to pick"));
    }
    let idx = rng.random_range(0..set.len());
    set.iter()
        .nth(idx)
        .copied()
        .ok_or_else(|| LayoutError::internal("random pick out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trefoil() -> PdCode {
        PdCode::new(vec![[1, 5, 2, 4], [3, 1, 4, 6], [5, 3, 6, 2]]).unwrap()
    }

    fn is_adjacent(a: Cell, b: Cell) -> bool {
        (a.0 - b.0).abs() + (a.1 - b.1).abs() == 1
    }

    #[test]
    fn places_every_crossing_once() {
        let pd = trefoil();
        let mut rng = SmallRng::seed_from_u64(7);
        let tree = PdTree::build(&pd, &mut rng).unwrap();
        let mut crossings: Vec<usize> = tree.nodes().iter().map(|n| n.crossing).collect();
        crossings.sort();
        assert_eq!(crossings, vec![0, 1, 2]);
        assert_eq!(tree.piece_count(), 1);
        assert_eq!(tree.tree_sockets().len(), 2);
        assert_eq!(tree.nodes()[0].cell, (0, 0));
        assert_eq!(tree.nodes()[0].base, Direction::East);
    }

    #[test]
    fn linked_nodes_are_grid_neighbours_sharing_a_socket() {
        let pd = trefoil();
        for seed in 0..20 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let tree = PdTree::build(&pd, &mut rng).unwrap();
            for node in tree.nodes() {
                for dir in Direction::ALL {
                    let Some(other) = node.links[dir.index()] else {
                        continue;
                    };
                    let other = &tree.nodes()[other];
                    assert!(is_adjacent(node.cell, other.cell));
                    assert_eq!(step(node.cell, dir), other.cell);
                    let here = pd.crossings()[node.crossing].socket_on(node.base, dir);
                    let there =
                        pd.crossings()[other.crossing].socket_on(other.base, dir.opposite());
                    assert_eq!(here, there);
                }
            }
        }
    }

    #[test]
    fn registry_holds_two_plugs_per_socket() {
        let pd = trefoil();
        let mut rng = SmallRng::seed_from_u64(3);
        let tree = PdTree::build_non_overlapping(&pd, &mut rng, 64).unwrap();
        assert!(!tree.has_overlap());
        let mut registry = tree.socket_registry(&pd).unwrap();
        for socket in 1..=6 {
            assert!(registry.plugs(socket).is_some());
        }
        registry.check(3, tree.piece_count()).unwrap();
        assert_eq!(registry.used_count(), 2);
    }

    #[test]
    fn same_seed_same_tree() {
        let pd = trefoil();
        let a = PdTree::build(&pd, &mut SmallRng::seed_from_u64(11)).unwrap();
        let b = PdTree::build(&pd, &mut SmallRng::seed_from_u64(11)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn split_diagrams_grow_a_forest() {
        // Two separate kinked loops: nothing links the crossings.
        let pd = PdCode::new(vec![[1, 1, 2, 2], [3, 3, 4, 4]]).unwrap();
        let mut rng = SmallRng::seed_from_u64(5);
        let tree = PdTree::build(&pd, &mut rng).unwrap();
        assert_eq!(tree.piece_count(), 2);
        assert!(tree.tree_sockets().is_empty());
        assert_eq!(tree.nodes()[1].cell, (PIECE_GAP, 0));
        let mut registry = tree.socket_registry(&pd).unwrap();
        registry.check(2, tree.piece_count()).unwrap();
    }

    fn roots_at(cells: &[Cell]) -> PdTree {
        let mut tree = PdTree {
            nodes: Vec::new(),
            tree_sockets: BTreeSet::new(),
            pieces: 0,
        };
        for (crossing, cell) in cells.iter().enumerate() {
            tree.place_root(crossing, *cell);
        }
        tree
    }

    #[test]
    fn overlap_detection() {
        assert!(!roots_at(&[(0, 0)]).has_overlap());
        assert!(roots_at(&[(0, 0), (0, 0)]).has_overlap());
    }

    #[test]
    fn overlapping_build_fails_once_rebuilds_run_out() {
        let overlapping = roots_at(&[(0, 0), (0, 0)]);
        let err = rebuild_while_overlapping(overlapping.clone(), 0, || {
            panic!("no rebuild allowed with a cap of 0")
        })
        .unwrap_err();
        assert_eq!(err, LayoutError::CrossingOverlap { rebuilds: 0 });
        assert!(err.is_recoverable());

        let mut calls = 0;
        let err = rebuild_while_overlapping(overlapping.clone(), 3, || {
            calls += 1;
            Ok(overlapping.clone())
        })
        .unwrap_err();
        assert_eq!(err, LayoutError::CrossingOverlap { rebuilds: 3 });
        assert_eq!(calls, 3);
    }

    #[test]
    fn rebuild_stops_at_the_first_clean_placement() {
        let clean = roots_at(&[(0, 0), (2, 0)]);
        let mut attempts = vec![clean.clone(), roots_at(&[(1, 1), (1, 1)])];
        let tree = rebuild_while_overlapping(roots_at(&[(0, 0), (0, 0)]), 5, || {
            attempts
                .pop()
                .ok_or_else(|| LayoutError::internal("ran out of placements"))
        })
        .unwrap();
        assert_eq!(tree, clean);
        assert!(attempts.is_empty());
    }

    #[test]
    fn zero_rebuild_cap_fails_exactly_when_the_first_build_overlaps() {
        let pd = PdCode::new(vec![
            [1, 8, 2, 9],
            [9, 5, 10, 4],
            [3, 10, 4, 1],
            [7, 2, 8, 3],
            [5, 7, 6, 6],
        ])
        .unwrap();
        for seed in 0..50 {
            let first = PdTree::build(&pd, &mut SmallRng::seed_from_u64(seed)).unwrap();
            let capped =
                PdTree::build_non_overlapping(&pd, &mut SmallRng::seed_from_u64(seed), 0);
            match capped {
                Ok(tree) => {
                    assert!(!first.has_overlap());
                    assert_eq!(tree, first);
                }
                Err(err) => {
                    assert!(first.has_overlap());
                    assert_eq!(err, LayoutError::CrossingOverlap { rebuilds: 0 });
                }
            }
        }
    }
}
