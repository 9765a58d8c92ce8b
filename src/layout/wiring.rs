use crate::config::LayoutConfig;
use crate::ir::SocketId;

use super::error::LayoutError;
use super::grid::{ErasePoint, GridView, GridViewMut, Merge, PixelStore, Span};
use super::routing::{Route, find_loop_route, find_route};
use super::sockets::SocketRegistry;

/// Draws every socket the placement left open, one at a time. Each socket
/// sees the grid left behind by all earlier ones.
#[derive(Debug, Clone)]
pub struct Wiring {
    registry: SocketRegistry,
    edges: PixelStore,
    crossings: PixelStore,
    max_socket: SocketId,
    spread_factor: i32,
    compact_factor: i32,
    search_margin: i32,
}

/// What the wiring loop leaves behind.
#[derive(Debug, Clone)]
pub struct WiredGrid {
    pub registry: SocketRegistry,
    pub edges: PixelStore,
    pub crossings: PixelStore,
}

impl Wiring {
    /// Takes a registry that already passed `check`.
    pub fn new(
        registry: SocketRegistry,
        crossing_count: usize,
        config: &LayoutConfig,
    ) -> Result<Self, LayoutError> {
        if !registry.is_checked() {
            return Err(LayoutError::internal("wiring needs a checked registry"));
        }
        let edges = registry.tree_edge_view()?;
        let crossings = registry.crossing_view();
        Ok(Self {
            registry,
            edges,
            crossings,
            max_socket: 2 * crossing_count as SocketId,
            spread_factor: config.spread_factor,
            compact_factor: config.compact_factor,
            search_margin: config.search_margin,
        })
    }

    pub fn run(mut self) -> Result<WiredGrid, LayoutError> {
        while let Some(socket) = self.registry.unused(self.max_socket).first().copied() {
            self.rescale(self.spread_factor)?;
            let route = self.wire_socket(socket)?;
            tracing::debug!(socket, cost = route.cost, segments = route.segments.len(), "wired socket");
            self.rescale(self.compact_factor)?;
        }
        Ok(WiredGrid {
            registry: self.registry,
            edges: self.edges,
            crossings: self.crossings,
        })
    }

    /// Re-ranks every coordinate in use onto multiples of `k`.
    fn rescale(&mut self, k: i32) -> Result<(), LayoutError> {
        let coords = self.edges.coord_set().merge(self.registry.coord_set());
        let ranks = coords.ranks(k)?;
        self.registry = self.registry.commit_coord_map(&ranks)?;
        self.edges = self.edges.remap(&ranks)?;
        self.crossings = self.crossings.remap(&ranks)?;
        Ok(())
    }

    fn wire_socket(&mut self, socket: SocketId) -> Result<Route, LayoutError> {
        let [first, second] = self
            .registry
            .plugs(socket)
            .ok_or_else(|| LayoutError::internal(format!("socket {socket} lacks two plugs")))?;

        let route = {
            let span = Span::new(&self.crossings);
            let obstacles = Merge::new(&span, &self.edges);
            let view = ErasePoint::new(
                &obstacles,
                [first.cell, first.exit_cell(), second.cell, second.exit_cell()],
            )?;
            let rect = view
                .bounds()
                .ok_or_else(|| LayoutError::internal("nothing placed before wiring"))?
                .expand(self.search_margin);
            if first.cell == second.cell {
                find_loop_route(&view, rect, first.cell, first.direction, second.direction)?
            } else {
                find_route(&view, rect, first.cell, second.cell)?
            }
        };
        let route = route.ok_or(LayoutError::Unroutable { socket })?;

        for segment in &route.segments {
            self.edges.set_line(segment.with_tag(socket))?;
        }
        self.registry.set_used(socket);
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Direction;
    use crate::ir::PdCode;
    use crate::layout::sockets::Plug;
    use crate::layout::tree::PdTree;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    /// Single crossing `[1, 1, 2, 2]` at the origin, nothing used yet.
    fn kink_registry() -> SocketRegistry {
        let mut registry = SocketRegistry::new();
        for (socket, dir) in [
            (1, Direction::East),
            (1, Direction::North),
            (2, Direction::West),
            (2, Direction::South),
        ] {
            registry.add_plug(socket, Plug::new((0, 0), dir)).unwrap();
        }
        registry.set_base((0, 0), Direction::East);
        registry.check(1, 1).unwrap();
        registry
    }

    #[test]
    fn wires_both_loops_of_a_kink() {
        let config = LayoutConfig::default();
        let wired = Wiring::new(kink_registry(), 1, &config).unwrap().run().unwrap();
        assert_eq!(wired.registry.used_count(), 2);
        let tags: Vec<i32> = wired.edges.lines().iter().map(|line| line.tag).collect();
        assert!(tags.contains(&1));
        assert!(tags.contains(&2));
        assert!(wired.edges.lines().iter().all(|line| line.is_axis_aligned()));
        assert_eq!(wired.crossings.negative_cells().len(), 1);
    }

    #[test]
    fn refuses_unchecked_registry() {
        let mut registry = SocketRegistry::new();
        registry
            .add_plug(1, Plug::new((0, 0), Direction::East))
            .unwrap();
        let config = LayoutConfig::default();
        assert!(Wiring::new(registry, 1, &config).is_err());
    }

    #[test]
    fn routed_cells_never_cover_other_sockets() {
        let config = LayoutConfig::default();
        let wired = Wiring::new(kink_registry(), 1, &config).unwrap().run().unwrap();
        let crossing = wired.crossings.negative_cells()[0];
        for line in wired.edges.lines() {
            for cell in line.cells() {
                if cell != crossing {
                    assert_eq!(wired.edges.get(cell), line.tag);
                }
            }
        }
    }

    #[test]
    fn non_planar_code_leaves_a_socket_unroutable() {
        // Ids pair up correctly, but no planar drawing joins them all.
        let pd = PdCode::new(vec![
            [1, 8, 2, 9],
            [9, 5, 10, 4],
            [3, 10, 4, 1],
            [7, 2, 8, 3],
            [5, 7, 6, 6],
        ])
        .unwrap();
        let config = LayoutConfig::default();
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let tree = PdTree::build_non_overlapping(&pd, &mut rng, config.max_tree_rebuilds).unwrap();
        let mut registry = tree.socket_registry(&pd).unwrap();
        registry.check(pd.crossing_count(), tree.piece_count()).unwrap();

        let err = Wiring::new(registry, pd.crossing_count(), &config)
            .unwrap()
            .run()
            .unwrap_err();
        assert!(matches!(err, LayoutError::Unroutable { .. }), "{err:?}");
        assert!(err.is_recoverable());
    }

    #[test]
    fn zero_spread_is_an_internal_error() {
        let config = LayoutConfig {
            spread_factor: 0,
            ..LayoutConfig::default()
        };
        let err = Wiring::new(kink_registry(), 1, &config)
            .unwrap()
            .run()
            .unwrap_err();
        assert!(matches!(err, LayoutError::Internal(_)));
    }
}
