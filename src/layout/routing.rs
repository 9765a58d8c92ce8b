use std::collections::VecDeque;

use serde::Serialize;

use crate::ir::Direction;

use super::error::LayoutError;
use super::grid::{Bounds, Cell, GridView, GridViewMut, Line, Margin, Merge, PixelStore, step};

// ── Search costs ────────────────────────────────────────────────────
/// Costs are kept in tenths so relaxation compares integers.
const COST_SCALE: f64 = 10.0;
/// One cell forward.
const MOVE_COST: u32 = 10;
/// Rotating in place to another heading.
const TURN_COST: u32 = 1;
/// Value read outside the search rectangle.
const WALL: i32 = -1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub cost: f64,
    /// Axis-aligned pieces from start to end, tagged 0.
    pub segments: Vec<Line>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct RouteState {
    x: i32,
    y: i32,
    dir: Direction,
}

/// Dense per-state tables over the search rectangle.
struct StateTable {
    rect: Bounds,
    cols: usize,
}

impl StateTable {
    fn len(&self) -> usize {
        self.rect.width() * self.rect.height() * 4
    }

    fn index(&self, state: RouteState) -> usize {
        let ix = (state.x - self.rect.min_x) as usize;
        let iy = (state.y - self.rect.min_y) as usize;
        (iy * self.cols + ix) * 4 + state.dir.index()
    }
}

/// Cheapest heading-aware path from `start` to `end` inside `rect`.
///
/// Every non-zero cell is an obstacle except `start` and `end`. Moving one
/// cell costs 1.0 and turning in place costs 0.1. `Ok(None)` means the
/// end is unreachable.
pub fn find_route<G: GridView + ?Sized>(
    grid: &G,
    rect: Bounds,
    start: Cell,
    end: Cell,
) -> Result<Option<Route>, LayoutError> {
    if !rect.contains(start) || !rect.contains(end) {
        return Ok(None);
    }
    if start == end {
        return Ok(Some(Route {
            cost: 0.0,
            segments: vec![Line::point(start, 0)],
        }));
    }

    let view = Margin::new(grid, rect, WALL, [start, end])?;
    let table = StateTable {
        rect,
        cols: rect.width(),
    };
    let mut dist = vec![u32::MAX; table.len()];
    let mut prev: Vec<Option<RouteState>> = vec![None; table.len()];
    let mut queued = vec![false; table.len()];
    let mut queue = VecDeque::new();

    for dir in Direction::ALL {
        let state = RouteState {
            x: start.0,
            y: start.1,
            dir,
        };
        let idx = table.index(state);
        dist[idx] = 0;
        queued[idx] = true;
        queue.push_back(state);
    }

    while let Some(state) = queue.pop_front() {
        let idx = table.index(state);
        queued[idx] = false;
        let cost = dist[idx];

        let (dx, dy) = state.dir.delta();
        let forward = RouteState {
            x: state.x + dx,
            y: state.y + dy,
            dir: state.dir,
        };
        let turns = Direction::ALL
            .into_iter()
            .filter(|dir| *dir != state.dir)
            .map(|dir| (RouteState { dir, ..state }, TURN_COST));

        for (next, step_cost) in std::iter::once((forward, MOVE_COST)).chain(turns) {
            if view.get((next.x, next.y)) != 0 {
                continue;
            }
            let next_idx = table.index(next);
            let next_cost = cost.saturating_add(step_cost);
            if next_cost >= dist[next_idx] {
                continue;
            }
            dist[next_idx] = next_cost;
            prev[next_idx] = Some(state);
            if !queued[next_idx] {
                queued[next_idx] = true;
                queue.push_back(next);
            }
        }
    }

    let mut best: Option<(u32, RouteState)> = None;
    for dir in Direction::ALL {
        let state = RouteState {
            x: end.0,
            y: end.1,
            dir,
        };
        let cost = dist[table.index(state)];
        if cost != u32::MAX && best.is_none_or(|(best_cost, _)| cost < best_cost) {
            best = Some((cost, state));
        }
    }
    let Some((cost, end_state)) = best else {
        return Ok(None);
    };

    let mut states = vec![end_state];
    let mut cur = end_state;
    while let Some(before) = prev[table.index(cur)] {
        states.push(before);
        cur = before;
    }
    states.reverse();

    Ok(Some(Route {
        cost: cost as f64 / COST_SCALE,
        segments: collapse_states(&states),
    }))
}

/// Merges runs of one heading into single segments; a heading change opens
/// a new segment at the turning cell.
fn collapse_states(states: &[RouteState]) -> Vec<Line> {
    let mut segments: Vec<Line> = Vec::new();
    for (i, state) in states.iter().enumerate() {
        let cell = (state.x, state.y);
        if i > 0 && states[i - 1].dir == state.dir {
            if let Some(last) = segments.last_mut() {
                last.to = cell;
                continue;
            }
        }
        segments.push(Line::point(cell, 0));
    }
    if segments.len() > 1 {
        segments.retain(|segment| segment.length() > 0);
    }
    segments
}

/// Route for a socket whose two plugs sit on the same crossing: the crossing
/// cell is blocked, the search runs between the two exit cells, and unit
/// stubs from the crossing are spliced on at both ends.
pub fn find_loop_route<G: GridView + ?Sized>(
    grid: &G,
    rect: Bounds,
    center: Cell,
    first: Direction,
    second: Direction,
) -> Result<Option<Route>, LayoutError> {
    let first_exit = step(center, first);
    let second_exit = step(center, second);
    let mut blocker = PixelStore::new();
    blocker.set(center, WALL);
    let blocked = Merge::new(&blocker, grid);

    let Some(inner) = find_route(&blocked, rect, first_exit, second_exit)? else {
        return Ok(None);
    };
    let mut segments = vec![Line::new(center, first_exit, 0)];
    segments.extend(inner.segments.into_iter().filter(|s| s.length() > 0));
    segments.push(Line::new(second_exit, center, 0));
    Ok(Some(Route {
        cost: inner.cost + 2.0 * MOVE_COST as f64 / COST_SCALE,
        segments,
    }))
}
