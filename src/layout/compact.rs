use std::collections::{BTreeMap, BTreeSet};

use super::error::LayoutError;
use super::grid::Cell;

/// Distinct coordinates seen on each axis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordSet {
    xs: BTreeSet<i32>,
    ys: BTreeSet<i32>,
}

impl CoordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, cell: Cell) {
        self.xs.insert(cell.0);
        self.ys.insert(cell.1);
    }

    pub fn merge(mut self, other: CoordSet) -> CoordSet {
        self.xs.extend(other.xs);
        self.ys.extend(other.ys);
        self
    }

    /// Rank of every coordinate times `k`, computed once for a whole remap.
    pub fn ranks(&self, k: i32) -> Result<CoordRanks, LayoutError> {
        if k < 1 {
            return Err(LayoutError::internal(format!(
                "rank spacing must be at least 1, got {k}"
            )));
        }
        Ok(CoordRanks {
            xs: scaled_ranks(&self.xs, k),
            ys: scaled_ranks(&self.ys, k),
        })
    }
}

fn scaled_ranks(values: &BTreeSet<i32>, k: i32) -> BTreeMap<i32, i32> {
    values
        .iter()
        .enumerate()
        .map(|(rank, value)| (*value, rank as i32 * k))
        .collect()
}

/// Lookup table from old coordinates to their scaled ranks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordRanks {
    xs: BTreeMap<i32, i32>,
    ys: BTreeMap<i32, i32>,
}

impl CoordRanks {
    pub fn x(&self, x: i32) -> Option<i32> {
        self.xs.get(&x).copied()
    }

    pub fn y(&self, y: i32) -> Option<i32> {
        self.ys.get(&y).copied()
    }

    /// Both axes at once. A coordinate that was never added is a bookkeeping
    /// bug in the caller.
    pub fn rank_cell(&self, cell: Cell) -> Result<Cell, LayoutError> {
        match (self.x(cell.0), self.y(cell.1)) {
            (Some(x), Some(y)) => Ok((x, y)),
            _ => Err(LayoutError::internal(format!(
                "coordinate {cell:?} missing from the coordinate set"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(cells: &[Cell]) -> CoordSet {
        let mut set = CoordSet::new();
        for cell in cells {
            set.add(*cell);
        }
        set
    }

    #[test]
    fn ranks_are_scaled_ordinals() {
        let set = set_of(&[(-7, 3), (2, 3), (40, -1)]);
        let ranks = set.ranks(6).unwrap();
        assert_eq!(ranks.x(-7), Some(0));
        assert_eq!(ranks.x(2), Some(6));
        assert_eq!(ranks.x(40), Some(12));
        assert_eq!(ranks.x(5), None);
        assert_eq!(set.ranks(2).unwrap().y(3), Some(2));
        assert!(matches!(set.ranks(0), Err(LayoutError::Internal(_))));
    }

    #[test]
    fn ranks_are_strictly_monotonic_with_gap_k() {
        let xs = [-30, -4, 0, 1, 9, 100];
        let set = set_of(&xs.iter().map(|x| (*x, 0)).collect::<Vec<_>>());
        for k in 1..5 {
            let ranks = set.ranks(k).unwrap();
            let ranked: Vec<i32> = xs.iter().map(|x| ranks.x(*x).unwrap()).collect();
            for pair in ranked.windows(2) {
                assert!(pair[1] - pair[0] >= k);
            }
        }
    }

    #[test]
    fn merge_unions_both_axes() {
        let merged = set_of(&[(0, 0), (5, 5)]).merge(set_of(&[(3, 9)]));
        let unit = merged.ranks(1).unwrap();
        assert_eq!(unit.x(5), Some(2));
        assert_eq!(unit.y(9), Some(2));
        let doubled = merged.ranks(2).unwrap();
        assert_eq!(doubled.rank_cell((3, 5)).unwrap(), (2, 2));
        assert!(doubled.rank_cell((4, 5)).is_err());
    }
}
