use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::layout::LayoutError;
use crate::layout::border::connected_components;

/// Strand-segment identifier. Grid cells reuse the same integer space, so
/// this stays signed.
pub type SocketId = i32;

/// Compass directions in counter-clockwise order. The discriminants are
/// load-bearing: rotation arithmetic works modulo 4 on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Direction {
    East = 0,
    North = 1,
    West = 2,
    South = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::East,
        Direction::North,
        Direction::West,
        Direction::South,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    pub fn opposite(self) -> Self {
        self.rotate(2)
    }

    /// Rotate counter-clockwise by `quarter_turns`.
    pub fn rotate(self, quarter_turns: usize) -> Self {
        Self::from_index(self.index() + quarter_turns)
    }

    /// Unit step on the grid; north is +y.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::East => (1, 0),
            Direction::North => (0, 1),
            Direction::West => (-1, 0),
            Direction::South => (0, -1),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::East | Direction::West)
    }
}

/// One crossing: four socket ids, index 0 entering from below, the rest
/// counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Crossing {
    pub sockets: [SocketId; 4],
}

impl Crossing {
    pub fn new(sockets: [SocketId; 4]) -> Self {
        Self { sockets }
    }

    pub fn has_socket(&self, socket: SocketId) -> bool {
        self.sockets.contains(&socket)
    }

    /// Socket that sits on `aim` once index 0 has been rotated to `base`.
    pub fn socket_on(&self, base: Direction, aim: Direction) -> SocketId {
        let delta = (4 + aim.index() - base.index()) % 4;
        self.sockets[delta]
    }

    /// Base direction that puts the first occurrence of `socket` on `aim`.
    pub fn base_for(&self, socket: SocketId, aim: Direction) -> Option<Direction> {
        let slot = self.sockets.iter().position(|&s| s == socket)?;
        Some(Direction::from_index(aim.index() + 4 - slot))
    }

    /// Opposite socket pairs, i.e. the two strands passing through.
    pub fn strand_pairs(&self) -> [(SocketId, SocketId); 2] {
        [
            (self.sockets[0], self.sockets[2]),
            (self.sockets[1], self.sockets[3]),
        ]
    }
}

impl fmt::Display for Crossing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.sockets;
        write!(f, "X[{a}, {b}, {c}, {d}]")
    }
}

/// A validated planar-diagram code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdCode {
    crossings: Vec<Crossing>,
}

impl PdCode {
    /// Every id in `1..=2n` must occur exactly twice and nothing else may
    /// occur at all.
    pub fn new(crossings: Vec<[SocketId; 4]>) -> Result<Self, LayoutError> {
        if crossings.is_empty() {
            return Err(LayoutError::MalformedPdCode(
                "a PD code needs at least one crossing".to_string(),
            ));
        }
        let max_id = 2 * crossings.len() as SocketId;
        let mut counts: BTreeMap<SocketId, usize> = BTreeMap::new();
        for crossing in &crossings {
            for &socket in crossing {
                if socket < 1 || socket > max_id {
                    return Err(LayoutError::MalformedPdCode(format!(
                        "socket id {socket} outside 1..={max_id}"
                    )));
                }
                *counts.entry(socket).or_default() += 1;
            }
        }
        for socket in 1..=max_id {
            let seen = counts.get(&socket).copied().unwrap_or(0);
            if seen != 2 {
                return Err(LayoutError::MalformedPdCode(format!(
                    "socket id {socket} occurs {seen} times, expected 2"
                )));
            }
        }
        Ok(Self {
            crossings: crossings.into_iter().map(Crossing::new).collect(),
        })
    }

    pub fn crossing_count(&self) -> usize {
        self.crossings.len()
    }

    pub fn crossings(&self) -> &[Crossing] {
        &self.crossings
    }

    pub fn max_socket(&self) -> SocketId {
        2 * self.crossings.len() as SocketId
    }

    /// Strand components: ids linked through opposite sockets of a crossing.
    pub fn components(&self) -> Vec<BTreeSet<SocketId>> {
        let pairs: Vec<(SocketId, SocketId)> = self
            .crossings
            .iter()
            .flat_map(|crossing| crossing.strand_pairs())
            .collect();
        connected_components(self.max_socket(), &pairs)
    }

    pub fn component_of(&self, socket: SocketId) -> Option<BTreeSet<SocketId>> {
        self.components()
            .into_iter()
            .find(|component| component.contains(&socket))
    }
}

impl fmt::Display for PdCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PD[")?;
        for (idx, crossing) in self.crossings.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{crossing}")?;
        }
        write!(f, "]")
    }
}
