use thiserror::Error;

use crate::ir::SocketId;

/// Which socket component the border check is asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OuterTarget {
    Socket(SocketId),
    /// The component holding the numerically largest id in the diagram.
    LargestId,
}

impl std::fmt::Display for OuterTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OuterTarget::Socket(id) => write!(f, "socket {id}"),
            OuterTarget::LargestId => write!(f, "largest socket id"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("malformed PD code: {0}")]
    MalformedPdCode(String),
    #[error("crossings still overlap after {rebuilds} tree rebuilds")]
    CrossingOverlap { rebuilds: usize },
    #[error("no route for socket {socket}")]
    Unroutable { socket: SocketId },
    #[error("component of {target} does not reach the outer border")]
    BadBorder { target: OuterTarget },
    #[error("no valid layout after {tries} tries starting at seed {seed}")]
    MaxTriesExceeded { seed: u64, tries: usize },
    #[error("internal layout error: {0}")]
    Internal(String),
}

impl LayoutError {
    /// Recoverable failures are an unlucky random draw; the next seed may work.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LayoutError::CrossingOverlap { .. }
                | LayoutError::Unroutable { .. }
                | LayoutError::BadBorder { .. }
        )
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        LayoutError::Internal(message.into())
    }
}
