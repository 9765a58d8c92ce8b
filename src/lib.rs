#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;
pub mod skeleton;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::LayoutConfig;
pub use ir::{Crossing, Direction, PdCode, SocketId};
pub use layout::{DiagramLayout, LayoutError, OuterTarget, compute_layout};
