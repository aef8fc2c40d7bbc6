//! Hardware fabric models for the Tessera CGRA mapper.
//!
//! The fabric is a directed [`ResourceGraph`] of typed nodes (compute units,
//! switch outputs, constant registers, input and output ports) built once per
//! architecture. Routing never mutates that topology: every individual owns a
//! sparse [`GraphOverlay`] holding edge weights, claim flags and removals, and
//! the router works through a [`RoutedGraph`] view that pairs the shared
//! topology with one overlay.
//!
//! # Usage
//!
//! ```
//! use tessera_arch::{load_architecture, GridParams};
//!
//! let arch = load_architecture("mesh", "mesh4x4", GridParams::new(4, 4)).unwrap();
//! assert_eq!(arch.dimensions(), (4, 4));
//! ```

#![warn(missing_docs)]

pub mod arch;
pub mod error;
pub mod graph;
pub mod grid;
pub mod ids;
pub mod overlay;
pub mod types;

pub use arch::{load_architecture, Architecture};
pub use error::ArchError;
pub use graph::ResourceGraph;
pub use grid::{GridArchitecture, GridParams};
pub use ids::{EdgeId, NodeId};
pub use overlay::{EdgeState, GraphOverlay, RoutedGraph};
pub use types::{Direction, Edge, Node, NodeKey, NodeKind};
