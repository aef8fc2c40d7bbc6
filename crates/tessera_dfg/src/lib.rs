//! Application dataflow graphs for the Tessera CGRA mapper.
//!
//! An [`Application`] splits the dataflow graph into the pieces the mapper
//! routes separately: the computation subgraph (operation to operation), the
//! constant subgraph (constant value to consuming operation), and the input
//! and output port subgraphs. Applications are built with
//! [`ApplicationBuilder`] or loaded from JSON with [`load_application`].

#![warn(missing_docs)]

pub mod app;
pub mod error;
pub mod ids;
pub mod loader;

pub use app::{Application, ApplicationBuilder, CompEdge, ConstEdge, InputPort, Operation, OutputPort};
pub use error::DfgError;
pub use ids::OpId;
pub use loader::{load_application, parse_application};
