//! Evolutionary spatial mapping of dataflow graphs onto CGRA fabrics.
//!
//! The crate pairs an NSGA-II placement search ([`engine::Engine`]) with a
//! contention-aware router ([`routing::AStarRouter`]) that acts as the
//! feasibility oracle for every fitness evaluation:
//!
//! 1. [`placement`] seeds the population with layered-layout and random
//!    mappings.
//! 2. Each [`Individual`] carries a mapping, a pipeline vector and its own
//!    routing overlay, and owns the crossover and mutation operators.
//! 3. The router runs the computation, constant, input and output phases
//!    over the individual's overlay; infeasibility becomes a penalty cost.
//! 4. The engine evaluates individuals in parallel, selects with
//!    non-dominated sorting and crowding distance, and keeps a Pareto
//!    archive until the generation limit, stagnation, or cancellation.
//!
//! Results are persisted as a [`record::MappingRecord`].

#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod individual;
pub mod mapping;
pub mod placement;
pub mod record;
pub mod routing;

pub use engine::{CancelToken, Engine, RunOutcome, StopReason};
pub use error::SetupError;
pub use individual::Individual;
pub use mapping::Mapping;
pub use record::{read_record, write_record, MappingRecord, RecordError, RecordHeader, RecordPayload};
