//! Seed mapping generation.
//!
//! Two generators feed the initial population and the per-generation
//! random injection:
//!
//! - [`generate_init_mappings`] rounds a layered layout of the dataflow
//!   graph into random sub-regions of the array.
//! - [`make_random_mappings`] draws random coordinate permutations,
//!   optionally assigned in topological order by radial distance.
//!
//! Each sample runs as an independent rayon task with its own seeded RNG,
//! so results depend only on the caller's RNG state.

mod layout;
mod random;

pub use layout::Layout;

use crate::mapping::{dedup_mappings, Mapping};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tessera_dfg::Application;

/// Generates up to `count` distinct layout-based mappings on a
/// `width` x `height` array, trying at most `iterations` roundings each.
pub fn generate_init_mappings(
    app: &Application,
    width: u32,
    height: u32,
    count: usize,
    iterations: usize,
    rng: &mut impl Rng,
) -> Vec<Mapping> {
    let layout = Layout::layered(app);
    let seeds: Vec<u64> = (0..count).map(|_| rng.gen()).collect();
    let mappings: Vec<Mapping> = seeds
        .into_par_iter()
        .filter_map(|seed| {
            let mut task_rng = StdRng::seed_from_u64(seed);
            layout.round_into(width, height, iterations, &mut task_rng)
        })
        .collect();
    dedup_mappings(mappings)
}

/// Generates up to `size` distinct random mappings on a `width` x `height`
/// array. Each sample is placed in topological order along ascending
/// radial distance with probability `topo_probability`.
pub fn make_random_mappings(
    app: &Application,
    width: u32,
    height: u32,
    size: usize,
    topo_probability: f64,
    rng: &mut impl Rng,
) -> Vec<Mapping> {
    let seeds: Vec<u64> = (0..size).map(|_| rng.gen()).collect();
    let mappings: Vec<Mapping> = seeds
        .into_par_iter()
        .filter_map(|seed| {
            let mut task_rng = StdRng::seed_from_u64(seed);
            random::random_mapping(app, width, height, topo_probability, &mut task_rng)
        })
        .collect();
    dedup_mappings(mappings)
}
