//! Candidate solutions and their genetic operators.

use crate::mapping::Mapping;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tessera_arch::GraphOverlay;
use tessera_common::Coord;
use tessera_dfg::OpId;

/// One chromosome: a mapping, a pipeline vector and everything derived
/// from routing and evaluating them.
///
/// Any change to the mapping or the pipeline drops the routed overlay and
/// clears validity and fitness, since they were computed for the old genes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Individual {
    mapping: Mapping,
    pipeline: Vec<bool>,
    routed: Option<GraphOverlay>,
    routing_cost: f64,
    valid: bool,
    fitness: Vec<f64>,
    eval_cache: BTreeMap<String, f64>,
}

impl Individual {
    /// Creates an unrouted individual.
    pub fn new(mapping: Mapping, pipeline: Vec<bool>) -> Self {
        Self {
            mapping,
            pipeline,
            routed: None,
            routing_cost: 0.0,
            valid: false,
            fitness: Vec::new(),
            eval_cache: BTreeMap::new(),
        }
    }

    /// Creates an unrouted individual with random pipeline bits.
    pub fn with_random_pipeline(mapping: Mapping, pipeline_len: usize, rng: &mut impl Rng) -> Self {
        let pipeline = (0..pipeline_len).map(|_| rng.gen_bool(0.5)).collect();
        Self::new(mapping, pipeline)
    }

    /// The operation-to-coordinate mapping.
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Pipeline cut activation bits.
    pub fn pipeline(&self) -> &[bool] {
        &self.pipeline
    }

    /// The routing overlay, present once the individual has been routed.
    pub fn routed(&self) -> Option<&GraphOverlay> {
        self.routed.as_ref()
    }

    /// Whether the router has run on the current genes.
    pub fn is_routed(&self) -> bool {
        self.routed.is_some()
    }

    /// Total routing cost including penalties.
    pub fn routing_cost(&self) -> f64 {
        self.routing_cost
    }

    /// Whether every required routing phase succeeded and no objective
    /// flagged an infeasibility.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Fitness vector in objective order; empty until evaluated.
    pub fn fitness(&self) -> &[f64] {
        &self.fitness
    }

    /// Whether the current genes have a fitness vector.
    pub fn is_evaluated(&self) -> bool {
        !self.fitness.is_empty()
    }

    /// Auxiliary values cached by objectives.
    pub fn eval_cache(&self) -> &BTreeMap<String, f64> {
        &self.eval_cache
    }

    /// Stores the outcome of routing the current genes.
    pub fn set_routing(&mut self, overlay: GraphOverlay, cost: f64, valid: bool) {
        self.routed = Some(overlay);
        self.routing_cost = cost;
        self.valid = valid;
    }

    /// Stores the fitness vector.
    pub fn set_fitness(&mut self, fitness: Vec<f64>) {
        self.fitness = fitness;
    }

    /// Flags an infeasibility found after routing.
    pub fn mark_invalid(&mut self) {
        self.valid = false;
    }

    /// Caches an auxiliary value for later objectives and downstream tools.
    pub fn cache(&mut self, key: &str, value: f64) {
        self.eval_cache.insert(key.to_string(), value);
    }

    /// Discards everything derived from the genes.
    pub fn invalidate(&mut self) {
        self.routed = None;
        self.routing_cost = 0.0;
        self.valid = false;
        self.fitness.clear();
        self.eval_cache.clear();
    }

    /// One-point crossover of mappings and pipeline vectors.
    ///
    /// At and past the cut, a child adopts the other parent's coordinate for
    /// an operation only when its own parent does not place a different
    /// operation there. The collision check runs against the parent, not the
    /// child under construction, so callers must [`repair`](Self::repair).
    pub fn crossover(&self, other: &Individual, rng: &mut impl Rng) -> (Individual, Individual) {
        let n = self.mapping.len().min(other.mapping.len());
        let cut = if n == 0 { 0 } else { rng.gen_range(0..n) };
        let child1 = blend(&self.mapping, &other.mapping, cut);
        let child2 = blend(&other.mapping, &self.mapping, cut);

        let mut pipe1 = self.pipeline.clone();
        let mut pipe2 = other.pipeline.clone();
        let len = pipe1.len().min(pipe2.len());
        if len > 0 {
            let pcut = rng.gen_range(0..len);
            for k in pcut..len {
                std::mem::swap(&mut pipe1[k], &mut pipe2[k]);
            }
        }
        (Individual::new(child1, pipe1), Individual::new(child2, pipe2))
    }

    /// Swap or relocate mutation.
    ///
    /// With probability `swap_probability` two operations exchange
    /// coordinates (and two pipeline bits are exchanged when there are at
    /// least two); otherwise one operation moves to a free coordinate taken
    /// from `coords`.
    pub fn mutate(&mut self, coords: &[Coord], swap_probability: f64, rng: &mut impl Rng) {
        let n = self.mapping.len();
        if n == 0 {
            return;
        }
        if rng.gen_bool(swap_probability.clamp(0.0, 1.0)) {
            if n > 1 {
                let a = rng.gen_range(0..n);
                let b = (a + rng.gen_range(1..n)) % n;
                self.mapping.coords_mut().swap(a, b);
            }
            let len = self.pipeline.len();
            if len > 1 {
                let a = rng.gen_range(0..len);
                let b = (a + rng.gen_range(1..len)) % len;
                self.pipeline.swap(a, b);
            }
        } else {
            let occupied = self.mapping.occupied();
            let free: Vec<Coord> = coords.iter().copied().filter(|c| !occupied.contains(c)).collect();
            if let Some(&target) = free.choose(rng) {
                let op = OpId::from_raw(rng.gen_range(0..n) as u32);
                self.mapping.set(op, target);
            }
        }
        self.invalidate();
    }

    /// Moves every operation that collides with an earlier one to a random
    /// free coordinate from `coords`. Returns the number of moved operations.
    pub fn repair(&mut self, coords: &[Coord], rng: &mut impl Rng) -> usize {
        let mut seen = HashSet::new();
        let mut colliding = Vec::new();
        for (i, &c) in self.mapping.coords().iter().enumerate() {
            if !seen.insert(c) {
                colliding.push(i);
            }
        }
        if colliding.is_empty() {
            return 0;
        }
        let mut free: Vec<Coord> = coords.iter().copied().filter(|c| !seen.contains(c)).collect();
        free.shuffle(rng);
        let mut moved = 0;
        for i in colliding {
            let Some(c) = free.pop() else { break };
            self.mapping.coords_mut()[i] = c;
            moved += 1;
        }
        self.invalidate();
        moved
    }
}

fn blend(base: &Mapping, donor: &Mapping, cut: usize) -> Mapping {
    let mut coords = base.coords().to_vec();
    for i in cut..coords.len().min(donor.len()) {
        let candidate = donor.coords()[i];
        let holder = base.op_at(candidate);
        if holder.is_none() || holder == Some(OpId::from_raw(i as u32)) {
            coords[i] = candidate;
        }
    }
    Mapping::new(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grid(w: u32, h: u32) -> Vec<Coord> {
        (0..h)
            .flat_map(|y| (0..w).map(move |x| Coord::new(x, y)))
            .collect()
    }

    fn ind(coords: &[(u32, u32)], pipeline: Vec<bool>) -> Individual {
        Individual::new(
            Mapping::new(coords.iter().map(|&(x, y)| Coord::new(x, y)).collect()),
            pipeline,
        )
    }

    #[test]
    fn crossover_children_use_parent_coords() {
        let a = ind(&[(0, 0), (1, 0), (2, 0), (0, 1)], vec![true, false]);
        let b = ind(&[(2, 2), (0, 0), (1, 1), (1, 0)], vec![false, true]);
        let allowed: HashSet<Coord> = a
            .mapping()
            .coords()
            .iter()
            .chain(b.mapping().coords())
            .copied()
            .collect();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let (c1, c2) = a.crossover(&b, &mut rng);
            for child in [&c1, &c2] {
                assert!(child.mapping().is_injective());
                assert!(child.mapping().coords().iter().all(|c| allowed.contains(c)));
                assert!(!child.is_routed());
                assert_eq!(child.pipeline().len(), 2);
            }
        }
    }

    #[test]
    fn blend_skips_coords_held_by_other_ops() {
        let base = Mapping::new(vec![Coord::new(0, 0), Coord::new(1, 0)]);
        let donor = Mapping::new(vec![Coord::new(1, 0), Coord::new(2, 0)]);
        let child = blend(&base, &donor, 0);
        // (1, 0) belongs to op 1 in the base, so op 0 keeps (0, 0).
        assert_eq!(child.coords(), &[Coord::new(0, 0), Coord::new(2, 0)]);
    }

    #[test]
    fn mutation_keeps_injectivity_and_invalidates() {
        let coords = grid(3, 3);
        let mut rng = StdRng::seed_from_u64(11);
        let mut x = ind(&[(0, 0), (1, 1), (2, 2)], vec![true, false, false]);
        x.set_routing(GraphOverlay::new(), 3.0, true);
        x.set_fitness(vec![3.0]);
        for _ in 0..100 {
            x.mutate(&coords, 0.5, &mut rng);
            assert!(x.mapping().is_injective());
            assert!(!x.is_routed());
            assert!(!x.is_valid());
            assert!(!x.is_evaluated());
            assert_eq!(x.pipeline().iter().filter(|&&b| b).count(), 1);
        }
    }

    #[test]
    fn relocate_on_full_grid_is_noop_on_mapping() {
        let coords = grid(2, 1);
        let mut rng = StdRng::seed_from_u64(3);
        let mut x = ind(&[(0, 0), (1, 0)], Vec::new());
        x.mutate(&coords, 0.0, &mut rng);
        assert_eq!(x.mapping().len(), 2);
        assert!(x.mapping().is_injective());
    }

    #[test]
    fn repair_moves_collisions() {
        let coords = grid(2, 2);
        let mut rng = StdRng::seed_from_u64(5);
        let mut x = ind(&[(0, 0), (0, 0), (1, 1)], Vec::new());
        assert_eq!(x.repair(&coords, &mut rng), 1);
        assert!(x.mapping().is_injective());
        assert_eq!(x.mapping().get(OpId::from_raw(0)), Coord::new(0, 0));
    }

    #[test]
    fn cache_survives_until_invalidation() {
        let mut x = ind(&[(0, 0)], Vec::new());
        x.cache("switch_usage", 4.0);
        assert_eq!(x.eval_cache().get("switch_usage"), Some(&4.0));
        x.invalidate();
        assert!(x.eval_cache().is_empty());
    }
}
