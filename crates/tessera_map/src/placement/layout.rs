//! Layered layout of the computation subgraph and its rounding onto the
//! array.

use crate::mapping::Mapping;
use rand::Rng;
use std::collections::HashSet;
use tessera_common::Coord;
use tessera_dfg::{Application, OpId};

/// Barycenter sweeps used to untangle layer orderings.
const ORDERING_SWEEPS: usize = 4;

/// Continuous positions of every operation in `[0, 1]²`, indexed by op id.
///
/// Layers follow the longest path from the graph's sources, so dependency
/// chains run top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    points: Vec<(f64, f64)>,
}

impl Layout {
    /// Computes the layered layout of `app`.
    pub fn layered(app: &Application) -> Self {
        let n = app.op_count();
        let mut layer = vec![0usize; n];
        for &op in app.topo_order() {
            for p in app.producers(op) {
                layer[op.index()] = layer[op.index()].max(layer[p.index()] + 1);
            }
        }
        let depth = layer.iter().copied().max().map_or(0, |d| d + 1);
        let mut rows: Vec<Vec<usize>> = vec![Vec::new(); depth];
        for (i, &l) in layer.iter().enumerate() {
            rows[l].push(i);
        }

        let mut pos = vec![0.0f64; n];
        for row in &rows {
            for (k, &i) in row.iter().enumerate() {
                pos[i] = k as f64;
            }
        }
        for _ in 0..ORDERING_SWEEPS {
            for row in rows.iter_mut().skip(1) {
                let mut sorted: Vec<(f64, usize)> = row
                    .iter()
                    .map(|&i| {
                        let producers = app.producers(OpId::from_raw(i as u32));
                        let bary = if producers.is_empty() {
                            pos[i]
                        } else {
                            producers.iter().map(|p| pos[p.index()]).sum::<f64>()
                                / producers.len() as f64
                        };
                        (bary, i)
                    })
                    .collect();
                sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                *row = sorted.into_iter().map(|(_, i)| i).collect();
                for (k, &i) in row.iter().enumerate() {
                    pos[i] = k as f64;
                }
            }
        }

        let widest = rows.iter().map(Vec::len).max().unwrap_or(1);
        let x_span = widest.saturating_sub(1).max(1) as f64;
        let y_span = depth.saturating_sub(1).max(1) as f64;
        let mut points = vec![(0.5, 0.5); n];
        for (l, row) in rows.iter().enumerate() {
            let offset = (widest - row.len()) as f64 / 2.0;
            for (k, &i) in row.iter().enumerate() {
                let x = if widest == 1 { 0.5 } else { (k as f64 + offset) / x_span };
                let y = if depth == 1 { 0.5 } else { l as f64 / y_span };
                points[i] = (x, y);
            }
        }
        Self { points }
    }

    /// Normalized positions by op id.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Rounds the layout into a random sub-region of a `width` x `height`
    /// array. Retries up to `iterations` times until no two operations
    /// collide; returns `None` if every attempt collided.
    pub fn round_into(
        &self,
        width: u32,
        height: u32,
        iterations: usize,
        rng: &mut impl Rng,
    ) -> Option<Mapping> {
        let n = self.points.len();
        if n == 0 || n > (width as usize) * (height as usize) {
            return None;
        }
        let mirror = rng.gen_bool(0.5);
        for _ in 0..iterations {
            let region_w = rng.gen_range(1..=width);
            let min_h = n.div_ceil(region_w as usize) as u32;
            if min_h > height {
                continue;
            }
            let region_h = rng.gen_range(min_h..=height);
            let ox = rng.gen_range(0..=width - region_w);
            let oy = rng.gen_range(0..=height - region_h);

            let mut seen = HashSet::with_capacity(n);
            let mut coords = Vec::with_capacity(n);
            for &(x, y) in &self.points {
                let x = if mirror { 1.0 - x } else { x };
                let cx = round_random(ox as f64 + x * (region_w - 1) as f64, rng);
                let cy = round_random(oy as f64 + y * (region_h - 1) as f64, rng);
                let c = Coord::new(cx.min(width - 1), cy.min(height - 1));
                if !seen.insert(c) {
                    break;
                }
                coords.push(c);
            }
            if coords.len() == n {
                return Some(Mapping::new(coords));
            }
        }
        None
    }
}

fn round_random(v: f64, rng: &mut impl Rng) -> u32 {
    let r = if rng.gen_bool(0.5) { v.ceil() } else { v.floor() };
    r.max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tessera_dfg::ApplicationBuilder;

    fn diamond() -> Application {
        let mut b = ApplicationBuilder::new("d");
        let a = b.op("a", "add").unwrap();
        let l = b.op("l", "add").unwrap();
        let r = b.op("r", "add").unwrap();
        let j = b.op("j", "add").unwrap();
        b.edge(a, l, 0).edge(a, r, 0).edge(l, j, 0).edge(r, j, 1);
        b.build().unwrap()
    }

    #[test]
    fn layers_run_top_to_bottom() {
        let layout = Layout::layered(&diamond());
        let p = layout.points();
        assert_eq!(p[0].1, 0.0);
        assert_eq!(p[1].1, 0.5);
        assert_eq!(p[2].1, 0.5);
        assert_eq!(p[3].1, 1.0);
        assert!(p.iter().all(|&(x, y)| (0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y)));
        assert_ne!(p[1].0, p[2].0);
    }

    #[test]
    fn rounding_is_injective() {
        let layout = Layout::layered(&diamond());
        let mut rng = StdRng::seed_from_u64(4);
        let mut found = 0;
        for _ in 0..20 {
            if let Some(m) = layout.round_into(3, 3, 50, &mut rng) {
                assert!(m.is_injective());
                found += 1;
            }
        }
        assert!(found > 0);
    }

    #[test]
    fn single_op_is_centred() {
        let mut b = ApplicationBuilder::new("one");
        b.op("a", "neg").unwrap();
        let layout = Layout::layered(&b.build().unwrap());
        assert_eq!(layout.points(), &[(0.5, 0.5)]);
    }
}
