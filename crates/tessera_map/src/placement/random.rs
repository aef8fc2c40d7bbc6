//! Uniformly random mappings.

use crate::mapping::Mapping;
use rand::seq::SliceRandom;
use rand::Rng;
use tessera_common::Coord;
use tessera_dfg::Application;

/// Draws one random injective mapping, or `None` if the array is too small.
///
/// With probability `topo_probability` the drawn coordinates are sorted by
/// distance from the array origin and handed out in topological order, so
/// dependency chains tend to move outward monotonically.
pub(crate) fn random_mapping(
    app: &Application,
    width: u32,
    height: u32,
    topo_probability: f64,
    rng: &mut impl Rng,
) -> Option<Mapping> {
    let n = app.op_count();
    let mut cells: Vec<Coord> = (0..height)
        .flat_map(|y| (0..width).map(move |x| Coord::new(x, y)))
        .collect();
    if n > cells.len() {
        return None;
    }
    cells.shuffle(rng);
    cells.truncate(n);

    if rng.gen_bool(topo_probability.clamp(0.0, 1.0)) {
        cells.sort_by_key(|c| (c.radial_sq(), c.y, c.x));
        let mut coords = vec![Coord::new(0, 0); n];
        for (&op, &c) in app.topo_order().iter().zip(&cells) {
            coords[op.index()] = c;
        }
        Some(Mapping::new(coords))
    } else {
        Some(Mapping::new(cells))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tessera_dfg::ApplicationBuilder;

    #[test]
    fn topological_assignment_moves_outward() {
        let mut b = ApplicationBuilder::new("chain");
        let c = b.op("c", "add").unwrap();
        let a = b.op("a", "add").unwrap();
        let m = b.op("m", "add").unwrap();
        b.edge(a, m, 0).edge(m, c, 0);
        let app = b.build().unwrap();
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..20 {
            let mapping = random_mapping(&app, 3, 3, 1.0, &mut rng).unwrap();
            let r = |op| mapping.get(op).radial_sq();
            assert!(r(a) <= r(m) && r(m) <= r(c));
        }
    }

    #[test]
    fn too_small_array() {
        let mut b = ApplicationBuilder::new("big");
        for i in 0..5 {
            b.op(&format!("o{i}"), "add").unwrap();
        }
        let app = b.build().unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(random_mapping(&app, 2, 2, 0.0, &mut rng).is_none());
    }
}
