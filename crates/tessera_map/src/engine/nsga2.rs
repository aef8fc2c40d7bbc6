//! Non-dominated sorting and crowding-distance selection.
//!
//! All functions take fitness vectors already oriented for minimisation.

use std::cmp::Ordering;

/// Whether `a` Pareto-dominates `b` (no worse everywhere, better somewhere).
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    let mut better = false;
    for (x, y) in a.iter().zip(b) {
        if x > y {
            return false;
        }
        if x < y {
            better = true;
        }
    }
    better
}

/// Splits `points` into successive non-dominated fronts of indices.
pub fn non_dominated_sort(points: &[Vec<f64>]) -> Vec<Vec<usize>> {
    let n = points.len();
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut counts = vec![0usize; n];
    let mut fronts = vec![Vec::new()];
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            if dominates(&points[i], &points[j]) {
                dominated_by[i].push(j);
            } else if dominates(&points[j], &points[i]) {
                counts[i] += 1;
            }
        }
        if counts[i] == 0 {
            fronts[0].push(i);
        }
    }
    let mut k = 0;
    while !fronts[k].is_empty() {
        let mut next = Vec::new();
        for &i in &fronts[k] {
            for &j in &dominated_by[i] {
                counts[j] -= 1;
                if counts[j] == 0 {
                    next.push(j);
                }
            }
        }
        next.sort_unstable();
        fronts.push(next);
        k += 1;
    }
    fronts.pop();
    fronts
}

/// Crowding distance of each member of `front`, in `front` order.
/// Boundary points get infinity.
pub fn crowding_distance(points: &[Vec<f64>], front: &[usize]) -> Vec<f64> {
    let m = front.len();
    let mut distance = vec![0.0; m];
    if m <= 2 {
        return vec![f64::INFINITY; m];
    }
    let objectives = points[front[0]].len();
    let mut order: Vec<usize> = (0..m).collect();
    for k in 0..objectives {
        order.sort_by(|&a, &b| points[front[a]][k].total_cmp(&points[front[b]][k]));
        let lo = points[front[order[0]]][k];
        let hi = points[front[order[m - 1]]][k];
        distance[order[0]] = f64::INFINITY;
        distance[order[m - 1]] = f64::INFINITY;
        let range = hi - lo;
        if range <= 0.0 {
            continue;
        }
        for w in 1..m - 1 {
            let gap = points[front[order[w + 1]]][k] - points[front[order[w - 1]]][k];
            distance[order[w]] += gap / range;
        }
    }
    distance
}

/// Picks `k` indices: whole fronts in rank order, the last partial front
/// by descending crowding distance (ties by index).
pub fn select(points: &[Vec<f64>], k: usize) -> Vec<usize> {
    let mut chosen = Vec::with_capacity(k);
    for front in non_dominated_sort(points) {
        if chosen.len() + front.len() <= k {
            chosen.extend_from_slice(&front);
            continue;
        }
        let distance = crowding_distance(points, &front);
        let mut ranked: Vec<(f64, usize)> = distance.into_iter().zip(front).collect();
        ranked.sort_by(|a, b| match b.0.total_cmp(&a.0) {
            Ordering::Equal => a.1.cmp(&b.1),
            other => other,
        });
        let room = k - chosen.len();
        chosen.extend(ranked.into_iter().take(room).map(|(_, i)| i));
        break;
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(v: &[(f64, f64)]) -> Vec<Vec<f64>> {
        v.iter().map(|&(a, b)| vec![a, b]).collect()
    }

    #[test]
    fn domination() {
        assert!(dominates(&[1.0, 1.0], &[1.0, 2.0]));
        assert!(!dominates(&[1.0, 2.0], &[1.0, 2.0]));
        assert!(!dominates(&[0.0, 3.0], &[1.0, 2.0]));
    }

    #[test]
    fn fronts_in_rank_order() {
        let p = pts(&[(1.0, 4.0), (2.0, 2.0), (4.0, 1.0), (3.0, 3.0), (5.0, 5.0)]);
        let fronts = non_dominated_sort(&p);
        assert_eq!(fronts, vec![vec![0, 1, 2], vec![3], vec![4]]);
    }

    #[test]
    fn crowding_prefers_extremes() {
        let p = pts(&[(0.0, 4.0), (1.0, 3.0), (2.0, 2.0), (4.0, 0.0)]);
        let d = crowding_distance(&p, &[0, 1, 2, 3]);
        assert!(d[0].is_infinite() && d[3].is_infinite());
        assert!(d[2] > d[1]);
    }

    #[test]
    fn select_truncates_last_front() {
        let p = pts(&[(0.0, 4.0), (1.0, 3.0), (2.0, 2.0), (4.0, 0.0), (5.0, 5.0)]);
        let chosen = select(&p, 3);
        assert_eq!(chosen.len(), 3);
        assert!(chosen.contains(&0) && chosen.contains(&3));
        assert!(!chosen.contains(&4));
    }

    #[test]
    fn select_more_than_available() {
        let p = pts(&[(1.0, 1.0), (2.0, 2.0)]);
        assert_eq!(select(&p, 5), vec![0, 1]);
    }
}
