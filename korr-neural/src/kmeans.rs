//! k-means scenario grouping over SOM BMU coordinates (spec.md §4.8,
//! "Scenario grouping").

type Point = (f64, f64);

fn squared_distance(a: Point, b: Point) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx * dx + dy * dy
}

/// Seed `k` centers: the first is the point farthest (by squared L2 norm)
/// from the origin; each subsequent center is the remaining point
/// maximizing the summed squared distance to every center chosen so far.
fn init_centers(points: &[Point], k: usize) -> Vec<Point> {
    let mut centers = Vec::with_capacity(k);

    let first = points
        .iter()
        .copied()
        .max_by(|a, b| {
            let da = a.0 * a.0 + a.1 * a.1;
            let db = b.0 * b.0 + b.1 * b.1;
            da.partial_cmp(&db).unwrap()
        })
        .expect("non-empty point set");
    centers.push(first);

    while centers.len() < k {
        let next = points
            .iter()
            .copied()
            .max_by(|a, b| {
                let sum_a: f64 = centers.iter().map(|c| squared_distance(*a, *c)).sum();
                let sum_b: f64 = centers.iter().map(|c| squared_distance(*b, *c)).sum();
                sum_a.partial_cmp(&sum_b).unwrap()
            })
            .expect("non-empty point set");
        centers.push(next);
    }

    centers
}

fn nearest_center(point: Point, centers: &[Point]) -> usize {
    let mut best = (0usize, f64::MAX);
    for (idx, c) in centers.iter().enumerate() {
        let d = squared_distance(point, *c);
        if d < best.1 {
            best = (idx, d);
        }
    }
    best.0
}

fn recompute_centers(points: &[Point], assignment: &[usize], k: usize, fallback: &[Point]) -> Vec<Point> {
    let mut sums = vec![(0.0_f64, 0.0_f64, 0usize); k];
    for (point, &cluster) in points.iter().zip(assignment.iter()) {
        sums[cluster].0 += point.0;
        sums[cluster].1 += point.1;
        sums[cluster].2 += 1;
    }
    sums.iter()
        .enumerate()
        .map(|(i, (sx, sy, count))| {
            if *count == 0 {
                fallback[i]
            } else {
                (sx / *count as f64, sy / *count as f64)
            }
        })
        .collect()
}

/// Run Lloyd's algorithm to convergence (centers bit-identical to the
/// previous iteration) and return the final `(centers, assignment)`.
fn lloyd(points: &[Point], k: usize) -> (Vec<Point>, Vec<usize>) {
    let mut centers = init_centers(points, k);
    let mut assignment = vec![0usize; points.len()];

    loop {
        for (point, slot) in points.iter().zip(assignment.iter_mut()) {
            *slot = nearest_center(*point, &centers);
        }
        let next_centers = recompute_centers(points, &assignment, k, &centers);
        if next_centers == centers {
            break;
        }
        centers = next_centers;
    }

    (centers, assignment)
}

fn distortion(points: &[Point], centers: &[Point], assignment: &[usize]) -> f64 {
    points
        .iter()
        .zip(assignment.iter())
        .map(|(p, &c)| squared_distance(*p, centers[c]))
        .sum()
}

/// A k-means result: the chosen `k`, the centers, and the per-point cluster
/// assignment (same order as the input slice).
#[derive(Debug, Clone)]
pub struct KMeansResult {
    pub centers: Vec<(f64, f64)>,
    pub assignment: Vec<usize>,
}

/// Cluster BMU coordinates, choosing `k` automatically by the minimum of
/// the Schwarz-like score `distortion + k * ln(n)` over `k = 1..=n`.
pub fn auto_kmeans(bmu_coords: &[(usize, usize)]) -> KMeansResult {
    let points: Vec<Point> = bmu_coords.iter().map(|&(x, y)| (x as f64, y as f64)).collect();
    let n = points.len();
    assert!(n > 0, "auto_kmeans requires at least one point");

    let mut best: Option<(f64, KMeansResult)> = None;
    for k in 1..=n {
        let (centers, assignment) = lloyd(&points, k);
        let score = distortion(&points, &centers, &assignment) + (k as f64) * (n as f64).ln();
        let improves = match &best {
            Some((best_score, _)) => score < *best_score,
            None => true,
        };
        if improves {
            best = Some((score, KMeansResult { centers, assignment }));
        }
    }

    best.expect("loop runs at least once for k=1").1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_point_converges_trivially() {
        let result = auto_kmeans(&[(1, 1)]);
        assert_eq!(result.centers.len(), 1);
        assert_eq!(result.assignment, vec![0]);
    }

    #[test]
    fn two_well_separated_clusters_are_recovered() {
        let coords = vec![(0, 0), (0, 1), (1, 0), (20, 20), (20, 21), (21, 20)];
        let result = auto_kmeans(&coords);
        assert_eq!(result.centers.len(), 2);
        let first_cluster = result.assignment[0];
        assert_eq!(result.assignment[1], first_cluster);
        assert_eq!(result.assignment[2], first_cluster);
        let second_cluster = result.assignment[3];
        assert_ne!(first_cluster, second_cluster);
        assert_eq!(result.assignment[4], second_cluster);
        assert_eq!(result.assignment[5], second_cluster);
    }

    #[test]
    fn distortion_is_zero_when_k_equals_n_distinct_points() {
        let points = vec![(0.0, 0.0), (5.0, 5.0), (10.0, 0.0)];
        let (centers, assignment) = lloyd(&points, 3);
        assert_eq!(distortion(&points, &centers, &assignment), 0.0);
    }
}
