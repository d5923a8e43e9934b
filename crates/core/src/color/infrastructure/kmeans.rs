/// Lloyd's k-means over RGB points.
///
/// Centroids are seeded from evenly spaced input points so the result is
/// deterministic. Stops early once no centroid moves more than `epsilon`.
pub fn kmeans(points: &[[f64; 3]], k: usize, max_iter: usize, epsilon: f64) -> Vec<[f64; 3]> {
    if points.is_empty() || k == 0 {
        return Vec::new();
    }
    let k = k.min(points.len());
    let step = points.len() / k;
    let mut centroids: Vec<[f64; 3]> = (0..k).map(|i| points[i * step]).collect();

    for _ in 0..max_iter {
        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for p in points {
            let nearest = nearest_index(&centroids, p);
            for c in 0..3 {
                sums[nearest][c] += p[c];
            }
            counts[nearest] += 1;
        }

        let mut shift = 0.0f64;
        for i in 0..k {
            if counts[i] == 0 {
                continue;
            }
            let n = counts[i] as f64;
            let updated = [sums[i][0] / n, sums[i][1] / n, sums[i][2] / n];
            shift = shift.max(distance_sq(&centroids[i], &updated).sqrt());
            centroids[i] = updated;
        }
        if shift <= epsilon {
            break;
        }
    }
    centroids
}

pub fn distance_sq(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

fn nearest_index(centroids: &[[f64; 3]], p: &[f64; 3]) -> usize {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, distance_sq(c, p)))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
