//! A minimal isolation-forest scorer (spec §4.3, §9: "no library choice is
//! implied"). Hand-rolled for the same reason `math::stats::erfc` is: a
//! single call site doesn't justify an ML-crate dependency, and the
//! algorithm is fully specified (Liu, Ting & Zhou, 2008).

use rand::Rng;

/// `n_estimators` trees, each built over a subsample of `max_samples` rows.
#[derive(Debug, Clone, Copy)]
pub struct IsolationForestConfig {
    pub n_estimators: usize,
    pub max_samples: usize,
}

impl Default for IsolationForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
        }
    }
}

enum Node {
    Leaf { size: usize },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Average path length of an unsuccessful BST search over `n` points
/// (standard iForest normalization constant).
fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 1.0;
    }
    let n = n as f64;
    2.0 * (harmonic_number(n - 1.0)) - (2.0 * (n - 1.0) / n)
}

fn harmonic_number(n: f64) -> f64 {
    // Euler-Mascheroni approximation, adequate for the sample sizes here.
    n.ln() + 0.577_215_664_9
}

fn build_tree(rows: &[Vec<f64>], depth: usize, max_depth: usize, rng: &mut impl Rng) -> Node {
    if rows.len() <= 1 || depth >= max_depth {
        return Node::Leaf { size: rows.len() };
    }

    let n_features = rows[0].len();
    let feature = rng.gen_range(0..n_features);
    let (min, max) = rows.iter().fold((f64::MAX, f64::MIN), |(lo, hi), row| {
        (lo.min(row[feature]), hi.max(row[feature]))
    });
    if (max - min).abs() < f64::EPSILON {
        return Node::Leaf { size: rows.len() };
    }

    let threshold = rng.gen_range(min..max);
    let (left_rows, right_rows): (Vec<_>, Vec<_>) =
        rows.iter().cloned().partition(|row| row[feature] < threshold);

    if left_rows.is_empty() || right_rows.is_empty() {
        return Node::Leaf { size: rows.len() };
    }

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_tree(&left_rows, depth + 1, max_depth, rng)),
        right: Box::new(build_tree(&right_rows, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &Node, row: &[f64], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if row[*feature] < *threshold {
                path_length(left, row, depth + 1)
            } else {
                path_length(right, row, depth + 1)
            }
        }
    }
}

/// Score every row in `[0,1]`; scores close to `1.0` are the most anomalous.
/// Returns an empty vector if `rows` is empty.
#[must_use]
pub fn score(rows: &[Vec<f64>], config: &IsolationForestConfig) -> Vec<f64> {
    if rows.is_empty() {
        return Vec::new();
    }

    let mut rng = rand::thread_rng();
    let sample_size = config.max_samples.min(rows.len());
    let max_depth = (sample_size.max(2) as f64).log2().ceil() as usize;

    let trees: Vec<Node> = (0..config.n_estimators)
        .map(|_| {
            let mut sample: Vec<Vec<f64>> = rows.to_vec();
            // Fisher-Yates partial shuffle down to `sample_size`.
            for i in 0..sample_size.min(sample.len()) {
                let j = rng.gen_range(i..sample.len());
                sample.swap(i, j);
            }
            sample.truncate(sample_size);
            build_tree(&sample, 0, max_depth, &mut rng)
        })
        .collect();

    let c = average_path_length(sample_size);
    rows.iter()
        .map(|row| {
            let avg_path = trees.iter().map(|t| path_length(t, row, 0)).sum::<f64>()
                / trees.len() as f64;
            2f64.powf(-avg_path / c.max(1e-9))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outlier_scores_higher_than_cluster() {
        let mut rows: Vec<Vec<f64>> = (0..50).map(|i| vec![i as f64 % 3.0, 1.0]).collect();
        rows.push(vec![500.0, -500.0]);

        let config = IsolationForestConfig {
            n_estimators: 50,
            max_samples: 64,
        };
        let scores = score(&rows, &config);
        let outlier_score = *scores.last().unwrap();
        let mean_cluster_score = scores[..scores.len() - 1].iter().sum::<f64>() / (scores.len() - 1) as f64;
        assert!(outlier_score > mean_cluster_score);
    }

    #[test]
    fn empty_input_yields_empty_scores() {
        let config = IsolationForestConfig::default();
        assert!(score(&[], &config).is_empty());
    }
}
