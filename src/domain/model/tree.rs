//! Single regression tree with variance-reduction splits.
//!
//! Candidate thresholds are midpoints between distinct sorted feature
//! values; split quality is evaluated with prefix sums so each feature is
//! scanned once per node.

#[derive(Debug, Clone)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone)]
pub struct RegressionTree {
    root: Node,
    /// Unnormalized variance-reduction totals per feature.
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Fit on the sample rows selected by `indices` (duplicates allowed,
    /// as produced by bootstrap sampling).
    pub fn fit(
        rows: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        params: &TreeParams,
    ) -> RegressionTree {
        let n_features = rows.first().map(Vec::len).unwrap_or(0);
        let mut importances = vec![0.0; n_features];
        let root = build_node(rows, targets, indices, 0, params, &mut importances);
        RegressionTree { root, importances }
    }

    pub fn predict_row(&self, features: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    pub fn importances(&self) -> &[f64] {
        &self.importances
    }
}

fn mean_of(targets: &[f64], indices: &[usize]) -> f64 {
    indices.iter().map(|&i| targets[i]).sum::<f64>() / indices.len() as f64
}

fn variance_of(targets: &[f64], indices: &[usize]) -> f64 {
    let n = indices.len() as f64;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for &i in indices {
        sum += targets[i];
        sum_sq += targets[i] * targets[i];
    }
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

fn build_node(
    rows: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    depth: usize,
    params: &TreeParams,
    importances: &mut [f64],
) -> Node {
    let n = indices.len();
    let impurity = variance_of(targets, indices);

    if depth >= params.max_depth || n < params.min_samples_split || impurity < 1e-12 {
        return Node::Leaf {
            value: mean_of(targets, indices),
        };
    }

    let Some(split) = find_best_split(rows, targets, indices, impurity, params) else {
        return Node::Leaf {
            value: mean_of(targets, indices),
        };
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .partition(|&&i| rows[i][split.feature] <= split.threshold);

    // Weight gain by node size so splits near the root dominate.
    importances[split.feature] += split.gain * n as f64;

    let left = build_node(rows, targets, &left_idx, depth + 1, params, importances);
    let right = build_node(rows, targets, &right_idx, depth + 1, params, importances);

    Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn find_best_split(
    rows: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    parent_impurity: f64,
    params: &TreeParams,
) -> Option<BestSplit> {
    let n = indices.len();
    let n_features = rows[indices[0]].len();
    let mut best: Option<BestSplit> = None;

    let mut order: Vec<usize> = indices.to_vec();
    for feature in 0..n_features {
        order.sort_by(|&a, &b| {
            rows[a][feature]
                .partial_cmp(&rows[b][feature])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // Left-prefix running sums over the sorted sample.
        let mut left_sum = 0.0;
        let mut left_sum_sq = 0.0;
        let mut total_sum = 0.0;
        let mut total_sum_sq = 0.0;
        for &i in &order {
            total_sum += targets[i];
            total_sum_sq += targets[i] * targets[i];
        }

        for pos in 0..n - 1 {
            let y = targets[order[pos]];
            left_sum += y;
            left_sum_sq += y * y;

            let here = rows[order[pos]][feature];
            let next = rows[order[pos + 1]][feature];
            if here == next {
                continue;
            }

            let n_left = pos + 1;
            let n_right = n - n_left;
            if n_left < params.min_samples_leaf || n_right < params.min_samples_leaf {
                continue;
            }

            let left_var = {
                let m = left_sum / n_left as f64;
                (left_sum_sq / n_left as f64 - m * m).max(0.0)
            };
            let right_var = {
                let sum = total_sum - left_sum;
                let sum_sq = total_sum_sq - left_sum_sq;
                let m = sum / n_right as f64;
                (sum_sq / n_right as f64 - m * m).max(0.0)
            };

            let weighted =
                (n_left as f64 * left_var + n_right as f64 * right_var) / n as f64;
            let gain = parent_impurity - weighted;

            if gain > best.as_ref().map(|b| b.gain).unwrap_or(0.0) {
                best = Some(BestSplit {
                    feature,
                    threshold: (here + next) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}
