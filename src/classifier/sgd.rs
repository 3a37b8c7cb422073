// Binary logistic regression trained by stochastic gradient descent.
//
// Plain per-sample SGD on L2-regularised log-loss:
//
//   eta_t  = 1 / (alpha * (t0 + t))                 "optimal" schedule
//   w     <- w * (1 - eta_t * alpha) - eta_t * dloss(p, y) * cw[y] * x
//   b     <- b - eta_t * dloss(p, y) * cw[y]
//
// with targets in {-1, +1}, zero-initialised weights, class weights
// `n / (2 * count[class])` so the minority class carries as much total weight
// as the majority, a seeded reshuffle every epoch, and early stopping once
// the epoch loss has failed to improve by `tol * n` for `n_iter_no_change`
// consecutive epochs.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Largest gradient magnitude applied in a single step.
const MAX_DLOSS: f64 = 1e12;

/// Hyperparameters shared by every per-class model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SgdParams {
    /// L2 regularisation strength.
    pub alpha: f64,
    /// Maximum number of passes over the training data.
    pub max_iter: usize,
    /// Stopping tolerance on the summed epoch loss; `None` disables early stopping.
    pub tol: Option<f64>,
    /// Epochs without improvement before stopping.
    pub n_iter_no_change: usize,
    /// Seed for the per-epoch shuffle.
    pub seed: u64,
    /// Weight classes inversely to their frequency.
    pub balanced: bool,
}

impl Default for SgdParams {
    fn default() -> Self {
        Self {
            alpha: 1e-4,
            max_iter: 1000,
            tol: Some(1e-3),
            n_iter_no_change: 5,
            seed: 42,
            balanced: true,
        }
    }
}

/// A fitted binary model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BinaryModel {
    /// Logistic model over the embedding.
    Linear {
        weights: Vec<f64>,
        intercept: f64,
        epochs: usize,
    },
    /// Fallback for a target column that is all-negative or all-positive:
    /// always answers the observed probability (0.0 or 1.0).
    Constant { probability: f64 },
}

impl BinaryModel {
    /// P(label present | x).
    pub fn probability(&self, x: &[f64]) -> f64 {
        match self {
            BinaryModel::Linear {
                weights, intercept, ..
            } => sigmoid(dot(weights, x) + intercept),
            BinaryModel::Constant { probability } => *probability,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, BinaryModel::Constant { .. })
    }
}

/// Fit one binary model. `x` and `y` must be non-empty and of equal length.
pub fn fit_binary(x: &[Vec<f64>], y: &[bool], params: &SgdParams) -> BinaryModel {
    let n_pos = y.iter().filter(|&&v| v).count();
    if n_pos == 0 || n_pos == y.len() {
        return BinaryModel::Constant {
            probability: if n_pos == 0 { 0.0 } else { 1.0 },
        };
    }

    let n = y.len();
    let dim = x.first().map_or(0, Vec::len);
    let (weight_neg, weight_pos) = if params.balanced {
        (
            n as f64 / (2.0 * (n - n_pos) as f64),
            n as f64 / (2.0 * n_pos as f64),
        )
    } else {
        (1.0, 1.0)
    };

    let alpha = params.alpha;
    let t0 = optimal_init(alpha);
    let mut weights = vec![0.0_f64; dim];
    let mut intercept = 0.0_f64;
    let mut t = 1.0_f64;

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);

    let mut best_loss = f64::INFINITY;
    let mut no_improvement = 0usize;
    let mut epochs = 0usize;
    let mut converged = false;

    for _ in 0..params.max_iter {
        order.shuffle(&mut rng);
        epochs += 1;
        let mut sum_loss = 0.0;

        for &i in &order {
            let target = if y[i] { 1.0 } else { -1.0 };
            let class_weight = if y[i] { weight_pos } else { weight_neg };
            let p = dot(&weights, &x[i]) + intercept;

            let eta = 1.0 / (alpha * (t0 + t - 1.0));
            let update = -eta * dloss(p, target).clamp(-MAX_DLOSS, MAX_DLOSS) * class_weight;

            let decay = (1.0 - eta * alpha).max(0.0);
            for (w, &xi) in weights.iter_mut().zip(&x[i]) {
                *w = *w * decay + update * xi;
            }
            intercept += update;

            sum_loss += log_loss(p, target);
            t += 1.0;
        }

        if let Some(tol) = params.tol {
            if sum_loss > best_loss - tol * n as f64 {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            if sum_loss < best_loss {
                best_loss = sum_loss;
            }
            if no_improvement >= params.n_iter_no_change {
                converged = true;
                break;
            }
        }
    }

    if !converged && params.tol.is_some() {
        warn!(
            max_iter = params.max_iter,
            "SGD reached max_iter before converging"
        );
    }

    BinaryModel::Linear {
        weights,
        intercept,
        epochs,
    }
}

/// Starting offset t0 of the "optimal" learning-rate schedule.
///
/// Chosen so the first step size matches a typical weight magnitude of
/// `1 / sqrt(sqrt(alpha))`.
fn optimal_init(alpha: f64) -> f64 {
    let typw = (1.0 / alpha.sqrt()).sqrt();
    let initial_eta0 = typw / dloss(-typw, 1.0).max(1.0);
    1.0 / (initial_eta0 * alpha)
}

/// Log-loss for margin `p` and target `y` in {-1, +1}.
fn log_loss(p: f64, y: f64) -> f64 {
    let z = p * y;
    if z > 18.0 {
        (-z).exp()
    } else if z < -18.0 {
        -z
    } else {
        (-z).exp().ln_1p()
    }
}

/// Derivative of the log-loss with respect to the margin.
fn dloss(p: f64, y: f64) -> f64 {
    let z = p * y;
    if z > 18.0 {
        -y * (-z).exp()
    } else if z < -18.0 {
        -y
    } else {
        -y / (z.exp() + 1.0)
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
