use nalgebra::convert;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    error::{ensure_argument, ensure_shape},
    misc::FloatingPoint,
};

/// Hyperparameters for the 1-D k-means used to place knots.
#[derive(Clone, Debug)]
pub struct ClusterOptions<T> {
    /// Maximum number of Lloyd iterations
    pub max_iters: usize,
    /// Iteration stops once no center moves more than this
    pub tolerance: T,
    /// Seed of the k-means++ initialization, fixed so equal inputs give equal knots
    pub seed: u64,
}

impl<T: FloatingPoint> Default for ClusterOptions<T> {
    fn default() -> Self {
        Self {
            max_iters: 100,
            tolerance: convert(1e-10),
            seed: 0,
        }
    }
}

impl<T: FloatingPoint> ClusterOptions<T> {
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn with_tolerance(mut self, tolerance: T) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Find `k` cluster centers of scalar `samples` by weighted k-means
/// Centers are returned in cluster order, not sorted.
pub fn cluster_centers<T: FloatingPoint>(
    samples: &[T],
    weights: Option<&[T]>,
    k: usize,
    options: &ClusterOptions<T>,
) -> anyhow::Result<Vec<T>> {
    if k == 0 {
        return Ok(vec![]);
    }
    ensure_shape!(
        samples.len() >= k,
        "Cannot find {} clusters in {} samples",
        k,
        samples.len()
    );
    let weights = match weights {
        Some(w) => {
            ensure_shape!(
                w.len() == samples.len(),
                "Got {} weights for {} samples",
                w.len(),
                samples.len()
            );
            ensure_argument!(
                w.iter().all(|w| *w >= T::zero()),
                "Cluster weights must be non-negative"
            );
            w.to_vec()
        }
        None => vec![T::one(); samples.len()],
    };

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut centers = seed_centers(samples, &weights, k, &mut rng);
    let mut labels = vec![0; samples.len()];

    for _iter in 0..options.max_iters {
        samples.iter().enumerate().for_each(|(i, s)| {
            labels[i] = nearest(&centers, *s);
        });

        let mut sums = vec![T::zero(); k];
        let mut masses = vec![T::zero(); k];
        samples.iter().zip(weights.iter()).zip(labels.iter()).for_each(|((s, w), l)| {
            sums[*l] += *s * *w;
            masses[*l] += *w;
        });

        let mut shift = T::zero();
        for c in 0..k {
            // empty clusters keep their previous center
            if masses[c] > T::zero() {
                let next = sums[c] / masses[c];
                shift = shift.max((next - centers[c]).abs());
                centers[c] = next;
            }
        }

        if shift <= options.tolerance {
            return Ok(centers);
        }
    }

    #[cfg(feature = "log")]
    log::debug!(
        "k-means did not settle within {} iterations",
        options.max_iters
    );

    Ok(centers)
}

/// k-means++ seeding: each next center is drawn with probability proportional to `w * d^2`
fn seed_centers<T: FloatingPoint>(
    samples: &[T],
    weights: &[T],
    k: usize,
    rng: &mut StdRng,
) -> Vec<T> {
    let n = samples.len();
    let mut centers = vec![samples[rng.random_range(0..n)]];

    while centers.len() < k {
        let scores: Vec<f64> = samples
            .iter()
            .zip(weights.iter())
            .map(|(s, w)| {
                let d = *s - centers[nearest(&centers, *s)];
                (*w * d * d).to_f64().unwrap_or(0.)
            })
            .collect();
        let total: f64 = scores.iter().sum();

        let index = if total > 0. {
            let threshold = rng.random::<f64>() * total;
            let mut acc = 0.;
            scores
                .iter()
                .position(|s| {
                    acc += s;
                    acc >= threshold
                })
                .unwrap_or(n - 1)
        } else {
            // every sample already coincides with a center
            centers.len() * n / k
        };
        centers.push(samples[index]);
    }

    centers
}

fn nearest<T: FloatingPoint>(centers: &[T], value: T) -> usize {
    centers
        .iter()
        .enumerate()
        .fold((0, None), |(best, dist): (usize, Option<T>), (i, c)| {
            let d = (*c - value).abs();
            match dist {
                Some(dist) if d >= dist => (best, Some(dist)),
                _ => (i, Some(d)),
            }
        })
        .0
}
