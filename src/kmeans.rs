//! K-means color clustering.
//!
//! Lloyd's algorithm with k-means++ seeding and best-of-n restarts.
//!
//! # Algorithm
//!
//! 1. Seed `k` centroids with k-means++ from a seeded generator
//! 2. Assign each pixel to its nearest centroid (squared Euclidean, RGB)
//! 3. Move each centroid to the mean of its pixels
//! 4. Repeat 2-3 until no label changes, the total centroid shift drops
//!    below the tolerance, or `max_iter` is reached
//! 5. Keep the restart with the lowest inertia
//!
//! Ties in step 2 go to the lowest centroid id. A centroid that ends an
//! assignment step with no pixels stays where it was.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::error::{PaletteError, Result};
use crate::pixels::{Observation, PixelSet};

/// Cluster center in RGB, components nominally in `0.0..=255.0`.
pub type Centroid = [f64; 3];

/// How a clustering run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceStatus {
    /// Labels stopped changing or centroids stopped moving.
    Converged,
    /// `max_iter` iterations ran without meeting either criterion.
    ///
    /// The result is still usable; this commonly happens on noisy images.
    IterationCapReached,
}

/// Result of [`KMeans::fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Cluster id per pixel, index-aligned with the input [`PixelSet`].
    pub labels: Vec<usize>,
    /// Exactly `k` centroids; id is the position in this vector.
    pub centroids: Vec<Centroid>,
    /// Sum of squared distances from every pixel to its centroid.
    pub inertia: f64,
    /// Iterations used by the winning restart.
    pub iterations: usize,
    pub status: ConvergenceStatus,
}

impl Clustering {
    pub fn converged(&self) -> bool {
        self.status == ConvergenceStatus::Converged
    }

    pub fn k(&self) -> usize {
        self.centroids.len()
    }
}

/// K-means clusterer configuration.
///
/// # Examples
///
/// ```
/// use image_to_palette_wasm::{KMeans, PixelSet};
///
/// let pixels = PixelSet::new(vec![
///     [255.0, 0.0, 0.0],
///     [250.0, 5.0, 0.0],
///     [0.0, 0.0, 255.0],
///     [0.0, 5.0, 250.0],
/// ]).unwrap();
///
/// let result = KMeans::new(2).with_seed(7).fit(&pixels).unwrap();
/// assert_eq!(result.labels.len(), 4);
/// assert_eq!(result.labels[0], result.labels[1]);
/// assert_ne!(result.labels[0], result.labels[2]);
/// ```
#[derive(Debug, Clone)]
pub struct KMeans {
    n_clusters: usize,
    n_init: usize,
    max_iter: usize,
    /// Relative to the mean per-channel variance of the input.
    tol: f64,
    seed: u64,
}

impl Default for KMeans {
    fn default() -> Self {
        Self::new(8)
    }
}

impl KMeans {
    pub const DEFAULT_N_INIT: usize = 10;
    pub const DEFAULT_MAX_ITER: usize = 300;
    pub const DEFAULT_TOL: f64 = 1e-4;
    pub const DEFAULT_SEED: u64 = 42;

    #[must_use]
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            n_init: Self::DEFAULT_N_INIT,
            max_iter: Self::DEFAULT_MAX_ITER,
            tol: Self::DEFAULT_TOL,
            seed: Self::DEFAULT_SEED,
        }
    }

    /// Number of independent seedings; the lowest-inertia run wins.
    #[must_use]
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    pub fn n_init(&self) -> usize {
        self.n_init
    }

    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    pub fn tol(&self) -> f64 {
        self.tol
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Cluster `pixels` using a generator seeded from [`KMeans::with_seed`].
    ///
    /// # Errors
    ///
    /// - [`PaletteError::InvalidInput`] if `pixels` is empty
    /// - [`PaletteError::InvalidConfiguration`] if `k` is 0 or exceeds the
    ///   pixel count, or `n_init`, `max_iter` or `tol` are unusable
    pub fn fit(&self, pixels: &PixelSet) -> Result<Clustering> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.fit_with_rng(pixels, &mut rng)
    }

    /// Cluster `pixels` drawing every random choice from `rng`.
    ///
    /// Restarts consume the generator in sequence, so the same generator
    /// state always yields the same result.
    pub fn fit_with_rng<R: Rng>(&self, pixels: &PixelSet, rng: &mut R) -> Result<Clustering> {
        self.validate(pixels)?;

        let data = pixels.as_slice();
        let tol = self.tol * pixels.mean_channel_variance();

        let mut best: Option<Clustering> = None;
        for restart in 0..self.n_init {
            let seeds = kmeans_plusplus(data, self.n_clusters, rng);
            let run = lloyd(data, seeds, self.max_iter, tol);
            debug!(
                restart,
                iterations = run.iterations,
                inertia = run.inertia,
                converged = run.converged(),
                "k-means restart finished"
            );
            let better = match &best {
                Some(current) => run.inertia < current.inertia,
                None => true,
            };
            if better {
                best = Some(run);
            }
        }

        let best = best.ok_or_else(|| {
            PaletteError::InvalidConfiguration("n_init must be at least 1".to_string())
        })?;
        if !best.converged() {
            warn!(
                max_iter = self.max_iter,
                inertia = best.inertia,
                "k-means stopped at the iteration cap"
            );
        }
        Ok(best)
    }

    fn validate(&self, pixels: &PixelSet) -> Result<()> {
        if pixels.is_empty() {
            return Err(PaletteError::InvalidInput("pixel set is empty".to_string()));
        }
        if self.n_clusters == 0 {
            return Err(PaletteError::InvalidConfiguration(
                "k must be at least 1".to_string(),
            ));
        }
        if self.n_clusters > pixels.len() {
            return Err(PaletteError::InvalidConfiguration(format!(
                "k = {} exceeds the number of pixels ({})",
                self.n_clusters,
                pixels.len()
            )));
        }
        if self.n_init == 0 {
            return Err(PaletteError::InvalidConfiguration(
                "n_init must be at least 1".to_string(),
            ));
        }
        if self.max_iter == 0 {
            return Err(PaletteError::InvalidConfiguration(
                "max_iter must be at least 1".to_string(),
            ));
        }
        if !self.tol.is_finite() || self.tol < 0.0 {
            return Err(PaletteError::InvalidConfiguration(format!(
                "tol must be a finite non-negative number, got {}",
                self.tol
            )));
        }
        Ok(())
    }
}

/// Cluster with the default restart count, iteration cap and tolerance.
pub fn cluster(pixels: &PixelSet, k: usize, seed: u64) -> Result<Clustering> {
    KMeans::new(k).with_seed(seed).fit(pixels)
}

#[inline]
fn squared_distance(a: &Observation, b: &Centroid) -> f64 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    dr * dr + dg * dg + db * db
}

/// k-means++ seeding: first centre uniform, the rest drawn with
/// probability proportional to squared distance from the nearest centre
/// chosen so far.
fn kmeans_plusplus<R: Rng>(data: &[Observation], k: usize, rng: &mut R) -> Vec<Centroid> {
    let n = data.len();
    let mut centroids: Vec<Centroid> = Vec::with_capacity(k);
    centroids.push(data[rng.random_range(0..n)]);

    let mut closest: Vec<f64> = data
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = closest.iter().sum();
        let next = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            // Rounding can leave `target` just above the running sum.
            let mut chosen = closest.iter().rposition(|&d| d > 0.0).unwrap_or(n - 1);
            let mut acc = 0.0;
            for (i, &d) in closest.iter().enumerate() {
                acc += d;
                if acc > target {
                    chosen = i;
                    break;
                }
            }
            chosen
        } else {
            // Every pixel already sits on a centre.
            rng.random_range(0..n)
        };

        let centre = data[next];
        for (d, p) in closest.iter_mut().zip(data) {
            let candidate = squared_distance(p, &centre);
            if candidate < *d {
                *d = candidate;
            }
        }
        centroids.push(centre);
    }

    centroids
}

fn lloyd(
    data: &[Observation],
    mut centroids: Vec<Centroid>,
    max_iter: usize,
    tol: f64,
) -> Clustering {
    let mut labels = assign(data, &centroids);
    let mut status = ConvergenceStatus::IterationCapReached;
    let mut iterations = 0;

    for iter in 1..=max_iter {
        iterations = iter;

        let updated = update(data, &labels, &centroids);
        let shift: f64 = centroids
            .iter()
            .zip(&updated)
            .map(|(old, new)| squared_distance(old, new))
            .sum();
        centroids = updated;

        let relabeled = assign(data, &centroids);
        let unchanged = relabeled == labels;
        labels = relabeled;

        if unchanged || shift <= tol {
            status = ConvergenceStatus::Converged;
            break;
        }
    }

    let inertia = data
        .iter()
        .zip(&labels)
        .map(|(p, &l)| squared_distance(p, &centroids[l]))
        .sum();

    Clustering {
        labels,
        centroids,
        inertia,
        iterations,
        status,
    }
}

/// Index of the nearest centroid; equal distances resolve to the lower id.
#[inline]
fn nearest(point: &Observation, centroids: &[Centroid]) -> usize {
    let mut best_idx = 0;
    let mut best_dist = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let dist = squared_distance(point, c);
        if dist < best_dist {
            best_dist = dist;
            best_idx = i;
        }
    }
    best_idx
}

#[cfg(not(feature = "parallel"))]
fn assign(data: &[Observation], centroids: &[Centroid]) -> Vec<usize> {
    data.iter().map(|p| nearest(p, centroids)).collect()
}

#[cfg(feature = "parallel")]
fn assign(data: &[Observation], centroids: &[Centroid]) -> Vec<usize> {
    use rayon::prelude::*;

    data.par_iter().map(|p| nearest(p, centroids)).collect()
}

/// Recompute each centroid as the mean of its pixels.
///
/// Runs after every assignment has finished; clusters with no pixels keep
/// their previous position.
fn update(data: &[Observation], labels: &[usize], previous: &[Centroid]) -> Vec<Centroid> {
    let k = previous.len();
    let mut sums = vec![[0.0f64; 3]; k];
    let mut counts = vec![0usize; k];

    for (p, &label) in data.iter().zip(labels) {
        counts[label] += 1;
        for c in 0..3 {
            sums[label][c] += p[c];
        }
    }

    sums.iter()
        .zip(&counts)
        .zip(previous)
        .map(|((sum, &count), prev)| {
            if count == 0 {
                *prev
            } else {
                sum.map(|s| s / count as f64)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixels(data: &[[f64; 3]]) -> PixelSet {
        PixelSet::new(data.to_vec()).unwrap()
    }

    fn sample_data() -> PixelSet {
        pixels(&[
            [250.0, 10.0, 10.0],
            [240.0, 20.0, 5.0],
            [245.0, 0.0, 15.0],
            [10.0, 200.0, 30.0],
            [20.0, 210.0, 25.0],
            [5.0, 190.0, 40.0],
            [30.0, 30.0, 220.0],
            [25.0, 40.0, 230.0],
            [35.0, 20.0, 240.0],
            [128.0, 128.0, 128.0],
        ])
    }

    #[test]
    fn test_new_defaults() {
        let kmeans = KMeans::new(5);
        assert_eq!(kmeans.n_clusters(), 5);
        assert_eq!(kmeans.n_init(), 10);
        assert_eq!(kmeans.max_iter(), 300);
        assert_eq!(kmeans.tol(), 1e-4);
        assert_eq!(kmeans.seed(), 42);
        assert_eq!(KMeans::default().n_clusters(), 8);
    }

    #[test]
    fn test_labels_cover_input_and_stay_in_range() {
        let data = sample_data();
        for k in 1..=data.len() {
            let result = cluster(&data, k, 3).unwrap();
            assert_eq!(result.labels.len(), data.len());
            assert_eq!(result.centroids.len(), k);
            assert!(result.labels.iter().all(|&l| l < k));
        }
    }

    #[test]
    fn test_reproducible_with_same_seed() {
        let data = sample_data();
        let a = cluster(&data, 3, 99).unwrap();
        let b = cluster(&data, 3, 99).unwrap();
        assert_eq!(a.labels, b.labels);
        let bits = |c: &Clustering| -> Vec<u64> {
            c.centroids.iter().flatten().map(|v| v.to_bits()).collect()
        };
        assert_eq!(bits(&a), bits(&b));
        assert_eq!(a.inertia.to_bits(), b.inertia.to_bits());
    }

    #[test]
    fn test_injected_rng_matches_seeded_fit() {
        let data = sample_data();
        let kmeans = KMeans::new(3).with_seed(11);
        let seeded = kmeans.fit(&data).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let injected = kmeans.fit_with_rng(&data, &mut rng).unwrap();
        assert_eq!(seeded, injected);
    }

    #[test]
    fn test_single_cluster_is_global_mean() {
        let data = pixels(&[[0.0, 0.0, 0.0], [10.0, 20.0, 30.0], [20.0, 40.0, 60.0]]);
        let result = cluster(&data, 1, 0).unwrap();
        assert!(result.labels.iter().all(|&l| l == 0));
        assert_eq!(result.centroids[0], [10.0, 20.0, 30.0]);
        assert!(result.converged());
    }

    #[test]
    fn test_k_equals_n_gives_singletons() {
        let data = sample_data();
        let result = cluster(&data, data.len(), 5).unwrap();
        let mut seen = result.labels.clone();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), data.len());
        assert!(result.inertia.abs() < 1e-9);
    }

    #[test]
    fn test_two_color_scenario() {
        let data = pixels(&[
            [255.0, 0.0, 0.0],
            [255.0, 0.0, 0.0],
            [0.0, 0.0, 255.0],
            [0.0, 0.0, 255.0],
        ]);
        let result = cluster(&data, 2, 42).unwrap();
        assert_eq!(result.labels[0], result.labels[1]);
        assert_eq!(result.labels[2], result.labels[3]);
        assert_ne!(result.labels[0], result.labels[2]);
        assert_eq!(result.centroids[result.labels[0]], [255.0, 0.0, 0.0]);
        assert_eq!(result.centroids[result.labels[2]], [0.0, 0.0, 255.0]);
        assert_eq!(result.inertia, 0.0);
        assert!(result.converged());
    }

    #[test]
    fn test_labels_are_nearest_to_returned_centroids() {
        let data = sample_data();
        let result = cluster(&data, 4, 8).unwrap();
        for (p, &label) in data.as_slice().iter().zip(&result.labels) {
            assert_eq!(nearest(p, &result.centroids), label);
        }
    }

    #[test]
    fn test_more_clusters_do_not_increase_inertia() {
        let data = sample_data();
        let two = cluster(&data, 2, 1).unwrap();
        let four = cluster(&data, 4, 1).unwrap();
        assert!(four.inertia <= two.inertia);
    }

    #[test]
    fn test_empty_pixels_error() {
        let empty = PixelSet::new(Vec::new()).unwrap();
        assert!(matches!(
            cluster(&empty, 1, 0),
            Err(PaletteError::InvalidInput(_))
        ));
        assert!(matches!(
            cluster(&empty, 0, 0),
            Err(PaletteError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_invalid_k_errors() {
        let data = sample_data();
        assert!(matches!(
            cluster(&data, 0, 0),
            Err(PaletteError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            cluster(&data, data.len() + 1, 0),
            Err(PaletteError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_invalid_loop_settings() {
        let data = sample_data();
        for kmeans in [
            KMeans::new(2).with_n_init(0),
            KMeans::new(2).with_max_iter(0),
            KMeans::new(2).with_tol(-1.0),
            KMeans::new(2).with_tol(f64::NAN),
        ] {
            assert!(matches!(
                kmeans.fit(&data),
                Err(PaletteError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn test_nearest_tie_goes_to_lowest_id() {
        let centroids = [[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        assert_eq!(nearest(&[1.0, 0.0, 0.0], &centroids[..2]), 0);
        assert_eq!(nearest(&[1.0, 0.0, 0.0], &centroids), 2);
    }

    #[test]
    fn test_empty_cluster_keeps_previous_position() {
        let data = [[0.0, 0.0, 0.0], [2.0, 2.0, 2.0]];
        let previous = [[1.0, 1.0, 1.0], [100.0, 50.0, 25.0]];
        let updated = update(&data, &[0, 0], &previous);
        assert_eq!(updated[0], [1.0, 1.0, 1.0]);
        assert_eq!(updated[1], [100.0, 50.0, 25.0]);
    }

    #[test]
    fn test_iteration_cap_reported() {
        let data: Vec<Observation> = [0.0, 1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 13.0]
            .iter()
            .map(|&v| [v, v, v])
            .collect();
        let seeds = vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]];

        let capped = lloyd(&data, seeds.clone(), 1, 0.0);
        assert_eq!(capped.status, ConvergenceStatus::IterationCapReached);
        assert_eq!(capped.iterations, 1);
        assert_eq!(capped.labels.len(), data.len());

        let settled = lloyd(&data, seeds, 50, 0.0);
        assert_eq!(settled.status, ConvergenceStatus::Converged);
        assert_eq!(settled.labels, vec![0, 0, 0, 0, 1, 1, 1, 1]);
        assert_eq!(settled.centroids[0], [1.5, 1.5, 1.5]);
        assert_eq!(settled.centroids[1], [11.5, 11.5, 11.5]);
    }

    #[test]
    fn test_fit_reports_iteration_cap() {
        let data = pixels(
            &(0..16)
                .map(|v| [v as f64, v as f64, v as f64])
                .collect::<Vec<_>>(),
        );
        let mut capped_runs = 0;
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let seeds = kmeans_plusplus(data.as_slice(), 2, &mut rng);
            let uncapped = lloyd(data.as_slice(), seeds, 300, 0.0);
            assert!(uncapped.converged());

            let kmeans = KMeans::new(2)
                .with_n_init(1)
                .with_tol(0.0)
                .with_seed(seed);
            let capped = kmeans.clone().with_max_iter(1).fit(&data).unwrap();
            assert_eq!(capped.iterations, 1);
            assert_eq!(capped.labels.len(), data.len());
            if uncapped.iterations > 1 {
                capped_runs += 1;
                assert_eq!(capped.status, ConvergenceStatus::IterationCapReached);
                assert!(!capped.converged());
            } else {
                assert_eq!(capped.status, ConvergenceStatus::Converged);
            }

            let full = kmeans.with_max_iter(uncapped.iterations).fit(&data).unwrap();
            assert_eq!(full, uncapped);
        }
        assert!(capped_runs > 0);
    }

    #[test]
    fn test_equal_inertia_restart_keeps_first() {
        let data = sample_data();
        let k = data.len();
        let kmeans = KMeans::new(k).with_n_init(5).with_seed(7);
        let best = kmeans.fit(&data).unwrap();

        let tol = kmeans.tol() * data.mean_channel_variance();
        let mut rng = StdRng::seed_from_u64(7);
        let runs: Vec<Clustering> = (0..5)
            .map(|_| {
                let seeds = kmeans_plusplus(data.as_slice(), k, &mut rng);
                lloyd(data.as_slice(), seeds, kmeans.max_iter(), tol)
            })
            .collect();

        // every restart ends in singletons, so all inertias are zero
        assert!(runs.iter().all(|r| r.inertia == 0.0));
        assert!(runs[1..].iter().any(|r| r.labels != runs[0].labels));
        assert_eq!(best, runs[0]);
    }

    #[test]
    fn test_plusplus_picks_distinct_points() {
        let data = sample_data();
        let mut rng = StdRng::seed_from_u64(4);
        let seeds = kmeans_plusplus(data.as_slice(), data.len(), &mut rng);
        let mut keys: Vec<[u64; 3]> = seeds.iter().map(|c| c.map(f64::to_bits)).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), data.len());
    }

    #[test]
    fn test_plusplus_on_constant_data() {
        let data = vec![[9.0, 9.0, 9.0]; 4];
        let mut rng = StdRng::seed_from_u64(0);
        let seeds = kmeans_plusplus(&data, 3, &mut rng);
        assert_eq!(seeds, vec![[9.0, 9.0, 9.0]; 3]);
    }
}
