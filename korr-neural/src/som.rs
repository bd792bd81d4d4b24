use crate::error::NeuralError;
use crate::features::FEATURES;
use crate::lambert::{learning_rate, learning_time_constant};
use ndarray::Array3;
use std::io::{Read, Write};
use std::path::Path;

/// Learning-rate amplitude (`M`); spec.md §4.8 states `M ≈ 0.8`.
const LEARNING_M: f64 = 0.8;
/// Cutoff the learning rate must drop below after `CUTOFF_N` steps.
const LEARNING_CUTOFF: f64 = 0.01;
/// Step count used only to derive `T` analytically; independent of how many
/// iterations a training run actually performs per sample (fixed
/// separately from the `iter` parameter passed to `train`).
const CUTOFF_N: usize = 200;
const LAMBERT_SERIES_TERMS: usize = 64;

/// A self-organizing map over [`FEATURES`]-dimensional alert feature
/// vectors, serving both as an ongoing online-training model (C8) and as
/// the BMU lookup the correlation engine uses for scenario labels.
#[derive(Debug, Clone)]
pub struct Som {
    weights: Array3<f64>,
    epoch_of_last_train: i64,
    learning_t: f64,
}

impl Som {
    /// A freshly allocated grid of the given topology, weights zeroed.
    /// Call [`Som::init_weights`] before training for a non-trivial start.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            weights: Array3::zeros((rows, cols, FEATURES)),
            epoch_of_last_train: 0,
            learning_t: learning_time_constant(LEARNING_M, CUTOFF_N, LEARNING_CUTOFF, LAMBERT_SERIES_TERMS),
        }
    }

    pub fn rows(&self) -> usize {
        self.weights.dim().0
    }

    pub fn cols(&self) -> usize {
        self.weights.dim().1
    }

    pub fn epoch_of_last_train(&self) -> i64 {
        self.epoch_of_last_train
    }

    /// Seed the weight grid from a representative dataset (spec.md §4.8's
    /// "Weight initialization"): the two farthest-apart vectors anchor
    /// corners (0,C-1) and (R-1,0), the vector farthest from their mean
    /// anchors (0,0), the vector farthest from the mean of those three
    /// anchors (R-1,C-1); edges are then linearly interpolated and the
    /// interior bilinearly interpolated from the four corners.
    ///
    /// Datasets too small to pick four distinct anchors (fewer than four
    /// vectors) fall back to a uniform random seed in `[0, 1)`.
    pub fn init_weights(&mut self, dataset: &[[f64; FEATURES]]) {
        let (rows, cols, _) = self.weights.dim();
        if dataset.len() < 4 || rows < 2 || cols < 2 {
            let mut rng = rand::thread_rng();
            for w in self.weights.iter_mut() {
                *w = rand::Rng::gen(&mut rng);
            }
            return;
        }

        let (max_i, max_j) = farthest_pair(dataset);
        let mean_two = mean_of(&[dataset[max_i], dataset[max_j]]);
        let medium_i = farthest_from(dataset, &mean_two, &[max_i, max_j]);
        let mean_three = mean_of(&[dataset[max_i], dataset[max_j], dataset[medium_i]]);
        let medium_j = farthest_from(dataset, &mean_three, &[max_i, max_j, medium_i]);

        self.set_cell(0, cols - 1, &dataset[max_i]);
        self.set_cell(rows - 1, 0, &dataset[max_j]);
        self.set_cell(0, 0, &dataset[medium_i]);
        self.set_cell(rows - 1, cols - 1, &dataset[medium_j]);

        self.interpolate_edges_and_interior();
    }

    fn set_cell(&mut self, i: usize, j: usize, value: &[f64; FEATURES]) {
        for (k, v) in value.iter().enumerate() {
            self.weights[[i, j, k]] = *v;
        }
    }

    fn cell(&self, i: usize, j: usize) -> [f64; FEATURES] {
        let mut out = [0.0; FEATURES];
        for (k, v) in out.iter_mut().enumerate() {
            *v = self.weights[[i, j, k]];
        }
        out
    }

    fn interpolate_edges_and_interior(&mut self) {
        let (rows, cols, _) = self.weights.dim();
        let r = (rows - 1) as f64;
        let c = (cols - 1) as f64;
        let top_right = self.cell(0, cols - 1);
        let bottom_left = self.cell(rows - 1, 0);
        let top_left = self.cell(0, 0);
        let bottom_right = self.cell(rows - 1, cols - 1);

        for j in 1..cols.saturating_sub(1) {
            let jf = j as f64;
            let mut top = [0.0; FEATURES];
            let mut bottom = [0.0; FEATURES];
            for k in 0..FEATURES {
                top[k] = ((jf - 1.0) / c) * top_right[k] + ((c - jf) / c) * top_left[k];
                bottom[k] = ((jf - 1.0) / c) * bottom_right[k] + ((c - jf) / c) * bottom_left[k];
            }
            self.set_cell(0, j, &top);
            self.set_cell(rows - 1, j, &bottom);
        }

        for i in 1..rows.saturating_sub(1) {
            let iff = i as f64;
            let mut left = [0.0; FEATURES];
            let mut right = [0.0; FEATURES];
            for k in 0..FEATURES {
                left[k] = ((iff - 1.0) / r) * bottom_left[k] + ((r - iff) / r) * top_left[k];
                right[k] = ((iff - 1.0) / r) * bottom_right[k] + ((r - iff) / r) * top_right[k];
            }
            self.set_cell(i, 0, &left);
            self.set_cell(i, cols - 1, &right);
        }

        for i in 1..rows.saturating_sub(1) {
            let iff = i as f64;
            for j in 1..cols.saturating_sub(1) {
                let jf = j as f64;
                let mut cell = [0.0; FEATURES];
                for k in 0..FEATURES {
                    cell[k] = ((jf - 1.0) * (iff - 1.0)) / (r * c) * bottom_right[k]
                        + ((jf - 1.0) * (r - iff)) / (r * c) * top_right[k]
                        + ((c - jf) * (iff - 1.0)) / (r * c) * bottom_left[k]
                        + ((c - jf) * (r - iff)) / (r * c) * top_left[k];
                }
                self.set_cell(i, j, &cell);
            }
        }
    }

    /// The best-matching unit for `input`: the cell minimizing squared
    /// Euclidean distance, plus that minimal distance.
    pub fn best_matching_unit(&self, input: &[f64; FEATURES]) -> (usize, usize, f64) {
        let (rows, cols, _) = self.weights.dim();
        let mut best = (0usize, 0usize, f64::MAX);
        for i in 0..rows {
            for j in 0..cols {
                let mut dist = 0.0;
                for k in 0..FEATURES {
                    let d = input[k] - self.weights[[i, j, k]];
                    dist += d * d;
                }
                if dist < best.2 {
                    best = (i, j, dist);
                }
            }
        }
        best
    }

    /// Scenario label for a new alert: its BMU coordinates (spec.md §4.8,
    /// "Inference").
    pub fn infer(&self, input: &[f64; FEATURES]) -> (usize, usize) {
        let (i, j, _) = self.best_matching_unit(input);
        (i, j)
    }

    /// One training pass over `dataset`, each sample driven for up to
    /// `iterations_per_sample` steps (the per-sample iteration counter
    /// restarts at 1 for every sample). Stops early on a sample once its
    /// BMU distance hits zero. `epoch` stamps
    /// [`Som::epoch_of_last_train`] on completion.
    pub fn train(&mut self, dataset: &[[f64; FEATURES]], iterations_per_sample: usize, epoch: i64) {
        for sample in dataset {
            for k in 1..=iterations_per_sample {
                let dist = self.train_iteration(sample, k as f64);
                if dist == 0.0 {
                    break;
                }
            }
        }
        self.epoch_of_last_train = epoch;
    }

    fn train_iteration(&mut self, input: &[f64; FEATURES], k: f64) -> f64 {
        let eta = learning_rate(k, self.learning_t, LEARNING_M);
        let (x_star, y_star, dist) = self.best_matching_unit(input);
        let (rows, cols, _) = self.weights.dim();

        for i in 0..rows {
            for j in 0..cols {
                let grid_dist = ((x_star as i64 - i as i64).unsigned_abs() + (y_star as i64 - j as i64).unsigned_abs()) as f64;
                let falloff = grid_dist.powi(4);
                let factor = eta / (falloff + 1.0);
                for k_feat in 0..FEATURES {
                    let w = self.weights[[i, j, k_feat]];
                    self.weights[[i, j, k_feat]] = w + factor * (input[k_feat] - w);
                }
            }
        }

        dist
    }

    /// Serialize to the exact on-disk layout spec.md §4.8 describes:
    /// native-endian `i64 epoch_of_last_train`, `f64 learning_T`, `u64 IN`,
    /// `u64 R`, `u64 C`, then `R*C*IN` `f64`s in row-major order.
    pub fn save(&self, path: &Path) -> Result<(), NeuralError> {
        let path_str = path.display().to_string();
        let mut file = std::fs::File::create(path).map_err(|source| NeuralError::Io {
            path: path_str.clone(),
            source,
        })?;

        let (rows, cols, in_dim) = self.weights.dim();
        file.write_all(&self.epoch_of_last_train.to_ne_bytes())
            .and_then(|_| file.write_all(&self.learning_t.to_ne_bytes()))
            .and_then(|_| file.write_all(&(in_dim as u64).to_ne_bytes()))
            .and_then(|_| file.write_all(&(rows as u64).to_ne_bytes()))
            .and_then(|_| file.write_all(&(cols as u64).to_ne_bytes()))
            .map_err(|source| NeuralError::Io {
                path: path_str.clone(),
                source,
            })?;

        for value in self.weights.iter() {
            file.write_all(&value.to_ne_bytes()).map_err(|source| NeuralError::Io {
                path: path_str.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, NeuralError> {
        let path_str = path.display().to_string();
        let mut file = std::fs::File::open(path).map_err(|source| NeuralError::Io {
            path: path_str.clone(),
            source,
        })?;

        let mut header = [0u8; 8 + 8 + 8 + 8 + 8];
        file.read_exact(&mut header).map_err(|source| NeuralError::Io {
            path: path_str.clone(),
            source,
        })?;

        let epoch_of_last_train = i64::from_ne_bytes(header[0..8].try_into().unwrap());
        let learning_t = f64::from_ne_bytes(header[8..16].try_into().unwrap());
        let in_dim = u64::from_ne_bytes(header[16..24].try_into().unwrap()) as usize;
        let rows = u64::from_ne_bytes(header[24..32].try_into().unwrap()) as usize;
        let cols = u64::from_ne_bytes(header[32..40].try_into().unwrap()) as usize;

        if in_dim != FEATURES {
            return Err(NeuralError::Malformed {
                path: path_str,
                reason: format!("feature dimension {in_dim} does not match expected {FEATURES}"),
            });
        }

        let mut weights = Array3::zeros((rows, cols, in_dim));
        let mut buf = [0u8; 8];
        for value in weights.iter_mut() {
            file.read_exact(&mut buf).map_err(|source| NeuralError::Io {
                path: path_str.clone(),
                source,
            })?;
            *value = f64::from_ne_bytes(buf);
        }

        Ok(Self {
            weights,
            epoch_of_last_train,
            learning_t,
        })
    }
}

fn mean_of(vectors: &[[f64; FEATURES]]) -> [f64; FEATURES] {
    let mut mean = [0.0; FEATURES];
    for v in vectors {
        for (k, m) in mean.iter_mut().enumerate() {
            *m += v[k];
        }
    }
    for m in mean.iter_mut() {
        *m /= vectors.len() as f64;
    }
    mean
}

fn l1_distance(a: &[f64; FEATURES], b: &[f64; FEATURES]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
}

fn farthest_pair(dataset: &[[f64; FEATURES]]) -> (usize, usize) {
    let mut best = (0usize, 1usize.min(dataset.len() - 1), -1.0_f64);
    for i in 0..dataset.len() {
        for j in (i + 1)..dataset.len() {
            let d = l1_distance(&dataset[i], &dataset[j]);
            if d > best.2 {
                best = (i, j, d);
            }
        }
    }
    (best.0, best.1)
}

fn farthest_from(dataset: &[[f64; FEATURES]], target: &[f64; FEATURES], excluded: &[usize]) -> usize {
    let mut best = (0usize, -1.0_f64);
    for (idx, v) in dataset.iter().enumerate() {
        if excluded.contains(&idx) {
            continue;
        }
        let d = l1_distance(v, target);
        if d > best.1 {
            best = (idx, d);
        }
    }
    best.0
}
