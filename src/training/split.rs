//! Reproducible train/test splitting
//!
//! Classification splits are stratified by class; regression splits are a plain
//! shuffle. Both are driven by a seeded `ChaCha8Rng`, so the same targets and seed
//! always produce the same partition.

use super::config::TaskType;
use crate::error::{ForgeError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Row indices of the two partitions, each sorted ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    /// Materialize `(x_train, x_test, y_train, y_test)`
    pub fn apply(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> (Array2<f64>, Array2<f64>, Array1<f64>, Array1<f64>) {
        (
            x.select(Axis(0), &self.train),
            x.select(Axis(0), &self.test),
            y.select(Axis(0), &self.train),
            y.select(Axis(0), &self.test),
        )
    }
}

/// Number of held-out rows: `ceil(n * test_fraction)`
pub fn test_size(n_samples: usize, test_fraction: f64) -> usize {
    // Absorb rounding noise such as 35 * 0.2 = 7.000000000000001
    (n_samples as f64 * test_fraction - 1e-9).ceil().max(0.0) as usize
}

fn check_fraction(test_fraction: f64) -> Result<()> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ForgeError::InvalidInputFormat(format!(
            "validation_split must be in (0, 1), got {}",
            test_fraction
        )));
    }
    Ok(())
}

/// Split rows for the given task
pub fn train_test_split(
    y: &Array1<f64>,
    task: TaskType,
    test_fraction: f64,
    seed: u64,
) -> Result<SplitIndices> {
    match task {
        TaskType::Classification => stratified_split(y, test_fraction, seed),
        TaskType::Regression => shuffle_split(y.len(), test_fraction, seed),
    }
}

/// Shuffled split; both sides receive at least one row
pub fn shuffle_split(n_samples: usize, test_fraction: f64, seed: u64) -> Result<SplitIndices> {
    check_fraction(test_fraction)?;
    if n_samples < 2 {
        return Err(ForgeError::InsufficientSamples {
            required: 2,
            actual: n_samples,
        });
    }

    let n_test = test_size(n_samples, test_fraction).clamp(1, n_samples - 1);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n_samples).collect();
    indices.shuffle(&mut rng);

    let mut test = indices[..n_test].to_vec();
    let mut train = indices[n_test..].to_vec();
    test.sort_unstable();
    train.sort_unstable();
    Ok(SplitIndices { train, test })
}

/// Split preserving class proportions, with every class present on both sides.
///
/// Each class needs at least two rows, and both partitions must be large enough
/// to hold one row per class; otherwise `InsufficientClassSamples`.
pub fn stratified_split(y: &Array1<f64>, test_fraction: f64, seed: u64) -> Result<SplitIndices> {
    check_fraction(test_fraction)?;
    let n_samples = y.len();

    let mut classes = y.to_vec();
    classes.sort_by(f64::total_cmp);
    classes.dedup();

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); classes.len()];
    for (row, value) in y.iter().enumerate() {
        let k = classes.partition_point(|c| c < value);
        members[k].push(row);
    }

    if let Some((k, rows)) = members.iter().enumerate().find(|(_, rows)| rows.len() < 2) {
        return Err(ForgeError::InsufficientClassSamples(format!(
            "class {} has {} row(s); every class needs at least 2",
            classes[k],
            rows.len()
        )));
    }

    let n_classes = classes.len();
    let n_test = test_size(n_samples, test_fraction);
    let n_train = n_samples - n_test.min(n_samples);
    if n_test < n_classes || n_train < n_classes {
        return Err(ForgeError::InsufficientClassSamples(format!(
            "{} classes cannot be represented in a {}/{} train/test split",
            n_classes, n_train, n_test
        )));
    }

    let counts: Vec<usize> = members.iter().map(Vec::len).collect();
    let allocation = allocate_test_rows(&counts, n_test);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for (mut rows, take) in members.into_iter().zip(allocation) {
        rows.shuffle(&mut rng);
        test.extend_from_slice(&rows[..take]);
        train.extend_from_slice(&rows[take..]);
    }

    test.sort_unstable();
    train.sort_unstable();
    Ok(SplitIndices { train, test })
}

/// Held-out rows per class: proportional by largest remainder, then moved so
/// every class keeps at least one row on each side.
fn allocate_test_rows(counts: &[usize], n_test: usize) -> Vec<usize> {
    let n_samples: usize = counts.iter().sum();
    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * n_test as f64 / n_samples as f64)
        .collect();
    let mut alloc: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let frac_a = exact[a] - exact[a].floor();
        let frac_b = exact[b] - exact[b].floor();
        frac_b.total_cmp(&frac_a).then(a.cmp(&b))
    });
    let assigned: usize = alloc.iter().sum();
    for &k in order.iter().take(n_test.saturating_sub(assigned)) {
        alloc[k] += 1;
    }

    for (a, &c) in alloc.iter_mut().zip(counts) {
        *a = (*a).clamp(1, c - 1);
    }

    // Clamping may have moved the total; rebalance one row at a time
    loop {
        let total: usize = alloc.iter().sum();
        if total > n_test {
            match (0..alloc.len()).filter(|&k| alloc[k] > 1).max_by_key(|&k| alloc[k]) {
                Some(k) => alloc[k] -= 1,
                None => break,
            }
        } else if total < n_test {
            match (0..alloc.len())
                .filter(|&k| alloc[k] + 1 < counts[k])
                .max_by_key(|&k| counts[k] - 1 - alloc[k])
            {
                Some(k) => alloc[k] += 1,
                None => break,
            }
        } else {
            break;
        }
    }
    alloc
}
