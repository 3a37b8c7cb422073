// Seeded train/test split.
//
// Shuffle row indices with a ChaCha RNG seeded from the configured random
// state, take the first ceil(test_size * n) as the test partition and the
// rest as train. No stratification: a rare label may land entirely in one
// partition.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
    #[error("test_size must be strictly between 0 and 1, got {0}")]
    InvalidTestSize(f64),

    #[error("{rows} rows with test_size {test_size} leaves an empty train or test partition")]
    TooFewRows { rows: usize, test_size: f64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

pub fn train_test_split(rows: usize, test_size: f64, seed: u64) -> Result<SplitIndices, SplitError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(SplitError::InvalidTestSize(test_size));
    }

    let n_test = (test_size * rows as f64).ceil() as usize;
    if n_test == 0 || n_test >= rows {
        return Err(SplitError::TooFewRows { rows, test_size });
    }

    let mut permutation: Vec<usize> = (0..rows).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    permutation.shuffle(&mut rng);

    let train = permutation.split_off(n_test);
    Ok(SplitIndices {
        train,
        test: permutation,
    })
}

/// Pick the elements of `items` at `indices`, in index order.
pub fn take<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| items[i].clone()).collect()
}
