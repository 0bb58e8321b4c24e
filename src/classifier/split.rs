use super::TrainingError;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffles `items` with a seeded RNG and splits off `ceil(test_fraction * n)`
/// of them for evaluation. Returns `(train, test)`.
pub fn train_test_split<T>(
    items: Vec<T>,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<T>, Vec<T>), TrainingError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TrainingError::InvalidDataset(format!(
            "test fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let n = items.len();
    let test_count = (test_fraction * n as f64).ceil() as usize;
    if n < 2 || test_count >= n {
        return Err(TrainingError::InvalidDataset(format!(
            "need at least one training and one test sample, got {} samples",
            n
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut take = |i: &usize| slots[*i].take();
    let test: Vec<T> = indices[..test_count].iter().filter_map(&mut take).collect();
    let train: Vec<T> = indices[test_count..].iter().filter_map(&mut take).collect();

    Ok((train, test))
}
