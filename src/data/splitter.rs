// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Seeded shuffle, then cut at round(len * train_fraction).
//
// Corpora usually arrive grouped (by article, by source), so
// the shuffle matters. The seed makes reruns train and
// validate on exactly the same items.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and return (train, validation).
/// `train_fraction` is clamped to the available items.
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    samples.shuffle(&mut StdRng::seed_from_u64(seed));

    let total = samples.len();
    let cut = (((total as f64) * train_fraction).round() as usize).min(total);
    let valid = samples.split_off(cut);

    tracing::debug!(
        "Split {} items (seed {}): {} train / {} validation",
        total,
        seed,
        samples.len(),
        valid.len()
    );
    (samples, valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ninety_ten_sizes() {
        let (train, valid) = split_train_val((0..100).collect::<Vec<usize>>(), 0.9, 42);
        assert_eq!((train.len(), valid.len()), (90, 10));
    }

    #[test]
    fn test_no_item_lost_or_duplicated() {
        let (mut train, valid) = split_train_val((0..50).collect::<Vec<usize>>(), 0.7, 3);
        train.extend(valid);
        train.sort_unstable();
        assert_eq!(train, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_seed_controls_the_split() {
        let items = || (0..30).collect::<Vec<usize>>();
        let (a, _) = split_train_val(items(), 0.5, 7);
        let (b, _) = split_train_val(items(), 0.5, 7);
        let (c, _) = split_train_val(items(), 0.5, 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_degenerate_inputs() {
        let (train, valid) = split_train_val(Vec::<usize>::new(), 0.9, 42);
        assert!(train.is_empty() && valid.is_empty());

        let (train, valid) = split_train_val((0..10).collect::<Vec<usize>>(), 1.0, 42);
        assert_eq!(train.len(), 10);
        assert!(valid.is_empty());
    }
}
