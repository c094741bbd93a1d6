// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Cuts the encoded windows into a training set and a held-out
// validation set, in random order.
//
// Windows arrive grouped by ticker and ordered by date, so a
// straight cut would send every ticker's most recent windows to
// validation. Shuffling first gives both sets a mix of tickers
// and time periods.
//
// Reference: rand crate documentation (SliceRandom)

use rand::seq::SliceRandom;

/// Shuffle `samples` and cut them at `train_fraction`.
///
/// The cut is rounded to the nearest whole sample and clamped,
/// so a fraction of 1.0 keeps validation empty and tiny inputs
/// never panic. Returns (train, validation).
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64) -> (Vec<T>, Vec<T>) {
    samples.shuffle(&mut rand::thread_rng());

    let cut = ((samples.len() as f64) * train_fraction).round() as usize;
    let val = samples.split_off(cut.min(samples.len()));

    tracing::debug!(
        "Split {} windows: {} train / {} validation",
        samples.len() + val.len(),
        samples.len(),
        val.len(),
    );

    (samples, val)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_rounds_to_whole_samples() {
        let windows: Vec<f32> = vec![0.01; 10];
        let (train, val) = split_train_val(windows, 0.75);
        // 7.5 rounds up
        assert_eq!(train.len(), 8);
        assert_eq!(val.len(), 2);
    }

    #[test]
    fn nothing_is_lost_or_duplicated() {
        let windows: Vec<usize> = (0..101).collect();
        let (mut train, val) = split_train_val(windows, 0.8);
        train.extend(val);
        train.sort_unstable();
        assert_eq!(train, (0..101).collect::<Vec<_>>());
    }

    #[test]
    fn samples_are_shuffled() {
        // 64 items keep their original order with odds around 1e-89
        let windows: Vec<usize> = (0..64).collect();
        let (train, _) = split_train_val(windows, 1.0);
        assert_ne!(train, (0..64).collect::<Vec<_>>());
    }

    #[test]
    fn empty_input_splits_into_empty_halves() {
        let (train, val) = split_train_val(Vec::<usize>::new(), 0.8);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }

    #[test]
    fn full_fraction_keeps_validation_empty() {
        let windows: Vec<usize> = (0..10).collect();
        let (train, val) = split_train_val(windows, 1.0);
        assert_eq!(train.len(), 10);
        assert!(val.is_empty());
    }
}
