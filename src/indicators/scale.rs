//! Croux–Rousseeuw Qn robust scale estimator.

use rayon::prelude::*;

use crate::error::DataError;
use crate::num::Decimal;

/// Gaussian consistency constant for Qn.
const QN_CONSISTENCY: &str = "2.2219";

/// Qn scale: `2.2219` times the `h`-th order statistic of the pairwise
/// absolute differences, with `h = C(⌊n/2⌋ + 1, 2)`.
///
/// The O(n²) form is deliberate — the estimator runs on in-sample return
/// vectors of at most a few thousand observations, where the pairwise set
/// fits comfortably in memory and parallelizes well.
pub fn robust_qn(values: &[Decimal]) -> Result<Decimal, DataError> {
    let n = values.len();
    if n < 2 {
        return Err(DataError::InsufficientSamples { needed: 2, got: n });
    }

    let mut diffs: Vec<i64> = (0..n - 1)
        .into_par_iter()
        .flat_map_iter(|i| {
            let xi = values[i];
            values[i + 1..]
                .iter()
                .map(move |xj| (xi - *xj).abs().raw())
        })
        .collect();

    let half = n / 2;
    let h = (half + 1) * half / 2; // C(half + 1, 2)
    debug_assert!(h >= 1 && h <= diffs.len());
    let (_, kth, _) = diffs.select_nth_unstable(h - 1);
    let order_stat = Decimal::from_raw(*kth);
    let consistency: Decimal = QN_CONSISTENCY.parse().expect("constant parses");
    Ok(order_stat * consistency)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn qn_of_pair_is_scaled_gap() {
        // n=2: one pairwise difference, h = C(2,2) = 1
        let result = robust_qn(&[dec("1"), dec("3")]).unwrap();
        assert_eq!(result, dec("2") * dec("2.2219"));
    }

    #[test]
    fn qn_small_sample_hand_check() {
        // x = {1, 2, 4, 8}: sorted pairwise diffs {1, 2, 3, 4, 6, 7},
        // half = 2, h = C(3,2) = 3 -> third smallest = 3
        let result = robust_qn(&[dec("1"), dec("2"), dec("4"), dec("8")]).unwrap();
        assert_eq!(result, dec("3") * dec("2.2219"));
    }

    #[test]
    fn qn_ignores_a_single_outlier() {
        // A gross outlier should barely move Qn relative to the core spread.
        let core: Vec<Decimal> = (0..50).map(|i| Decimal::from_int(i % 7)).collect();
        let clean = robust_qn(&core).unwrap();
        let mut spiked = core.clone();
        spiked[0] = dec("10000");
        let spiked_qn = robust_qn(&spiked).unwrap();
        assert!((spiked_qn - clean).abs() < clean);
    }

    #[test]
    fn qn_requires_two_samples() {
        assert!(matches!(
            robust_qn(&[dec("1")]),
            Err(DataError::InsufficientSamples { .. })
        ));
    }
}
