//! Medcouple robust skewness (Brys, Hubert, Struyf).

use crate::num::Decimal;

/// Medcouple of a sample: the median of the kernel
/// `h(x_i, x_j) = ((x_i - m) - (m - x_j)) / (x_i - x_j)` over all pairs with
/// `x_i >= m >= x_j`, where `m` is the sample median. Pairs tied exactly at
/// the median use the standard signum rule on their tie indices. The result
/// lies in `[-1, 1]`; samples smaller than three return 0.
///
/// The O(n²) kernel enumeration is fine at the in-sample sizes this crate
/// feeds it (same rationale as Qn).
pub fn medcouple_skew(values: &[Decimal]) -> Decimal {
    let n = values.len();
    if n < 3 {
        return Decimal::ZERO;
    }

    let mut sorted: Vec<f64> = values.iter().map(|v| v.to_f64()).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("finite values"));
    let med = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };

    // Deviations from the median; zplus >= 0 ascending, zminus <= 0 ascending.
    let zplus: Vec<f64> = sorted.iter().filter(|&&x| x >= med).map(|x| x - med).collect();
    let zminus: Vec<f64> = sorted.iter().filter(|&&x| x <= med).map(|x| x - med).collect();
    let p = zplus.len();
    let q = zminus.len();
    if p == 0 || q == 0 {
        return Decimal::ZERO;
    }

    let mut kernels = Vec::with_capacity(p * q);
    for (i, &zi) in zplus.iter().enumerate() {
        for (j, &zj) in zminus.iter().enumerate() {
            let h = if zi == 0.0 && zj == 0.0 {
                // Both observations sit exactly on the median; the tie rule
                // keeps the kernel median well-defined.
                let k = (p - 1 - i) as i64;
                match k.cmp(&(j as i64)) {
                    std::cmp::Ordering::Greater => 1.0,
                    std::cmp::Ordering::Equal => 0.0,
                    std::cmp::Ordering::Less => -1.0,
                }
            } else {
                (zi + zj) / (zi - zj)
            };
            kernels.push(h);
        }
    }

    kernels.sort_by(|a, b| a.partial_cmp(b).expect("finite kernels"));
    let m = kernels.len();
    let mc = if m % 2 == 1 {
        kernels[m / 2]
    } else {
        (kernels[m / 2 - 1] + kernels[m / 2]) / 2.0
    };
    Decimal::from_f64(mc.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decs(values: &[f64]) -> Vec<Decimal> {
        values.iter().map(|&v| Decimal::from_f64(v)).collect()
    }

    #[test]
    fn symmetric_sample_has_zero_medcouple() {
        let mc = medcouple_skew(&decs(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        assert_eq!(mc, Decimal::ZERO);
    }

    #[test]
    fn right_skew_gives_positive_medcouple() {
        // Kernel median works out to exactly 0.5 for this sample.
        let mc = medcouple_skew(&decs(&[1.0, 2.0, 3.0, 6.0, 12.0]));
        assert_eq!(mc, Decimal::from_f64(0.5));
    }

    #[test]
    fn left_skew_gives_negative_medcouple() {
        let mc = medcouple_skew(&decs(&[-12.0, -6.0, -3.0, -2.0, -1.0]));
        assert_eq!(mc, Decimal::from_f64(-0.5));
    }

    #[test]
    fn bounded_in_unit_interval() {
        let mc = medcouple_skew(&decs(&[0.0, 0.0, 0.0, 0.0, 1000.0]));
        assert!(mc <= Decimal::ONE && mc >= -Decimal::ONE);
    }

    #[test]
    fn tiny_samples_return_zero() {
        assert_eq!(medcouple_skew(&decs(&[1.0, 5.0])), Decimal::ZERO);
        assert_eq!(medcouple_skew(&[]), Decimal::ZERO);
    }

    #[test]
    fn mirror_symmetry_flips_sign() {
        let sample = decs(&[1.0, 2.0, 2.5, 3.0, 9.0, 12.0]);
        let mirrored: Vec<Decimal> = sample.iter().map(|v| -*v).collect();
        assert_eq!(medcouple_skew(&sample), -medcouple_skew(&mirrored));
    }
}
