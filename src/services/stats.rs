//! Numeric helpers shared by the per-record and dashboard metrics.

/// Rounds to `places` decimals, ties to even, judged on the exact binary
/// value: `round_to(3.125, 2)` is 3.12 while 2.675 (stored just below) gives
/// 2.67.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    let scaled = value * factor;
    if (scaled - scaled.trunc()).abs() != 0.5 {
        return scaled.round() / factor;
    }
    // The product may only look like a tie after rounding; the fused
    // residual tells which side the exact product lies on.
    let residual = value.mul_add(factor, -scaled);
    let rounded = if residual > 0.0 {
        scaled.ceil()
    } else if residual < 0.0 {
        scaled.floor()
    } else {
        scaled.round_ties_even()
    };
    rounded / factor
}

/// `100 * numerator / denominator` rounded to two decimals, or 0 when the
/// denominator is zero.
pub fn percentage(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round_to(numerator as f64 / denominator as f64 * 100.0, 2)
}

/// Plain ratio rounded to two decimals, or 0 when the denominator is zero.
pub fn ratio(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round_to(numerator as f64 / denominator as f64, 2)
}

pub fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: i64 = values.iter().sum();
    Some(sum as f64 / values.len() as f64)
}

/// Element at index `len / 2` of the sorted values. For even lengths this is
/// the upper of the two middle elements, not their average.
pub fn upper_median(values: &[i64]) -> Option<i64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    Some(sorted[sorted.len() / 2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_even_length_takes_upper_middle() {
        assert_eq!(upper_median(&[1, 2, 3, 4]), Some(3));
        assert_eq!(upper_median(&[4, 1, 3, 2]), Some(3));
    }

    #[test]
    fn median_of_odd_length_takes_middle() {
        assert_eq!(upper_median(&[9, -2, 5]), Some(5));
        assert_eq!(upper_median(&[7]), Some(7));
    }

    #[test]
    fn empty_sequences_have_no_mean_or_median() {
        assert_eq!(mean(&[]), None);
        assert_eq!(upper_median(&[]), None);
    }

    #[test]
    fn mean_is_unrounded() {
        assert_eq!(mean(&[1, 2]), Some(1.5));
        let m = mean(&[10, 20, 25]).unwrap();
        assert_eq!(round_to(m, 1), 18.3);
    }

    #[test]
    fn zero_denominators_yield_zero() {
        assert_eq!(percentage(5, 0), 0.0);
        assert_eq!(ratio(5, 0), 0.0);
    }

    #[test]
    fn percentages_round_to_two_places() {
        assert_eq!(percentage(4, 15), 26.67);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(1, 1), 100.0);
        assert_eq!(ratio(7, 3), 2.33);
    }

    #[test]
    fn exact_ties_round_to_even() {
        assert_eq!(percentage(1, 32), 3.12);
        assert_eq!(percentage(3, 32), 9.38);
        assert_eq!(round_to(mean(&[0, 0, 0, 1]).unwrap(), 1), 0.2);
        assert_eq!(round_to(0.75, 1), 0.8);
        assert_eq!(round_to(-0.25, 1), -0.2);
    }

    #[test]
    fn values_stored_off_a_tie_round_by_their_exact_value() {
        assert_eq!(round_to(2.675, 2), 2.67);
        assert_eq!(round_to(1.005, 2), 1.0);
        assert_eq!(round_to(0.125, 2), 0.12);
    }
}
