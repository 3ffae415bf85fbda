use std::cmp::Ordering;
use std::error::Error;
use std::fmt;

/// InputValueError is used if some simulation option or parameter does not fulfill the posed
/// requirements, e.g., a question interval that is not positive.
#[derive(Debug, Clone)]
pub struct InputValueError {
    pub reason: String,
}

impl InputValueError {
    pub fn new(reason: impl Into<String>) -> InputValueError {
        InputValueError {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for InputValueError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid input value: {}", self.reason)
    }
}

impl Error for InputValueError {}

#[derive(Debug, Clone, Copy)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// argsort returns the indices that would sort an array. The sort is stable, i.e. equal values
/// keep their original relative order. Incomparable values (NaN) are treated as equal.
pub fn argsort<T: PartialOrd>(x: &[T], order: SortOrder) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..x.len()).collect();
    let cmp = |a: &T, b: &T| a.partial_cmp(b).unwrap_or(Ordering::Equal);
    match order {
        SortOrder::Ascending => indices.sort_by(|&a, &b| cmp(&x[a], &x[b])),
        SortOrder::Descending => indices.sort_by(|&a, &b| cmp(&x[b], &x[a])),
    }
    indices
}

/// lerp returns the value at fraction t between a and b. t is clamped to [0.0, 1.0].
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// inv_lerp returns the fraction of x between a and b. The denominator is kept away from zero by
/// eps, so a degenerate range yields 0.0 or 1.0 instead of NaN.
pub fn inv_lerp(a: f64, b: f64, x: f64, eps: f64) -> f64 {
    let denom = (b - a).max(eps);
    ((x - a) / denom).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn argsort_is_stable_for_equal_values() {
        let x = [2.0, 1.0, 2.0, 0.5];
        assert_eq!(argsort(&x, SortOrder::Ascending), vec![3, 1, 0, 2]);
        assert_eq!(argsort(&x, SortOrder::Descending), vec![0, 2, 1, 3]);
    }

    #[test]
    fn inv_lerp_survives_degenerate_range() {
        assert_abs_diff_eq!(inv_lerp(5.0, 5.0, 5.0, 1e-4), 0.0);
        assert_abs_diff_eq!(inv_lerp(5.0, 5.0, 6.0, 1e-4), 1.0);
        assert_abs_diff_eq!(inv_lerp(0.0, 10.0, 2.5, 1e-4), 0.25);
    }

    #[test]
    fn lerp_clamps_fraction() {
        assert_abs_diff_eq!(lerp(3.0, 0.5, 0.5), 1.75);
        assert_abs_diff_eq!(lerp(3.0, 0.5, 2.0), 0.5);
    }
}
