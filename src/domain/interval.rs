//! Interval-valued probabilities.
//!
//! Reliabilities are never point estimates here: every quantity carries a
//! lower and an upper bound. Formulas are evaluated once per bound side and
//! the resulting failure probabilities are flipped back into a reliability
//! interval with [`Interval::from_failure_bounds`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// A probability interval `[lower, upper]`.
///
/// No validation is performed: callers are trusted to supply
/// `0 <= lower <= upper <= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Interval {
    /// Lower bound.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
}

/// Which side of an interval a formula is being evaluated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// The lower side (`L` values).
    Lower,
    /// The upper side (`R` values).
    Upper,
}

/// Success and failure probabilities of a quantity at one bound side.
///
/// At the lower side this is `(lower, 1 - upper)`, at the upper side
/// `(upper, 1 - lower)`. The two values do not sum to one unless the
/// interval is degenerate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Odds {
    /// Probability of success (`Q`).
    pub q: f64,
    /// Probability of failure (`P`).
    pub p: f64,
}

impl Interval {
    /// Creates a new interval.
    #[must_use]
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// A degenerate interval with both bounds equal.
    #[must_use]
    pub const fn point(value: f64) -> Self {
        Self::new(value, value)
    }

    /// Success/failure probabilities at the given bound side.
    #[must_use]
    pub fn at(self, bound: Bound) -> Odds {
        match bound {
            Bound::Lower => Odds {
                q: self.lower,
                p: 1.0 - self.upper,
            },
            Bound::Upper => Odds {
                q: self.upper,
                p: 1.0 - self.lower,
            },
        }
    }

    /// Converts per-side failure probabilities back to a reliability
    /// interval.
    ///
    /// The lower reliability bound comes from the upper failure bound and
    /// vice versa.
    #[must_use]
    pub fn from_failure_bounds(failure_lower: f64, failure_upper: f64) -> Self {
        Self::new(1.0 - failure_upper, 1.0 - failure_lower)
    }

    /// Evaluates `failure` at both sides and flips the result into a
    /// reliability interval.
    #[must_use]
    pub fn from_failure_fn(mut failure: impl FnMut(Bound) -> f64) -> Self {
        let lower = failure(Bound::Lower);
        let upper = failure(Bound::Upper);
        Self::from_failure_bounds(lower, upper)
    }

    /// Series composition: both bounds multiplied.
    #[must_use]
    pub fn product(self, other: Self) -> Self {
        Self::new(self.lower * other.lower, self.upper * other.upper)
    }

    /// Whether `lower <= upper`.
    #[must_use]
    pub fn is_ordered(self) -> bool {
        self.lower <= self.upper
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{:.6}, {:.6}]", self.lower, self.upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odds_use_opposite_bound_for_failure() {
        let interval = Interval::new(0.8, 0.85);

        let lower = interval.at(Bound::Lower);
        assert!((lower.q - 0.8).abs() < 1e-12);
        assert!((lower.p - 0.15).abs() < 1e-12);

        let upper = interval.at(Bound::Upper);
        assert!((upper.q - 0.85).abs() < 1e-12);
        assert!((upper.p - 0.2).abs() < 1e-12);
    }

    #[test]
    fn flip_maps_upper_failure_to_lower_reliability() {
        let interval = Interval::from_failure_bounds(0.1, 0.3);
        assert!((interval.lower - 0.7).abs() < 1e-12);
        assert!((interval.upper - 0.9).abs() < 1e-12);
        assert!(interval.is_ordered());
    }
}
