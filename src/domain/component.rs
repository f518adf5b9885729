use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::{GenerationParams, Interval};

/// One hardware or software implementation variant of a module.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Declared identifier of the variant within its module.
    ///
    /// Only used for ordering at construction time; afterwards variants are
    /// referenced purely by their position in the sorted list.
    pub num: u32,
    /// Reliability bounds.
    pub reliability: Interval,
    /// Monetary cost.
    pub cost: u64,
}

impl Component {
    /// Creates a new component.
    #[must_use]
    pub const fn new(num: u32, reliability: Interval, cost: u64) -> Self {
        Self {
            num,
            reliability,
            cost,
        }
    }

    /// Draws a random component within the reliability and cost ranges of
    /// `params`.
    ///
    /// The lower reliability bound is uniform in `[minrel, maxrel]` and the
    /// upper bound is uniform in `[lower, maxrel]`, so `lower <= upper`
    /// always holds. The historical generator drew the upper bound from an
    /// undefined variable; this range replaces that draw.
    pub fn generate<R: Rng + ?Sized>(num: u32, params: &GenerationParams, rng: &mut R) -> Self {
        let (min_rel, max_rel) = ordered(params.min_rel, params.max_rel);
        let lower = rng.gen_range(min_rel..=max_rel);
        let upper = rng.gen_range(lower..=max_rel);
        let (min_cost, max_cost) = ordered(params.min_cost, params.max_cost);
        let cost = rng.gen_range(min_cost..=max_cost);

        Self::new(num, Interval::new(lower, upper), cost)
    }
}

fn ordered<T: PartialOrd>(a: T, b: T) -> (T, T) {
    if a <= b { (a, b) } else { (b, a) }
}
