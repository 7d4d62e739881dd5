//! Core trait for neighbor generation.

use rand::Rng;

use super::temperature::Temperature;
use crate::assignment::Assignment;

/// Produces the next assignment of an annealing run.
///
/// An implementation generates a candidate from `current` and decides,
/// using `temperature`, whether to keep it. Returning a clone of `current`
/// means the candidate was rejected. The annealer only looks at the
/// objective of the returned value to drive its stagnation counter.
///
/// Implementations must keep the partition invariant: every job of
/// `current` appears exactly once in the result.
///
/// # Examples
///
/// ```
/// use rand::Rng;
/// use u_balance::Assignment;
/// use u_balance::sa::{Mutator, Temperature};
///
/// /// Never moves anything.
/// struct Frozen;
///
/// impl Mutator for Frozen {
///     fn mutate<R: Rng>(
///         &self,
///         current: &Assignment,
///         _t: &Temperature,
///         _rng: &mut R,
///     ) -> Assignment {
///         current.clone()
///     }
/// }
/// ```
pub trait Mutator {
    fn mutate<R: Rng>(
        &self,
        current: &Assignment,
        temperature: &Temperature,
        rng: &mut R,
    ) -> Assignment;
}
