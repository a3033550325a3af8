//! Clip sampling without replacement.

use rand::seq::index;
use rand::Rng;

use super::errors::{PlanError, PlanResult};

/// Draw `count` distinct clips uniformly at random.
///
/// The returned order is the concatenation order.
pub fn sample_clips<R: Rng + ?Sized>(
    clips: &[String],
    count: usize,
    rng: &mut R,
) -> PlanResult<Vec<String>> {
    if count > clips.len() {
        return Err(PlanError::InsufficientClips {
            available: clips.len(),
            required: count,
        });
    }

    Ok(index::sample(rng, clips.len(), count)
        .into_iter()
        .map(|i| clips[i].clone())
        .collect())
}
