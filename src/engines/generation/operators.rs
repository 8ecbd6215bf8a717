use crate::config::MutationConfig;
use rand::Rng;

pub const MIN_STEPS: u32 = 1;
pub const MIN_GUIDANCE: f64 = 1.0;
pub const MIN_REFINE_STEPS: u32 = 1;

/// Which branch a mutation took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Seed replaced: large visual change.
    BigJump,
    /// Bounded deltas on the numeric parameters.
    Perturbation,
}

/// Single coin flip between the two branches.
pub fn choose_mutation<R: Rng + ?Sized>(config: &MutationConfig, rng: &mut R) -> MutationKind {
    if rng.gen::<f64>() < config.big_jump_probability {
        MutationKind::BigJump
    } else {
        MutationKind::Perturbation
    }
}

/// Fresh seed, uniform over the full u64 range.
pub fn reseed<R: Rng + ?Sized>(rng: &mut R) -> u64 {
    rng.gen()
}

/// Add a uniform delta in `[-max_delta, max_delta]` and clamp to `[floor, u32::MAX]`.
pub fn perturb_count<R: Rng + ?Sized>(value: u32, max_delta: u32, floor: u32, rng: &mut R) -> u32 {
    let delta = if max_delta == 0 {
        0
    } else {
        let max_delta = i64::from(max_delta);
        rng.gen_range(-max_delta..=max_delta)
    };
    (i64::from(value) + delta).clamp(i64::from(floor), i64::from(u32::MAX)) as u32
}

/// Add a uniform delta in `[-max_delta, max_delta]` and clamp to `floor`.
///
/// Non-finite inputs collapse to the floor.
pub fn perturb_scale<R: Rng + ?Sized>(value: f64, max_delta: f64, floor: f64, rng: &mut R) -> f64 {
    let delta = if max_delta > 0.0 && max_delta.is_finite() {
        rng.gen_range(-max_delta..=max_delta)
    } else {
        0.0
    };
    let mutated = value + delta;
    if mutated.is_finite() {
        mutated.max(floor)
    } else {
        floor
    }
}
