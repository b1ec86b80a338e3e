//! Random loop-array generation: tandem arrays of loops with exponentially or
//! gamma-distributed sizes, and nested two-layer arrays.

use rand::Rng;
use rand_distr::{Distribution, Exp, Gamma};

use super::{LoopError, LoopSpan};

/// Tile `[0, length)` with loops whose sizes are exponentially distributed around
/// `mean_loop_size`, separated by `spacing` backbone particles.
pub fn exponential_loop_array(
    length: usize,
    mean_loop_size: f64,
    spacing: usize,
    rng: &mut impl Rng,
) -> Result<Vec<LoopSpan>, LoopError> {
    if mean_loop_size <= 1.0 {
        return Err(LoopError::InvalidParameter(format!(
            "mean loop size must exceed 1, got {mean_loop_size}"
        )));
    }
    let dist = Exp::new(1.0 / mean_loop_size)
        .map_err(|e| LoopError::InvalidParameter(e.to_string()))?;

    Ok(sample_array(length, spacing, 2, rng, |rng| dist.sample(rng)))
}

/// Like [`exponential_loop_array`], but sizes follow a gamma distribution with
/// shape `gamma_k` and mean `mean_loop_size`, truncated below at `min_loop_size`.
pub fn gamma_loop_array(
    length: usize,
    mean_loop_size: f64,
    gamma_k: f64,
    spacing: usize,
    min_loop_size: usize,
    rng: &mut impl Rng,
) -> Result<Vec<LoopSpan>, LoopError> {
    if mean_loop_size <= 1.0 {
        return Err(LoopError::InvalidParameter(format!(
            "mean loop size must exceed 1, got {mean_loop_size}"
        )));
    }
    let dist = Gamma::new(gamma_k, mean_loop_size / gamma_k)
        .map_err(|e| LoopError::InvalidParameter(e.to_string()))?;

    Ok(sample_array(length, spacing, min_loop_size.max(2), rng, |rng| {
        dist.sample(rng)
    }))
}

/// Nested two-layer array: an outer gamma array across the whole chain, with an
/// inner gamma array tiled inside each outer loop, offset from its anchors.
/// Returns `(outer, inner)`.
#[allow(clippy::too_many_arguments)]
pub fn two_layer_gamma_loop_array(
    length: usize,
    outer_loop_size: f64,
    outer_gamma_k: f64,
    outer_spacing: usize,
    inner_loop_size: f64,
    inner_gamma_k: f64,
    inner_spacing: usize,
    offset: usize,
    rng: &mut impl Rng,
) -> Result<(Vec<LoopSpan>, Vec<LoopSpan>), LoopError> {
    let outer = gamma_loop_array(
        length,
        outer_loop_size,
        outer_gamma_k,
        outer_spacing,
        2,
        rng,
    )?;

    let mut inner = Vec::new();
    for outer_loop in &outer {
        let lo = outer_loop.start + offset;
        let hi = outer_loop.end.saturating_sub(offset);
        if hi <= lo {
            continue;
        }
        let nested = gamma_loop_array(
            hi - lo,
            inner_loop_size,
            inner_gamma_k,
            inner_spacing,
            2,
            rng,
        )?;
        inner.extend(nested.into_iter().map(|lp| lp.shifted(lo)));
    }

    Ok((outer, inner))
}

fn sample_array<R: Rng>(
    length: usize,
    spacing: usize,
    min_size: usize,
    rng: &mut R,
    mut sample: impl FnMut(&mut R) -> f64,
) -> Vec<LoopSpan> {
    let mut loops = Vec::new();
    let mut cursor = spacing;
    loop {
        let size = (sample(rng).round() as usize).max(min_size);
        if cursor + size >= length {
            break;
        }
        loops.push(LoopSpan::new(cursor, cursor + size));
        cursor += size + spacing;
    }
    loops
}
