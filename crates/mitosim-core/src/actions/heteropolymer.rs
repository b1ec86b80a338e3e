//! Heteropolymer type assignment.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Geometric};
use serde::{Deserialize, Serialize};

use super::params_to_toml;
use crate::core::state::{StateKey, StateValue};
use crate::engine::action::{Action, StateView, StateWrites};
use crate::engine::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RandomBlockParticleTypesParams {
    /// Mean block length per type; the types cycle in order along the chain.
    pub avg_block_lens: Vec<usize>,
    pub seed: Option<u64>,
}

impl Default for RandomBlockParticleTypesParams {
    fn default() -> Self {
        Self {
            avg_block_lens: vec![2, 2],
            seed: None,
        }
    }
}

/// Assigns particle types in alternating blocks of geometrically distributed
/// length, one mean length per type.
#[derive(Debug, Default)]
pub struct RandomBlockParticleTypes {
    params: RandomBlockParticleTypesParams,
}

impl RandomBlockParticleTypes {
    pub fn new(params: RandomBlockParticleTypesParams) -> Self {
        Self { params }
    }
}

impl Action for RandomBlockParticleTypes {
    fn name(&self) -> &str {
        "random_block_particle_types"
    }

    fn reads(&self) -> &'static [StateKey] {
        &[StateKey::N]
    }

    fn writes(&self) -> &'static [StateKey] {
        &[StateKey::ParticleTypes]
    }

    fn params(&self) -> toml::Value {
        params_to_toml(&self.params)
    }

    fn configure(&mut self, state: &StateView<'_>) -> Result<StateWrites, PipelineError> {
        let n = state.count()?;
        let lens = &self.params.avg_block_lens;
        if lens.is_empty() || lens.iter().any(|&l| l == 0) {
            return Err(PipelineError::configuration(
                self.name(),
                "avg-block-lens must be a non-empty list of positive lengths",
            ));
        }
        if lens.len() > usize::from(u8::MAX) + 1 {
            return Err(PipelineError::configuration(
                self.name(),
                format!("at most 256 particle types are supported, got {}", lens.len()),
            ));
        }

        let mut rng = match self.params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let dists: Vec<Geometric> = lens
            .iter()
            .map(|&len| {
                Geometric::new(1.0 / len as f64).map_err(|e| {
                    PipelineError::configuration(self.name(), e.to_string())
                })
            })
            .collect::<Result<_, _>>()?;

        let mut types = vec![0u8; n];
        let mut pos = 0;
        let mut t = 0;
        while pos < n {
            // The geometric sample counts failures; +1 makes the block mean
            // equal to the configured length.
            let block = dists[t].sample(&mut rng) as usize + 1;
            let end = (pos + block).min(n);
            for slot in &mut types[pos..end] {
                *slot = t as u8;
            }
            t = (t + 1) % dists.len();
            pos = end;
        }

        Ok(vec![(
            StateKey::ParticleTypes,
            StateValue::ParticleTypes(types),
        )])
    }
}
