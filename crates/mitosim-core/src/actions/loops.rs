//! Loop layout actions (single- and two-layer random arrays) and the harmonic
//! loop-anchor bonds.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::params_to_toml;
use crate::core::loops::{self, LoopSpan, random};
use crate::core::state::{StateKey, StateValue};
use crate::engine::action::{Action, StateView, StateWrites};
use crate::engine::error::PipelineError;
use crate::engine::sim::{ForceDescriptor, SimulationEngine};

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SingleLayerLoopsParams {
    pub loop_size: f64,
    /// Shape of the loop-size distribution; `1` selects the exponential array.
    pub gamma_k: f64,
    pub loop_spacing: usize,
    pub min_loop_size: usize,
    /// Restrict loop generation to these chains (indices into the shared
    /// `chains`); all chains when omitted.
    pub chain_indices: Option<Vec<usize>>,
    pub seed: Option<u64>,
}

impl Default for SingleLayerLoopsParams {
    fn default() -> Self {
        Self {
            loop_size: 400.0,
            gamma_k: 1.0,
            loop_spacing: 1,
            min_loop_size: 3,
            chain_indices: None,
            seed: None,
        }
    }
}

/// Tiles each chain with a random single-layer loop array and publishes the
/// loops plus the resulting backbone.
#[derive(Debug, Default)]
pub struct SingleLayerLoops {
    params: SingleLayerLoopsParams,
}

impl SingleLayerLoops {
    pub fn new(params: SingleLayerLoopsParams) -> Self {
        Self { params }
    }
}

impl Action for SingleLayerLoops {
    fn name(&self) -> &str {
        "single_layer_loops"
    }

    fn reads(&self) -> &'static [StateKey] {
        &[StateKey::N, StateKey::Chains]
    }

    fn writes(&self) -> &'static [StateKey] {
        &[StateKey::Loops, StateKey::Backbone]
    }

    fn params(&self) -> toml::Value {
        params_to_toml(&self.params)
    }

    fn configure(&mut self, state: &StateView<'_>) -> Result<StateWrites, PipelineError> {
        let n = state.count()?;
        let all_chains = state.chains()?;
        let chains: Vec<_> = match &self.params.chain_indices {
            Some(indices) => {
                let mut picked = Vec::with_capacity(indices.len());
                for &i in indices {
                    let span = all_chains.get(i).ok_or_else(|| {
                        PipelineError::configuration(
                            self.name(),
                            format!("chain index {i} out of range ({} chains)", all_chains.len()),
                        )
                    })?;
                    picked.push(*span);
                }
                picked
            }
            None => all_chains.to_vec(),
        };

        let mut rng = rng_for(self.params.seed);
        let mut all_loops = Vec::new();
        for chain in chains {
            let end = chain.resolve_end(n);
            let chain_len = end - chain.start;
            let generated = if self.params.gamma_k == 1.0 {
                random::exponential_loop_array(
                    chain_len,
                    self.params.loop_size,
                    self.params.loop_spacing,
                    &mut rng,
                )
            } else {
                random::gamma_loop_array(
                    chain_len,
                    self.params.loop_size,
                    self.params.gamma_k,
                    self.params.loop_spacing,
                    self.params.min_loop_size,
                    &mut rng,
                )
            }
            .map_err(|e| PipelineError::loops(self.name(), e))?;
            all_loops.extend(generated.into_iter().map(|lp| lp.shifted(chain.start)));
        }
        all_loops.sort();

        let backbone = loops::backbone_indices(&all_loops, n)
            .map_err(|e| PipelineError::loops(self.name(), e))?;
        Ok(vec![
            (StateKey::Loops, StateValue::Loops(all_loops)),
            (StateKey::Backbone, StateValue::Indices(backbone)),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TwoLayerLoopsParams {
    pub inner_loop_size: f64,
    pub outer_loop_size: f64,
    pub inner_loop_spacing: usize,
    pub outer_loop_spacing: usize,
    pub outer_inner_offset: usize,
    pub inner_gamma_k: f64,
    pub outer_gamma_k: f64,
    pub seed: Option<u64>,
}

impl Default for TwoLayerLoopsParams {
    fn default() -> Self {
        Self {
            inner_loop_size: 400.0,
            outer_loop_size: 400.0 * 4.0,
            inner_loop_spacing: 1,
            outer_loop_spacing: 1,
            outer_inner_offset: 1,
            inner_gamma_k: 1.0,
            outer_gamma_k: 1.0,
            seed: None,
        }
    }
}

/// Nested two-layer loop array; the backbone is derived from the outer layer
/// alone. The generated layers are kept on the action for the resolved record.
#[derive(Debug, Default)]
pub struct TwoLayerLoops {
    params: TwoLayerLoopsParams,
    outer: Vec<LoopSpan>,
    inner: Vec<LoopSpan>,
}

impl TwoLayerLoops {
    pub fn new(params: TwoLayerLoopsParams) -> Self {
        Self {
            params,
            outer: Vec::new(),
            inner: Vec::new(),
        }
    }

    pub fn outer(&self) -> &[LoopSpan] {
        &self.outer
    }

    pub fn inner(&self) -> &[LoopSpan] {
        &self.inner
    }
}

impl Action for TwoLayerLoops {
    fn name(&self) -> &str {
        "two_layer_loops"
    }

    fn reads(&self) -> &'static [StateKey] {
        &[StateKey::N]
    }

    fn writes(&self) -> &'static [StateKey] {
        &[StateKey::Loops, StateKey::Backbone]
    }

    fn params(&self) -> toml::Value {
        params_to_toml(&self.params)
    }

    fn configure(&mut self, state: &StateView<'_>) -> Result<StateWrites, PipelineError> {
        let n = state.count()?;
        let mut rng = rng_for(self.params.seed);
        let (outer, inner) = random::two_layer_gamma_loop_array(
            n,
            self.params.outer_loop_size,
            self.params.outer_gamma_k,
            self.params.outer_loop_spacing,
            self.params.inner_loop_size,
            self.params.inner_gamma_k,
            self.params.inner_loop_spacing,
            self.params.outer_inner_offset,
            &mut rng,
        )
        .map_err(|e| PipelineError::loops(self.name(), e))?;

        let backbone = loops::backbone_indices(&outer, n)
            .map_err(|e| PipelineError::loops(self.name(), e))?;

        let mut all_loops: Vec<LoopSpan> =
            outer.iter().chain(inner.iter()).copied().collect();
        all_loops.sort();
        self.outer = outer;
        self.inner = inner;

        Ok(vec![
            (StateKey::Loops, StateValue::Loops(all_loops)),
            (StateKey::Backbone, StateValue::Indices(backbone)),
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AddLoopsParams {
    pub wiggle_dist: f64,
    pub bond_length: f64,
}

impl Default for AddLoopsParams {
    fn default() -> Self {
        Self {
            wiggle_dist: 0.05,
            bond_length: 1.0,
        }
    }
}

/// Bonds every loop's anchors with a harmonic spring.
#[derive(Debug, Default)]
pub struct AddLoops {
    params: AddLoopsParams,
}

impl AddLoops {
    pub fn new(params: AddLoopsParams) -> Self {
        Self { params }
    }
}

impl Action for AddLoops {
    fn name(&self) -> &str {
        "add_loops"
    }

    fn reads(&self) -> &'static [StateKey] {
        &[StateKey::Loops]
    }

    fn params(&self) -> toml::Value {
        params_to_toml(&self.params)
    }

    fn attach(
        &mut self,
        engine: &mut dyn SimulationEngine,
        state: &StateView<'_>,
    ) -> Result<(), PipelineError> {
        let bonds: Vec<(usize, usize)> = state
            .loops()?
            .iter()
            .map(|lp| (lp.start, lp.end))
            .collect();
        let bond_lengths = vec![self.params.bond_length; bonds.len()];
        engine.add_force(ForceDescriptor::HarmonicBonds {
            bonds,
            bond_lengths,
            wiggle_dist: self.params.wiggle_dist,
            name: "loop_harmonic_bonds".to_string(),
        })?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RootLoopSeparatorParams {
    pub wiggle_dist: f64,
}

impl Default for RootLoopSeparatorParams {
    fn default() -> Self {
        Self { wiggle_dist: 0.1 }
    }
}

/// Bonds the spacer between consecutive root loops at its genomic length,
/// keeping the inter-loop backbone stretches from collapsing.
#[derive(Debug, Default)]
pub struct RootLoopSeparator {
    params: RootLoopSeparatorParams,
}

impl RootLoopSeparator {
    pub fn new(params: RootLoopSeparatorParams) -> Self {
        Self { params }
    }
}

impl Action for RootLoopSeparator {
    fn name(&self) -> &str {
        "root_loop_separator"
    }

    fn reads(&self) -> &'static [StateKey] {
        &[StateKey::Loops]
    }

    fn params(&self) -> toml::Value {
        params_to_toml(&self.params)
    }

    fn attach(
        &mut self,
        engine: &mut dyn SimulationEngine,
        state: &StateView<'_>,
    ) -> Result<(), PipelineError> {
        let all_loops = state.loops()?;
        let mut roots: Vec<LoopSpan> = loops::root_loops(all_loops)
            .into_iter()
            .map(|i| all_loops[i])
            .collect();
        roots.sort();

        let mut bonds = Vec::new();
        let mut bond_lengths = Vec::new();
        for pair in roots.windows(2) {
            if pair[1].start < pair[0].end {
                return Err(PipelineError::loops(
                    self.name(),
                    loops::LoopError::OverlappingRoots(
                        pair[0].start,
                        pair[0].end,
                        pair[1].start,
                        pair[1].end,
                    ),
                ));
            }
            bonds.push((pair[0].end, pair[1].start));
            bond_lengths.push((pair[1].start - pair[0].end) as f64);
        }
        engine.add_force(ForceDescriptor::HarmonicBonds {
            bonds,
            bond_lengths,
            wiggle_dist: self.params.wiggle_dist,
            name: "root_loop_spacers".to_string(),
        })?;
        Ok(())
    }
}
