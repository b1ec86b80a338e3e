//! Chain layout and connectivity: publishes the chain spans and attaches the
//! polymer connectivity force.

use serde::{Deserialize, Serialize};

use super::params_to_toml;
use crate::core::loops::ChainSpan;
use crate::core::state::{StateKey, StateValue};
use crate::engine::action::{Action, StateView, StateWrites};
use crate::engine::error::PipelineError;
use crate::engine::sim::{ForceDescriptor, SimulationEngine, TypePairAttraction};

pub const CHAIN_FORCE_NAME: &str = "polymer_chains";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AddChainsParams {
    /// Explicit chain spans. When omitted, `chain-lengths` or a single chain
    /// covering all particles is used.
    pub chains: Option<Vec<ChainSpan>>,
    /// Contiguous chain lengths, converted to spans by cumulative sum.
    pub chain_lengths: Option<Vec<usize>>,
    pub bond_length: f64,
    pub wiggle_dist: f64,
    pub repulsion_energy: f64,
    /// Type-pair attraction well depths, indexed by the shared particle types.
    /// Requires `attraction-radius` and an earlier type-assigning action.
    pub attraction_energies: Option<Vec<Vec<f64>>>,
    pub attraction_radius: Option<f64>,
}

impl Default for AddChainsParams {
    fn default() -> Self {
        Self {
            chains: None,
            chain_lengths: None,
            bond_length: 1.0,
            wiggle_dist: 0.025,
            repulsion_energy: 2.5,
            attraction_energies: None,
            attraction_radius: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct AddChains {
    params: AddChainsParams,
}

impl AddChains {
    pub fn new(params: AddChainsParams) -> Self {
        Self { params }
    }

    fn resolve_spans(&self) -> Result<Vec<ChainSpan>, PipelineError> {
        if self.params.chains.is_some() && self.params.chain_lengths.is_some() {
            return Err(PipelineError::configuration(
                self.name(),
                "specify either `chains` or `chain-lengths`, not both",
            ));
        }
        if let Some(chains) = &self.params.chains {
            return Ok(chains.clone());
        }
        if let Some(lengths) = &self.params.chain_lengths {
            let mut spans = Vec::with_capacity(lengths.len());
            let mut edge = 0;
            for &len in lengths {
                spans.push(ChainSpan::new(edge, Some(edge + len), false));
                edge += len;
            }
            return Ok(spans);
        }
        // Single chain over the whole system; the open end resolves against N.
        Ok(vec![ChainSpan::new(0, None, false)])
    }
}

impl Action for AddChains {
    fn name(&self) -> &str {
        "add_chains"
    }

    fn reads(&self) -> &'static [StateKey] {
        if self.params.attraction_energies.is_some() {
            &[StateKey::N, StateKey::Chains, StateKey::ParticleTypes]
        } else {
            &[StateKey::N, StateKey::Chains]
        }
    }

    fn writes(&self) -> &'static [StateKey] {
        &[StateKey::Chains]
    }

    fn params(&self) -> toml::Value {
        params_to_toml(&self.params)
    }

    fn configure(&mut self, _state: &StateView<'_>) -> Result<StateWrites, PipelineError> {
        if self.params.attraction_energies.is_some() != self.params.attraction_radius.is_some() {
            return Err(PipelineError::configuration(
                self.name(),
                "`attraction-energies` and `attraction-radius` must be given together",
            ));
        }
        if let Some(energies) = &self.params.attraction_energies {
            let n_types = energies.len();
            if n_types == 0 || energies.iter().any(|row| row.len() != n_types) {
                return Err(PipelineError::configuration(
                    self.name(),
                    "`attraction-energies` must be a non-empty square type-pair matrix",
                ));
            }
        }
        let spans = self.resolve_spans()?;
        Ok(vec![(StateKey::Chains, StateValue::Chains(spans))])
    }

    fn attach(
        &mut self,
        engine: &mut dyn SimulationEngine,
        state: &StateView<'_>,
    ) -> Result<(), PipelineError> {
        let n = state.count()?;
        let chains = state
            .chains()?
            .iter()
            .map(|span| (span.start, span.resolve_end(n), span.is_ring))
            .collect();

        let attraction = match &self.params.attraction_energies {
            None => None,
            Some(energies) => {
                let types = state.particle_types()?;
                let highest = types.iter().copied().max().unwrap_or(0) as usize;
                if highest >= energies.len() {
                    return Err(PipelineError::configuration(
                        self.name(),
                        format!(
                            "attraction matrix covers {} types but the shared types reach {}",
                            energies.len(),
                            highest
                        ),
                    ));
                }
                let radius = self.params.attraction_radius.ok_or_else(|| {
                    PipelineError::configuration(
                        self.name(),
                        "`attraction-energies` requires `attraction-radius`",
                    )
                })?;
                Some(TypePairAttraction {
                    particle_types: types.to_vec(),
                    energies: energies.clone(),
                    radius,
                })
            }
        };

        engine.add_force(ForceDescriptor::PolymerChains {
            chains,
            bond_length: self.params.bond_length,
            wiggle_dist: self.params.wiggle_dist,
            repulsion_energy: self.params.repulsion_energy,
            attraction,
            name: CHAIN_FORCE_NAME.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::heteropolymer::RandomBlockParticleTypesParams;
    use crate::actions::{InitializeSimulation, RandomBlockParticleTypes};
    use crate::engine::pipeline::Pipeline;
    use crate::engine::sim::NullEngine;

    #[test]
    fn chain_lengths_become_contiguous_spans() {
        let chains = AddChains::new(AddChainsParams {
            chain_lengths: Some(vec![100, 50, 25]),
            ..Default::default()
        })
        .resolve_spans()
        .unwrap();
        assert_eq!(
            chains,
            vec![
                ChainSpan::new(0, Some(100), false),
                ChainSpan::new(100, Some(150), false),
                ChainSpan::new(150, Some(175), false),
            ]
        );
    }

    #[test]
    fn conflicting_chain_specifications_are_rejected() {
        let action = AddChains::new(AddChainsParams {
            chains: Some(vec![ChainSpan::new(0, Some(10), false)]),
            chain_lengths: Some(vec![10]),
            ..Default::default()
        });
        assert!(action.resolve_spans().is_err());
    }

    #[test]
    fn attach_resolves_the_open_end_against_n() {
        let mut pipeline = Pipeline::new();
        pipeline.add_action(InitializeSimulation::with_count(500));
        pipeline.add_action(AddChains::default());
        pipeline.configure().unwrap();

        let mut engine = NullEngine::new();
        pipeline.attach_to_engine(&mut engine).unwrap();
        match &engine.forces()[0] {
            ForceDescriptor::PolymerChains { chains, .. } => {
                assert_eq!(chains, &vec![(0, 500, false)]);
            }
            other => panic!("unexpected force: {other:?}"),
        }
    }

    fn attraction_params(energies: Vec<Vec<f64>>) -> AddChainsParams {
        AddChainsParams {
            attraction_energies: Some(energies),
            attraction_radius: Some(1.5),
            ..Default::default()
        }
    }

    #[test]
    fn typed_attraction_rides_on_the_chain_force() {
        let mut pipeline = Pipeline::new();
        pipeline.add_action(InitializeSimulation::with_count(1_000));
        pipeline.add_action(RandomBlockParticleTypes::new(
            RandomBlockParticleTypesParams {
                avg_block_lens: vec![3, 3],
                seed: Some(41),
            },
        ));
        pipeline.add_action(AddChains::new(attraction_params(vec![
            vec![0.0, 0.0],
            vec![0.0, 0.5],
        ])));
        pipeline.configure().unwrap();

        let mut engine = NullEngine::new();
        pipeline.attach_to_engine(&mut engine).unwrap();
        match &engine.forces()[0] {
            ForceDescriptor::PolymerChains {
                attraction: Some(attraction),
                ..
            } => {
                assert_eq!(attraction.particle_types.len(), 1_000);
                assert_eq!(attraction.energies[1][1], 0.5);
                assert_eq!(attraction.radius, 1.5);
            }
            other => panic!("unexpected force: {other:?}"),
        }
    }

    #[test]
    fn attraction_requires_shared_particle_types() {
        let mut pipeline = Pipeline::new();
        pipeline.add_action(InitializeSimulation::with_count(100));
        pipeline.add_action(AddChains::new(attraction_params(vec![vec![0.5]])));
        pipeline.configure().unwrap();

        let mut engine = NullEngine::new();
        let err = pipeline.attach_to_engine(&mut engine).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingKey {
                key: StateKey::ParticleTypes,
                ..
            }
        ));
    }

    #[test]
    fn undersized_attraction_matrix_is_rejected() {
        let mut pipeline = Pipeline::new();
        pipeline.add_action(InitializeSimulation::with_count(1_000));
        pipeline.add_action(RandomBlockParticleTypes::new(
            RandomBlockParticleTypesParams {
                avg_block_lens: vec![2, 2],
                seed: Some(8),
            },
        ));
        // Two types in the shared state, but a one-type matrix.
        pipeline.add_action(AddChains::new(attraction_params(vec![vec![0.5]])));
        pipeline.configure().unwrap();

        let mut engine = NullEngine::new();
        let err = pipeline.attach_to_engine(&mut engine).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
    }

    #[test]
    fn attraction_energies_without_a_radius_fail_configuration() {
        let mut pipeline = Pipeline::new();
        pipeline.add_action(InitializeSimulation::with_count(100));
        pipeline.add_action(AddChains::new(AddChainsParams {
            attraction_energies: Some(vec![vec![0.5]]),
            ..Default::default()
        }));
        let err = pipeline.configure().unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
    }
}
