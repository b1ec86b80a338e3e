//! Initial conformation actions: the helical loop-brush generator and the
//! action that commits coordinates to the engine.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::params_to_toml;
use crate::core::conformation::{self, HelixConstraints};
use crate::core::state::{StateKey, StateValue};
use crate::engine::action::{Action, StateView, StateWrites};
use crate::engine::error::PipelineError;
use crate::engine::sim::SimulationEngine;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HelicalLoopBrushParams {
    #[serde(flatten)]
    pub helix: HelixConstraints,
    pub random_loop_orientations: bool,
    pub seed: Option<u64>,
}

impl Default for HelicalLoopBrushParams {
    fn default() -> Self {
        Self {
            helix: HelixConstraints::default(),
            random_loop_orientations: true,
            seed: None,
        }
    }
}

/// Solves the helix constraints against the relation `t² = s² + (2πr)²` and
/// synthesizes the loop-brush coordinates. The solved `(radius, step)` pair is
/// written back into the parameter record, so the resolved configuration
/// carries the completed geometry.
#[derive(Debug, Default)]
pub struct HelicalLoopBrushConformation {
    params: HelicalLoopBrushParams,
}

impl HelicalLoopBrushConformation {
    pub fn new(params: HelicalLoopBrushParams) -> Self {
        Self { params }
    }
}

impl Action for HelicalLoopBrushConformation {
    fn name(&self) -> &str {
        "helical_loop_brush_conformation"
    }

    fn reads(&self) -> &'static [StateKey] {
        &[StateKey::N, StateKey::Loops]
    }

    fn writes(&self) -> &'static [StateKey] {
        &[StateKey::InitialConformation]
    }

    fn params(&self) -> toml::Value {
        params_to_toml(&self.params)
    }

    fn configure(&mut self, state: &StateView<'_>) -> Result<StateWrites, PipelineError> {
        let helix = self
            .params
            .helix
            .solve()
            .map_err(|e| PipelineError::conformation(self.name(), e))?;
        self.params.helix.radius = Some(helix.radius);
        self.params.helix.step = Some(helix.step);

        let n = state.count()?;
        let loops = state.loops()?;
        let mut rng = match self.params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let coords = conformation::make_helical_loopbrush(
            n,
            helix,
            loops,
            self.params.random_loop_orientations,
            &mut rng,
        )
        .map_err(|e| PipelineError::loops(self.name(), e))?;

        Ok(vec![(
            StateKey::InitialConformation,
            StateValue::Conformation(coords),
        )])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct UniformHelicalLoopBrushParams {
    pub radius: Option<f64>,
    pub step: Option<f64>,
    pub axial_compression: Option<f64>,
    /// Backbone particles per helical turn; derived from the bond length when
    /// omitted.
    pub period_particles: Option<f64>,
    pub chain_bond_length: f64,
    pub seed: Option<u64>,
}

impl Default for UniformHelicalLoopBrushParams {
    fn default() -> Self {
        Self {
            radius: None,
            step: None,
            axial_compression: None,
            period_particles: None,
            chain_bond_length: 1.0,
            seed: None,
        }
    }
}

/// The uniform loop-brush: the backbone advances by one fixed helical phase per
/// particle and loops fold as bridged random walks. Takes zero or two of the
/// three helix parameters (radius, step, axial compression); the turn length is
/// always derived.
#[derive(Debug, Default)]
pub struct UniformHelicalLoopBrushConformation {
    params: UniformHelicalLoopBrushParams,
}

impl UniformHelicalLoopBrushConformation {
    pub fn new(params: UniformHelicalLoopBrushParams) -> Self {
        Self { params }
    }
}

impl Action for UniformHelicalLoopBrushConformation {
    fn name(&self) -> &str {
        "uniform_helical_loop_brush_conformation"
    }

    fn reads(&self) -> &'static [StateKey] {
        &[StateKey::N, StateKey::Loops]
    }

    fn writes(&self) -> &'static [StateKey] {
        &[StateKey::InitialConformation]
    }

    fn params(&self) -> toml::Value {
        params_to_toml(&self.params)
    }

    fn configure(&mut self, state: &StateView<'_>) -> Result<StateWrites, PipelineError> {
        let given = [
            self.params.radius,
            self.params.step,
            self.params.axial_compression,
        ]
        .iter()
        .filter(|p| p.is_some())
        .count();
        if given != 0 && given != 2 {
            return Err(PipelineError::configuration(
                self.name(),
                format!(
                    "specify 0 or 2 of the three helix parameters \
                     (radius, step, axial-compression), got {given}"
                ),
            ));
        }
        let helix = HelixConstraints {
            radius: self.params.radius,
            turn_length: None,
            step: self.params.step,
            axial_compression: self.params.axial_compression,
        }
        .solve()
        .map_err(|e| PipelineError::conformation(self.name(), e))?;
        self.params.radius = Some(helix.radius);
        self.params.step = Some(helix.step);

        let n = state.count()?;
        let loops = state.loops()?;
        let mut rng = match self.params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let coords = conformation::make_uniform_helical_loopbrush(
            n,
            helix,
            self.params.period_particles,
            loops,
            self.params.chain_bond_length,
            &mut rng,
        )
        .map_err(|e| PipelineError::loops(self.name(), e))?;

        Ok(vec![(
            StateKey::InitialConformation,
            StateValue::Conformation(coords),
        )])
    }
}

/// Commits the shared initial conformation to the engine.
#[derive(Debug, Default)]
pub struct SetInitialConformation;

impl Action for SetInitialConformation {
    fn name(&self) -> &str {
        "set_initial_conformation"
    }

    fn reads(&self) -> &'static [StateKey] {
        &[StateKey::InitialConformation]
    }

    fn attach(
        &mut self,
        engine: &mut dyn SimulationEngine,
        state: &StateView<'_>,
    ) -> Result<(), PipelineError> {
        engine.set_initial_positions(state.conformation()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{AddChains, InitializeSimulation, SingleLayerLoops};
    use crate::actions::loops::SingleLayerLoopsParams;
    use crate::engine::pipeline::Pipeline;
    use crate::engine::sim::NullEngine;

    fn loop_brush_pipeline(params: HelicalLoopBrushParams) -> Pipeline {
        let mut pipeline = Pipeline::new();
        pipeline.add_action(InitializeSimulation::with_count(5_000));
        pipeline.add_action(AddChains::default());
        pipeline.add_action(SingleLayerLoops::new(SingleLayerLoopsParams {
            seed: Some(23),
            ..Default::default()
        }));
        pipeline.add_action(HelicalLoopBrushConformation::new(params));
        pipeline.add_action(SetInitialConformation);
        pipeline
    }

    #[test]
    fn conformation_covers_every_particle() {
        let mut pipeline = loop_brush_pipeline(HelicalLoopBrushParams {
            seed: Some(1),
            ..Default::default()
        });
        pipeline.configure().unwrap();
        assert_eq!(
            pipeline.shared_state().conformation().unwrap().len(),
            5_000
        );
    }

    #[test]
    fn impossible_helix_geometry_fails_configuration() {
        let mut pipeline = loop_brush_pipeline(HelicalLoopBrushParams {
            helix: HelixConstraints {
                turn_length: Some(100.0),
                step: Some(500.0),
                ..Default::default()
            },
            ..Default::default()
        });
        let err = pipeline.configure().unwrap_err();
        assert!(matches!(err, PipelineError::Conformation { .. }));
    }

    #[test]
    fn solved_geometry_lands_in_the_resolved_params() {
        let mut pipeline = loop_brush_pipeline(HelicalLoopBrushParams {
            helix: HelixConstraints {
                turn_length: Some(500.0),
                step: Some(100.0),
                ..Default::default()
            },
            seed: Some(2),
            ..Default::default()
        });
        pipeline.configure().unwrap();
        let resolved = pipeline.resolved().unwrap();
        let record = resolved
            .actions
            .iter()
            .find(|r| r.name == "helical_loop_brush_conformation")
            .unwrap();
        let radius = record
            .params
            .as_table()
            .and_then(|t| t.get("radius"))
            .and_then(|v| v.as_float())
            .unwrap();
        assert!((radius - 77.97).abs() < 0.01);
    }

    fn uniform_brush_pipeline(params: UniformHelicalLoopBrushParams) -> Pipeline {
        let mut pipeline = Pipeline::new();
        pipeline.add_action(InitializeSimulation::with_count(5_000));
        pipeline.add_action(AddChains::default());
        pipeline.add_action(SingleLayerLoops::new(SingleLayerLoopsParams {
            seed: Some(23),
            ..Default::default()
        }));
        pipeline.add_action(UniformHelicalLoopBrushConformation::new(params));
        pipeline
    }

    #[test]
    fn uniform_brush_covers_every_particle_and_solves_the_step() {
        let mut pipeline = uniform_brush_pipeline(UniformHelicalLoopBrushParams {
            radius: Some(10.0),
            axial_compression: Some(4.0),
            seed: Some(7),
            ..Default::default()
        });
        pipeline.configure().unwrap();
        assert_eq!(
            pipeline.shared_state().conformation().unwrap().len(),
            5_000
        );

        let resolved = pipeline.resolved().unwrap();
        let record = resolved
            .actions
            .iter()
            .find(|r| r.name == "uniform_helical_loop_brush_conformation")
            .unwrap();
        let step = record
            .params
            .as_table()
            .and_then(|t| t.get("step"))
            .and_then(|v| v.as_float())
            .unwrap();
        // step = 2πr / sqrt(a² - 1) for r = 10, a = 4.
        assert!((step - 16.223).abs() < 0.01);
    }

    #[test]
    fn uniform_brush_rejects_a_lone_helix_parameter() {
        let mut pipeline = uniform_brush_pipeline(UniformHelicalLoopBrushParams {
            radius: Some(10.0),
            ..Default::default()
        });
        let err = pipeline.configure().unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
    }

    #[test]
    fn seeded_uniform_brush_is_reproducible() {
        let build = || {
            let mut pipeline = uniform_brush_pipeline(UniformHelicalLoopBrushParams {
                radius: Some(10.0),
                step: Some(20.0),
                seed: Some(19),
                ..Default::default()
            });
            pipeline.configure().unwrap();
            pipeline.shared_state().conformation().unwrap().to_vec()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn attach_pushes_the_coordinates_into_the_engine() {
        let mut pipeline = loop_brush_pipeline(HelicalLoopBrushParams {
            seed: Some(3),
            ..Default::default()
        });
        pipeline.configure().unwrap();
        let mut engine = NullEngine::new();
        pipeline.attach_to_engine(&mut engine).unwrap();
        assert_eq!(engine.positions().len(), 5_000);
    }
}
