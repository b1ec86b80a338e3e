//! Simulation initialization: seeds the particle count into the shared state
//! and commits the engine settings during attachment.

use serde::{Deserialize, Serialize};

use super::params_to_toml;
use crate::engine::action::{Action, ParamBag, StateView, StateWrites};
use crate::engine::error::PipelineError;
use crate::engine::sim::{EngineSettings, Platform, SimulationEngine};
use crate::core::state::{StateKey, StateValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct InitializeSimulationParams {
    /// Total particle count. May be omitted when the overflow bag carries
    /// `n-loops` and `loop-size`, from which `N` is derived.
    pub n: Option<usize>,
    pub platform: Platform,
    pub error_tolerance: f64,
    pub collision_rate: f64,
    /// Overflow bag for caller-supplied fields beyond the typed record.
    #[serde(flatten)]
    pub extra: ParamBag,
}

impl Default for InitializeSimulationParams {
    fn default() -> Self {
        Self {
            n: None,
            platform: Platform::default(),
            error_tolerance: 0.001,
            collision_rate: 0.003,
            extra: ParamBag::new(),
        }
    }
}

#[derive(Debug)]
pub struct InitializeSimulation {
    params: InitializeSimulationParams,
}

impl InitializeSimulation {
    pub fn new(params: InitializeSimulationParams) -> Self {
        Self { params }
    }

    pub fn with_count(n: usize) -> Self {
        Self::new(InitializeSimulationParams {
            n: Some(n),
            ..Default::default()
        })
    }

    /// Resolves the particle count from the typed record, or derives it from
    /// the documented overflow-bag escape hatch (`n-loops` × `loop-size`).
    fn resolve_count(&self) -> Result<usize, PipelineError> {
        if let Some(n) = self.params.n {
            return Ok(n);
        }
        let derived = self
            .params
            .extra
            .get_usize("n-loops")
            .zip(self.params.extra.get_usize("loop-size"))
            .map(|(loops, size)| loops * size);
        derived.ok_or_else(|| {
            PipelineError::configuration(
                self.name(),
                "particle count not given: supply `n`, or `n-loops` and `loop-size`",
            )
        })
    }
}

impl Action for InitializeSimulation {
    fn name(&self) -> &str {
        "initialize_simulation"
    }

    fn reads(&self) -> &'static [StateKey] {
        &[StateKey::N]
    }

    fn writes(&self) -> &'static [StateKey] {
        &[StateKey::N]
    }

    fn params(&self) -> toml::Value {
        params_to_toml(&self.params)
    }

    fn configure(&mut self, _state: &StateView<'_>) -> Result<StateWrites, PipelineError> {
        let n = self.resolve_count()?;
        self.params.n = Some(n);
        Ok(vec![(StateKey::N, StateValue::Count(n))])
    }

    fn attach(
        &mut self,
        engine: &mut dyn SimulationEngine,
        state: &StateView<'_>,
    ) -> Result<(), PipelineError> {
        let settings = EngineSettings {
            particle_count: state.count()?,
            platform: self.params.platform,
            error_tolerance: self.params.error_tolerance,
            collision_rate: self.params.collision_rate,
        };
        engine.initialize(&settings)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::pipeline::Pipeline;
    use crate::engine::sim::NullEngine;

    #[test]
    fn explicit_count_is_seeded_into_the_shared_state() {
        let mut pipeline = Pipeline::new();
        pipeline.add_action(InitializeSimulation::with_count(20_000));
        pipeline.configure().unwrap();
        assert_eq!(pipeline.shared_state().count().unwrap(), 20_000);
    }

    #[test]
    fn count_is_derived_from_the_overflow_bag() {
        let mut params = InitializeSimulationParams::default();
        params.extra.insert("n-loops", toml::Value::Integer(50));
        params.extra.insert("loop-size", toml::Value::Integer(400));
        let mut pipeline = Pipeline::new();
        pipeline.add_action(InitializeSimulation::new(params));
        pipeline.configure().unwrap();
        assert_eq!(pipeline.shared_state().count().unwrap(), 20_000);
    }

    #[test]
    fn missing_count_is_a_configuration_error() {
        let mut pipeline = Pipeline::new();
        pipeline.add_action(InitializeSimulation::new(Default::default()));
        let err = pipeline.configure().unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
    }

    #[test]
    fn attach_commits_the_engine_settings() {
        let mut pipeline = Pipeline::new();
        pipeline.add_action(InitializeSimulation::with_count(128));
        pipeline.configure().unwrap();
        let mut engine = NullEngine::new();
        pipeline.attach_to_engine(&mut engine).unwrap();
        assert_eq!(engine.settings().unwrap().particle_count, 128);
    }

    #[test]
    fn solved_count_appears_in_the_resolved_params() {
        let mut params = InitializeSimulationParams::default();
        params.extra.insert("n-loops", toml::Value::Integer(10));
        params.extra.insert("loop-size", toml::Value::Integer(40));
        let mut pipeline = Pipeline::new();
        pipeline.add_action(InitializeSimulation::new(params));
        pipeline.configure().unwrap();
        let resolved = pipeline.resolved().unwrap();
        let table = resolved.actions[0].params.as_table().unwrap();
        assert_eq!(table.get("n").and_then(|v| v.as_integer()), Some(400));
    }
}
