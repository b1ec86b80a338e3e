//! The action capability contract.
//!
//! An action is a polymorphic configuration unit with a fixed parameter record,
//! declared read/write sets over the shared state, and optional lifecycle hooks.
//! The orchestrator invokes each hook at a specific phase; actions must not
//! communicate through any channel other than the shared state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::PipelineError;
use super::sim::SimulationEngine;
use crate::core::loops::{ChainSpan, LoopSpan};
use crate::core::state::{SharedState, StateKey, StateValue};
use nalgebra::Point3;

/// Ordered key/value pairs returned from `configure`. The orchestrator asserts
/// the key set equals the action's declared write-set before merging.
pub type StateWrites = Vec<(StateKey, StateValue)>;

pub trait Action {
    /// Identity of this action instance, used in error messages and in the
    /// resolved-configuration record. Spawned actions may carry derived names.
    fn name(&self) -> &str;

    /// Shared-state keys this action is allowed to read during `configure`
    /// and `attach`.
    fn reads(&self) -> &'static [StateKey] {
        &[]
    }

    /// Shared-state keys this action must write from `configure`.
    fn writes(&self) -> &'static [StateKey] {
        &[]
    }

    /// The parameter record for the resolved-configuration snapshot, including
    /// any values the action solved for itself during `configure`.
    fn params(&self) -> toml::Value {
        toml::Value::Table(toml::value::Table::new())
    }

    /// Resolves this action's contribution to the shared state. Fails when the
    /// supplied parameters are mutually inconsistent.
    fn configure(&mut self, _state: &StateView<'_>) -> Result<StateWrites, PipelineError> {
        Ok(Vec::new())
    }

    /// Optionally replaces this action with an ordered list of sub-actions.
    /// Called once, immediately after `configure`; expansion of an action that
    /// was itself spawned by an expansion is rejected by the orchestrator.
    fn expand(&mut self) -> Option<Vec<Box<dyn Action>>> {
        None
    }

    /// Commits this action's physical effect to the engine.
    fn attach(
        &mut self,
        _engine: &mut dyn SimulationEngine,
        _state: &StateView<'_>,
    ) -> Result<(), PipelineError> {
        Ok(())
    }

    /// Called once per simulation block during the run-loop pass.
    fn step(
        &mut self,
        _engine: &mut dyn SimulationEngine,
        _block: usize,
    ) -> Result<(), PipelineError> {
        Ok(())
    }
}

impl std::fmt::Debug for dyn Action + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action").field("name", &self.name()).finish()
    }
}

/// A read guard over the shared state, scoped to one action's declared
/// read-set. Undeclared reads fail instead of silently coupling actions.
pub struct StateView<'a> {
    state: &'a SharedState,
    action: &'a str,
    allowed: &'static [StateKey],
}

impl<'a> StateView<'a> {
    pub(crate) fn new(state: &'a SharedState, action: &'a str, allowed: &'static [StateKey]) -> Self {
        Self {
            state,
            action,
            allowed,
        }
    }

    pub fn contains(&self, key: StateKey) -> bool {
        self.allowed.contains(&key) && self.state.contains(key)
    }

    pub fn read(&self, key: StateKey) -> Result<&'a StateValue, PipelineError> {
        if !self.allowed.contains(&key) {
            return Err(PipelineError::UndeclaredRead {
                action: self.action.to_string(),
                key,
            });
        }
        self.state.read(key).map_err(|_| PipelineError::MissingKey {
            action: self.action.to_string(),
            key,
        })
    }

    pub fn count(&self) -> Result<usize, PipelineError> {
        match self.read(StateKey::N)? {
            StateValue::Count(n) => Ok(*n),
            other => Err(self.internal(StateKey::N, other)),
        }
    }

    pub fn chains(&self) -> Result<&'a [ChainSpan], PipelineError> {
        match self.read(StateKey::Chains)? {
            StateValue::Chains(chains) => Ok(chains),
            other => Err(self.internal(StateKey::Chains, other)),
        }
    }

    pub fn loops(&self) -> Result<&'a [LoopSpan], PipelineError> {
        match self.read(StateKey::Loops)? {
            StateValue::Loops(loops) => Ok(loops),
            other => Err(self.internal(StateKey::Loops, other)),
        }
    }

    pub fn backbone(&self) -> Result<&'a [usize], PipelineError> {
        match self.read(StateKey::Backbone)? {
            StateValue::Indices(idxs) => Ok(idxs),
            other => Err(self.internal(StateKey::Backbone, other)),
        }
    }

    pub fn conformation(&self) -> Result<&'a [Point3<f64>], PipelineError> {
        match self.read(StateKey::InitialConformation)? {
            StateValue::Conformation(coords) => Ok(coords),
            other => Err(self.internal(StateKey::InitialConformation, other)),
        }
    }

    pub fn particle_types(&self) -> Result<&'a [u8], PipelineError> {
        match self.read(StateKey::ParticleTypes)? {
            StateValue::ParticleTypes(types) => Ok(types),
            other => Err(self.internal(StateKey::ParticleTypes, other)),
        }
    }

    fn internal(&self, key: StateKey, value: &StateValue) -> PipelineError {
        PipelineError::Internal(format!(
            "shared-state key '{key}' holds a {} value, which the store should have rejected",
            value.kind()
        ))
    }
}

/// The documented escape hatch for caller-supplied parameters beyond an
/// action's typed record. Unknown fields land here (via `serde(flatten)`) and
/// are preserved verbatim in the resolved configuration; actions consult the
/// bag only where explicitly documented, never by silent fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamBag(BTreeMap<String, toml::Value>);

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: toml::Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.0.get(key)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            toml::Value::Float(v) => Some(*v),
            toml::Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        match self.0.get(key)? {
            toml::Value::Integer(v) if *v >= 0 => Some(*v as usize),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undeclared_read_is_rejected_even_when_the_key_exists() {
        let mut state = SharedState::new();
        state.write(StateKey::N, StateValue::Count(5)).unwrap();
        let view = StateView::new(&state, "reader", &[StateKey::Loops]);
        let err = view.read(StateKey::N).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UndeclaredRead { key: StateKey::N, .. }
        ));
    }

    #[test]
    fn declared_read_of_absent_key_is_a_missing_key_error() {
        let state = SharedState::new();
        let view = StateView::new(&state, "reader", &[StateKey::Loops]);
        let err = view.loops().unwrap_err();
        match err {
            PipelineError::MissingKey { action, key } => {
                assert_eq!(action, "reader");
                assert_eq!(key, StateKey::Loops);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn param_bag_exposes_numeric_values_with_coercion() {
        let mut bag = ParamBag::new();
        bag.insert("n-loops", toml::Value::Integer(50));
        bag.insert("loop-size", toml::Value::Float(400.0));
        assert_eq!(bag.get_usize("n-loops"), Some(50));
        assert_eq!(bag.get_f64("n-loops"), Some(50.0));
        assert_eq!(bag.get_f64("loop-size"), Some(400.0));
        assert_eq!(bag.get_usize("loop-size"), None);
        assert_eq!(bag.get_usize("absent"), None);
    }
}
