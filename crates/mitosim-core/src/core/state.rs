//! The shared-state store: a typed mapping of named quantities produced and
//! consumed by pipeline actions.
//!
//! The set of known keys is a closed schema ([`StateKey`]) and every key has a
//! fixed value shape ([`ValueKind`]), validated on write. The store is the only
//! channel of information flow between actions.

use nalgebra::Point3;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use super::loops::{ChainSpan, LoopSpan};

#[derive(Debug, Error, PartialEq, Clone)]
pub enum StateError {
    #[error("missing shared-state key: {0}")]
    MissingKey(StateKey),

    #[error("key {key} expects a {expected} value, got {actual}")]
    KindMismatch {
        key: StateKey,
        expected: ValueKind,
        actual: ValueKind,
    },
}

/// The registered schema of shared-state keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKey {
    N,
    Chains,
    Loops,
    Backbone,
    InitialConformation,
    ParticleTypes,
}

impl StateKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::N => "N",
            StateKey::Chains => "chains",
            StateKey::Loops => "loops",
            StateKey::Backbone => "backbone",
            StateKey::InitialConformation => "initial_conformation",
            StateKey::ParticleTypes => "particle_types",
        }
    }

    pub fn expected_kind(&self) -> ValueKind {
        match self {
            StateKey::N => ValueKind::Count,
            StateKey::Chains => ValueKind::Chains,
            StateKey::Loops => ValueKind::Loops,
            StateKey::Backbone => ValueKind::Indices,
            StateKey::InitialConformation => ValueKind::Conformation,
            StateKey::ParticleTypes => ValueKind::ParticleTypes,
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Count,
    Chains,
    Loops,
    Indices,
    Conformation,
    ParticleTypes,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Count => "count",
            ValueKind::Chains => "chains",
            ValueKind::Loops => "loops",
            ValueKind::Indices => "indices",
            ValueKind::Conformation => "conformation",
            ValueKind::ParticleTypes => "particle types",
        };
        f.write_str(name)
    }
}

/// A value stored under a [`StateKey`].
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    Count(usize),
    Chains(Vec<ChainSpan>),
    Loops(Vec<LoopSpan>),
    Indices(Vec<usize>),
    Conformation(Vec<Point3<f64>>),
    ParticleTypes(Vec<u8>),
}

impl StateValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            StateValue::Count(_) => ValueKind::Count,
            StateValue::Chains(_) => ValueKind::Chains,
            StateValue::Loops(_) => ValueKind::Loops,
            StateValue::Indices(_) => ValueKind::Indices,
            StateValue::Conformation(_) => ValueKind::Conformation,
            StateValue::ParticleTypes(_) => ValueKind::ParticleTypes,
        }
    }

    /// A `toml` rendition used for the resolved-configuration dump.
    pub fn to_toml(&self) -> toml::Value {
        let result = match self {
            StateValue::Count(n) => toml::Value::try_from(*n as i64),
            StateValue::Chains(chains) => toml::Value::try_from(chains),
            StateValue::Loops(loops) => toml::Value::try_from(loops),
            StateValue::Indices(idxs) => {
                toml::Value::try_from(idxs.iter().map(|&i| i as i64).collect::<Vec<_>>())
            }
            StateValue::Conformation(coords) => toml::Value::try_from(
                coords
                    .iter()
                    .map(|p| [p.x, p.y, p.z])
                    .collect::<Vec<_>>(),
            ),
            StateValue::ParticleTypes(types) => {
                toml::Value::try_from(types.iter().map(|&t| t as i64).collect::<Vec<_>>())
            }
        };
        result.unwrap_or_else(|_| toml::Value::String("<unserializable>".to_string()))
    }
}

/// An append-and-overwrite mapping from schema keys to values. Keys are never
/// deleted during a run; a later write to the same key wins.
#[derive(Debug, Default, Clone)]
pub struct SharedState {
    entries: BTreeMap<StateKey, StateValue>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: StateKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = StateKey> + '_ {
        self.entries.keys().copied()
    }

    pub fn read(&self, key: StateKey) -> Result<&StateValue, StateError> {
        self.entries.get(&key).ok_or(StateError::MissingKey(key))
    }

    pub fn write(&mut self, key: StateKey, value: StateValue) -> Result<(), StateError> {
        if value.kind() != key.expected_kind() {
            return Err(StateError::KindMismatch {
                key,
                expected: key.expected_kind(),
                actual: value.kind(),
            });
        }
        self.entries.insert(key, value);
        Ok(())
    }

    pub fn count(&self) -> Result<usize, StateError> {
        match self.read(StateKey::N)? {
            StateValue::Count(n) => Ok(*n),
            other => Err(self.mismatch(StateKey::N, other)),
        }
    }

    pub fn chains(&self) -> Result<&[ChainSpan], StateError> {
        match self.read(StateKey::Chains)? {
            StateValue::Chains(chains) => Ok(chains),
            other => Err(self.mismatch(StateKey::Chains, other)),
        }
    }

    pub fn loops(&self) -> Result<&[LoopSpan], StateError> {
        match self.read(StateKey::Loops)? {
            StateValue::Loops(loops) => Ok(loops),
            other => Err(self.mismatch(StateKey::Loops, other)),
        }
    }

    pub fn backbone(&self) -> Result<&[usize], StateError> {
        match self.read(StateKey::Backbone)? {
            StateValue::Indices(idxs) => Ok(idxs),
            other => Err(self.mismatch(StateKey::Backbone, other)),
        }
    }

    pub fn conformation(&self) -> Result<&[Point3<f64>], StateError> {
        match self.read(StateKey::InitialConformation)? {
            StateValue::Conformation(coords) => Ok(coords),
            other => Err(self.mismatch(StateKey::InitialConformation, other)),
        }
    }

    pub fn particle_types(&self) -> Result<&[u8], StateError> {
        match self.read(StateKey::ParticleTypes)? {
            StateValue::ParticleTypes(types) => Ok(types),
            other => Err(self.mismatch(StateKey::ParticleTypes, other)),
        }
    }

    fn mismatch(&self, key: StateKey, actual: &StateValue) -> StateError {
        StateError::KindMismatch {
            key,
            expected: key.expected_kind(),
            actual: actual.kind(),
        }
    }
}
