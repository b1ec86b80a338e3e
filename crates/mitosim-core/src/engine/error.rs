use thiserror::Error;

use super::pipeline::Phase;
use super::sim::SimError;
use crate::core::conformation::ConformationError;
use crate::core::io::IoError;
use crate::core::loops::LoopError;
use crate::core::state::StateKey;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration of action '{action}' failed: {message}")]
    Configuration { action: String, message: String },

    #[error("action '{action}' reads shared-state key '{key}' that no earlier action wrote")]
    MissingKey { action: String, key: StateKey },

    #[error("action '{action}' violated its write contract on key '{key}': {message}")]
    WriteViolation {
        action: String,
        key: StateKey,
        message: &'static str,
    },

    #[error("action '{action}' read shared-state key '{key}' it did not declare")]
    UndeclaredRead { action: String, key: StateKey },

    #[error("expanded action '{action}' attempted a further expansion")]
    ExpansionCycle { action: String },

    #[error("pipeline phase mismatch: expected {expected}, but the pipeline is {actual}")]
    Phase { expected: Phase, actual: Phase },

    #[error("conformation solver failed in action '{action}': {source}")]
    Conformation {
        action: String,
        #[source]
        source: ConformationError,
    },

    #[error("loop geometry failed in action '{action}': {source}")]
    Loops {
        action: String,
        #[source]
        source: LoopError,
    },

    #[error("simulation engine failure: {0}")]
    Engine(#[from] SimError),

    #[error("persistence failure: {0}")]
    Persistence(#[from] IoError),

    #[error("internal pipeline error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub(crate) fn configuration(action: &str, message: impl Into<String>) -> Self {
        PipelineError::Configuration {
            action: action.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn conformation(action: &str, source: ConformationError) -> Self {
        PipelineError::Conformation {
            action: action.to_string(),
            source,
        }
    }

    pub(crate) fn loops(action: &str, source: LoopError) -> Self {
        PipelineError::Loops {
            action: action.to_string(),
            source,
        }
    }
}
