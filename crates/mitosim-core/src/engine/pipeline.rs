//! The pipeline orchestrator: an ordered action sequence plus the shared state,
//! driven through three phases: configure (with expansion splicing), engine
//! attachment, and the block-wise run loop.

use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use super::action::{Action, StateView};
use super::error::PipelineError;
use super::sim::{BlockState, SimulationEngine};
use crate::core::io::{ActionRecord, ResolvedConfig};
use crate::core::state::{SharedState, StateKey, StateValue};

/// Lifecycle of a pipeline. Phases advance strictly forward; any failure
/// poisons the pipeline, which must not be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Building,
    Configured,
    Attached,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Building => "building",
            Phase::Configured => "configured",
            Phase::Attached => "attached",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Building
    }
}

struct Node {
    action: Box<dyn Action>,
    /// Set on nodes spliced in by an expansion. Expansion is single-shot: an
    /// expanded node returning a further expansion is rejected.
    expanded: bool,
}

/// The ordered action sequence and the shared-state store it communicates
/// through. Single-threaded and synchronous: each hook runs to completion
/// before the next action's hook begins.
#[derive(Default)]
pub struct Pipeline {
    nodes: Vec<Node>,
    state: SharedState,
    phase: Phase,
    resolved: Option<ResolvedConfig>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeds a root value (such as `N`) before the configuration pass.
    pub fn seed(&mut self, key: StateKey, value: StateValue) -> Result<(), PipelineError> {
        self.expect_phase(Phase::Building)?;
        self.state
            .write(key, value)
            .map_err(|e| PipelineError::configuration("<seed>", e.to_string()))
    }

    pub fn add_action(&mut self, action: impl Action + 'static) {
        self.add_boxed_action(Box::new(action));
    }

    pub fn add_boxed_action(&mut self, action: Box<dyn Action>) {
        self.nodes.push(Node {
            action,
            expanded: false,
        });
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn action_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.action.name()).collect()
    }

    pub fn shared_state(&self) -> &SharedState {
        &self.state
    }

    /// The frozen configuration snapshot, available once `configure` succeeds.
    pub fn resolved(&self) -> Option<&ResolvedConfig> {
        self.resolved.as_ref()
    }

    /// The configuration pass: a single forward pass over the (possibly
    /// growing) action list. For each node, `configure` runs against a read
    /// view, its returned writes are checked against the declared write-set and
    /// merged, and an expansion replaces the node in place before the pass
    /// continues over the spliced nodes.
    pub fn configure(&mut self) -> Result<(), PipelineError> {
        self.expect_phase(Phase::Building)?;
        self.phase = Phase::Failed;

        let mut idx = 0;
        while idx < self.nodes.len() {
            let node = &mut self.nodes[idx];
            let name = node.action.name().to_string();
            debug!(action = %name, position = idx, "configuring action");

            let view = StateView::new(&self.state, &name, node.action.reads());
            let writes = node.action.configure(&view)?;

            let declared = node.action.writes();
            for (key, _) in &writes {
                if !declared.contains(key) {
                    return Err(PipelineError::WriteViolation {
                        action: name,
                        key: *key,
                        message: "returned a key absent from the declared write-set",
                    });
                }
            }
            for key in declared {
                if !writes.iter().any(|(k, _)| k == key) {
                    return Err(PipelineError::WriteViolation {
                        action: name,
                        key: *key,
                        message: "declared key missing from the configured return set",
                    });
                }
            }
            for (key, value) in writes {
                self.state
                    .write(key, value)
                    .map_err(|e| PipelineError::configuration(&name, e.to_string()))?;
            }

            let was_expanded = self.nodes[idx].expanded;
            if let Some(replacements) = self.nodes[idx].action.expand() {
                if was_expanded {
                    return Err(PipelineError::ExpansionCycle { action: name });
                }
                info!(
                    action = %name,
                    spawned = replacements.len(),
                    "action expanded into sub-actions"
                );
                self.nodes.splice(
                    idx..=idx,
                    replacements.into_iter().map(|action| Node {
                        action,
                        expanded: true,
                    }),
                );
                // The spliced nodes are configured next, before the original
                // successor.
                continue;
            }

            idx += 1;
        }

        self.resolved = Some(self.capture_resolved());
        self.phase = Phase::Configured;
        info!(actions = self.nodes.len(), "configuration pass complete");
        Ok(())
    }

    /// The engine-attachment pass: in final pipeline order, each action commits
    /// its physical effect to the engine.
    pub fn attach_to_engine(
        &mut self,
        engine: &mut dyn SimulationEngine,
    ) -> Result<(), PipelineError> {
        self.expect_phase(Phase::Configured)?;
        self.phase = Phase::Failed;

        for node in &mut self.nodes {
            let name = node.action.name().to_string();
            debug!(action = %name, "attaching action to engine");
            let view = StateView::new(&self.state, &name, node.action.reads());
            node.action.attach(engine, &view)?;
        }

        self.phase = Phase::Attached;
        info!("engine attachment pass complete");
        Ok(())
    }

    /// The run-loop pass: advances the engine block by block, invoking every
    /// action's `step` after each block.
    pub fn run_loop(
        &mut self,
        engine: &mut dyn SimulationEngine,
        total_blocks: usize,
        steps_per_block: usize,
    ) -> Result<(), PipelineError> {
        self.run_loop_with(engine, total_blocks, steps_per_block, |_| Ok(()))
    }

    /// Like [`run_loop`](Self::run_loop), with a per-block observer (snapshot
    /// writers, progress reporting) invoked after the actions' `step` hooks.
    pub fn run_loop_with(
        &mut self,
        engine: &mut dyn SimulationEngine,
        total_blocks: usize,
        steps_per_block: usize,
        mut on_block: impl FnMut(&BlockState) -> Result<(), PipelineError>,
    ) -> Result<(), PipelineError> {
        self.expect_phase(Phase::Attached)?;

        for block in 0..total_blocks {
            let block_state = match engine.advance_block(steps_per_block) {
                Ok(state) => state,
                Err(e) => {
                    self.phase = Phase::Failed;
                    return Err(e.into());
                }
            };
            for node in &mut self.nodes {
                if let Err(e) = node.action.step(engine, block) {
                    self.phase = Phase::Failed;
                    return Err(e);
                }
            }
            if let Err(e) = on_block(&block_state) {
                self.phase = Phase::Failed;
                return Err(e);
            }
        }
        Ok(())
    }

    fn expect_phase(&self, expected: Phase) -> Result<(), PipelineError> {
        if self.phase != expected {
            return Err(PipelineError::Phase {
                expected,
                actual: self.phase,
            });
        }
        Ok(())
    }

    fn capture_resolved(&self) -> ResolvedConfig {
        let actions = self
            .nodes
            .iter()
            .map(|n| ActionRecord {
                name: n.action.name().to_string(),
                params: n.action.params(),
            })
            .collect();
        let shared: BTreeMap<String, toml::Value> = self
            .state
            .keys()
            .filter_map(|key| {
                self.state
                    .read(key)
                    .ok()
                    .map(|value| (key.as_str().to_string(), value.to_toml()))
            })
            .collect();
        ResolvedConfig { actions, shared }
    }
}
