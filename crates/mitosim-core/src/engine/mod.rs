//! # Engine Module
//!
//! This module implements the pipeline orchestration engine: the stateful layer
//! that resolves a declarative action sequence into a consistent simulation
//! setup and drives it against an external physics engine.
//!
//! ## Architecture
//!
//! - **Action contract** ([`action`]) - The polymorphic capability trait with
//!   declared shared-state dependencies and optional lifecycle hooks, plus the
//!   read-guarded state view and the overflow parameter bag.
//! - **Orchestration** ([`pipeline`]) - The three-phase state machine
//!   (configure, attach, run-loop) with expansion splicing and the frozen
//!   resolved-configuration capture.
//! - **Scheduling** ([`schedule`]) - Block-windowed parameter interpolation for
//!   actions that evolve engine parameters over a run.
//! - **Engine boundary** ([`sim`]) - The contract the pipeline uses to talk to
//!   the external simulation engine, and the recording `NullEngine`.
//! - **Progress Monitoring** ([`progress`]) - Callback-based phase and block
//!   reporting for user feedback.
//! - **Error Handling** ([`error`]) - The pipeline error taxonomy; every
//!   configuration-time failure names the offending action and key.

pub mod action;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod schedule;
pub mod sim;
