//! # MitoSim Core Library
//!
//! A library for assembling and driving polymer/chromosome simulations from small,
//! independently-authored configuration units ("actions") composed into an ordered pipeline.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a clear separation
//! of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless data models (the typed shared-state
//!   store, loop/chain intervals), pure geometry (the helical conformation solver), and
//!   persistence utilities for resolved configurations and coordinate snapshots.
//!
//! - **[`engine`]: The Logic Core.** This stateful layer orchestrates the pipeline. It defines
//!   the [`Action`](engine::action::Action) capability contract, the three-phase
//!   [`Pipeline`](engine::pipeline::Pipeline) orchestrator (configure, attach, run-loop), the
//!   block-windowed [`Schedule`](engine::schedule::Schedule) interpolator, and the
//!   [`SimulationEngine`](engine::sim::SimulationEngine) boundary to the external physics engine.
//!
//! - **[`actions`] and [`workflows`]: The Public API.** Concrete actions (loop layouts,
//!   initial conformations, tethers, confinements) and the end-to-end simulation workflow
//!   that ties the pipeline, the engine, and persistence together. These are the entry points
//!   for end-users of the library.

pub mod actions;
pub mod core;
pub mod engine;
pub mod workflows;
