//! # Core Module
//!
//! Stateless foundation layer: the typed shared-state store through which actions
//! communicate, loop/chain interval types and backbone derivation, the helical
//! conformation solver, and persistence of resolved configurations.

pub mod conformation;
pub mod io;
pub mod loops;
pub mod state;
