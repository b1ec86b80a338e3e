//! High-level workflows orchestrating the engine layer for external callers.

pub mod simulate;
