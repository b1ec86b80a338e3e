//! Concrete pipeline actions.
//!
//! Each action pairs a serde-serializable parameter record with an
//! [`Action`](crate::engine::action::Action) implementation. Actions are
//! modular and composable: a pipeline is assembled by appending the layout
//! actions (loops, conformations), the force actions (chains, tethers,
//! confinements), and the scheduling actions that evolve parameters over the
//! run.

pub mod chains;
pub mod confinement;
pub mod conformations;
pub mod heteropolymer;
pub mod init;
pub mod loops;
pub mod tethers;

pub use chains::AddChains;
pub use confinement::{CylinderRadiusSchedule, DynamicCylinderCompression, StaticCylinderConfinement};
pub use conformations::{
    HelicalLoopBrushConformation, SetInitialConformation, UniformHelicalLoopBrushConformation,
};
pub use heteropolymer::RandomBlockParticleTypes;
pub use init::InitializeSimulation;
pub use loops::{AddLoops, RootLoopSeparator, SingleLayerLoops, TwoLayerLoops};
pub use tethers::{BackboneStiffness, BackboneTethering, TipsTethering};

/// Renders a serializable parameter record as a `toml` table for the
/// resolved-configuration snapshot.
pub(crate) fn params_to_toml<T: serde::Serialize>(params: &T) -> toml::Value {
    toml::Value::try_from(params)
        .unwrap_or_else(|_| toml::Value::Table(toml::value::Table::new()))
}
