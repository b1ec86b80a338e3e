//! Tethering and stiffness forces anchored on the backbone and chain tips.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::params_to_toml;
use crate::core::state::StateKey;
use crate::engine::action::{Action, StateView};
use crate::engine::error::PipelineError;
use crate::engine::sim::{ForceDescriptor, SimulationEngine};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BackboneTetheringParams {
    pub k: f64,
}

impl Default for BackboneTetheringParams {
    fn default() -> Self {
        Self { k: 15.0 }
    }
}

/// Tethers every backbone particle to its current position.
#[derive(Debug, Default)]
pub struct BackboneTethering {
    params: BackboneTetheringParams,
}

impl BackboneTethering {
    pub fn new(params: BackboneTetheringParams) -> Self {
        Self { params }
    }
}

impl Action for BackboneTethering {
    fn name(&self) -> &str {
        "backbone_tethering"
    }

    fn reads(&self) -> &'static [StateKey] {
        &[StateKey::Backbone]
    }

    fn params(&self) -> toml::Value {
        params_to_toml(&self.params)
    }

    fn attach(
        &mut self,
        engine: &mut dyn SimulationEngine,
        state: &StateView<'_>,
    ) -> Result<(), PipelineError> {
        engine.add_force(ForceDescriptor::TetherParticles {
            particles: state.backbone()?.to_vec(),
            k: [self.params.k; 3],
            name: "tether_backbone".to_string(),
        })?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TipsTetheringParams {
    /// Anisotropic spring constant; the default restrains the axial direction
    /// only.
    pub k: [f64; 3],
    /// Particles to tether; the two chain tips (`0` and `N - 1`) when omitted.
    pub particles: Option<Vec<usize>>,
}

impl Default for TipsTetheringParams {
    fn default() -> Self {
        Self {
            k: [0.0, 0.0, 5.0],
            particles: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct TipsTethering {
    params: TipsTetheringParams,
}

impl TipsTethering {
    pub fn new(params: TipsTetheringParams) -> Self {
        Self { params }
    }
}

impl Action for TipsTethering {
    fn name(&self) -> &str {
        "tips_tethering"
    }

    fn reads(&self) -> &'static [StateKey] {
        &[StateKey::N]
    }

    fn params(&self) -> toml::Value {
        params_to_toml(&self.params)
    }

    fn attach(
        &mut self,
        engine: &mut dyn SimulationEngine,
        state: &StateView<'_>,
    ) -> Result<(), PipelineError> {
        let particles = match &self.params.particles {
            Some(particles) => particles.clone(),
            None => {
                let n = state.count()?;
                if n == 0 {
                    return Err(PipelineError::configuration(
                        self.name(),
                        "cannot tether the tips of an empty system",
                    ));
                }
                vec![0, n - 1]
            }
        };
        engine.add_force(ForceDescriptor::TetherParticles {
            particles,
            k: self.params.k,
            name: "tether_tips".to_string(),
        })?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BackboneStiffnessParams {
    pub k: f64,
}

impl Default for BackboneStiffnessParams {
    fn default() -> Self {
        Self { k: 1.5 }
    }
}

/// An angular force over consecutive backbone triplets, straightening the main
/// chain.
#[derive(Debug, Default)]
pub struct BackboneStiffness {
    params: BackboneStiffnessParams,
}

impl BackboneStiffness {
    pub fn new(params: BackboneStiffnessParams) -> Self {
        Self { params }
    }
}

impl Action for BackboneStiffness {
    fn name(&self) -> &str {
        "backbone_stiffness"
    }

    fn reads(&self) -> &'static [StateKey] {
        &[StateKey::Backbone]
    }

    fn params(&self) -> toml::Value {
        params_to_toml(&self.params)
    }

    fn attach(
        &mut self,
        engine: &mut dyn SimulationEngine,
        state: &StateView<'_>,
    ) -> Result<(), PipelineError> {
        let backbone = state.backbone()?;
        let triplets = backbone
            .windows(3)
            .map(|w| [w[0], w[1], w[2]])
            .collect();
        engine.add_force(ForceDescriptor::AngleForce {
            triplets,
            k: self.params.k,
            theta_zero: PI,
            name: "backbone_stiffness".to_string(),
        })?;
        Ok(())
    }
}
