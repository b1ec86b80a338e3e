//! Cylindrical confinement, static and progressively compressing.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::params_to_toml;
use crate::core::state::StateKey;
use crate::engine::action::{Action, StateView, StateWrites};
use crate::engine::error::PipelineError;
use crate::engine::schedule::{Easing, Schedule};
use crate::engine::sim::{ForceDescriptor, SimulationEngine};

pub const CYLINDER_FORCE_NAME: &str = "cylindrical_confinement";

/// How an axial boundary of the cylinder is obtained: the extent of the full
/// conformation, the extent of the backbone only, or an explicit coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AxialBound {
    #[default]
    Conformation,
    Backbone,
    #[serde(untagged)]
    Fixed(f64),
}

impl AxialBound {
    fn resolve(
        &self,
        state: &StateView<'_>,
        pick: impl Fn(f64, f64) -> f64,
        seed: f64,
    ) -> Result<f64, PipelineError> {
        let z = match self {
            AxialBound::Fixed(z) => *z,
            AxialBound::Conformation => state
                .conformation()?
                .iter()
                .map(|p| p.z)
                .fold(seed, &pick),
            AxialBound::Backbone => {
                let coords = state.conformation()?;
                state
                    .backbone()?
                    .iter()
                    .map(|&i| coords[i].z)
                    .fold(seed, &pick)
            }
        };
        Ok(z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StaticCylinderConfinementParams {
    pub k: f64,
    pub z_min: AxialBound,
    pub z_max: AxialBound,
    /// Explicit cylinder radius. Mutually exclusive with
    /// `per-particle-volume`; when neither is given the radius is measured as
    /// the largest radial extent of the initial conformation.
    pub radius: Option<f64>,
    /// Target density: the radius satisfying
    /// `N * v = pi * r^2 * (z_max - z_min)`.
    pub per_particle_volume: Option<f64>,
}

impl Default for StaticCylinderConfinementParams {
    fn default() -> Self {
        Self {
            k: 1.0,
            z_min: AxialBound::Conformation,
            z_max: AxialBound::Conformation,
            radius: None,
            per_particle_volume: None,
        }
    }
}

/// Confines all particles to a cylinder around the z axis. The geometry is
/// resolved during `configure` and the solved radius and bounds land in the
/// resolved-configuration record.
#[derive(Debug, Default)]
pub struct StaticCylinderConfinement {
    params: StaticCylinderConfinementParams,
}

impl StaticCylinderConfinement {
    pub fn new(params: StaticCylinderConfinementParams) -> Self {
        Self { params }
    }

    fn solved_geometry(&self) -> Result<(f64, f64, f64), PipelineError> {
        match (self.params.radius, self.params.z_min, self.params.z_max) {
            (Some(r), AxialBound::Fixed(z_min), AxialBound::Fixed(z_max)) => {
                Ok((r, z_min, z_max))
            }
            _ => Err(PipelineError::Internal(
                "cylindrical confinement attached before its geometry was resolved".to_string(),
            )),
        }
    }
}

impl Action for StaticCylinderConfinement {
    fn name(&self) -> &str {
        "static_cylinder_confinement"
    }

    fn reads(&self) -> &'static [StateKey] {
        &[StateKey::N, StateKey::Backbone, StateKey::InitialConformation]
    }

    fn params(&self) -> toml::Value {
        params_to_toml(&self.params)
    }

    fn configure(&mut self, state: &StateView<'_>) -> Result<StateWrites, PipelineError> {
        let z_min = self
            .params
            .z_min
            .resolve(state, f64::min, f64::INFINITY)?;
        let z_max = self
            .params
            .z_max
            .resolve(state, f64::max, f64::NEG_INFINITY)?;
        if z_max <= z_min {
            return Err(PipelineError::configuration(
                self.name(),
                format!("degenerate axial bounds: z-min {z_min} >= z-max {z_max}"),
            ));
        }

        let radius = match (self.params.radius, self.params.per_particle_volume) {
            (Some(_), Some(_)) => {
                return Err(PipelineError::configuration(
                    self.name(),
                    "specify either an explicit radius or a per-particle volume, not both",
                ));
            }
            (Some(r), None) => r,
            (None, Some(volume)) => {
                let n = state.count()? as f64;
                (n * volume / (z_max - z_min) / PI).sqrt()
            }
            (None, None) => state
                .conformation()?
                .iter()
                .map(|p| (p.x * p.x + p.y * p.y).sqrt())
                .fold(0.0, f64::max),
        };

        self.params.radius = Some(radius);
        self.params.z_min = AxialBound::Fixed(z_min);
        self.params.z_max = AxialBound::Fixed(z_max);
        Ok(Vec::new())
    }

    fn attach(
        &mut self,
        engine: &mut dyn SimulationEngine,
        _state: &StateView<'_>,
    ) -> Result<(), PipelineError> {
        let (radius, z_min, z_max) = self.solved_geometry()?;
        engine.add_force(ForceDescriptor::CylindricalConfinement {
            radius,
            bottom: z_min,
            top: z_max,
            k: self.params.k,
            name: CYLINDER_FORCE_NAME.to_string(),
        })?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DynamicCylinderCompressionParams {
    pub k: f64,
    pub initial_block: usize,
    pub final_block: usize,
    /// Target radius at the end of the compression window. Mutually exclusive
    /// with `final-per-particle-volume`.
    pub final_radius: Option<f64>,
    pub final_per_particle_volume: Option<f64>,
    /// Optional power-law exponent for the radius trajectory.
    pub powerlaw: Option<f64>,
}

impl Default for DynamicCylinderCompressionParams {
    fn default() -> Self {
        Self {
            k: 1.0,
            initial_block: 0,
            final_block: 100,
            final_radius: None,
            final_per_particle_volume: None,
            powerlaw: None,
        }
    }
}

/// Compresses the confining cylinder over a block window. Resolves the initial
/// radius from the conformation and the final radius from the target density,
/// then expands into a static confinement at the initial radius followed by a
/// radius schedule that narrows it block by block.
#[derive(Debug, Default)]
pub struct DynamicCylinderCompression {
    params: DynamicCylinderCompressionParams,
    solved: Option<SolvedCompression>,
}

#[derive(Debug, Clone, Copy)]
struct SolvedCompression {
    initial_radius: f64,
    final_radius: f64,
    z_min: f64,
    z_max: f64,
}

impl DynamicCylinderCompression {
    pub fn new(params: DynamicCylinderCompressionParams) -> Self {
        Self {
            params,
            solved: None,
        }
    }
}

impl Action for DynamicCylinderCompression {
    fn name(&self) -> &str {
        "dynamic_cylinder_compression"
    }

    fn reads(&self) -> &'static [StateKey] {
        &[StateKey::N, StateKey::Backbone, StateKey::InitialConformation]
    }

    fn params(&self) -> toml::Value {
        params_to_toml(&self.params)
    }

    fn configure(&mut self, state: &StateView<'_>) -> Result<StateWrites, PipelineError> {
        if self.params.final_block <= self.params.initial_block {
            return Err(PipelineError::configuration(
                self.name(),
                format!(
                    "compression window is empty: final-block {} <= initial-block {}",
                    self.params.final_block, self.params.initial_block
                ),
            ));
        }

        let coords = state.conformation()?;
        let z_min = coords.iter().map(|p| p.z).fold(f64::INFINITY, f64::min);
        let z_max = coords.iter().map(|p| p.z).fold(f64::NEG_INFINITY, f64::max);
        let initial_radius = coords
            .iter()
            .map(|p| (p.x * p.x + p.y * p.y).sqrt())
            .fold(0.0, f64::max);

        let final_radius = match (self.params.final_radius, self.params.final_per_particle_volume)
        {
            (Some(_), Some(_)) => {
                return Err(PipelineError::configuration(
                    self.name(),
                    "specify either a final radius or a final per-particle volume, not both",
                ));
            }
            (Some(r), None) => r,
            (None, Some(volume)) => {
                let n = state.count()? as f64;
                (n * volume / (z_max - z_min) / PI).sqrt()
            }
            (None, None) => {
                return Err(PipelineError::configuration(
                    self.name(),
                    "a final radius or a final per-particle volume is required",
                ));
            }
        };

        self.solved = Some(SolvedCompression {
            initial_radius,
            final_radius,
            z_min,
            z_max,
        });
        Ok(Vec::new())
    }

    fn expand(&mut self) -> Option<Vec<Box<dyn Action>>> {
        let solved = self.solved?;
        let schedule = Schedule {
            start_block: self.params.initial_block,
            end_block: self.params.final_block,
            from: solved.initial_radius,
            to: solved.final_radius,
            easing: match self.params.powerlaw {
                Some(p) => Easing::Power(p),
                None => Easing::Linear,
            },
        };
        Some(vec![
            Box::new(StaticCylinderConfinement::new(
                StaticCylinderConfinementParams {
                    k: self.params.k,
                    z_min: AxialBound::Fixed(solved.z_min),
                    z_max: AxialBound::Fixed(solved.z_max),
                    radius: Some(solved.initial_radius),
                    per_particle_volume: None,
                },
            )),
            Box::new(CylinderRadiusSchedule::new(schedule)),
        ])
    }
}

/// Pushes the scheduled cylinder radius into the engine once per block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CylinderRadiusSchedule {
    pub schedule: Schedule,
}

impl CylinderRadiusSchedule {
    pub fn new(schedule: Schedule) -> Self {
        Self { schedule }
    }
}

impl Action for CylinderRadiusSchedule {
    fn name(&self) -> &str {
        "cylinder_radius_schedule"
    }

    fn params(&self) -> toml::Value {
        params_to_toml(self)
    }

    fn step(
        &mut self,
        engine: &mut dyn SimulationEngine,
        block: usize,
    ) -> Result<(), PipelineError> {
        let radius = self.schedule.value_at(block);
        engine.update_global_parameter(CYLINDER_FORCE_NAME, "r", radius)?;
        Ok(())
    }
}
