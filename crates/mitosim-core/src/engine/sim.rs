//! The boundary to the external physics/integration engine.
//!
//! The pipeline never computes forces itself; it instructs an engine through
//! this trait and treats every call as blocking and synchronous. Engine-level
//! failures (numerical divergence, resource exhaustion) are fatal and propagate
//! uncaught through the pipeline.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum SimError {
    #[error("engine is not initialized")]
    NotInitialized,

    #[error("engine rejected {context}: {message}")]
    Rejected {
        context: &'static str,
        message: String,
    },

    #[error("no force named '{0}' is registered")]
    UnknownForce(String),

    #[error("engine failure: {0}")]
    Failure(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    #[default]
    Cuda,
    OpenCl,
    Cpu,
    Reference,
}

/// Engine initialization parameters committed by the pipeline's first action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSettings {
    pub particle_count: usize,
    pub platform: Platform,
    pub error_tolerance: f64,
    pub collision_rate: f64,
}

/// Type-pair attraction riding on the chain nonbonded term: `energies[a][b]`
/// is the well depth between particle types `a` and `b`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypePairAttraction {
    pub particle_types: Vec<u8>,
    pub energies: Vec<Vec<f64>>,
    pub radius: f64,
}

/// A force term the pipeline registers with the engine. The `name` is the
/// handle for later global- or per-particle parameter updates.
#[derive(Debug, Clone, PartialEq)]
pub enum ForceDescriptor {
    /// Chain connectivity plus excluded-volume repulsion for a set of chains
    /// given as `(start, end, is_ring)`. With `attraction` set, the nonbonded
    /// term adds a type-pair attractive well on top of the repulsive core.
    PolymerChains {
        chains: Vec<(usize, usize, bool)>,
        bond_length: f64,
        wiggle_dist: f64,
        repulsion_energy: f64,
        attraction: Option<TypePairAttraction>,
        name: String,
    },
    /// Harmonic springs with one rest length per bond.
    HarmonicBonds {
        bonds: Vec<(usize, usize)>,
        bond_lengths: Vec<f64>,
        wiggle_dist: f64,
        name: String,
    },
    AngleForce {
        triplets: Vec<[usize; 3]>,
        k: f64,
        theta_zero: f64,
        name: String,
    },
    TetherParticles {
        particles: Vec<usize>,
        k: [f64; 3],
        name: String,
    },
    CylindricalConfinement {
        radius: f64,
        bottom: f64,
        top: f64,
        k: f64,
        name: String,
    },
}

impl ForceDescriptor {
    pub fn name(&self) -> &str {
        match self {
            ForceDescriptor::PolymerChains { name, .. }
            | ForceDescriptor::HarmonicBonds { name, .. }
            | ForceDescriptor::AngleForce { name, .. }
            | ForceDescriptor::TetherParticles { name, .. }
            | ForceDescriptor::CylindricalConfinement { name, .. } => name,
        }
    }
}

/// The state reported back after one block of integration.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockState {
    pub block: usize,
    pub steps_done: usize,
    pub potential_energy: f64,
    pub positions: Vec<Point3<f64>>,
}

pub trait SimulationEngine {
    fn initialize(&mut self, settings: &EngineSettings) -> Result<(), SimError>;

    fn set_initial_positions(&mut self, coords: &[Point3<f64>]) -> Result<(), SimError>;

    fn add_force(&mut self, force: ForceDescriptor) -> Result<(), SimError>;

    fn has_force(&self, name: &str) -> bool;

    fn update_global_parameter(
        &mut self,
        force: &str,
        param: &str,
        value: f64,
    ) -> Result<(), SimError>;

    fn update_per_particle_parameter(
        &mut self,
        force: &str,
        param: &str,
        term_index: usize,
        value: f64,
    ) -> Result<(), SimError>;

    fn advance_block(&mut self, n_steps: usize) -> Result<BlockState, SimError>;
}

/// An engine that records every call without integrating anything. Serves as
/// the test double and the CLI dry-run target.
#[derive(Debug, Default)]
pub struct NullEngine {
    settings: Option<EngineSettings>,
    positions: Vec<Point3<f64>>,
    forces: Vec<ForceDescriptor>,
    global_updates: Vec<(String, String, f64)>,
    per_particle_updates: Vec<(String, String, usize, f64)>,
    blocks_done: usize,
}

impl NullEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(&self) -> Option<&EngineSettings> {
        self.settings.as_ref()
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn forces(&self) -> &[ForceDescriptor] {
        &self.forces
    }

    pub fn global_updates(&self) -> &[(String, String, f64)] {
        &self.global_updates
    }

    pub fn per_particle_updates(&self) -> &[(String, String, usize, f64)] {
        &self.per_particle_updates
    }

    pub fn blocks_done(&self) -> usize {
        self.blocks_done
    }

    fn particle_count(&self) -> Result<usize, SimError> {
        self.settings
            .as_ref()
            .map(|s| s.particle_count)
            .ok_or(SimError::NotInitialized)
    }
}

impl SimulationEngine for NullEngine {
    fn initialize(&mut self, settings: &EngineSettings) -> Result<(), SimError> {
        debug!(particle_count = settings.particle_count, "null engine initialized");
        self.settings = Some(settings.clone());
        Ok(())
    }

    fn set_initial_positions(&mut self, coords: &[Point3<f64>]) -> Result<(), SimError> {
        let n = self.particle_count()?;
        if coords.len() != n {
            return Err(SimError::Rejected {
                context: "initial positions",
                message: format!("expected {n} coordinates, got {}", coords.len()),
            });
        }
        self.positions = coords.to_vec();
        Ok(())
    }

    fn add_force(&mut self, force: ForceDescriptor) -> Result<(), SimError> {
        debug!(name = force.name(), "null engine registered force");
        self.forces.push(force);
        Ok(())
    }

    fn has_force(&self, name: &str) -> bool {
        self.forces.iter().any(|f| f.name() == name)
    }

    fn update_global_parameter(
        &mut self,
        force: &str,
        param: &str,
        value: f64,
    ) -> Result<(), SimError> {
        if !self.has_force(force) {
            return Err(SimError::UnknownForce(force.to_string()));
        }
        self.global_updates
            .push((force.to_string(), param.to_string(), value));
        Ok(())
    }

    fn update_per_particle_parameter(
        &mut self,
        force: &str,
        param: &str,
        term_index: usize,
        value: f64,
    ) -> Result<(), SimError> {
        if !self.has_force(force) {
            return Err(SimError::UnknownForce(force.to_string()));
        }
        self.per_particle_updates
            .push((force.to_string(), param.to_string(), term_index, value));
        Ok(())
    }

    fn advance_block(&mut self, n_steps: usize) -> Result<BlockState, SimError> {
        if self.settings.is_none() {
            return Err(SimError::NotInitialized);
        }
        let block = self.blocks_done;
        self.blocks_done += 1;
        Ok(BlockState {
            block,
            steps_done: n_steps,
            potential_energy: 0.0,
            positions: self.positions.clone(),
        })
    }
}
