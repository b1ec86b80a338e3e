//! Scenario files: a TOML description of a pipeline plus its run settings.
//!
//! A scenario lists `[[action]]` tables, each carrying a `kind` selector and
//! the action's parameters in the same kebab-case keys the resolved
//! configuration uses, plus an optional `[run]` table with the loop settings.

use crate::error::{CliError, Result};
use mitosim::actions::chains::AddChainsParams;
use mitosim::actions::confinement::{
    DynamicCylinderCompressionParams, StaticCylinderConfinementParams,
};
use mitosim::actions::conformations::{HelicalLoopBrushParams, UniformHelicalLoopBrushParams};
use mitosim::actions::heteropolymer::RandomBlockParticleTypesParams;
use mitosim::actions::init::InitializeSimulationParams;
use mitosim::actions::loops::{
    AddLoopsParams, RootLoopSeparatorParams, SingleLayerLoopsParams, TwoLayerLoopsParams,
};
use mitosim::actions::tethers::{
    BackboneStiffnessParams, BackboneTetheringParams, TipsTetheringParams,
};
use mitosim::actions::{
    AddChains, AddLoops, BackboneStiffness, BackboneTethering, DynamicCylinderCompression,
    HelicalLoopBrushConformation, InitializeSimulation, RandomBlockParticleTypes,
    RootLoopSeparator, SetInitialConformation, SingleLayerLoops, StaticCylinderConfinement,
    TipsTethering, TwoLayerLoops, UniformHelicalLoopBrushConformation,
};
use mitosim::engine::action::Action;
use mitosim::engine::pipeline::Pipeline;
use mitosim::workflows::simulate::RunOptions;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RunSection {
    pub output_dir: Option<PathBuf>,
    pub total_blocks: usize,
    pub steps_per_block: usize,
    pub snapshot_every: usize,
}

impl Default for RunSection {
    fn default() -> Self {
        let defaults = RunOptions::default();
        Self {
            output_dir: None,
            total_blocks: defaults.total_blocks,
            steps_per_block: defaults.steps_per_block,
            snapshot_every: defaults.snapshot_every,
        }
    }
}

/// One `[[action]]` table: the `kind` selector plus the remaining keys, parsed
/// into the matching parameter record on demand.
#[derive(Debug, Deserialize)]
pub struct ActionSpec {
    kind: String,
    #[serde(flatten)]
    params: toml::Value,
}

impl ActionSpec {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn into_action(self) -> Result<Box<dyn Action>> {
        let kind = self.kind;
        let params = self.params;
        let action: Box<dyn Action> = match kind.as_str() {
            "initialize-simulation" => Box::new(InitializeSimulation::new(
                parse::<InitializeSimulationParams>(&kind, params)?,
            )),
            "add-chains" => Box::new(AddChains::new(parse::<AddChainsParams>(&kind, params)?)),
            "single-layer-loops" => Box::new(SingleLayerLoops::new(
                parse::<SingleLayerLoopsParams>(&kind, params)?,
            )),
            "two-layer-loops" => Box::new(TwoLayerLoops::new(
                parse::<TwoLayerLoopsParams>(&kind, params)?,
            )),
            "add-loops" => Box::new(AddLoops::new(parse::<AddLoopsParams>(&kind, params)?)),
            "root-loop-separator" => Box::new(RootLoopSeparator::new(
                parse::<RootLoopSeparatorParams>(&kind, params)?,
            )),
            "helical-loop-brush-conformation" => Box::new(HelicalLoopBrushConformation::new(
                parse::<HelicalLoopBrushParams>(&kind, params)?,
            )),
            "uniform-helical-loop-brush-conformation" => {
                Box::new(UniformHelicalLoopBrushConformation::new(
                    parse::<UniformHelicalLoopBrushParams>(&kind, params)?,
                ))
            }
            "set-initial-conformation" => Box::new(SetInitialConformation::default()),
            "backbone-tethering" => Box::new(BackboneTethering::new(
                parse::<BackboneTetheringParams>(&kind, params)?,
            )),
            "tips-tethering" => Box::new(TipsTethering::new(
                parse::<TipsTetheringParams>(&kind, params)?,
            )),
            "backbone-stiffness" => Box::new(BackboneStiffness::new(
                parse::<BackboneStiffnessParams>(&kind, params)?,
            )),
            "static-cylinder-confinement" => Box::new(StaticCylinderConfinement::new(
                parse::<StaticCylinderConfinementParams>(&kind, params)?,
            )),
            "dynamic-cylinder-compression" => Box::new(DynamicCylinderCompression::new(
                parse::<DynamicCylinderCompressionParams>(&kind, params)?,
            )),
            "random-block-particle-types" => Box::new(RandomBlockParticleTypes::new(
                parse::<RandomBlockParticleTypesParams>(&kind, params)?,
            )),
            other => {
                return Err(CliError::Scenario(format!("unknown action kind '{other}'")));
            }
        };
        Ok(action)
    }
}

fn parse<T>(kind: &str, params: toml::Value) -> Result<T>
where
    T: DeserializeOwned,
{
    params
        .try_into()
        .map_err(|e| CliError::Scenario(format!("invalid parameters for action '{kind}': {e}")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScenarioFile {
    #[serde(default)]
    pub run: RunSection,
    #[serde(default, rename = "action")]
    pub actions: Vec<ActionSpec>,
}

impl ScenarioFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| CliError::ScenarioParsing {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Builds the pipeline in scenario order.
    pub fn build_pipeline(self) -> Result<(Pipeline, RunSection)> {
        if self.actions.is_empty() {
            return Err(CliError::Scenario(
                "scenario declares no actions".to_string(),
            ));
        }
        let mut pipeline = Pipeline::new();
        for spec in self.actions {
            pipeline.add_boxed_action(spec.into_action()?);
        }
        Ok((pipeline, self.run))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
        [run]
        total-blocks = 20
        steps-per-block = 500
        snapshot-every = 5

        [[action]]
        kind = "initialize-simulation"
        n = 4000

        [[action]]
        kind = "add-chains"

        [[action]]
        kind = "single-layer-loops"
        loop-size = 200.0
        seed = 11

        [[action]]
        kind = "helical-loop-brush-conformation"
        turn-length = 500.0
        step = 100.0
        seed = 11

        [[action]]
        kind = "set-initial-conformation"
    "#;

    #[test]
    fn scenario_parses_and_builds_a_pipeline() {
        let scenario: ScenarioFile = toml::from_str(SCENARIO).unwrap();
        assert_eq!(scenario.run.total_blocks, 20);
        let (pipeline, run) = scenario.build_pipeline().unwrap();
        assert_eq!(run.snapshot_every, 5);
        assert_eq!(
            pipeline.action_names(),
            vec![
                "initialize_simulation",
                "add_chains",
                "single_layer_loops",
                "helical_loop_brush_conformation",
                "set_initial_conformation"
            ]
        );
    }

    #[test]
    fn separator_and_uniform_brush_kinds_resolve() {
        let scenario: ScenarioFile = toml::from_str(
            r#"
            [[action]]
            kind = "root-loop-separator"
            wiggle-dist = 0.2

            [[action]]
            kind = "uniform-helical-loop-brush-conformation"
            radius = 10.0
            step = 20.0
            "#,
        )
        .unwrap();
        let (pipeline, _) = scenario.build_pipeline().unwrap();
        assert_eq!(
            pipeline.action_names(),
            vec![
                "root_loop_separator",
                "uniform_helical_loop_brush_conformation"
            ]
        );
    }

    #[test]
    fn unknown_action_kind_is_reported_by_name() {
        let spec: ActionSpec = toml::from_str("kind = \"melt-chromosomes\"").unwrap();
        let err = spec.into_action().unwrap_err();
        assert!(err.to_string().contains("melt-chromosomes"));
    }

    #[test]
    fn invalid_parameters_name_the_action_kind() {
        let spec: ActionSpec =
            toml::from_str("kind = \"single-layer-loops\"\nloop-size = \"huge\"").unwrap();
        let err = spec.into_action().unwrap_err();
        assert!(err.to_string().contains("single-layer-loops"));
    }

    #[test]
    fn empty_scenario_is_rejected() {
        let scenario: ScenarioFile = toml::from_str("").unwrap();
        assert!(scenario.build_pipeline().is_err());
    }
}
