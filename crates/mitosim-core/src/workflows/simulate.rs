use crate::core::io::{ResolvedConfig, SnapshotWriter};
use crate::engine::error::PipelineError;
use crate::engine::pipeline::Pipeline;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::sim::SimulationEngine;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Runtime options for a simulation run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Root directory for the run folder. `None` disables persistence: no
    /// configuration dump and no snapshots.
    pub output_dir: Option<PathBuf>,
    pub total_blocks: usize,
    pub steps_per_block: usize,
    /// Snapshot cadence in blocks; `0` disables snapshots.
    pub snapshot_every: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            total_blocks: 100,
            steps_per_block: 10_000,
            snapshot_every: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The run folder, when persistence was enabled.
    pub run_dir: Option<PathBuf>,
    pub blocks_done: usize,
    pub snapshots_written: usize,
}

/// Drives a built pipeline through its full lifecycle: configure, persist the
/// resolved configuration under a deterministic run folder, attach to the
/// engine, and execute the block loop with periodic coordinate snapshots.
#[instrument(skip_all, name = "simulation_workflow")]
pub fn run(
    pipeline: &mut Pipeline,
    engine: &mut dyn SimulationEngine,
    options: &RunOptions,
    reporter: &ProgressReporter,
) -> Result<RunSummary, PipelineError> {
    // === Phase 1: Configuration ===
    reporter.report(Progress::PhaseStart {
        name: "Configuration",
    });
    info!(actions = pipeline.len(), "starting configuration pass");
    pipeline.configure()?;
    reporter.report(Progress::PhaseFinish);

    let run_dir = persist_resolved(pipeline, options)?;

    // === Phase 2: Engine attachment ===
    reporter.report(Progress::PhaseStart {
        name: "Engine Attachment",
    });
    pipeline.attach_to_engine(engine)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Block loop ===
    let snapshots = match (&run_dir, options.snapshot_every) {
        (Some(dir), every) if every > 0 => Some(SnapshotWriter::new(dir.join("blocks"))?),
        _ => None,
    };

    reporter.report(Progress::RunStart {
        total_blocks: options.total_blocks as u64,
    });
    let mut snapshots_written = 0;
    pipeline.run_loop_with(
        engine,
        options.total_blocks,
        options.steps_per_block,
        |block_state| {
            if let Some(writer) = &snapshots {
                if block_state.block % options.snapshot_every == 0 {
                    writer.write_block(block_state.block, &block_state.positions)?;
                    snapshots_written += 1;
                }
            }
            reporter.report(Progress::BlockFinish {
                block: block_state.block as u64,
            });
            Ok(())
        },
    )?;

    info!(
        blocks = options.total_blocks,
        snapshots = snapshots_written,
        "simulation run complete"
    );
    Ok(RunSummary {
        run_dir,
        blocks_done: options.total_blocks,
        snapshots_written,
    })
}

fn persist_resolved(
    pipeline: &Pipeline,
    options: &RunOptions,
) -> Result<Option<PathBuf>, PipelineError> {
    let Some(root) = &options.output_dir else {
        return Ok(None);
    };
    let resolved = resolved_config(pipeline)?;
    let run_dir = root.join(resolved.folder_name());
    let path = resolved.save_to(&run_dir)?;
    info!(path = %path.display(), "resolved configuration saved");
    Ok(Some(run_dir))
}

fn resolved_config(pipeline: &Pipeline) -> Result<&ResolvedConfig, PipelineError> {
    pipeline.resolved().ok_or_else(|| {
        PipelineError::Internal("configured pipeline carries no resolved configuration".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{
        AddChains, AddLoops, BackboneStiffness, BackboneTethering, HelicalLoopBrushConformation,
        InitializeSimulation, SetInitialConformation, SingleLayerLoops, StaticCylinderConfinement,
        TipsTethering,
    };
    use crate::actions::conformations::HelicalLoopBrushParams;
    use crate::actions::loops::SingleLayerLoopsParams;
    use crate::core::conformation::HelixConstraints;
    use crate::engine::pipeline::Phase;
    use crate::engine::sim::NullEngine;
    use std::sync::Mutex;

    fn brush_pipeline() -> Pipeline {
        let mut pipeline = Pipeline::new();
        pipeline.add_action(InitializeSimulation::with_count(2_000));
        pipeline.add_action(AddChains::default());
        pipeline.add_action(SingleLayerLoops::new(SingleLayerLoopsParams {
            seed: Some(5),
            ..Default::default()
        }));
        pipeline.add_action(HelicalLoopBrushConformation::new(HelicalLoopBrushParams {
            helix: HelixConstraints {
                turn_length: Some(500.0),
                step: Some(100.0),
                ..Default::default()
            },
            seed: Some(5),
            ..Default::default()
        }));
        pipeline.add_action(SetInitialConformation::default());
        pipeline.add_action(AddLoops::default());
        pipeline.add_action(BackboneTethering::default());
        pipeline.add_action(TipsTethering::default());
        pipeline.add_action(BackboneStiffness::default());
        pipeline.add_action(StaticCylinderConfinement::default());
        pipeline
    }

    #[test]
    fn full_run_persists_config_and_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = brush_pipeline();
        let mut engine = NullEngine::new();
        let options = RunOptions {
            output_dir: Some(dir.path().to_path_buf()),
            total_blocks: 6,
            steps_per_block: 100,
            snapshot_every: 2,
        };
        let summary = run(
            &mut pipeline,
            &mut engine,
            &options,
            &ProgressReporter::new(),
        )
        .unwrap();

        assert_eq!(pipeline.phase(), Phase::Attached);
        assert_eq!(summary.blocks_done, 6);
        assert_eq!(summary.snapshots_written, 3);
        let run_dir = summary.run_dir.unwrap();
        assert!(run_dir.join("config.toml").exists());
        assert!(run_dir.join("blocks").join("block_000000000.csv").exists());
        assert!(run_dir.join("blocks").join("block_000000004.csv").exists());
        assert_eq!(engine.blocks_done(), 6);
    }

    #[test]
    fn dry_run_without_output_dir_writes_nothing() {
        let mut pipeline = brush_pipeline();
        let mut engine = NullEngine::new();
        let options = RunOptions {
            total_blocks: 2,
            steps_per_block: 10,
            ..Default::default()
        };
        let summary = run(
            &mut pipeline,
            &mut engine,
            &options,
            &ProgressReporter::new(),
        )
        .unwrap();
        assert!(summary.run_dir.is_none());
        assert_eq!(summary.snapshots_written, 0);
    }

    #[test]
    fn progress_events_cover_phases_and_blocks() {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(event);
        }));

        let mut pipeline = brush_pipeline();
        let mut engine = NullEngine::new();
        let options = RunOptions {
            total_blocks: 3,
            steps_per_block: 10,
            ..Default::default()
        };
        run(&mut pipeline, &mut engine, &options, &reporter).unwrap();
        drop(reporter);

        let events = events.into_inner().unwrap();
        let phase_starts = events
            .iter()
            .filter(|e| matches!(e, Progress::PhaseStart { .. }))
            .count();
        let block_finishes = events
            .iter()
            .filter(|e| matches!(e, Progress::BlockFinish { .. }))
            .count();
        assert_eq!(phase_starts, 2);
        assert_eq!(block_finishes, 3);
    }

    #[test]
    fn missing_state_fails_the_run_without_registering_forces() {
        let mut pipeline = Pipeline::new();
        // Reads backbone state that no action provides.
        pipeline.add_action(BackboneTethering::default());
        let mut engine = NullEngine::new();
        let err = run(
            &mut pipeline,
            &mut engine,
            &RunOptions::default(),
            &ProgressReporter::new(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::MissingKey { .. }));
        assert!(engine.forces().is_empty());
    }
}
