use crate::cli::RunArgs;
use crate::config::ScenarioFile;
use crate::error::Result;
use crate::ui::CliProgressHandler;
use mitosim::engine::progress::ProgressReporter;
use mitosim::engine::sim::NullEngine;
use mitosim::workflows::simulate::{self, RunOptions};
use tracing::info;

// TODO: grow an engine selector here once a real integrator backend lands;
// until then every run drives the recording NullEngine.
pub fn run(args: RunArgs, quiet: bool) -> Result<()> {
    info!("Loading scenario from {:?}", &args.scenario);
    let scenario = ScenarioFile::from_file(&args.scenario)?;
    let (mut pipeline, run_section) = scenario.build_pipeline()?;
    info!(actions = pipeline.len(), "pipeline assembled from scenario");

    if args.dry_run {
        pipeline.configure()?;
        let resolved = pipeline.resolved().ok_or_else(|| {
            crate::error::CliError::Scenario("pipeline resolved no configuration".to_string())
        })?;
        println!("✓ Scenario resolves. Run folder: {}", resolved.folder_name());
        return Ok(());
    }

    let options = RunOptions {
        output_dir: args.output.or(run_section.output_dir),
        total_blocks: args.blocks.unwrap_or(run_section.total_blocks),
        steps_per_block: args.steps_per_block.unwrap_or(run_section.steps_per_block),
        snapshot_every: args.snapshot_every.unwrap_or(run_section.snapshot_every),
    };

    let reporter = if quiet || args.no_progress {
        ProgressReporter::new()
    } else {
        ProgressReporter::with_callback(CliProgressHandler::new().get_callback())
    };

    let mut engine = NullEngine::new();
    let summary = simulate::run(&mut pipeline, &mut engine, &options, &reporter)?;

    match &summary.run_dir {
        Some(dir) => println!(
            "✓ Run complete: {} block(s), {} snapshot(s) in {}",
            summary.blocks_done,
            summary.snapshots_written,
            dir.display()
        ),
        None => println!(
            "✓ Run complete: {} block(s), nothing persisted",
            summary.blocks_done
        ),
    }

    Ok(())
}
