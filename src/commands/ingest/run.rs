use crate::cli::IngestArgs;
use crate::config::AppConfig;
use crate::datasets;
use crate::model::RunSummary;
use crate::util::{now_utc_string, utc_compact_string, write_json_pretty};

use super::*;

pub fn run(args: IngestArgs) -> Result<()> {
    let config = AppConfig::resolve(args.overrides());
    let run_date = args.run_date.unwrap_or_else(|| Local::now().date_naive());
    let selected = datasets::select(&args.datasets);

    let summary = ingest(&config, run_date, &selected, &TracingSink)?;

    if let Some(path) = &args.summary_path {
        write_json_pretty(path, &summary)?;
        info!(path = %path.display(), "wrote run summary");
    }

    Ok(())
}

/// Runs the engine once over `selected` with the store open for the whole
/// run. Only configuration and store errors are returned; dataset failures
/// land in the summary.
pub(super) fn ingest(
    config: &AppConfig,
    run_date: NaiveDate,
    selected: &[&DatasetSpec],
    sink: &dyn IngestSink,
) -> Result<RunSummary> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let input_dir = config.require_input_dir()?;

    info!(
        run_id = %run_id,
        run_date = %run_date,
        input_dir = %input_dir.display(),
        db_path = %config.db_path.display(),
        datasets = selected.len(),
        "starting ingest"
    );

    let mut connection = open_store(&config.db_path)?;
    ensure_tracking_schema(&connection)?;

    let engine = IngestEngine::new(input_dir, run_date, sink);
    let reports = engine.run(&mut connection, selected);

    connection
        .close()
        .map_err(|(_, err)| err)
        .with_context(|| format!("failed to close {}", config.db_path.display()))?;

    let mut summary = RunSummary {
        run_id,
        run_date,
        started_at,
        finished_at: now_utc_string(),
        input_dir: input_dir.display().to_string(),
        db_path: config.db_path.display().to_string(),
        processed: 0,
        skipped: 0,
        not_found: 0,
        failed: 0,
        datasets: reports,
    };
    summary.tally();

    if summary.failed > 0 {
        warn!(
            failed = summary.failed,
            "ingest completed with dataset failures"
        );
    }
    info!(
        run_id = %summary.run_id,
        processed = summary.processed,
        skipped = summary.skipped,
        not_found = summary.not_found,
        failed = summary.failed,
        "ingest completed"
    );

    Ok(summary)
}
