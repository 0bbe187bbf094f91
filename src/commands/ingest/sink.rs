use super::*;

/// Per-dataset decisions the engine reports while it runs.
#[derive(Debug, Clone, Copy)]
pub(super) enum IngestEvent<'a> {
    FileFound {
        file: &'a LocatedFile,
        reporting_date: Option<NaiveDate>,
    },
    FileNotFound {
        pattern: &'a str,
    },
    Skipped {
        file_name: &'a str,
        reason: &'a SkipReason,
    },
    Processing {
        file_name: &'a str,
        reason: &'a ProcessReason,
    },
    WindowReplaced {
        window: &'a MonthWindow,
        reporting_date: Option<NaiveDate>,
        deleted: usize,
    },
    Processed {
        file_name: &'a str,
        inserted: usize,
    },
    Failed {
        file_name: Option<&'a str>,
        error: &'a str,
    },
}

impl IngestEvent<'_> {
    pub(super) fn kind(&self) -> &'static str {
        match self {
            Self::FileFound { .. } => "found",
            Self::FileNotFound { .. } => "not_found",
            Self::Skipped { .. } => "skipped",
            Self::Processing {
                reason: ProcessReason::DetectionFailed { .. },
                ..
            } => "detection_failed",
            Self::Processing { .. } => "processing",
            Self::WindowReplaced { .. } => "window_replaced",
            Self::Processed { .. } => "processed",
            Self::Failed { .. } => "failed",
        }
    }
}

pub(super) trait IngestSink {
    fn record(&self, dataset: &str, event: IngestEvent<'_>);
}

#[derive(Debug, Default, Clone, Copy)]
pub(super) struct TracingSink;

impl IngestSink for TracingSink {
    fn record(&self, dataset: &str, event: IngestEvent<'_>) {
        debug!(dataset, event = event.kind(), "ingest event");
        match event {
            IngestEvent::FileFound {
                file,
                reporting_date,
            } => match reporting_date {
                Some(date) => info!(
                    dataset,
                    file = %file.file_name,
                    modified = %utc_micros_string(file.modified),
                    reporting_date = %date,
                    "found input file"
                ),
                None => warn!(
                    dataset,
                    file = %file.file_name,
                    modified = %utc_micros_string(file.modified),
                    "found input file without a reporting date; using run-date window"
                ),
            },
            IngestEvent::FileNotFound { pattern } => {
                warn!(dataset, pattern, "no input file found; skipping dataset")
            }
            IngestEvent::Skipped { file_name, reason } => match reason {
                SkipReason::Unchanged => {
                    info!(dataset, file = file_name, "file unchanged since last load; skipping")
                }
                SkipReason::SnapshotAlreadyLoaded { reporting_date } => info!(
                    dataset,
                    file = file_name,
                    reporting_date = %reporting_date,
                    "rows for reporting date already present; skipping"
                ),
            },
            IngestEvent::Processing { file_name, reason } => match reason {
                ProcessReason::NeverProcessed => {
                    info!(dataset, file = file_name, "loading new file")
                }
                ProcessReason::Modified { drift_ms } => info!(
                    dataset,
                    file = file_name,
                    drift_ms,
                    "file modified since last load; reloading"
                ),
                ProcessReason::DetectionFailed { error } => warn!(
                    dataset,
                    file = file_name,
                    error = %error,
                    "change detection failed; loading anyway"
                ),
            },
            IngestEvent::WindowReplaced {
                window,
                reporting_date,
                deleted,
            } => {
                info!(
                    dataset,
                    window_start = %window.start,
                    window_end = %window.end,
                    deleted,
                    "cleared open window"
                );
                if let Some(date) = reporting_date.filter(|date| !window.contains(*date)) {
                    warn!(
                        dataset,
                        reporting_date = %date,
                        window_start = %window.start,
                        window_end = %window.end,
                        "reporting date falls outside the open window"
                    );
                }
            }
            IngestEvent::Processed {
                file_name,
                inserted,
            } => info!(dataset, file = file_name, inserted, "dataset loaded"),
            IngestEvent::Failed { file_name, error } => error!(
                dataset,
                file = file_name.unwrap_or("-"),
                error = %error,
                "dataset load failed; changes rolled back"
            ),
        }
    }
}
