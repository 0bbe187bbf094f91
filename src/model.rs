use chrono::{Datelike, Days, Months, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    CurrencyDecimal,
    Number,
    NullableInteger,
    NullableDate,
    SerialDate,
    Text,
    PrefixedIdentifier(&'static str),
}

impl Coercion {
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::CurrencyDecimal | Self::Number => "REAL",
            Self::NullableInteger => "INTEGER",
            Self::NullableDate | Self::SerialDate | Self::Text | Self::PrefixedIdentifier(_) => {
                "TEXT"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub source: &'static str,
    pub column: &'static str,
    pub coercion: Coercion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPolicy {
    /// `[start of previous month, start of next month)` around the run date.
    CurrentMonthAnchored,
    /// The calendar month of the file's reporting date.
    SnapshotAnchored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKey {
    /// A mapped source column carries the reporting date of each row.
    SourceColumn(&'static str),
    /// Every row receives the reporting date parsed from the file name.
    FileReportingDate(&'static str),
}

/// Static description of one logical dataset: where its files come from,
/// how their columns map onto the table and how its open window is scoped.
#[derive(Debug, Clone, Copy)]
pub struct DatasetSpec {
    pub name: &'static str,
    pub table: &'static str,
    pub file_prefix: &'static str,
    pub file_extension: &'static str,
    /// Index of the `YYYYMMDD` segment in the underscore-split file stem.
    pub date_segment: usize,
    pub columns: &'static [ColumnSpec],
    pub partition_key: PartitionKey,
    pub window_policy: WindowPolicy,
    /// Skip an untracked file when rows for its reporting date already exist.
    pub snapshot_guard: bool,
}

impl DatasetSpec {
    pub fn partition_column(&self) -> &'static str {
        match self.partition_key {
            PartitionKey::SourceColumn(column) | PartitionKey::FileReportingDate(column) => column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingRecord {
    pub file_name: String,
    pub table_name: String,
    pub last_modified: String,
    pub last_processed: Option<String>,
}

/// Half-open date range `[start, end)` that a dataset may replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthWindow {
    pub fn single(anchor: NaiveDate) -> Self {
        let start = first_of_month(anchor);
        Self {
            start,
            end: start + Months::new(1),
        }
    }

    pub fn trailing(anchor: NaiveDate) -> Self {
        let current = first_of_month(anchor);
        Self {
            start: current - Months::new(1),
            end: current + Months::new(1),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    pub fn start_text(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_text(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    Unchanged,
    SnapshotAlreadyLoaded { reporting_date: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DatasetOutcome {
    Processed {
        file_name: String,
        reporting_date: Option<NaiveDate>,
        window: MonthWindow,
        rows_deleted: usize,
        rows_inserted: usize,
    },
    Skipped {
        file_name: String,
        reason: SkipReason,
    },
    NotFound {
        pattern: String,
    },
    Failed {
        file_name: Option<String>,
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetReport {
    pub dataset: String,
    pub table: String,
    pub outcome: DatasetOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub run_date: NaiveDate,
    pub started_at: String,
    pub finished_at: String,
    pub input_dir: String,
    pub db_path: String,
    pub processed: usize,
    pub skipped: usize,
    pub not_found: usize,
    pub failed: usize,
    pub datasets: Vec<DatasetReport>,
}

impl RunSummary {
    pub fn tally(&mut self) {
        self.processed = 0;
        self.skipped = 0;
        self.not_found = 0;
        self.failed = 0;
        for report in &self.datasets {
            match report.outcome {
                DatasetOutcome::Processed { .. } => self.processed += 1,
                DatasetOutcome::Skipped { .. } => self.skipped += 1,
                DatasetOutcome::NotFound { .. } => self.not_found += 1,
                DatasetOutcome::Failed { .. } => self.failed += 1,
            }
        }
    }
}
