use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, error, info, warn};

use crate::model::{
    Coercion, ColumnSpec, DatasetOutcome, DatasetReport, DatasetSpec, MonthWindow, PartitionKey,
    SkipReason, TrackingRecord, WindowPolicy,
};
use crate::util::{ensure_parent_directory, utc_micros_string};

mod db_setup;
mod detector;
mod engine;
mod ledger;
mod locator;
mod replacer;
mod run;
mod sink;
mod transform;
mod workbook;

pub use run::run;
pub(crate) use db_setup::{open_store, table_exists};
pub(crate) use ledger::{TRACKING_TABLE, ensure_tracking_schema, list_records};

use db_setup::*;
use detector::*;
use engine::*;
use ledger::*;
use locator::*;
use replacer::*;
use sink::*;
use transform::*;
use workbook::*;
