use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(
    name = "backoffice-ingest",
    version,
    about = "Incremental ingestion of back-office spreadsheet reports into SQLite"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Init(InitArgs),
    Ingest(IngestArgs),
    Backup(BackupArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long = "dataset", value_enum)]
    pub datasets: Vec<DatasetName>,

    /// Date used to anchor current-month windows (defaults to today).
    #[arg(long)]
    pub run_date: Option<NaiveDate>,

    #[arg(long)]
    pub summary_path: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum DatasetName {
    #[value(name = "ordens_rf")]
    OrdensRf,
    Positivador,
    Saldo,
}

#[derive(Args, Debug, Clone)]
pub struct BackupArgs {
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub backup_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

impl InitArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            db_path: self.db_path.clone(),
            ..ConfigOverrides::default()
        }
    }
}

impl IngestArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            input_dir: self.input_dir.clone(),
            db_path: self.db_path.clone(),
            ..ConfigOverrides::default()
        }
    }
}

impl BackupArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            db_path: self.db_path.clone(),
            backup_dir: self.backup_dir.clone(),
            ..ConfigOverrides::default()
        }
    }
}

impl StatusArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            db_path: self.db_path.clone(),
            ..ConfigOverrides::default()
        }
    }
}
