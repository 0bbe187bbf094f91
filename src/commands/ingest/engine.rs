use super::*;

/// Drives every selected dataset through locate, detect, transform and
/// replace against one open store. A dataset failure never stops the run.
pub(super) struct IngestEngine<'a> {
    input_dir: &'a Path,
    run_date: NaiveDate,
    sink: &'a dyn IngestSink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct LoadCounts {
    pub(super) deleted: usize,
    pub(super) inserted: usize,
}

impl<'a> IngestEngine<'a> {
    pub(super) fn new(input_dir: &'a Path, run_date: NaiveDate, sink: &'a dyn IngestSink) -> Self {
        Self {
            input_dir,
            run_date,
            sink,
        }
    }

    pub(super) fn run(
        &self,
        connection: &mut Connection,
        datasets: &[&DatasetSpec],
    ) -> Vec<DatasetReport> {
        datasets
            .iter()
            .map(|spec| DatasetReport {
                dataset: spec.name.to_string(),
                table: spec.table.to_string(),
                outcome: self.ingest_dataset(connection, spec),
            })
            .collect()
    }

    pub(super) fn ingest_dataset(
        &self,
        connection: &mut Connection,
        spec: &DatasetSpec,
    ) -> DatasetOutcome {
        let located = match locate_latest(self.input_dir, spec) {
            Ok(Some(located)) => located,
            Ok(None) => {
                let pattern = file_pattern_display(spec);
                self.sink
                    .record(spec.name, IngestEvent::FileNotFound { pattern: &pattern });
                return DatasetOutcome::NotFound { pattern };
            }
            Err(err) => return self.fail(spec, None, &err),
        };

        let reporting_date = reporting_date_from_file_name(&located.file_name, spec.date_segment);
        self.sink.record(
            spec.name,
            IngestEvent::FileFound {
                file: &located,
                reporting_date,
            },
        );

        let reason = match decide(connection, spec, &located, reporting_date) {
            Decision::Skip(reason) => {
                self.sink.record(
                    spec.name,
                    IngestEvent::Skipped {
                        file_name: &located.file_name,
                        reason: &reason,
                    },
                );
                return DatasetOutcome::Skipped {
                    file_name: located.file_name,
                    reason,
                };
            }
            Decision::Process(reason) => reason,
        };
        self.sink.record(
            spec.name,
            IngestEvent::Processing {
                file_name: &located.file_name,
                reason: &reason,
            },
        );

        let window = open_window(spec.window_policy, reporting_date, self.run_date);
        match self.load(connection, spec, &located, reporting_date, &window) {
            Ok(counts) => {
                self.sink.record(
                    spec.name,
                    IngestEvent::WindowReplaced {
                        window: &window,
                        reporting_date,
                        deleted: counts.deleted,
                    },
                );
                self.sink.record(
                    spec.name,
                    IngestEvent::Processed {
                        file_name: &located.file_name,
                        inserted: counts.inserted,
                    },
                );
                DatasetOutcome::Processed {
                    file_name: located.file_name,
                    reporting_date,
                    window,
                    rows_deleted: counts.deleted,
                    rows_inserted: counts.inserted,
                }
            }
            Err(err) => self.fail(spec, Some(&located.file_name), &err),
        }
    }

    /// Everything from table creation to the ledger update commits together;
    /// returning early drops the transaction, which rolls it back.
    fn load(
        &self,
        connection: &mut Connection,
        spec: &DatasetSpec,
        located: &LocatedFile,
        reporting_date: Option<NaiveDate>,
        window: &MonthWindow,
    ) -> Result<LoadCounts> {
        let table = read_first_sheet(&located.path)?;
        let batch = transform_table(spec, &table, reporting_date);
        if batch.mapped_source_columns == 0 {
            bail!(
                "none of the {} mapped columns are present in {}",
                spec.name,
                located.file_name
            );
        }

        let tx = connection
            .transaction()
            .context("failed to start ingest transaction")?;
        ensure_dataset_table(&tx, spec)?;
        let deleted = delete_window(&tx, spec, window)?;
        let inserted = insert_batch(&tx, spec.table, &batch)?;
        upsert_record(
            &tx,
            &located.file_name,
            spec.table,
            located.modified,
            Utc::now(),
        )?;
        tx.commit()
            .with_context(|| format!("failed to commit {} load", spec.name))?;

        Ok(LoadCounts { deleted, inserted })
    }

    fn fail(&self, spec: &DatasetSpec, file_name: Option<&str>, err: &anyhow::Error) -> DatasetOutcome {
        let reason = format!("{err:#}");
        self.sink.record(
            spec.name,
            IngestEvent::Failed {
                file_name,
                error: &reason,
            },
        );
        DatasetOutcome::Failed {
            file_name: file_name.map(str::to_string),
            reason,
        }
    }
}
