use std::fs;

use regex::Regex;

use super::*;

#[derive(Debug, Clone)]
pub(super) struct LocatedFile {
    pub(super) path: PathBuf,
    pub(super) file_name: String,
    pub(super) modified: DateTime<Utc>,
}

pub(super) fn file_pattern_display(spec: &DatasetSpec) -> String {
    format!("{}_*_*.{}", spec.file_prefix, spec.file_extension)
}

fn file_pattern(spec: &DatasetSpec) -> Result<Regex> {
    Regex::new(&format!(
        r"^{}_.*_.*\.{}$",
        regex::escape(spec.file_prefix),
        regex::escape(spec.file_extension)
    ))
    .with_context(|| format!("failed to compile file pattern for {}", spec.name))
}

/// Newest matching file by modification time; ties go to the greater name,
/// which carries the later generation stamp.
pub(super) fn locate_latest(input_dir: &Path, spec: &DatasetSpec) -> Result<Option<LocatedFile>> {
    let pattern = file_pattern(spec)?;
    let entries = fs::read_dir(input_dir)
        .with_context(|| format!("failed to read {}", input_dir.display()))?;

    let mut latest: Option<LocatedFile> = None;
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", input_dir.display()))?;
        let path = entry.path();

        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !pattern.is_match(file_name) {
            continue;
        }

        let metadata = fs::metadata(&path)
            .with_context(|| format!("failed to inspect {}", path.display()))?;
        if !metadata.is_file() {
            continue;
        }
        let modified: DateTime<Utc> = metadata
            .modified()
            .with_context(|| format!("failed to read modification time of {}", path.display()))?
            .into();

        let candidate = LocatedFile {
            file_name: file_name.to_string(),
            path,
            modified,
        };
        let newer = match &latest {
            None => true,
            Some(current) => {
                (candidate.modified, &candidate.file_name) > (current.modified, &current.file_name)
            }
        };
        if newer {
            latest = Some(candidate);
        }
    }

    Ok(latest)
}

pub(super) fn reporting_date_from_file_name(file_name: &str, segment: usize) -> Option<NaiveDate> {
    let stem = Path::new(file_name).file_stem()?.to_str()?;
    let raw = stem.split('_').nth(segment)?;
    if raw.len() != 8 || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }

    let year = raw[0..4].parse::<i32>().ok()?;
    let month = raw[4..6].parse::<u32>().ok()?;
    let day = raw[6..8].parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::datasets::{ORDENS_RF, SALDO};

    fn touch(dir: &Path, name: &str, modified: SystemTime) {
        let file = File::create(dir.join(name)).expect("file should be created");
        file.set_modified(modified).expect("mtime should be set");
    }

    #[test]
    fn reporting_date_uses_dataset_segment() {
        assert_eq!(
            reporting_date_from_file_name("ordens_rf_20241102_02-11-2024-10-30-45.xlsx", 2),
            NaiveDate::from_ymd_opt(2024, 11, 2)
        );
        assert_eq!(
            reporting_date_from_file_name("saldo_20241031_01-11-2024-08-00-00.xlsx", 1),
            NaiveDate::from_ymd_opt(2024, 10, 31)
        );
    }

    #[test]
    fn reporting_date_is_none_for_malformed_segments() {
        assert_eq!(reporting_date_from_file_name("saldo_2024110_x.xlsx", 1), None);
        assert_eq!(reporting_date_from_file_name("saldo_20241340_x.xlsx", 1), None);
        assert_eq!(reporting_date_from_file_name("saldo_latest_x.xlsx", 1), None);
        assert_eq!(reporting_date_from_file_name("saldo.xlsx", 1), None);
    }

    #[test]
    fn locate_latest_prefers_most_recent_modification() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_730_000_000);

        touch(dir.path(), "saldo_20241101_01-11-2024-08-00-00.xlsx", base + Duration::from_secs(60));
        touch(dir.path(), "saldo_20241031_31-10-2024-08-00-00.xlsx", base);
        touch(dir.path(), "saldo.xlsx", base + Duration::from_secs(600));
        touch(dir.path(), "ordens_rf_20241101_x.xlsx", base + Duration::from_secs(600));
        touch(dir.path(), "saldo_20241102_02-11-2024-08-00-00.csv", base + Duration::from_secs(600));

        let located = locate_latest(dir.path(), &SALDO)
            .expect("scan should succeed")
            .expect("a file should be found");
        assert_eq!(located.file_name, "saldo_20241101_01-11-2024-08-00-00.xlsx");
    }

    #[test]
    fn locate_latest_reports_nothing_when_no_file_matches() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        touch(dir.path(), "saldo_20241101_x.xlsx", SystemTime::now());

        let located = locate_latest(dir.path(), &ORDENS_RF).expect("scan should succeed");
        assert!(located.is_none());
    }

    #[test]
    fn locate_latest_fails_for_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        assert!(locate_latest(&dir.path().join("absent"), &SALDO).is_err());
    }
}
