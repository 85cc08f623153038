//! Append-only log of finished runs.
//!
//! One CSV row per run, no header:
//! `timestamp, runner, duration_s[, penalties, penalty_unit_s]`.
//! Rows written by older controllers only carry the first three columns.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::{debug, info};
use thiserror::Error;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("results file I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("results row {line} is malformed: {reason}")]
    Malformed { line: u64, reason: String },
    #[error("failed to write results row: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunRecord {
    pub timestamp: NaiveDateTime,
    pub runner: String,
    pub duration_s: f64,
    pub penalties: Option<u32>,
    pub penalty_unit_s: Option<f64>,
}

impl RunRecord {
    /// Raw duration plus the time charged for tripped beams.
    pub fn total_s(&self) -> f64 {
        match (self.penalties, self.penalty_unit_s) {
            (Some(n), Some(unit)) => self.duration_s + f64::from(n) * unit,
            _ => self.duration_s,
        }
    }

    fn to_row(&self) -> Vec<String> {
        let mut row = vec![
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            self.runner.clone(),
            self.duration_s.to_string(),
        ];
        if let Some(n) = self.penalties {
            row.push(n.to_string());
            row.push(self.penalty_unit_s.unwrap_or(0.0).to_string());
        }
        row
    }

    fn from_row(line: u64, row: &csv::StringRecord) -> Result<Self, RecordsError> {
        let malformed = |reason: String| RecordsError::Malformed { line, reason };

        if row.len() < 3 {
            return Err(malformed(format!("expected at least 3 fields, found {}", row.len())));
        }

        let timestamp = NaiveDateTime::parse_from_str(&row[0], TIMESTAMP_FORMAT)
            .map_err(|e| malformed(format!("bad timestamp {:?}: {e}", &row[0])))?;
        let duration_s: f64 = row[2]
            .trim()
            .parse()
            .map_err(|e| malformed(format!("bad duration {:?}: {e}", &row[2])))?;
        if !duration_s.is_finite() || duration_s < 0.0 {
            return Err(malformed(format!("duration out of range: {duration_s}")));
        }

        let penalties = match row.get(3) {
            Some(v) if !v.trim().is_empty() => Some(
                v.trim()
                    .parse::<u32>()
                    .map_err(|e| malformed(format!("bad penalty count {v:?}: {e}")))?,
            ),
            _ => None,
        };
        let penalty_unit_s = match row.get(4) {
            Some(v) if !v.trim().is_empty() => Some(
                v.trim()
                    .parse::<f64>()
                    .map_err(|e| malformed(format!("bad penalty unit {v:?}: {e}")))?,
            ),
            _ => None,
        };

        Ok(Self {
            timestamp,
            runner: row[1].to_string(),
            duration_s,
            penalties,
            penalty_unit_s,
        })
    }
}

pub fn read_records<R: Read>(reader: R) -> Result<Vec<RunRecord>, RecordsError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut out = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        // blank lines are skipped, so the record index can lag the file line
        let fallback = i as u64 + 1;
        let row = row.map_err(|e| RecordsError::Malformed {
            line: e.position().map_or(fallback, |p| p.line()),
            reason: e.to_string(),
        })?;
        let line = row.position().map_or(fallback, |p| p.line());
        out.push(RunRecord::from_row(line, &row)?);
    }
    Ok(out)
}

pub fn write_record<W: Write>(writer: W, record: &RunRecord) -> Result<(), RecordsError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(writer);
    wtr.write_record(record.to_row())?;
    wtr.flush()?;
    Ok(())
}

/// Lowest penalized total wins; ties go to the earlier row.
///
/// Runs are ranked by `duration + penalties * unit` rather than by the raw
/// duration column, so a fast run with penalties can lose to a clean one.
/// Rows without penalty columns rank by their duration.
pub fn best_of(records: &[RunRecord]) -> Option<&RunRecord> {
    records
        .iter()
        .reduce(|best, r| if r.total_s() < best.total_s() { r } else { best })
}

pub fn leaderboard(records: &[RunRecord], top: usize) -> Vec<&RunRecord> {
    let mut sorted: Vec<&RunRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.total_s().total_cmp(&b.total_s()));
    sorted.truncate(top);
    sorted
}

#[derive(Clone, Debug)]
pub struct ResultsStore {
    path: PathBuf,
}

impl ResultsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &RunRecord) -> Result<(), RecordsError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        write_record(file, record)?;
        info!(
            "recorded run for {:?}: {:.2}s, {} penalties",
            record.runner,
            record.duration_s,
            record.penalties.unwrap_or(0)
        );
        Ok(())
    }

    /// A missing file means nobody has run yet.
    pub fn load(&self) -> Result<Vec<RunRecord>, RecordsError> {
        match File::open(&self.path) {
            Ok(f) => read_records(f),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no results file at {}", self.path.display());
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn best(&self) -> Result<Option<RunRecord>, RecordsError> {
        let records = self.load()?;
        Ok(best_of(&records).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn run(name: &str, duration_s: f64, penalties: Option<u32>) -> RunRecord {
        RunRecord {
            timestamp: ts(14, 2, 11),
            runner: name.to_string(),
            duration_s,
            penalties,
            penalty_unit_s: penalties.map(|_| 5.0),
        }
    }

    #[test]
    fn writes_and_reads_back_rows() {
        let mut buf = Vec::new();
        write_record(&mut buf, &run("ada", 42.5, Some(2))).unwrap();
        write_record(&mut buf, &run("Smith, J", 40.0, None)).unwrap();

        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("2024-03-09 14:02:11,ada,42.5,2,5\n"));
        assert!(text.contains("\"Smith, J\""));

        let back = read_records(buf.as_slice()).unwrap();
        assert_eq!(back, vec![run("ada", 42.5, Some(2)), run("Smith, J", 40.0, None)]);
    }

    #[test]
    fn legacy_three_column_rows_parse() {
        let data = "2019-07-01 10:00:00,bob,61.25\n";
        let rows = read_records(data.as_bytes()).unwrap();
        assert_eq!(rows[0].penalties, None);
        assert_eq!(rows[0].total_s(), 61.25);
    }

    #[test]
    fn best_uses_penalized_total() {
        let rows = vec![
            run("fast-but-sloppy", 30.0, Some(3)),
            run("steady", 40.0, Some(0)),
            run("legacy", 44.0, None),
        ];
        assert_eq!(best_of(&rows).unwrap().runner, "steady");

        let top = leaderboard(&rows, 2);
        let names: Vec<&str> = top.iter().map(|r| r.runner.as_str()).collect();
        assert_eq!(names, vec!["steady", "legacy"]);
    }

    #[test]
    fn best_of_nothing_is_none() {
        assert!(best_of(&[]).is_none());
    }

    #[test]
    fn malformed_duration_reports_line() {
        let data = "2019-07-01 10:00:00,bob,61.25\n2019-07-01 10:05:00,eve,fast\n";
        match read_records(data.as_bytes()) {
            Err(RecordsError::Malformed { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed row, got {other:?}"),
        }
    }

    #[test]
    fn malformed_row_after_blank_lines_reports_file_line() {
        let data = "2019-07-01 10:00:00,bob,61.25\n\n\n2019-07-01 10:05:00,eve,fast\n";
        match read_records(data.as_bytes()) {
            Err(RecordsError::Malformed { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected malformed row, got {other:?}"),
        }
    }

    #[test]
    fn short_rows_are_malformed() {
        let data = "2019-07-01 10:00:00,bob\n";
        assert!(matches!(
            read_records(data.as_bytes()),
            Err(RecordsError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn store_appends_and_tolerates_missing_file() {
        let path = std::env::temp_dir().join(format!(
            "laser-escape-records-{}-{}.csv",
            std::process::id(),
            line!()
        ));
        let _ = std::fs::remove_file(&path);
        let store = ResultsStore::new(&path);

        assert!(store.load().unwrap().is_empty());
        assert!(store.best().unwrap().is_none());

        store.append(&run("ada", 50.0, Some(1))).unwrap();
        store.append(&run("bob", 52.0, Some(0))).unwrap();

        let all = store.load().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(store.best().unwrap().unwrap().runner, "ada");

        std::fs::remove_file(&path).unwrap();
    }
}
