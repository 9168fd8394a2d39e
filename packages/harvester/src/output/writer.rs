//! Record file writer.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::Record;

/// Render one record in the record file format.
///
/// Every field of the record kind is written, in schema order, even when
/// empty. Field values are flattened to a single line.
///
/// # Examples
/// ```
/// use legalacts_harvester::output::format_record;
/// use legalacts_harvester::types::{LawRecord, Record};
///
/// let record = Record::Law(LawRecord {
///     law_number: "622-ФЗ".to_string(),
///     law_name: "О внесении изменений".to_string(),
///     updated_at: String::new(),
///     body: "Статья 1\nТекст.".to_string(),
/// });
/// assert_eq!(
///     format_record(&record),
///     "[law_number] 622-ФЗ\n[law_name] О внесении изменений\n[updated_at]\n\nСтатья 1\nТекст.\n"
/// );
/// ```
#[must_use]
pub fn format_record(record: &Record) -> String {
    let mut out = String::new();
    for (name, value) in record.fields() {
        let value = single_line(value);
        if value.is_empty() {
            out.push_str(&format!("[{name}]\n"));
        } else {
            out.push_str(&format!("[{name}] {value}\n"));
        }
    }
    out.push('\n');
    out.push_str(record.body().trim_end_matches('\n'));
    out.push('\n');
    out
}

fn single_line(value: &str) -> String {
    value
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// File that receives the records of one code.
#[must_use]
pub fn code_destination(output_dir: &Path, slug: &str) -> PathBuf {
    output_dir.join(format!("{slug}.txt"))
}

/// Appends records to record files.
///
/// Each record goes out in a single write followed by a flush and sync, so
/// a killed process loses at most the record in flight.
#[derive(Debug, Default)]
pub struct RecordWriter {
    written: usize,
}

impl RecordWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `record` to `destination`, creating the file and its
    /// directory on first write.
    pub fn write_record(&mut self, destination: &Path, record: &Record) -> Result<()> {
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(destination)?;
        file.write_all(format_record(record).as_bytes())?;
        file.flush()?;
        file.sync_data()?;

        self.written += 1;
        tracing::debug!(path = %destination.display(), total = self.written, "Record written");
        Ok(())
    }

    /// Records written by this writer so far.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }
}
