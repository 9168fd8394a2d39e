//! Record file reader.
//!
//! Record files have no separators between records. A record starts at a
//! line holding the first field of its kind, and its metadata block ends at
//! the first blank line. Everything after that up to the next record start
//! is body.

use crate::types::RecordKind;

/// A record read back from a record file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRecord {
    /// Metadata fields in file order.
    pub fields: Vec<(String, String)>,
    pub body: String,
}

impl ParsedRecord {
    /// Value of field `name`, if present.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Split a `[name] value` line.
fn parse_field(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix('[')?;
    let (name, value) = rest.split_once(']')?;
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_lowercase() || c == '_') {
        return None;
    }
    if !value.is_empty() && !value.starts_with(' ') {
        return None;
    }
    Some((name, value.trim()))
}

fn starts_record(line: &str, kind: RecordKind) -> bool {
    parse_field(line).is_some_and(|(name, _)| name == kind.first_field())
}

#[derive(PartialEq)]
enum State {
    Seeking,
    Header,
    Body,
}

/// Parse every record of `kind` in `content`.
///
/// Text before the first record start is ignored. Trailing blank lines of a
/// body are dropped.
#[must_use]
pub fn parse_records(content: &str, kind: RecordKind) -> Vec<ParsedRecord> {
    let mut records = Vec::new();
    let mut current: Option<ParsedRecord> = None;
    let mut body: Vec<&str> = Vec::new();
    let mut state = State::Seeking;

    for line in content.lines() {
        if state != State::Header && starts_record(line, kind) {
            if let Some(record) = current.take() {
                records.push(finish(record, &body));
            }
            body.clear();
            current = Some(ParsedRecord::default());
            state = State::Header;
        }

        match state {
            State::Seeking => {}
            State::Header => {
                if line.trim().is_empty() {
                    state = State::Body;
                } else if let (Some((name, value)), Some(record)) =
                    (parse_field(line), current.as_mut())
                {
                    record.fields.push((name.to_string(), value.to_string()));
                } else {
                    state = State::Body;
                    body.push(line);
                }
            }
            State::Body => body.push(line),
        }
    }

    if let Some(record) = current.take() {
        records.push(finish(record, &body));
    }
    records
}

fn finish(mut record: ParsedRecord, body: &[&str]) -> ParsedRecord {
    let end = body
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(0, |i| i + 1);
    record.body = body[..end].join("\n");
    record
}
