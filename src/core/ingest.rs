//! CSV ingestion: export rows in, grouped credential records out

use csv::{ReaderBuilder, StringRecord};
use miette::Diagnostic;
use std::collections::HashMap;
use std::io::Read;
use thiserror::Error;

use crate::core::entry::PassEntry;
use crate::core::host::{self, HostError};

/// The exact header a Chrome password export carries.
pub const EXPECTED_HEADER: [&str; 5] = ["name", "url", "username", "password", "note"];

const COL_URL: usize = 1;
const COL_USERNAME: usize = 2;
const COL_PASSWORD: usize = 3;
const COL_NOTE: usize = 4;

/// Errors that can occur while reading an export
#[derive(Debug, Error, Diagnostic)]
pub enum ImportError {
    #[error("empty input: missing the export header row")]
    #[diagnostic(
        code(passporter::csv::missing_header),
        help("expected the Chrome export header: name,url,username,password,note")
    )]
    MissingHeader,

    #[error("malformed header at line {line}: column {column} is '{found}', expected '{expected}'")]
    #[diagnostic(
        code(passporter::csv::header),
        help("pass an unmodified Chrome password export; the header must read name,url,username,password,note")
    )]
    Header {
        line: u64,
        column: usize,
        expected: &'static str,
        found: String,
    },

    #[error("malformed header at line {line}: {found} column(s), expected {expected}")]
    #[diagnostic(
        code(passporter::csv::header),
        help("pass an unmodified Chrome password export; the header must read name,url,username,password,note")
    )]
    HeaderWidth {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("CSV parse error at line {line}")]
    #[diagnostic(code(passporter::csv::parse))]
    Csv {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("bad row at line {line} [{row}]")]
    #[diagnostic(code(passporter::csv::row))]
    Row {
        line: u64,
        /// The offending row with its password field masked.
        row: String,
        #[source]
        source: RowError,
    },
}

/// Per-row failures, wrapped into [`ImportError::Row`] with line context
#[derive(Debug, Error)]
pub enum RowError {
    #[error("expected {expected} fields, found {found}")]
    Width { expected: usize, found: usize },

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Counters reported after ingestion
#[derive(Debug, Default, Clone, Copy)]
pub struct ImportStats {
    pub rows_processed: usize,
    pub entries_created: usize,
    pub entries_merged: usize,
}

/// Base host → credential records, in first-seen order.
///
/// Both the group sequence and each group's record list preserve insertion
/// order; conflict resolution walks them in exactly this order.
#[derive(Debug, Default)]
pub struct GroupedEntries {
    groups: Vec<(String, Vec<PassEntry>)>,
    index: HashMap<String, usize>,
}

impl GroupedEntries {
    /// Number of base-host groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total record count across all groups.
    pub fn total_entries(&self) -> usize {
        self.groups.iter().map(|(_, entries)| entries.len()).sum()
    }

    pub fn get(&self, base_host: &str) -> Option<&[PassEntry]> {
        self.index
            .get(base_host)
            .map(|&at| self.groups[at].1.as_slice())
    }

    /// Group by position, in insertion order.
    pub fn group_at(&self, at: usize) -> Option<(&str, &[PassEntry])> {
        self.groups
            .get(at)
            .map(|(base_host, entries)| (base_host.as_str(), entries.as_slice()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PassEntry])> {
        self.groups
            .iter()
            .map(|(base_host, entries)| (base_host.as_str(), entries.as_slice()))
    }

    fn group_mut(&mut self, base_host: String) -> &mut Vec<PassEntry> {
        let at = match self.index.get(&base_host) {
            Some(&at) => at,
            None => {
                let at = self.groups.len();
                self.index.insert(base_host.clone(), at);
                self.groups.push((base_host, Vec::new()));
                at
            }
        };
        &mut self.groups[at].1
    }
}

/// Read a Chrome password export, deduplicating and grouping as it goes.
///
/// The first record must be the exact export header. Data rows are matched
/// against existing records by login and password within their base-host
/// group: a match merges (URL added, login fields updated), anything else
/// becomes a new record. The first malformed row aborts the whole read.
pub fn read_export<R: Read>(reader: R) -> Result<(GroupedEntries, ImportStats), ImportError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = rdr.records();
    let header = match records.next() {
        None => return Err(ImportError::MissingHeader),
        Some(Err(source)) => {
            let line = source.position().map(|p| p.line()).unwrap_or(1);
            return Err(ImportError::Csv { line, source });
        }
        Some(Ok(record)) => record,
    };
    validate_header(&header)?;

    let mut grouped = GroupedEntries::default();
    let mut stats = ImportStats::default();

    for result in records {
        let record = match result {
            Ok(record) => record,
            Err(source) => {
                let line = source.position().map(|p| p.line()).unwrap_or(0);
                return Err(ImportError::Csv { line, source });
            }
        };

        stats.rows_processed += 1;
        ingest_row(&mut grouped, &record, &mut stats).map_err(|source| ImportError::Row {
            line: record.position().map(|p| p.line()).unwrap_or(0),
            row: redact(&record),
            source,
        })?;
    }

    Ok((grouped, stats))
}

fn validate_header(record: &StringRecord) -> Result<(), ImportError> {
    let line = record.position().map(|p| p.line()).unwrap_or(1);
    if record.len() != EXPECTED_HEADER.len() {
        return Err(ImportError::HeaderWidth {
            line,
            expected: EXPECTED_HEADER.len(),
            found: record.len(),
        });
    }
    for (at, (found, expected)) in record.iter().zip(EXPECTED_HEADER).enumerate() {
        if found != expected {
            return Err(ImportError::Header {
                line,
                column: at + 1,
                expected,
                found: found.to_string(),
            });
        }
    }
    Ok(())
}

fn ingest_row(
    grouped: &mut GroupedEntries,
    record: &StringRecord,
    stats: &mut ImportStats,
) -> Result<(), RowError> {
    if record.len() != EXPECTED_HEADER.len() {
        return Err(RowError::Width {
            expected: EXPECTED_HEADER.len(),
            found: record.len(),
        });
    }

    let url = &record[COL_URL];
    let login = &record[COL_USERNAME];
    let password = &record[COL_PASSWORD];
    let note = &record[COL_NOTE];

    let base_host = host::base_host(url)?;
    let entries = grouped.group_mut(base_host);
    match entries.iter_mut().find(|e| e.matches(login, password)) {
        Some(entry) => {
            entry.merge(login, url);
            stats.entries_merged += 1;
        }
        None => {
            entries.push(PassEntry::from_row(login, password, url, note));
            stats.entries_created += 1;
        }
    }
    Ok(())
}

/// Render a row for error messages with the password column masked.
fn redact(record: &StringRecord) -> String {
    record
        .iter()
        .enumerate()
        .map(|(at, field)| if at == COL_PASSWORD { "***" } else { field })
        .collect::<Vec<_>>()
        .join(",")
}
