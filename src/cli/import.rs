//! Input adapters that turn link dumps into [`LinkRecord`] streams.
//!
//! Two layouts are understood:
//!
//! * JSON lines: each line an object mapping a page title to the array of
//!   titles it links to, e.g. `{"Rust": ["Ferris", "Cargo"]}`.
//! * Tab-separated edge lists: `source<TAB>target` per row; consecutive rows
//!   with the same source become one record and a row with only a source
//!   yields a page without links.
//!
//! Lines that cannot be parsed are yielded as
//! [`WikiGraphError::MalformedRecord`] so the converter can tally them.

use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::storage::{convert, ConvertOptions, ConvertSummary, LinkRecord};
use crate::types::{Result, WikiGraphError};

/// Boxed record stream accepted by [`convert`].
pub type RecordSource = Box<dyn Iterator<Item = Result<LinkRecord>>>;

/// Layout of an input dump.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    /// One JSON object per line.
    Jsonl,
    /// Tab-separated `source<TAB>target` rows.
    Tsv,
}

impl InputFormat {
    /// Guesses the format from a file extension.
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jsonl" | "json" | "ndjson" => Some(InputFormat::Jsonl),
            "tsv" | "txt" => Some(InputFormat::Tsv),
            _ => None,
        }
    }
}

/// Configuration for converting a dump file.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Input dump.
    pub input: PathBuf,
    /// Input layout; detected from the extension when `None`.
    pub format: Option<InputFormat>,
    /// Output graph file.
    pub graph_out: PathBuf,
    /// Output title map file.
    pub map_out: PathBuf,
    /// Encoder options.
    pub options: ConvertOptions,
}

/// Opens `path` as a record stream.
pub fn open_source(path: &Path, format: Option<InputFormat>) -> Result<RecordSource> {
    let format = format
        .or_else(|| InputFormat::detect(path))
        .ok_or(WikiGraphError::Invalid(
            "cannot detect input format from extension",
        ))?;
    let file = File::open(path)?;
    Ok(match format {
        InputFormat::Jsonl => Box::new(JsonlSource::new(BufReader::new(file))),
        InputFormat::Tsv => Box::new(TsvSource::new(BufReader::new(file))),
    })
}

/// Converts the dump described by `config`.
pub fn run_import(config: &ImportConfig) -> Result<ConvertSummary> {
    info!(
        input = %config.input.display(),
        format = ?config.format,
        block_size = config.options.block_size,
        "import.begin"
    );
    let source = open_source(&config.input, config.format)?;
    convert(source, &config.graph_out, &config.map_out, &config.options)
}

/// JSON-lines record stream.
pub struct JsonlSource<R> {
    lines: io::Lines<R>,
    line: u64,
    queue: VecDeque<LinkRecord>,
}

impl<R: BufRead> JsonlSource<R> {
    /// Wraps a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
            queue: VecDeque::new(),
        }
    }
}

impl<R: BufRead> Iterator for JsonlSource<R> {
    type Item = Result<LinkRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.queue.pop_front() {
                return Some(Ok(record));
            }
            let text = self.lines.next()?;
            self.line += 1;
            let text = match text {
                Ok(text) => text,
                Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                    return Some(Err(self.malformed("line is not valid UTF-8")));
                }
                Err(err) => return Some(Err(WikiGraphError::Io(err))),
            };
            if text.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LineRecords>(&text) {
                Ok(LineRecords(records)) => self.queue.extend(records),
                Err(err) => return Some(Err(self.malformed(err))),
            }
        }
    }
}

impl<R> JsonlSource<R> {
    fn malformed(&self, reason: impl fmt::Display) -> WikiGraphError {
        WikiGraphError::MalformedRecord {
            line: self.line,
            reason: reason.to_string(),
        }
    }
}

/// One JSON line's records, in the order the keys appear.
struct LineRecords(Vec<LinkRecord>);

impl<'de> Deserialize<'de> for LineRecords {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LineVisitor;

        impl<'de> Visitor<'de> for LineVisitor {
            type Value = LineRecords;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping titles to arrays of titles")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut records = Vec::with_capacity(map.size_hint().unwrap_or(1));
                while let Some((title, targets)) = map.next_entry::<String, Vec<String>>()? {
                    records.push(LinkRecord { title, targets });
                }
                Ok(LineRecords(records))
            }
        }

        deserializer.deserialize_map(LineVisitor)
    }
}

/// Tab-separated edge-list record stream.
pub struct TsvSource<R> {
    rows: csv::StringRecordsIntoIter<R>,
    pending: Option<LinkRecord>,
}

impl<R: Read> TsvSource<R> {
    /// Wraps a reader.
    pub fn new(reader: R) -> Self {
        let rows = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(reader)
            .into_records();
        Self {
            rows,
            pending: None,
        }
    }
}

impl<R: Read> Iterator for TsvSource<R> {
    type Item = Result<LinkRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = match self.rows.next() {
                None => return self.pending.take().map(Ok),
                Some(Ok(row)) => row,
                Some(Err(err)) => return Some(Err(csv_error(err))),
            };
            let line = row.position().map_or(0, |pos| pos.line());
            let source = row.get(0).unwrap_or_default();
            if source.is_empty() {
                return Some(Err(WikiGraphError::MalformedRecord {
                    line,
                    reason: "empty source title".into(),
                }));
            }
            let target = row.get(1).filter(|target| !target.is_empty());
            if let Some(record) = self
                .pending
                .as_mut()
                .filter(|record| record.title == source)
            {
                if let Some(target) = target {
                    record.targets.push(target.to_owned());
                }
                continue;
            }
            let next = LinkRecord {
                title: source.to_owned(),
                targets: target.map(|t| vec![t.to_owned()]).unwrap_or_default(),
            };
            if let Some(done) = self.pending.replace(next) {
                return Some(Ok(done));
            }
        }
    }
}

fn csv_error(err: csv::Error) -> WikiGraphError {
    let line = err.position().map_or(0, |pos| pos.line());
    match err.into_kind() {
        csv::ErrorKind::Io(io_err) => WikiGraphError::Io(io_err),
        kind => WikiGraphError::MalformedRecord {
            line,
            reason: format!("{kind:?}"),
        },
    }
}
