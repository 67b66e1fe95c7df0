//! Shutdown artifact writers
//!
//! Writes go straight through `std::fs`/`std::io`, never through the
//! instrumented storage facade, so exporting cannot record itself.

use crate::error::{Result, VigiaError};
use crate::json_output::{Payload, StructuredRecord, TreeDocument};
use crate::stats::AggregatedSummary;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where summary records go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    /// Interactive surface
    Stdout,
    /// Appended to a file
    File(PathBuf),
}

impl Sink {
    pub fn from_output(output: Option<&Path>) -> Self {
        match output {
            Some(path) => Sink::File(path.to_path_buf()),
            None => Sink::Stdout,
        }
    }
}

/// One element of a positional record
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Scalar(String),
    Nested(Value),
}

/// Renders and writes summary records and tree documents
#[derive(Debug, Clone)]
pub struct Exporter {
    sink: Sink,
    structured: bool,
}

impl Exporter {
    pub fn new(sink: Sink, structured: bool) -> Self {
        Self { sink, structured }
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    /// Write the timestamped shutdown summary
    pub fn write_summary(&self, summary: &AggregatedSummary) -> Result<()> {
        let rendered = self.render_summary(&timestamp(), summary)?;
        self.emit(&rendered)
    }

    /// Write one live log line (`summary = false` mode)
    pub fn write_log(&self, message: &str) -> Result<()> {
        let rendered = self.render_log(&timestamp(), message)?;
        self.emit(&rendered)
    }

    /// Render the summary record for the configured sink and format
    pub fn render_summary(&self, time: &str, summary: &AggregatedSummary) -> Result<String> {
        if self.structured {
            let record = StructuredRecord {
                time,
                payload: Payload::Summary(summary),
            };
            return self.render_structured(&record);
        }
        let payload = summary.to_value()?;
        match self.sink {
            Sink::File(_) => Ok(format!("{} - {}\r\n", time, serde_json::to_string(&payload)?)),
            Sink::Stdout => render_tokens(&[
                Token::Scalar(time.to_string()),
                Token::Scalar("-".to_string()),
                Token::Nested(payload),
            ]),
        }
    }

    /// Render a live log line for the configured sink and format
    pub fn render_log(&self, time: &str, message: &str) -> Result<String> {
        if self.structured {
            let record: StructuredRecord<'_, ()> = StructuredRecord {
                time,
                payload: Payload::Message(message),
            };
            return self.render_structured(&record);
        }
        match self.sink {
            Sink::File(_) => Ok(format!("{} - {}\r\n", time, message)),
            Sink::Stdout => render_tokens(&[
                Token::Scalar(time.to_string()),
                Token::Scalar("-".to_string()),
                Token::Scalar(message.to_string()),
            ]),
        }
    }

    fn render_structured<T: Serialize>(&self, record: &T) -> Result<String> {
        match self.sink {
            // One JSON document per line in files
            Sink::File(_) => Ok(format!("{}\n", serde_json::to_string(record)?)),
            Sink::Stdout => Ok(format!("{}\n", serde_json::to_string_pretty(record)?)),
        }
    }

    fn emit(&self, rendered: &str) -> Result<()> {
        match &self.sink {
            Sink::Stdout => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(rendered.as_bytes())?;
                stdout.flush()?;
                Ok(())
            }
            Sink::File(path) => append(path, rendered.as_bytes()),
        }
    }
}

/// Write the tree document to `path`, replacing any previous content
pub fn write_tree(path: &Path, document: &TreeDocument) -> Result<()> {
    let content = document.to_json()?;
    fs::write(path, content).map_err(|source| VigiaError::Export {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Wrote dependency tree ({} nodes) to {}", document.node_count(), path.display());
    Ok(())
}

fn append(path: &Path, bytes: &[u8]) -> Result<()> {
    let export_err = |source| VigiaError::Export {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(export_err)?;
    file.write_all(bytes).map_err(export_err)?;
    Ok(())
}

/// Positional rendering for the interactive surface: scalars as flat
/// space-separated tokens, nested values pretty-printed on their own lines
fn render_tokens(tokens: &[Token]) -> Result<String> {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Scalar(s) => {
                out.push_str(s);
                out.push(' ');
            }
            Token::Nested(value) => {
                out.push('\n');
                out.push_str(&serde_json::to_string_pretty(value)?);
                out.push('\n');
            }
        }
    }
    out.push('\n');
    Ok(out)
}

/// RFC 3339 UTC timestamp with millisecond precision
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
