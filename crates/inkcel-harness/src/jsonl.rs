#![forbid(unsafe_code)]

//! JSONL event log for end-to-end tests.
//!
//! ```text
//! {"seq":0,"run_id":"undo_e2e_seed7","event":"start","case":"branching"}
//! {"seq":1,"run_id":"undo_e2e_seed7","event":"record","depth":1,"checksum":"blake3:..."}
//! {"seq":2,"run_id":"undo_e2e_seed7","event":"complete","outcome":"pass"}
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde_json::{Map, Value};

/// Collects structured events, one JSON object per line.
#[derive(Debug, Default)]
pub struct JsonlLog {
    run_id: String,
    lines: Vec<String>,
}

impl JsonlLog {
    /// Start a log for a deterministic run.
    pub fn new(prefix: &str, seed: u64) -> Self {
        Self {
            run_id: format!("{prefix}_seed{seed}"),
            lines: Vec::new(),
        }
    }

    /// Run identifier stamped on every line.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Append an event. `fields` must be a JSON object; other values are
    /// stored under `"value"`.
    pub fn event(&mut self, event: &str, fields: Value) {
        let mut line = Map::new();
        line.insert("seq".into(), Value::from(self.lines.len() as u64));
        line.insert("run_id".into(), Value::from(self.run_id.clone()));
        line.insert("event".into(), Value::from(event));
        match fields {
            Value::Object(map) => line.extend(map),
            Value::Null => {}
            other => {
                line.insert("value".into(), other);
            }
        }
        let text = Value::Object(line).to_string();
        tracing::trace!(target: "inkcel.harness", line = %text, "jsonl event");
        self.lines.push(text);
    }

    /// Lines written so far.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Events parsed back into JSON values.
    pub fn parsed(&self) -> Vec<Value> {
        self.lines
            .iter()
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect()
    }

    /// Write all lines to `path`.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        for line in &self.lines {
            writeln!(out, "{line}")?;
        }
        out.flush()
    }
}
