#![warn(missing_docs)]
//! Deterministic testing surfaces (event stream capture + grid invariant checks).

mod invariants;

use anyhow::Result;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

pub use invariants::*;

/// Primary event record captured by headless tests.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a, P: Serialize> {
    /// Step of the scripted run when the event occurred.
    pub step: u64,
    /// Human-readable kind label.
    pub kind: &'a str,
    /// Structured payload (typically a container event).
    pub payload: &'a P,
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    file: File,
    written: usize,
}

impl JsonlSink {
    /// Create a new sink at `path`, creating parent dirs if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self { file, written: 0 })
    }

    /// Append an event to the log.
    pub fn write<P: Serialize>(&mut self, event: &EventRecord<'_, P>) -> Result<()> {
        let line = serde_json::to_string(event)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn written(&self) -> usize {
        self.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn jsonl_sink_writes_one_line_per_record() {
        let path = std::env::temp_dir().join(format!(
            "gridstash-events-{}.jsonl",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let mut sink = JsonlSink::create(&path).expect("sink create");
        let payload = serde_json::json!({ "id": 7 });
        sink.write(&EventRecord {
            step: 1,
            kind: "ItemAdded",
            payload: &payload,
        })
        .expect("write succeeds");
        sink.write(&EventRecord {
            step: 2,
            kind: "ItemRemoved",
            payload: &payload,
        })
        .expect("write succeeds");
        assert_eq!(sink.written(), 2);

        let contents = fs::read_to_string(&path).expect("file readable");
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"kind\":\"ItemAdded\""));
        assert!(lines[1].contains("\"step\":2"));
    }
}
