// Analysis stage tracing
// JSONL records of what each stage of an analysis run produced

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during trace operations
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Stages of one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Note sequence and cluster table loaded
    Load,
    /// Cluster table narrowed by occurrence count
    Prefilter,
    /// Variant windows rebuilt from cluster rows
    Reconstruct,
    /// Fragments selected under the ranking policy
    Rank,
}

/// A single stage record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Analysis run this record belongs to
    pub run_id: Uuid,

    /// When the record was created
    pub timestamp: DateTime<Utc>,

    pub stage: Stage,

    /// Progress through the run [0.0, 1.0]
    pub progress: f32,

    /// Human-readable summary of the stage outcome
    pub message: String,

    /// Optional structured counts (rows, fragments, variants)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TraceEntry {
    /// Serialize to JSON line (with newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Builds entries for one run, stamping run id and time
#[derive(Debug, Clone, Copy)]
pub struct TraceBuilder {
    run_id: Uuid,
}

impl TraceBuilder {
    pub fn new(run_id: Uuid) -> Self {
        TraceBuilder { run_id }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Record a stage outcome
    pub fn entry(&self, stage: Stage, progress: f32, message: impl Into<String>) -> TraceEntry {
        TraceEntry {
            run_id: self.run_id,
            timestamp: Utc::now(),
            stage,
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
            data: None,
        }
    }

    /// Record a stage outcome with structured data
    pub fn with_data(
        &self,
        stage: Stage,
        progress: f32,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> TraceEntry {
        TraceEntry {
            data: Some(data),
            ..self.entry(stage, progress, message)
        }
    }
}

/// Append-only JSONL trace file
pub struct TraceWriter {
    file_path: PathBuf,
}

impl TraceWriter {
    pub fn new(file_path: PathBuf) -> Self {
        TraceWriter { file_path }
    }

    /// Append entries, creating the file if needed
    pub fn write_batch(&self, entries: &[TraceEntry]) -> Result<(), TraceError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        let mut out = BufWriter::new(file);

        for entry in entries {
            out.write_all(entry.to_json_line()?.as_bytes())?;
        }

        out.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Read trace entries from a JSONL file, skipping blank lines
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    let contents = std::fs::read_to_string(path)?;

    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(TraceError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_entry_carries_run_id_and_clamps_progress() {
        let run_id = Uuid::new_v4();
        let trace = TraceBuilder::new(run_id);

        let entry = trace.entry(Stage::Rank, 1.5, "Ranked");
        assert_eq!(entry.run_id, run_id);
        assert_eq!(entry.stage, Stage::Rank);
        assert_eq!(entry.progress, 1.0);
        assert!(entry.data.is_none());

        assert_eq!(trace.entry(Stage::Load, -0.5, "Loaded").progress, 0.0);
    }

    #[test]
    fn test_entry_with_data() {
        let trace = TraceBuilder::new(Uuid::new_v4());
        let entry = trace.with_data(
            Stage::Reconstruct,
            0.6,
            "Reconstructed",
            serde_json::json!({ "fragments": 4, "variants": 17 }),
        );

        assert_eq!(entry.data.unwrap()["variants"], 17);
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        let entry = TraceBuilder::new(Uuid::new_v4()).entry(Stage::Prefilter, 0.2, "x");
        let line = entry.to_json_line().unwrap();

        assert!(line.ends_with('\n'));
        assert!(line.contains("\"stage\":\"prefilter\""));
        assert!(!line.contains("\"data\""));
    }

    #[test]
    fn test_write_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("trace.jsonl");
        let writer = TraceWriter::new(path.clone());
        let trace = TraceBuilder::new(Uuid::new_v4());

        writer
            .write_batch(&[
                trace.entry(Stage::Load, 0.0, "Loaded"),
                trace.entry(Stage::Reconstruct, 0.5, "Reconstructed"),
            ])
            .unwrap();
        writer
            .write_batch(&[trace.entry(Stage::Rank, 1.0, "Ranked")])
            .unwrap();

        let entries = read_trace_file(writer.path()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].stage, Stage::Load);
        assert_eq!(entries[2].stage, Stage::Rank);
        assert_eq!(entries[2].run_id, trace.run_id());
    }

    #[test]
    fn test_read_rejects_corrupt_line() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("trace.jsonl");
        std::fs::write(&path, "{\"stage\":\n").unwrap();

        assert!(matches!(
            read_trace_file(&path),
            Err(TraceError::SerializationError(_))
        ));
    }
}
