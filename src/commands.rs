// Command layer
// Request/response types for the shell; every error leaves as a CommandError

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::clustering::ClusterTable;
use crate::config::AnalysisConfig;
use crate::fragments::{FragmentSet, RankingPolicy, Variant};
use crate::pipeline::{self, TraceBuilder, TraceEntry};
use crate::render::{self, ArtifactId, ArtifactPaths, MidiExportOptions, VariantPreview};
use crate::sequence::{self, Note, NoteSequence};

#[derive(Debug, Serialize)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<E: std::fmt::Display> From<E> for CommandError {
    fn from(error: E) -> Self {
        CommandError {
            message: error.to_string(),
        }
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

// ==================== INPUT ====================

/// Where the performance comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SequenceSource {
    /// Standard MIDI File bytes
    Midi(Vec<u8>),
    /// Notes already decoded by the caller, in performance order
    Notes(Vec<Note>),
}

impl SequenceSource {
    pub fn load(&self) -> CommandResult<NoteSequence> {
        match self {
            SequenceSource::Midi(bytes) => sequence::load_midi(bytes).map_err(|e| CommandError {
                message: format!("Failed to load MIDI: {}", e),
            }),
            // Cluster indices refer to the caller's order; never reorder
            SequenceSource::Notes(notes) => Ok(NoteSequence::new(notes.clone())),
        }
    }
}

// ==================== ANALYSIS COMMANDS ====================

#[derive(Debug, Deserialize)]
pub struct AnalyzeInput {
    pub source: SequenceSource,

    /// Cluster table as emitted by the clustering routine (records or columns)
    pub clusters: serde_json::Value,

    #[serde(default)]
    pub config: AnalysisConfig,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResult {
    pub run_id: Uuid,
    pub fragments: FragmentSet,
    pub trace: Vec<TraceEntry>,
}

pub fn analyze_fragments(input: AnalyzeInput) -> CommandResult<AnalysisResult> {
    let sequence = input.source.load()?;
    let table = ClusterTable::from_value(input.clusters).map_err(|e| CommandError {
        message: format!("Failed to read cluster table: {}", e),
    })?;

    let run_id = Uuid::new_v4();
    log::info!(
        "Analyzing run {}: {} notes, {} cluster rows, n={}, policy={}, pipeline={}",
        run_id,
        sequence.size(),
        table.len(),
        input.config.n,
        input.config.policy,
        input.config.pipeline
    );

    if sequence.is_empty() {
        log::warn!("Run {}: note sequence is empty, every fragment will be dropped", run_id);
    }

    let trace = TraceBuilder::new(run_id);
    let (fragments, entries) =
        pipeline::run_pipeline_traced(&sequence, &table, &input.config, &trace)?;

    for entry in &entries {
        log::debug!("[{:?}] {:.0}% {}", entry.stage, entry.progress * 100.0, entry.message);
    }

    if fragments.is_empty() && !table.is_empty() {
        log::warn!("Run {}: no fragments survived reconstruction", run_id);
    }

    log::info!(
        "Run {} complete: {} fragments, {} variants",
        run_id,
        fragments.len(),
        fragments.variant_count()
    );

    Ok(AnalysisResult {
        run_id,
        fragments,
        trace: entries,
    })
}

#[derive(Debug, Serialize)]
pub struct PolicyInfo {
    pub label: &'static str,
    pub display_name: &'static str,
}

pub fn list_policies() -> Vec<PolicyInfo> {
    RankingPolicy::all()
        .iter()
        .map(|policy| PolicyInfo {
            label: policy.label(),
            display_name: policy.display_name(),
        })
        .collect()
}

// ==================== RENDER COMMANDS ====================

#[derive(Debug, Deserialize)]
pub struct PreviewInput {
    pub source: SequenceSource,
    pub run_id: Uuid,
    pub fragments: FragmentSet,
}

#[derive(Debug, Serialize)]
pub struct PreviewEntry {
    pub id: ArtifactId,
    pub preview: VariantPreview,
}

pub fn preview_fragments(input: PreviewInput) -> CommandResult<Vec<PreviewEntry>> {
    let sequence = input.source.load()?;

    let entries: Vec<PreviewEntry> =
        render::preview_fragments(&sequence, &input.fragments, input.run_id)
            .into_iter()
            .map(|(id, preview)| PreviewEntry { id, preview })
            .collect();

    let empty = entries.iter().filter(|e| e.preview.note_count == 0).count();
    if empty > 0 {
        log::warn!("{} of {} variants slice to no notes", empty, entries.len());
    }

    Ok(entries)
}

#[derive(Debug, Deserialize)]
pub struct ExportVariantInput {
    pub source: SequenceSource,
    pub id: ArtifactId,
    pub variant: Variant,

    /// Directory the caller will write artifacts under
    pub base_dir: PathBuf,

    #[serde(default)]
    pub options: MidiExportOptions,
}

#[derive(Debug, Serialize)]
pub struct ExportedVariant {
    pub id: ArtifactId,
    pub paths: ArtifactPaths,
    pub midi_data: Vec<u8>,
}

pub fn export_variant_midi(input: ExportVariantInput) -> CommandResult<ExportedVariant> {
    let sequence = input.source.load()?;

    let mut options = input.options;
    if options.track_name.is_none() {
        options.track_name = Some(input.id.stem());
    }

    let midi_data = render::export_variant_midi(&sequence, &input.variant, &options)?;
    let paths = ArtifactPaths::for_artifact(&input.base_dir, &input.id);

    log::info!(
        "Exported {} ({} bytes) for {}",
        input.id.stem(),
        midi_data.len(),
        paths.midi.display()
    );

    Ok(ExportedVariant {
        id: input.id,
        paths,
        midi_data,
    })
}
