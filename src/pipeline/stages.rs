// Analysis stages
// Two stage orders: pre-filter by occurrence count then reconstruct, or
// reconstruct every row then rank by the configured policy

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::trace::{Stage, TraceBuilder, TraceEntry};
use crate::clustering::{top_by_occurrences, ClusterError, ClusterTable};
use crate::config::{AnalysisConfig, ConfigError};
use crate::fragments::{rank, reconstruct, FragmentSet, PruningPolicy};
use crate::sequence::NoteSequence;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unknown pipeline: '{0}' (expected prefilter or rank)")]
    UnknownPipeline(String),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Stage order of an analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Pipeline {
    /// Keep the `limit` rows with the most occurrences, then reconstruct them
    #[serde(rename = "prefilter", alias = "prefilter-by-count")]
    PrefilterByCount,

    /// Reconstruct every row, then let the ranking policy choose
    #[default]
    #[serde(rename = "rank", alias = "reconstruct-then-rank")]
    ReconstructThenRank,
}

impl Pipeline {
    pub fn label(&self) -> &'static str {
        match self {
            Pipeline::PrefilterByCount => "prefilter",
            Pipeline::ReconstructThenRank => "rank",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Pipeline {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prefilter" | "prefilter-by-count" => Ok(Pipeline::PrefilterByCount),
            "rank" | "reconstruct-then-rank" => Ok(Pipeline::ReconstructThenRank),
            _ => Err(PipelineError::UnknownPipeline(s.to_string())),
        }
    }
}

/// Reconstruct every row in table order, dropping fragments left empty
pub fn reconstruct_all(
    sequence: &NoteSequence,
    table: &ClusterTable,
    n: usize,
    pruning: Option<&PruningPolicy>,
) -> Result<FragmentSet, ClusterError> {
    let mut fragments = Vec::with_capacity(table.len());

    for row in table {
        let fragment = reconstruct(sequence, row, n, pruning)?;
        if !fragment.is_empty() {
            fragments.push(fragment);
        }
    }

    Ok(fragments.into())
}

/// Reconstruct only the `limit` rows with the most occurrences
///
/// Fragments come back in descending occurrence order; empty ones are
/// dropped.
pub fn prefilter_then_reconstruct(
    sequence: &NoteSequence,
    table: &ClusterTable,
    n: usize,
    limit: usize,
    pruning: Option<&PruningPolicy>,
) -> Result<FragmentSet, ClusterError> {
    prefilter_stage(sequence, table, n, limit, pruning).map(|(fragments, _)| fragments)
}

/// Shared body of the pre-filter pipeline; also reports how many rows were kept
fn prefilter_stage(
    sequence: &NoteSequence,
    table: &ClusterTable,
    n: usize,
    limit: usize,
    pruning: Option<&PruningPolicy>,
) -> Result<(FragmentSet, usize), ClusterError> {
    let shortlist = top_by_occurrences(table, limit);
    let fragments = reconstruct_all(sequence, &shortlist, n, pruning)?;
    Ok((fragments, shortlist.len()))
}

/// Run the configured stages and return the bounded, ranked fragments
pub fn run_pipeline(
    sequence: &NoteSequence,
    table: &ClusterTable,
    config: &AnalysisConfig,
) -> Result<FragmentSet, PipelineError> {
    execute(sequence, table, config, None)
}

/// As `run_pipeline`, also returning one trace entry per stage
pub fn run_pipeline_traced(
    sequence: &NoteSequence,
    table: &ClusterTable,
    config: &AnalysisConfig,
    trace: &TraceBuilder,
) -> Result<(FragmentSet, Vec<TraceEntry>), PipelineError> {
    let mut entries = Vec::new();
    let fragments = execute(sequence, table, config, Some((trace, &mut entries)))?;
    Ok((fragments, entries))
}

fn execute(
    sequence: &NoteSequence,
    table: &ClusterTable,
    config: &AnalysisConfig,
    mut trace: Option<(&TraceBuilder, &mut Vec<TraceEntry>)>,
) -> Result<FragmentSet, PipelineError> {
    config.validate()?;

    let mut record = |stage: Stage, progress: f32, message: String, data: serde_json::Value| {
        if let Some((builder, entries)) = trace.as_mut() {
            entries.push(builder.with_data(stage, progress, message, data));
        }
    };

    record(
        Stage::Load,
        0.0,
        format!("{} notes, {} cluster rows", sequence.size(), table.len()),
        json!({ "notes": sequence.size(), "rows": table.len(), "n": config.n }),
    );

    let pruning = config.pruning.as_ref();
    let candidates = match config.pipeline {
        Pipeline::PrefilterByCount => {
            let (fragments, kept) =
                prefilter_stage(sequence, table, config.n, config.limit, pruning)?;
            record(
                Stage::Prefilter,
                0.25,
                format!("Kept {} of {} rows by occurrence count", kept, table.len()),
                json!({ "kept": kept, "limit": config.limit }),
            );
            fragments
        }
        Pipeline::ReconstructThenRank => reconstruct_all(sequence, table, config.n, pruning)?,
    };

    record(
        Stage::Reconstruct,
        0.75,
        format!(
            "Reconstructed {} fragments with {} variants",
            candidates.len(),
            candidates.variant_count()
        ),
        json!({
            "fragments": candidates.len(),
            "variants": candidates.variant_count(),
            "pruning": pruning.is_some()
        }),
    );

    let ranked = rank(&candidates, config.policy, config.limit);

    record(
        Stage::Rank,
        1.0,
        format!("Selected {} fragments by {}", ranked.len(), config.policy),
        json!({ "fragments": ranked.len(), "policy": config.policy.label() }),
    );

    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::ClusterRow;
    use crate::fragments::RankingPolicy;
    use crate::sequence::Note;
    use uuid::Uuid;

    fn ladder(count: usize) -> NoteSequence {
        NoteSequence::new(
            (0..count)
                .map(|i| Note::timed(i as f64, i as f64 + 0.5))
                .collect(),
        )
    }

    /// Rows whose first index identifies them in assertions
    fn table() -> ClusterTable {
        ClusterTable::new(vec![
            ClusterRow::new(vec![0, 10], 0, 0),         // 2 variants, short
            ClusterRow::new(vec![1, 11, 21], 0, 4),     // 3 variants, long
            ClusterRow::new(vec![2], 0, 1),             // 1 variant
            ClusterRow::new(vec![3, 13, 23, 33], 0, 0), // 4 variants, short
            ClusterRow::new(vec![4, 14], 0, 2),         // 2 variants
            ClusterRow::new(vec![5, 15, 25], 0, 1),     // 3 variants
            ClusterRow::new(vec![6], 0, 8),             // 1 variant, long
        ])
    }

    fn first_indices(set: &FragmentSet) -> Vec<usize> {
        set.iter().map(|f| f.variants[0].start_note_index).collect()
    }

    fn config(pipeline: Pipeline, policy: RankingPolicy, limit: usize) -> AnalysisConfig {
        AnalysisConfig {
            n: 1,
            limit,
            policy,
            pipeline,
            pruning: None,
        }
    }

    #[test]
    fn test_reconstruct_then_rank_detection_order() {
        let cfg = config(Pipeline::ReconstructThenRank, RankingPolicy::DetectionOrder, 5);
        let result = run_pipeline(&ladder(40), &table(), &cfg).unwrap();

        assert_eq!(first_indices(&result), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_reconstruct_then_rank_considers_every_row() {
        let cfg = config(Pipeline::ReconstructThenRank, RankingPolicy::Longest, 2);
        let result = run_pipeline(&ladder(40), &table(), &cfg).unwrap();

        // Totals: row 1 is 16.5 seconds, row 6 is 9.5, row 5 is 7.5
        assert_eq!(first_indices(&result), vec![1, 6]);
    }

    #[test]
    fn test_prefilter_orders_by_occurrence_count() {
        let cfg = config(Pipeline::PrefilterByCount, RankingPolicy::DetectionOrder, 3);
        let result = run_pipeline(&ladder(40), &table(), &cfg).unwrap();

        assert_eq!(first_indices(&result), vec![3, 1, 5]);
    }

    #[test]
    fn test_prefilter_then_duration_policy_ranks_within_shortlist() {
        let cfg = config(Pipeline::PrefilterByCount, RankingPolicy::Longest, 2);
        let result = run_pipeline(&ladder(40), &table(), &cfg).unwrap();

        // Shortlist is rows 3 and 1; row 6 is long but never considered
        assert_eq!(first_indices(&result), vec![1, 3]);
    }

    #[test]
    fn test_stage_functions_match_pipeline() {
        let sequence = ladder(40);
        let table = table();

        let all = reconstruct_all(&sequence, &table, 1, None).unwrap();
        assert_eq!(all.len(), 7);

        let shortlist = prefilter_then_reconstruct(&sequence, &table, 1, 2, None).unwrap();
        assert_eq!(first_indices(&shortlist), vec![3, 1]);
    }

    #[test]
    fn test_prefilter_pipeline_agrees_with_stage_function() {
        let sequence = ladder(40);
        let table = table();
        let trace = TraceBuilder::new(Uuid::new_v4());

        let cfg = config(Pipeline::PrefilterByCount, RankingPolicy::DetectionOrder, 3);
        let (piped, entries) = run_pipeline_traced(&sequence, &table, &cfg, &trace).unwrap();
        let staged = prefilter_then_reconstruct(&sequence, &table, 1, 3, None).unwrap();

        assert_eq!(piped, staged);
        assert_eq!(entries[1].stage, Stage::Prefilter);
        assert_eq!(entries[1].data.as_ref().unwrap()["kept"], 3);
    }

    #[test]
    fn test_pruning_applies_in_pipeline() {
        let sequence = ladder(60);
        let table = ClusterTable::new(vec![ClusterRow::new((0..8).map(|i| i * 5).collect(), 0, 3)]);

        let mut cfg = config(Pipeline::ReconstructThenRank, RankingPolicy::DetectionOrder, 5);
        let unpruned = run_pipeline(&sequence, &table, &cfg).unwrap();
        assert_eq!(unpruned.variant_count(), 8);

        cfg.pruning = Some(PruningPolicy::default());
        let pruned = run_pipeline(&sequence, &table, &cfg).unwrap();
        assert_eq!(pruned.variant_count(), 5);
    }

    #[test]
    fn test_empty_sequence_yields_empty_set() {
        let cfg = AnalysisConfig::default();
        let result = run_pipeline(&NoteSequence::default(), &table(), &cfg).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_out_of_range_row_fails() {
        let cfg = config(Pipeline::ReconstructThenRank, RankingPolicy::DetectionOrder, 5);
        let result = run_pipeline(&ladder(10), &table(), &cfg);

        assert!(matches!(
            result,
            Err(PipelineError::Cluster(ClusterError::IndexOutOfRange { idx: 10, size: 10 }))
        ));
    }

    #[test]
    fn test_invalid_config_fails() {
        let cfg = config(Pipeline::ReconstructThenRank, RankingPolicy::DetectionOrder, 0);
        let result = run_pipeline(&ladder(40), &table(), &cfg);

        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_traced_run_records_each_stage() {
        let trace = TraceBuilder::new(Uuid::new_v4());

        let cfg = config(Pipeline::PrefilterByCount, RankingPolicy::Fastest, 3);
        let (fragments, entries) =
            run_pipeline_traced(&ladder(40), &table(), &cfg, &trace).unwrap();

        let stages: Vec<Stage> = entries.iter().map(|e| e.stage).collect();
        assert_eq!(
            stages,
            vec![Stage::Load, Stage::Prefilter, Stage::Reconstruct, Stage::Rank]
        );
        assert_eq!(entries[3].data.as_ref().unwrap()["fragments"], fragments.len());

        let cfg = config(Pipeline::ReconstructThenRank, RankingPolicy::Fastest, 3);
        let (_, entries) = run_pipeline_traced(&ladder(40), &table(), &cfg, &trace).unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn test_pipeline_labels() {
        assert_eq!("prefilter".parse::<Pipeline>().unwrap(), Pipeline::PrefilterByCount);
        assert_eq!("RANK".parse::<Pipeline>().unwrap(), Pipeline::ReconstructThenRank);
        assert!(matches!(
            "sideways".parse::<Pipeline>(),
            Err(PipelineError::UnknownPipeline(_))
        ));

        let json = serde_json::to_string(&Pipeline::PrefilterByCount).unwrap();
        assert_eq!(json, "\"prefilter\"");
    }
}
