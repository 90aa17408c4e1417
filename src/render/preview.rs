// Variant previews
// Summaries of the note slice a variant hands to the renderer

use serde::{Deserialize, Serialize};

use crate::fragments::{FragmentSet, Variant};
use crate::sequence::NoteSequence;

use super::artifacts::ArtifactId;

/// What a renderer would receive for one variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantPreview {
    /// Notes in the half-open slice `[start_note_index, finish_note_index)`
    pub note_count: usize,

    /// Span of the sliced notes in seconds, 0.0 when the slice is empty
    pub duration: f64,

    pub start_time: f64,
    pub finish_time: f64,
}

/// Summarize the slice of `sequence` a variant refers to
pub fn preview_variant(sequence: &NoteSequence, variant: &Variant) -> VariantPreview {
    let notes = variant.notes_in(sequence);

    VariantPreview {
        note_count: notes.size(),
        duration: notes.duration(),
        start_time: variant.start_time,
        finish_time: variant.finish_time,
    }
}

/// Preview every variant of every fragment, keyed by artifact id
pub fn preview_fragments(
    sequence: &NoteSequence,
    fragments: &FragmentSet,
    run_id: uuid::Uuid,
) -> Vec<(ArtifactId, VariantPreview)> {
    fragments
        .iter()
        .enumerate()
        .flat_map(|(f, fragment)| {
            fragment.variants.iter().enumerate().map(move |(v, variant)| {
                (
                    ArtifactId::new(run_id, f, v),
                    preview_variant(sequence, variant),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragments::Fragment;
    use crate::sequence::Note;
    use uuid::Uuid;

    fn ladder(count: usize) -> NoteSequence {
        NoteSequence::new(
            (0..count)
                .map(|i| Note::timed(i as f64, i as f64 + 0.5))
                .collect(),
        )
    }

    fn variant(start: usize, finish: usize) -> Variant {
        Variant {
            start_time: start as f64,
            finish_time: finish as f64 + 0.5,
            start_note_index: start,
            finish_note_index: finish,
        }
    }

    #[test]
    fn test_slice_excludes_finish_note() {
        let preview = preview_variant(&ladder(10), &variant(2, 6));

        assert_eq!(preview.note_count, 4);
        // Notes 2..=5: first start 2.0, latest end 5.5
        assert!((preview.duration - 3.5).abs() < 1e-9);
        assert_eq!(preview.start_time, 2.0);
        assert_eq!(preview.finish_time, 6.5);
    }

    #[test]
    fn test_collapsed_window_is_empty() {
        let preview = preview_variant(&ladder(10), &variant(9, 9));

        assert_eq!(preview.note_count, 0);
        assert_eq!(preview.duration, 0.0);
    }

    #[test]
    fn test_preview_fragments_assigns_ids_in_order() {
        let run_id = Uuid::new_v4();
        let set = FragmentSet::new(vec![
            Fragment::new(vec![variant(0, 3), variant(4, 7)]),
            Fragment::new(vec![variant(1, 2)]),
        ]);

        let previews = preview_fragments(&ladder(10), &set, run_id);

        let ids: Vec<(usize, usize)> = previews
            .iter()
            .map(|(id, _)| (id.fragment, id.variant))
            .collect();
        assert_eq!(ids, vec![(0, 0), (0, 1), (1, 0)]);
        assert!(previews.iter().all(|(id, _)| id.run_id == run_id));
        assert_eq!(previews[2].1.note_count, 1);
    }
}
