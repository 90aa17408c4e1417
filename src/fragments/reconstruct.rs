// Window Reconstruction - Cluster rows to concrete variant windows
// Widens every matched index by the row margins and clamps to the sequence

use serde::{Deserialize, Serialize};

use super::types::{Fragment, Variant};
use crate::clustering::{ClusterError, ClusterRow};
use crate::sequence::NoteSequence;

/// Early-stop rule for fragments whose occurrences are padded by long pauses
///
/// Once a fragment already holds `min_variants` variants, the first variant
/// spanning more than `max_pause` seconds ends reconstruction for that
/// fragment (that variant is still kept).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PruningPolicy {
    /// Longest variant span (seconds) accepted without stopping
    pub max_pause: f64,

    /// Variants a fragment must hold before the rule can trigger
    pub min_variants: usize,
}

impl Default for PruningPolicy {
    fn default() -> Self {
        PruningPolicy {
            max_pause: 2.0,
            min_variants: 5,
        }
    }
}

impl PruningPolicy {
    /// Whether to stop after `latest` was appended, giving `kept` variants
    pub fn should_stop(&self, latest: &Variant, kept: usize) -> bool {
        latest.duration() > self.max_pause && kept >= self.min_variants
    }
}

/// Reconstruct the variant windows of one cluster row
///
/// For every representative index, in row order:
/// - the window starts `left_shift` notes earlier, floored at note 0
/// - the window ends `right_shift + n` notes later, capped at the last note
///
/// `n` is the clustering window size; a match marks only the first note of an
/// `n`-note pattern, so every window end is pushed forward by it.
///
/// An empty sequence yields an empty fragment. An index past the end of a
/// non-empty sequence means the row is corrupt and fails the call.
pub fn reconstruct(
    sequence: &NoteSequence,
    row: &ClusterRow,
    n: usize,
    pruning: Option<&PruningPolicy>,
) -> Result<Fragment, ClusterError> {
    let Some(last_index) = sequence.last_index() else {
        return Ok(Fragment::default());
    };

    let mut variants = Vec::with_capacity(row.idxs.len());

    for &idx in &row.idxs {
        if idx > last_index {
            return Err(ClusterError::IndexOutOfRange {
                idx,
                size: sequence.size(),
            });
        }

        let start_note_index = idx.saturating_sub(row.left_shift);
        let finish_note_index = idx
            .saturating_add(row.right_shift)
            .saturating_add(n)
            .min(last_index);

        let variant = Variant {
            start_time: sequence[start_note_index].start_time,
            finish_time: sequence[finish_note_index].end_time,
            start_note_index,
            finish_note_index,
        };
        variants.push(variant);

        if let Some(policy) = pruning {
            if policy.should_stop(&variant, variants.len()) {
                break;
            }
        }
    }

    Ok(Fragment::new(variants))
}
