// Fragment types
// Variants (occurrence windows), fragments, and fragment sets

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::sequence::NoteSequence;

/// One concrete occurrence of a fragment
///
/// Both note indices point at real notes of the source sequence:
/// `start_note_index <= finish_note_index <= size - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Start time of the first note in the window (seconds)
    pub start_time: f64,

    /// End time of the last note in the window (seconds)
    pub finish_time: f64,

    /// Index of the first note in the window
    pub start_note_index: usize,

    /// Index of the last note in the window
    pub finish_note_index: usize,
}

impl Variant {
    /// Time spanned by the window in seconds
    pub fn duration(&self) -> f64 {
        self.finish_time - self.start_time
    }

    /// Half-open note range used when slicing the sequence for rendering
    ///
    /// The finish note itself is excluded, so a window collapsed to a single
    /// note renders as an empty slice.
    pub fn note_range(&self) -> Range<usize> {
        self.start_note_index..self.finish_note_index
    }

    /// Notes of this variant, sliced half-open out of the source sequence
    pub fn notes_in(&self, sequence: &NoteSequence) -> NoteSequence {
        sequence.slice(self.start_note_index, self.finish_note_index)
    }
}

/// All reconstructed occurrences of one detected fragment type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub variants: Vec<Variant>,
}

impl Fragment {
    pub fn new(variants: Vec<Variant>) -> Self {
        Fragment { variants }
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Sum of variant durations, the metric the duration policies sort by
    pub fn total_duration(&self) -> f64 {
        self.variants.iter().map(Variant::duration).sum()
    }

    /// The variant shown as the fragment's representative
    pub fn first_variant(&self) -> Option<&Variant> {
        self.variants.first()
    }
}

/// Ordered fragments for one sequence and clustering window size
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentSet {
    fragments: Vec<Fragment>,
}

impl FragmentSet {
    pub fn new(fragments: Vec<Fragment>) -> Self {
        FragmentSet { fragments }
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Fragment> {
        self.fragments.iter()
    }

    pub fn into_fragments(self) -> Vec<Fragment> {
        self.fragments
    }

    /// Total number of variants across all fragments
    pub fn variant_count(&self) -> usize {
        self.fragments.iter().map(Fragment::len).sum()
    }
}

impl From<Vec<Fragment>> for FragmentSet {
    fn from(fragments: Vec<Fragment>) -> Self {
        FragmentSet::new(fragments)
    }
}

impl FromIterator<Fragment> for FragmentSet {
    fn from_iter<I: IntoIterator<Item = Fragment>>(iter: I) -> Self {
        FragmentSet::new(iter.into_iter().collect())
    }
}

impl IntoIterator for FragmentSet {
    type Item = Fragment;
    type IntoIter = std::vec::IntoIter<Fragment>;

    fn into_iter(self) -> Self::IntoIter {
        self.fragments.into_iter()
    }
}

impl<'a> IntoIterator for &'a FragmentSet {
    type Item = &'a Fragment;
    type IntoIter = std::slice::Iter<'a, Fragment>;

    fn into_iter(self) -> Self::IntoIter {
        self.fragments.iter()
    }
}
