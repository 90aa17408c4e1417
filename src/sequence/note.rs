// Note types
// A performance is a flat, zero-indexed list of notes in start-time order

use serde::{Deserialize, Serialize};
use std::ops::Index;

/// A single performed note
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Onset time in seconds from the start of the performance
    pub start_time: f64,

    /// Release time in seconds, never earlier than `start_time`
    pub end_time: f64,

    /// MIDI key number (0-127)
    #[serde(default = "default_pitch")]
    pub pitch: u8,

    /// MIDI velocity (1-127)
    #[serde(default = "default_velocity")]
    pub velocity: u8,
}

fn default_pitch() -> u8 {
    60
}

fn default_velocity() -> u8 {
    80
}

impl Note {
    /// Create a note with explicit pitch and velocity
    pub fn new(start_time: f64, end_time: f64, pitch: u8, velocity: u8) -> Self {
        Note {
            start_time,
            end_time,
            pitch,
            velocity,
        }
    }

    /// Create a note carrying timing only (middle C, medium velocity)
    pub fn timed(start_time: f64, end_time: f64) -> Self {
        Note::new(start_time, end_time, default_pitch(), default_velocity())
    }

    /// Sounding length in seconds
    pub fn length(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Ordered, index-addressable note sequence
///
/// Index `i` is the note's position in performance order. The sequence is
/// never mutated after construction; slicing produces a new sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteSequence {
    notes: Vec<Note>,
}

impl NoteSequence {
    /// Wrap notes that are already in performance order
    pub fn new(notes: Vec<Note>) -> Self {
        NoteSequence { notes }
    }

    /// Build a sequence from unordered notes
    ///
    /// Notes are ordered by start time, then pitch. The sort is stable so
    /// simultaneous notes of equal pitch keep their input order.
    pub fn from_unordered(mut notes: Vec<Note>) -> Self {
        notes.sort_by(|a, b| {
            a.start_time
                .total_cmp(&b.start_time)
                .then(a.pitch.cmp(&b.pitch))
        });
        NoteSequence { notes }
    }

    /// Number of notes
    pub fn size(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Index of the last note, `None` for an empty sequence
    pub fn last_index(&self) -> Option<usize> {
        self.notes.len().checked_sub(1)
    }

    pub fn get(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Note> {
        self.notes.iter()
    }

    /// Total span: first note start to the latest note end
    ///
    /// Returns 0.0 for an empty sequence.
    pub fn duration(&self) -> f64 {
        let Some(first) = self.notes.first() else {
            return 0.0;
        };

        let last_end = self
            .notes
            .iter()
            .map(|n| n.end_time)
            .fold(f64::NEG_INFINITY, f64::max);

        last_end - first.start_time
    }

    /// Copy out the half-open range `[start, finish)`
    ///
    /// Bounds past the end are clamped; an inverted range yields an empty
    /// sequence. Times are kept absolute.
    pub fn slice(&self, start: usize, finish: usize) -> NoteSequence {
        let finish = finish.min(self.notes.len());
        let start = start.min(finish);
        NoteSequence::new(self.notes[start..finish].to_vec())
    }

    /// Shift every note so the first one starts at zero
    pub fn rebased(&self) -> NoteSequence {
        let offset = self.notes.first().map(|n| n.start_time).unwrap_or(0.0);
        let notes = self
            .notes
            .iter()
            .map(|n| Note {
                start_time: n.start_time - offset,
                end_time: n.end_time - offset,
                ..*n
            })
            .collect();
        NoteSequence::new(notes)
    }
}

impl Index<usize> for NoteSequence {
    type Output = Note;

    fn index(&self, index: usize) -> &Self::Output {
        &self.notes[index]
    }
}

impl From<Vec<Note>> for NoteSequence {
    fn from(notes: Vec<Note>) -> Self {
        NoteSequence::new(notes)
    }
}

impl<'a> IntoIterator for &'a NoteSequence {
    type Item = &'a Note;
    type IntoIter = std::slice::Iter<'a, Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.notes.iter()
    }
}
