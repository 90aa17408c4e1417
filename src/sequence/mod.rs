// Note Sequence - Time-ordered notes of a performance
// Index lookup, half-open slicing, and loading from Standard MIDI Files

pub mod note;
pub mod midi;

pub use note::{Note, NoteSequence};
pub use midi::{load_midi, MidiError};
