// Render support - Everything the rendering collaborator needs per variant
// Explicit artifact naming, slice previews, and MIDI export of a variant

pub mod artifacts;
pub mod preview;
pub mod midi;

pub use artifacts::{ArtifactId, ArtifactPaths};
pub use preview::{preview_fragments, preview_variant, VariantPreview};
pub use midi::{export_notes_midi, export_variant_midi, ExportError, MidiExportOptions};
