// Refrain - Repeated fragment reconstruction and ranking for MIDI performances
// Module declarations

pub mod clustering;
pub mod commands;
pub mod config;
pub mod fragments;
pub mod pipeline;
pub mod render;
pub mod sequence;

pub use clustering::{ClusterError, ClusterRow, ClusterTable};
pub use config::{AnalysisConfig, ConfigError};
pub use fragments::{rank, reconstruct, Fragment, FragmentSet, PruningPolicy, RankingPolicy, Variant};
pub use pipeline::{run_pipeline, Pipeline, PipelineError};
pub use sequence::{load_midi, Note, NoteSequence};
