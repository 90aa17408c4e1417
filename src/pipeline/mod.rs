// Pipeline execution module
// Orders the pre-filter, reconstruction and ranking stages of an analysis run

pub mod stages;
pub mod trace;

pub use stages::{
    prefilter_then_reconstruct, reconstruct_all, run_pipeline, run_pipeline_traced, Pipeline,
    PipelineError,
};
pub use trace::{read_trace_file, Stage, TraceBuilder, TraceEntry, TraceError, TraceWriter};
