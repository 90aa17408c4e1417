// Refrain CLI
// Reconstruct and rank repeated fragments of a MIDI performance

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::prelude::*;

use refrain_lib::commands::{self, AnalyzeInput, CommandResult, ExportVariantInput, SequenceSource};
use refrain_lib::config::AnalysisConfig;
use refrain_lib::fragments::RankingPolicy;
use refrain_lib::pipeline::{Pipeline, TraceWriter};
use refrain_lib::render::{ArtifactId, MidiExportOptions};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Standard MIDI File to analyze
    midi: PathBuf,

    /// Cluster table emitted by the clustering routine (JSON)
    clusters: PathBuf,

    /// JSON config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Clustering window size
    #[arg(short, long)]
    n: Option<usize>,

    /// Maximum number of fragments to return
    #[arg(short, long)]
    limit: Option<usize>,

    /// Ranking policy: detection-order (top), fastest, longest
    #[arg(short, long)]
    policy: Option<RankingPolicy>,

    /// Stage order: rank (reconstruct then rank) or prefilter
    #[arg(long)]
    pipeline: Option<Pipeline>,

    /// Stop a fragment early once a long-pause variant appears
    #[arg(long)]
    prune: bool,

    /// Pause length in seconds that triggers pruning
    #[arg(long)]
    prune_max_pause: Option<f64>,

    /// Variants kept before pruning may stop a fragment
    #[arg(long)]
    prune_min_variants: Option<usize>,

    /// Append stage trace records to this JSONL file
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Write each variant as a MIDI file under this directory
    #[arg(long)]
    export_dir: Option<PathBuf>,
}

impl Args {
    fn analysis_config(&self) -> CommandResult<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(n) = self.n {
            config.n = n;
        }
        if let Some(limit) = self.limit {
            config.limit = limit;
        }
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
        if let Some(pipeline) = self.pipeline {
            config.pipeline = pipeline;
        }

        let wants_pruning =
            self.prune || self.prune_max_pause.is_some() || self.prune_min_variants.is_some();
        if wants_pruning {
            let mut pruning = config.pruning.unwrap_or_default();
            if let Some(max_pause) = self.prune_max_pause {
                pruning.max_pause = max_pause;
            }
            if let Some(min_variants) = self.prune_min_variants {
                pruning.min_variants = min_variants;
            }
            config.pruning = Some(pruning);
        }

        Ok(config)
    }
}

fn run(args: Args) -> CommandResult<()> {
    let config = args.analysis_config()?;
    let midi_data = std::fs::read(&args.midi)?;
    let clusters: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&args.clusters)?)?;

    let source = SequenceSource::Midi(midi_data);
    let result = commands::analyze_fragments(AnalyzeInput {
        source: source.clone(),
        clusters,
        config,
    })?;

    if let Some(path) = &args.trace {
        let writer = TraceWriter::new(path.clone());
        writer.write_batch(&result.trace)?;
        log::info!("Trace written to {}", writer.path().display());
    }

    if let Some(base_dir) = &args.export_dir {
        for (f, fragment) in result.fragments.iter().enumerate() {
            for (v, variant) in fragment.variants.iter().enumerate() {
                let exported = commands::export_variant_midi(ExportVariantInput {
                    source: source.clone(),
                    id: ArtifactId::new(result.run_id, f, v),
                    variant: *variant,
                    base_dir: base_dir.clone(),
                    options: MidiExportOptions::default(),
                })?;

                if let Some(dir) = exported.paths.midi.parent() {
                    std::fs::create_dir_all(dir)?;
                }
                std::fs::write(&exported.paths.midi, &exported.midi_data)?;
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&result.fragments)?);
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "refrain=info,refrain_lib=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{}", error.message());
            eprintln!("error: {}", error.message());
            ExitCode::FAILURE
        }
    }
}
