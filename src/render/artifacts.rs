// Artifact naming
// Render outputs are named from an explicit identifier, never from ambient state

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Identifies one variant of one fragment within an analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId {
    pub run_id: Uuid,

    /// Position of the fragment in the ranked set
    pub fragment: usize,

    /// Position of the variant within its fragment
    pub variant: usize,
}

impl ArtifactId {
    pub fn new(run_id: Uuid, fragment: usize, variant: usize) -> Self {
        ArtifactId {
            run_id,
            fragment,
            variant,
        }
    }

    /// File stem shared by every artifact of this variant
    pub fn stem(&self) -> String {
        format!("fragment-{}-variant-{}", self.fragment, self.variant)
    }
}

/// Where the rendering collaborator should put each artifact of a variant
///
/// Paths are computed only; nothing is created or checked on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub midi: PathBuf,
    pub audio: PathBuf,
    pub pianoroll: PathBuf,
}

impl ArtifactPaths {
    /// `<base_dir>/<run_id>/fragment-<f>-variant-<v>{.mid,.mp3,-pr.png}`
    pub fn for_artifact(base_dir: &Path, id: &ArtifactId) -> Self {
        let dir = base_dir.join(id.run_id.to_string());
        let stem = id.stem();

        ArtifactPaths {
            midi: dir.join(format!("{}.mid", stem)),
            audio: dir.join(format!("{}.mp3", stem)),
            pianoroll: dir.join(format!("{}-pr.png", stem)),
        }
    }
}
