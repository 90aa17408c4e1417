// Fragment Ranking - Bounded selection of fragments for display
// A closed set of policies; labels are parsed once at the boundary

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::types::{Fragment, FragmentSet};

/// Fragments surfaced when the caller does not ask for a specific count
pub const DEFAULT_LIMIT: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RankError {
    #[error("Unknown ranking policy: '{0}' (expected detection-order, fastest or longest)")]
    UnknownPolicy(String),
}

/// Rule used to choose which fragments are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankingPolicy {
    /// Keep the order the clustering routine emitted
    #[default]
    #[serde(alias = "top")]
    DetectionOrder,

    /// Shortest total duration first
    Fastest,

    /// Longest total duration first
    Longest,
}

impl RankingPolicy {
    /// Every policy, in display order
    pub fn all() -> [RankingPolicy; 3] {
        [
            RankingPolicy::DetectionOrder,
            RankingPolicy::Fastest,
            RankingPolicy::Longest,
        ]
    }

    /// Canonical label, accepted back by `from_str`
    pub fn label(&self) -> &'static str {
        match self {
            RankingPolicy::DetectionOrder => "detection-order",
            RankingPolicy::Fastest => "fastest",
            RankingPolicy::Longest => "longest",
        }
    }

    /// Human-readable name for UI display
    pub fn display_name(&self) -> &'static str {
        match self {
            RankingPolicy::DetectionOrder => "Top",
            RankingPolicy::Fastest => "Fastest",
            RankingPolicy::Longest => "Longest",
        }
    }
}

impl fmt::Display for RankingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RankingPolicy {
    type Err = RankError;

    /// Case-insensitive; `top` and `detection_order` are accepted aliases
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "detection-order" | "detection_order" | "top" => Ok(RankingPolicy::DetectionOrder),
            "fastest" => Ok(RankingPolicy::Fastest),
            "longest" => Ok(RankingPolicy::Longest),
            _ => Err(RankError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Select at most `limit` fragments under `policy`
///
/// Duration policies sort by `Fragment::total_duration` with a stable sort,
/// so equal totals keep detection order and repeated calls on identical input
/// give identical output.
pub fn rank(fragments: &FragmentSet, policy: RankingPolicy, limit: usize) -> FragmentSet {
    let mut ordered: Vec<&Fragment> = fragments.iter().collect();

    match policy {
        RankingPolicy::DetectionOrder => {}
        RankingPolicy::Fastest => {
            ordered.sort_by(|a, b| a.total_duration().total_cmp(&b.total_duration()));
        }
        RankingPolicy::Longest => {
            ordered.sort_by(|a, b| b.total_duration().total_cmp(&a.total_duration()));
        }
    }

    ordered.into_iter().take(limit).cloned().collect()
}

/// Rank using a policy label supplied by the caller
pub fn rank_by_name(
    fragments: &FragmentSet,
    policy: &str,
    limit: usize,
) -> Result<FragmentSet, RankError> {
    let policy = policy.parse::<RankingPolicy>()?;
    Ok(rank(fragments, policy, limit))
}
