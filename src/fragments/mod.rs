// Fragments - Window reconstruction and ranking of repeated fragments
// Turns cluster rows into concrete variant windows and selects which to surface

pub mod types;
pub mod reconstruct;
pub mod rank;

pub use types::{Fragment, FragmentSet, Variant};
pub use reconstruct::{reconstruct, PruningPolicy};
pub use rank::{rank, rank_by_name, RankError, RankingPolicy, DEFAULT_LIMIT};
