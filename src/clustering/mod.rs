// Clustering - Membership table produced by the external clustering routine
// Parsing, validation, and the occurrence-count pre-filter

pub mod table;
pub mod prefilter;

pub use table::{ClusterError, ClusterRow, ClusterTable};
pub use prefilter::top_by_occurrences;
