// Occurrence pre-filter
// Narrows the raw table to the most frequently detected fragment types

use super::table::{ClusterRow, ClusterTable};

/// Keep the `limit` rows with the most detected occurrences
///
/// Rows come back in descending `n_variants` order. Rows with equal counts
/// keep their table order, so the result is reproducible for identical input.
pub fn top_by_occurrences(table: &ClusterTable, limit: usize) -> ClusterTable {
    let mut rows: Vec<&ClusterRow> = table.iter().collect();
    rows.sort_by(|a, b| b.n_variants().cmp(&a.n_variants()));

    rows.into_iter().take(limit).cloned().collect::<Vec<_>>().into()
}
