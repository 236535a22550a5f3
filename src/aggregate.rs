use crate::models::Aggregate;
use crate::storage::ScoreEntry;

/// Folds a page's entries into totals for `visitor`.
///
/// Zero-score members are not counted as users; they can only appear when a
/// store was written by something other than this service.
pub fn build_aggregate(entries: &[ScoreEntry], visitor: &str, max_score: u64) -> Aggregate {
    let mut aggregate = Aggregate {
        max_score,
        ..Aggregate::default()
    };

    for entry in entries {
        if entry.visitor == visitor {
            aggregate.user_score = entry.score;
        }
        if entry.score > 0 {
            aggregate.total_users += 1;
        }
        aggregate.total_score = aggregate.total_score.saturating_add(entry.score);
    }

    aggregate
}
