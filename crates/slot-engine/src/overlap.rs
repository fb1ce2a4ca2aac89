//! Attach plan-calendar collisions to primary occurrences.
//!
//! Pairwise comparison of every primary occurrence with every plan occurrence.
//! Adjacent intervals (one ends exactly when the other starts) do NOT collide.

use crate::model::{Occurrence, OverlapRecord};

/// `[a.date, a.end_date)` and `[b.date, b.end_date)` intersect.
pub fn intervals_overlap(a: &Occurrence, b: &Occurrence) -> bool {
    a.date < b.end_date && b.date < a.end_date
}

/// Summary of `plan` as seen from `primary`. Plan events without a transparency
/// marker are private.
pub fn overlap_record(primary: &Occurrence, plan: &Occurrence) -> OverlapRecord {
    OverlapRecord {
        id: plan.id.clone(),
        date: plan.date,
        blocks: vec![primary.summary.clone()],
        name: plan.summary.clone(),
        private: plan.is_private(),
    }
}

/// Set `overlaps` on every primary occurrence, in plan-list order.
///
/// Occurrences with no collision get an empty list. Any overlaps already present
/// are replaced.
pub fn annotate(primary: Vec<Occurrence>, plans: &[Occurrence]) -> Vec<Occurrence> {
    primary
        .into_iter()
        .map(|mut occurrence| {
            occurrence.overlaps = plans
                .iter()
                .filter(|plan| intervals_overlap(&occurrence, plan))
                .map(|plan| overlap_record(&occurrence, plan))
                .collect();
            occurrence
        })
        .collect()
}
