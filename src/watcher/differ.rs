use std::collections::HashMap;

use crate::models::{Availability, MatchRecord, Snapshot};

/// Records of `current` that went from `Unavailable` in `previous` to
/// `Available` now, in `current` order.
///
/// A match with no record in `previous` is never a transition.
pub fn diff(previous: &Snapshot, current: &[MatchRecord]) -> Vec<MatchRecord> {
    let before: HashMap<&[String], Availability> = previous
        .records()
        .iter()
        .map(|r| (r.teams.as_slice(), r.availability))
        .collect();

    current
        .iter()
        .filter(|record| {
            record.availability == Availability::Available
                && before.get(record.teams.as_slice()) == Some(&Availability::Unavailable)
        })
        .cloned()
        .collect()
}
