//! # Sequence Generator
//!
//! Derives the next human-readable identifier for an entity collection from
//! a configured starting offset and the maximum numeric id already present.
//!
//! ## Contract
//! ```text
//! next = max(max(numeric ids in collection), start - 1) + 1
//! ```
//! Non-numeric ids (UUIDs, imported ids) are ignored when computing the max.
//!
//! ## Guarantees
//! Sequential calls over a growing collection yield strictly increasing,
//! collision-free ids. The generator does NOT guarantee uniqueness against a
//! concurrent remote pull that introduces ids above the local counter: two
//! offline devices can allocate the same next id before either syncs, and the
//! last-writer-wins collection replace keeps whichever synced last. This is
//! an accepted limitation of the sync model, not a bug to patch here.

/// Returns the next id in a collection's sequence as a string.
///
/// `existing_ids` is the full id set of the collection; `start` is the
/// configured starting offset for that collection.
///
/// ```
/// use vela_core::sequence::next_sequence;
///
/// // Empty collection starts at the offset.
/// assert_eq!(next_sequence(std::iter::empty(), 100), "100");
///
/// // Gaps are fine; only the maximum matters.
/// let ids = ["100", "104", "archived-xyz"];
/// assert_eq!(next_sequence(ids.iter().copied(), 100), "105");
/// ```
pub fn next_sequence<'a, I>(existing_ids: I, start: u64) -> String
where
    I: Iterator<Item = &'a str>,
{
    let max_existing = existing_ids
        .filter_map(|id| id.parse::<u64>().ok())
        .max()
        .unwrap_or(0);

    let floor = start.saturating_sub(1);
    (max_existing.max(floor) + 1).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_collection_starts_at_offset() {
        assert_eq!(next_sequence(std::iter::empty(), 100), "100");
        assert_eq!(next_sequence(std::iter::empty(), 1), "1");
    }

    #[test]
    fn advances_past_the_maximum_existing_id() {
        let ids = ["100", "101"];
        assert_eq!(next_sequence(ids.iter().copied(), 100), "102");
    }

    #[test]
    fn ignores_non_numeric_ids() {
        let ids = ["abc", "550e8400-e29b-41d4-a716-446655440000", "7"];
        assert_eq!(next_sequence(ids.iter().copied(), 1), "8");
    }

    #[test]
    fn offset_wins_over_lower_existing_ids() {
        let ids = ["3", "17"];
        assert_eq!(next_sequence(ids.iter().copied(), 500), "500");
    }

    #[test]
    fn sequential_calls_are_strictly_increasing() {
        let mut ids: Vec<String> = vec!["20".into(), "35".into()];
        let mut previous = 0u64;
        for _ in 0..50 {
            let next = next_sequence(ids.iter().map(String::as_str), 10);
            let numeric: u64 = next.parse().unwrap();
            assert!(numeric > previous, "{numeric} not > {previous}");
            assert!(!ids.contains(&next));
            previous = numeric;
            ids.push(next);
        }
    }

    #[test]
    fn zero_offset_behaves_like_one() {
        assert_eq!(next_sequence(std::iter::empty(), 0), "1");
    }
}
