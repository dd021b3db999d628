/// Decides which items of one question type a candidate receives.
///
/// Implementations return positions into the type's item list, ordered by ordinal.
/// `AppState` holds an `Arc<dyn AssignmentPolicy>`; default: [`RoundRobinAssignment`].
pub trait AssignmentPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `candidate_index` is 1-based. Every returned position is `< pool_size`.
    fn assign(&self, candidate_index: u32, per_candidate: u32, pool_size: u32) -> Vec<u32>;
}

/// Contiguous, wrapping slice starting at `(candidate_index - 1) * per_candidate mod pool_size`.
///
/// With `pool_size == candidate_count * per_candidate` every item is handed out exactly once.
/// A candidate never receives the same item twice: the slice is capped at `pool_size`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobinAssignment;

impl AssignmentPolicy for RoundRobinAssignment {
    fn name(&self) -> &'static str {
        "round_robin"
    }

    fn assign(&self, candidate_index: u32, per_candidate: u32, pool_size: u32) -> Vec<u32> {
        if candidate_index == 0 || per_candidate == 0 || pool_size == 0 {
            return Vec::new();
        }
        let pool = pool_size as u64;
        let offset = (candidate_index as u64 - 1) * per_candidate as u64 % pool;
        let take = per_candidate.min(pool_size) as u64;

        (0..take).map(|k| ((offset + k) % pool) as u32).collect()
    }
}
