//! Spawn bookkeeping shared by traffic and obstacles

use serde::{Deserialize, Serialize};

use super::events::ActorId;

/// Result of a single spawn attempt. Rejections are normal control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    Spawned(ActorId),
    /// Population cap reached
    CapReached,
    /// Too close to an existing entity; the attempt is dropped, not retried
    Unsafe,
    /// No variant is allowed at this stage
    NothingEligible,
}

impl SpawnOutcome {
    pub fn spawned(&self) -> Option<ActorId> {
        match self {
            SpawnOutcome::Spawned(id) => Some(*id),
            _ => None,
        }
    }
}

/// Hands out actor ids unique across every subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    pub fn next_id(&mut self) -> ActorId {
        let id = self.next;
        self.next += 1;
        ActorId(id)
    }
}

/// Cumulative-probability bucketing: index of the first bucket whose running
/// total reaches `roll`. Weights need not be normalized. Falls back to the
/// first bucket when rounding leaves `roll` past the final total.
pub fn pick_weighted(weights: &[f32], roll: f32) -> usize {
    let total: f32 = weights.iter().sum();
    if total <= 0.0 {
        return 0;
    }
    let mut cumulative = 0.0;
    for (i, w) in weights.iter().enumerate() {
        cumulative += w / total;
        if roll <= cumulative {
            return i;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_weighted_buckets() {
        let weights = [0.25, 0.5, 0.25];
        assert_eq!(pick_weighted(&weights, 0.0), 0);
        assert_eq!(pick_weighted(&weights, 0.25), 0);
        assert_eq!(pick_weighted(&weights, 0.3), 1);
        assert_eq!(pick_weighted(&weights, 0.76), 2);
    }

    #[test]
    fn test_pick_weighted_normalizes() {
        // 0.5 / 0.3 / 0.2 style weights that do not sum to one
        assert_eq!(pick_weighted(&[2.0, 2.0], 0.6), 1);
        assert_eq!(pick_weighted(&[], 0.5), 0);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut ids = IdAllocator::default();
        let a = ids.next_id();
        let b = ids.next_id();
        assert_ne!(a, b);
    }
}
