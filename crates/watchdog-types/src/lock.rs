//! Coordinator-hosted failover lock table (§4.7).

use serde::{Deserialize, Serialize};

/// The fixed, named sub-locks a failover can hold (§3, §4.7). Indexing by
/// this enum rather than a raw integer keeps the K=3 sub-lock bitmap from
/// the original source (`MAX_FAILOVER_LOCKS`) self-describing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubLock {
    Failover,
    Failback,
    FollowMaster,
}

pub const SUB_LOCK_COUNT: usize = 3;

impl SubLock {
    pub const ALL: [SubLock; SUB_LOCK_COUNT] =
        [SubLock::Failover, SubLock::Failback, SubLock::FollowMaster];

    pub fn index(self) -> usize {
        match self {
            SubLock::Failover => 0,
            SubLock::Failback => 1,
            SubLock::FollowMaster => 2,
        }
    }
}

/// Reply to a `status` lock verb (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockStatus {
    Locked,
    Unlocked,
    NoHolder,
    /// A failover object exists for this `failoverID` but the coordinator
    /// hasn't acquired the lock for it yet — a race a standby may observe.
    NoHolderButWait,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_lock_indices_are_dense_and_distinct() {
        let mut seen = [false; SUB_LOCK_COUNT];
        for lock in SubLock::ALL {
            let idx = lock.index();
            assert!(idx < SUB_LOCK_COUNT);
            assert!(!seen[idx], "duplicate index for {lock:?}");
            seen[idx] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
