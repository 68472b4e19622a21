//! Deterministic tie-breaking between concurrent coordinator candidates
//! (§4.5 "Election tie-breaking", invariant I5).

use std::cmp::Ordering;

use watchdog_types::NodeIdentity;

/// Orders two candidates by the rule in §4.5: higher priority wins,
/// then earlier `startTime` (older node) wins. `Ordering::Less` means
/// `a` beats `b`.
///
/// Returns `Ordering::Equal` only for an exact `(priority, startTime)`
/// tie, which the caller must break with [`we_win_exact_tie`] per I5's
/// third rule.
pub fn rank_candidates(a: &NodeIdentity, b: &NodeIdentity) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.start_time.cmp(&b.start_time))
}

/// Third tie-break rule, for the rare case where two candidates share
/// both `priority` and `startTime`: the candidate with the numerically
/// greater `PrivateId` yields. Wall-clock reception order isn't a valid
/// signal here — both sides learn of the other's STAND_FOR_COORDINATOR
/// exactly once, with no shared clock and no round trip to compare
/// timestamps against, so any rule built on "who received first" gives
/// each side a different answer. `PrivateId` comparison is the one
/// input both candidates already hold and agree on.
///
/// `their_id_outranks_ours` is true when the other candidate's
/// `PrivateId` is numerically greater than this node's — in which case
/// this node keeps standing and the other yields.
pub fn we_win_exact_tie(their_id_outranks_ours: bool) -> bool {
    their_id_outranks_ours
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchdog_types::PrivateId;

    fn identity(private_id: u32, priority: u32, start_time: u64) -> NodeIdentity {
        NodeIdentity {
            private_id: PrivateId(private_id),
            node_name: format!("node{private_id}"),
            hostname: "h".into(),
            watchdog_port: 9000,
            application_port: 5432,
            start_time,
            priority,
            delegate_ip: String::new(),
        }
    }

    #[test]
    fn higher_priority_wins_regardless_of_start_time() {
        let a = identity(1, 20, 100);
        let b = identity(2, 10, 1);
        assert_eq!(rank_candidates(&a, &b), Ordering::Less);
    }

    #[test]
    fn equal_priority_older_start_time_wins() {
        let a = identity(1, 10, 50);
        let b = identity(2, 10, 100);
        assert_eq!(rank_candidates(&a, &b), Ordering::Less);
    }

    #[test]
    fn exact_tie_is_equal_and_resolved_by_private_id() {
        let a = identity(1, 10, 50);
        let b = identity(2, 10, 50);
        assert_eq!(rank_candidates(&a, &b), Ordering::Equal);
        // a's id (1) is lower than b's (2): from a's side, b outranks it numerically.
        assert!(we_win_exact_tie(true));
        assert!(!we_win_exact_tie(false));
    }
}
