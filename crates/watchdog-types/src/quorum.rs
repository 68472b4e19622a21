//! Quorum arithmetic (§4.6).
//!
//! Open question noted in spec §9: the source's quorum table treats `N`
//! even and `N` odd inconsistently at `L = minimum`. This function follows
//! §4.6 literally rather than "fixing" the asymmetry — see `DESIGN.md` for
//! the recorded decision.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuorumStatus {
    /// Quorum lost (-1 in spec terms).
    Lost,
    /// On the edge but still treated as present (0 in spec terms).
    Edge,
    /// Comfortably present (+1 in spec terms).
    Present,
}

impl QuorumStatus {
    /// A coordinator may hold the VIP only when quorum is `Edge` or
    /// `Present` (§4.6, §I4).
    pub fn holds_vip(self) -> bool {
        !matches!(self, QuorumStatus::Lost)
    }
}

/// Computes quorum status from `n` (configured remote peers) and `l`
/// (remote peers currently active), per §4.6.
pub fn quorum_status(n: u32, l: u32) -> QuorumStatus {
    let minimum = if n % 2 == 0 { n / 2 } else { (n - 1) / 2 };

    if l > minimum {
        QuorumStatus::Present
    } else if l == minimum {
        if n % 2 == 1 {
            QuorumStatus::Edge
        } else {
            QuorumStatus::Present
        }
    } else {
        QuorumStatus::Lost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn three_remote_peers_minimum_is_one() {
        // N=3 (odd): minimum = 1.
        assert_eq!(quorum_status(3, 0), QuorumStatus::Lost);
        assert_eq!(quorum_status(3, 1), QuorumStatus::Edge);
        assert_eq!(quorum_status(3, 2), QuorumStatus::Present);
        assert_eq!(quorum_status(3, 3), QuorumStatus::Present);
    }

    #[test]
    fn four_remote_peers_minimum_is_two() {
        // N=4 (even): minimum = 2, and L == minimum is already Present.
        assert_eq!(quorum_status(4, 0), QuorumStatus::Lost);
        assert_eq!(quorum_status(4, 1), QuorumStatus::Lost);
        assert_eq!(quorum_status(4, 2), QuorumStatus::Present);
        assert_eq!(quorum_status(4, 4), QuorumStatus::Present);
    }

    #[test]
    fn two_remote_peers_minimum_is_one() {
        // N=2 (even): minimum = 1.
        assert_eq!(quorum_status(2, 0), QuorumStatus::Lost);
        assert_eq!(quorum_status(2, 1), QuorumStatus::Present);
        assert_eq!(quorum_status(2, 2), QuorumStatus::Present);
    }

    proptest! {
        #[test]
        fn holds_vip_iff_not_lost(n in 0u32..16, l in 0u32..16) {
            let status = quorum_status(n, l.min(n));
            prop_assert_eq!(status.holds_vip(), status != QuorumStatus::Lost);
        }

        #[test]
        fn more_active_peers_never_regress_quorum(n in 1u32..16, l in 0u32..15) {
            let l = l.min(n.saturating_sub(1));
            let worse = quorum_status(n, l);
            let better = quorum_status(n, l + 1);
            let rank = |s: QuorumStatus| match s {
                QuorumStatus::Lost => 0,
                QuorumStatus::Edge => 1,
                QuorumStatus::Present => 2,
            };
            prop_assert!(rank(better) >= rank(worse));
        }
    }
}
