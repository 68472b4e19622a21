//! Failover deduplication and lifecycle (§3, §4.8).

use serde::{Deserialize, Serialize};

use crate::node::PrivateId;

/// A failover's identity is its admitting commandID (§3 Glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FailoverId(pub u32);

impl std::fmt::Display for FailoverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three failover verbs named in §4.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailoverKind {
    NodeUp,
    NodeDown,
    Promote,
}

/// An admitted, in-flight failover (§3).
///
/// Dedup key is `(kind, nodeSet)` with `nodeSet` compared as a sorted
/// multiset (§3); equal sets in different orders are the same failover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailoverObject {
    pub id: FailoverId,
    pub kind: FailoverKind,
    pub node_set: Vec<PrivateId>,
    pub requester: PrivateId,
    pub start_time: u64,
}

impl FailoverObject {
    pub fn new(
        id: FailoverId,
        kind: FailoverKind,
        mut node_set: Vec<PrivateId>,
        requester: PrivateId,
        start_time: u64,
    ) -> Self {
        node_set.sort_unstable();
        Self {
            id,
            kind,
            node_set,
            requester,
            start_time,
        }
    }

    /// The dedup key described in §4.8 step 2.
    pub fn dedup_key(&self) -> (FailoverKind, &[PrivateId]) {
        (self.kind, &self.node_set)
    }

    pub fn matches(&self, kind: FailoverKind, node_set: &[PrivateId]) -> bool {
        let mut sorted = node_set.to_vec();
        sorted.sort_unstable();
        self.kind == kind && self.node_set == sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_ignores_node_set_order() {
        let a = FailoverObject::new(
            FailoverId(1),
            FailoverKind::NodeDown,
            vec![PrivateId(2), PrivateId(1)],
            PrivateId(0),
            0,
        );
        assert!(a.matches(FailoverKind::NodeDown, &[PrivateId(1), PrivateId(2)]));
        assert!(!a.matches(FailoverKind::NodeUp, &[PrivateId(1), PrivateId(2)]));
        assert!(!a.matches(FailoverKind::NodeDown, &[PrivateId(1)]));
    }
}
