//! Connection graph used by the network dimension.

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::RwLock;

use crate::identity::IdentityId;

/// Undirected social graph.
pub trait ConnectionGraph: Send + Sync {
    fn neighbours(&self, identity: &IdentityId) -> Vec<IdentityId>;

    /// Hop count from `from` to `to`, or `None` if it exceeds `limit`.
    fn distance(&self, from: &IdentityId, to: &IdentityId, limit: u32) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        let mut seen: HashSet<IdentityId> = HashSet::from([from.clone()]);
        let mut queue = VecDeque::from([(from.clone(), 0u32)]);

        while let Some((node, depth)) = queue.pop_front() {
            if depth == limit {
                continue;
            }
            for next in self.neighbours(&node) {
                if &next == to {
                    return Some(depth + 1);
                }
                if seen.insert(next.clone()) {
                    queue.push_back((next, depth + 1));
                }
            }
        }
        None
    }
}

#[derive(Default)]
pub struct MemoryConnectionGraph {
    edges: RwLock<HashMap<IdentityId, HashSet<IdentityId>>>,
}

impl MemoryConnectionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, a: &IdentityId, b: &IdentityId) {
        if a == b {
            return;
        }
        let mut edges = self.edges.write();
        edges.entry(a.clone()).or_default().insert(b.clone());
        edges.entry(b.clone()).or_default().insert(a.clone());
    }

    pub fn disconnect(&self, a: &IdentityId, b: &IdentityId) {
        let mut edges = self.edges.write();
        if let Some(set) = edges.get_mut(a) {
            set.remove(b);
        }
        if let Some(set) = edges.get_mut(b) {
            set.remove(a);
        }
    }
}

impl ConnectionGraph for MemoryConnectionGraph {
    fn neighbours(&self, identity: &IdentityId) -> Vec<IdentityId> {
        self.edges
            .read()
            .get(identity)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}
