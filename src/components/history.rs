use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;
use std::time::SystemTime;

use crate::io::EncodedImage;

/// Default bound on undo depth per domain (the initial entry not counted).
pub const DEFAULT_MAX_UNDO_STEPS: usize = 50;

// ============================================================================
// ENTRIES + REQUESTS
// ============================================================================

/// One full-frame snapshot of a surface.
#[derive(Clone, Debug)]
pub struct HistoryEntry<K> {
    pub key: K,
    pub snapshot: EncodedImage,
    pub timestamp: SystemTime,
}

impl<K> HistoryEntry<K> {
    fn new(key: K, snapshot: EncodedImage) -> Self {
        Self {
            key,
            snapshot,
            timestamp: SystemTime::now(),
        }
    }
}

/// A history operation that arrived while its domain was mid-restore.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryOp {
    Undo,
    Redo,
    Snapshot,
}

/// What the caller has to do after asking for an undo or redo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryRequest {
    /// Decode this snapshot into the surface, then call
    /// [`HistoryManager::finish_restore`].
    Restore(EncodedImage),
    /// A restore is in flight; the op was queued behind it.
    Queued,
    /// Nothing to undo/redo.
    Ignored,
}

// ============================================================================
// HISTORY MANAGER - per-domain undo/redo stacks of snapshots
// ============================================================================

struct DomainHistory<K> {
    /// Bottom entry is the floor state and is never popped by undo.
    undo: VecDeque<HistoryEntry<K>>,
    redo: Vec<HistoryEntry<K>>,
    restoring: bool,
    queued: VecDeque<HistoryOp>,
}

impl<K> Default for DomainHistory<K> {
    fn default() -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            restoring: false,
            queued: VecDeque::new(),
        }
    }
}

/// Undo/redo history keyed by undo domain.  A layered document uses one
/// domain per layer; the single-canvas mode uses one domain total.
///
/// The manager only moves snapshots around.  Decoding them back into a
/// surface is the caller's job, bracketed by [`begin_restore`] (implicit in
/// `undo`/`redo`) and [`finish_restore`].
///
/// [`begin_restore`]: HistoryManager::begin_restore
/// [`finish_restore`]: HistoryManager::finish_restore
pub struct HistoryManager<K> {
    domains: HashMap<K, DomainHistory<K>>,
    max_undo_steps: usize,
}

impl<K: Clone + Eq + Hash + Debug> Default for HistoryManager<K> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDO_STEPS)
    }
}

impl<K: Clone + Eq + Hash + Debug> HistoryManager<K> {
    pub fn new(max_undo_steps: usize) -> Self {
        Self {
            domains: HashMap::new(),
            max_undo_steps: max_undo_steps.max(1),
        }
    }

    pub fn max_undo_steps(&self) -> usize {
        self.max_undo_steps
    }

    /// Drop whatever the domain held and install `snapshot` as its floor.
    pub fn reset(&mut self, key: K, snapshot: EncodedImage) {
        let domain = self.domains.entry(key.clone()).or_default();
        domain.undo.clear();
        domain.redo.clear();
        domain.queued.clear();
        domain.restoring = false;
        domain.undo.push_back(HistoryEntry::new(key, snapshot));
    }

    /// Record a committed edit: push onto undo, clear redo, prune.
    ///
    /// Returns `false` without touching the stacks if the domain is mid-restore;
    /// the caller should [`defer`](Self::defer) a `Snapshot` instead.
    pub fn push(&mut self, key: K, snapshot: EncodedImage) -> bool {
        let max = self.max_undo_steps;
        let domain = self.domains.entry(key.clone()).or_default();
        if domain.restoring {
            log_warn!("History: push for {:?} while restoring, refused", key);
            return false;
        }
        domain.redo.clear();
        domain.undo.push_back(HistoryEntry::new(key, snapshot));
        while domain.undo.len() > max + 1 {
            domain.undo.pop_front();
        }
        true
    }

    /// Move the top undo entry to redo and hand back the new top to restore.
    pub fn undo(&mut self, key: &K) -> HistoryRequest {
        let Some(domain) = self.domains.get_mut(key) else {
            return HistoryRequest::Ignored;
        };
        if domain.restoring {
            domain.queued.push_back(HistoryOp::Undo);
            return HistoryRequest::Queued;
        }
        if domain.undo.len() <= 1 {
            return HistoryRequest::Ignored;
        }
        let Some(entry) = domain.undo.pop_back() else {
            return HistoryRequest::Ignored;
        };
        domain.redo.push(entry);
        match domain.undo.back() {
            Some(top) => {
                domain.restoring = true;
                HistoryRequest::Restore(top.snapshot.clone())
            }
            None => HistoryRequest::Ignored,
        }
    }

    /// Move the top redo entry back onto undo and hand it back to restore.
    pub fn redo(&mut self, key: &K) -> HistoryRequest {
        let Some(domain) = self.domains.get_mut(key) else {
            return HistoryRequest::Ignored;
        };
        if domain.restoring {
            domain.queued.push_back(HistoryOp::Redo);
            return HistoryRequest::Queued;
        }
        let Some(entry) = domain.redo.pop() else {
            return HistoryRequest::Ignored;
        };
        let snapshot = entry.snapshot.clone();
        domain.undo.push_back(entry);
        domain.restoring = true;
        HistoryRequest::Restore(snapshot)
    }

    pub fn is_restoring(&self, key: &K) -> bool {
        self.domains.get(key).is_some_and(|d| d.restoring)
    }

    /// Mark a restore that did not come from undo/redo (canvas resize).
    /// Returns `false` if one is already in flight.
    pub fn begin_restore(&mut self, key: &K) -> bool {
        let domain = self.domains.entry(key.clone()).or_default();
        if domain.restoring {
            return false;
        }
        domain.restoring = true;
        true
    }

    /// Queue an op behind the in-flight restore.
    pub fn defer(&mut self, key: &K, op: HistoryOp) {
        self.domains.entry(key.clone()).or_default().queued.push_back(op);
    }

    /// Clear the restoring flag and hand back the ops that queued up, in
    /// arrival order, for the caller to replay.
    pub fn finish_restore(&mut self, key: &K) -> VecDeque<HistoryOp> {
        match self.domains.get_mut(key) {
            Some(domain) => {
                domain.restoring = false;
                std::mem::take(&mut domain.queued)
            }
            None => VecDeque::new(),
        }
    }

    pub fn any_restoring(&self) -> bool {
        self.domains.values().any(|d| d.restoring)
    }

    pub fn can_undo(&self, key: &K) -> bool {
        self.domains.get(key).is_some_and(|d| !d.restoring && d.undo.len() > 1)
    }

    pub fn can_redo(&self, key: &K) -> bool {
        self.domains.get(key).is_some_and(|d| !d.restoring && !d.redo.is_empty())
    }

    pub fn undo_len(&self, key: &K) -> usize {
        self.domains.get(key).map_or(0, |d| d.undo.len())
    }

    pub fn redo_len(&self, key: &K) -> usize {
        self.domains.get(key).map_or(0, |d| d.redo.len())
    }

    /// The entry describing the domain's current state.
    pub fn top(&self, key: &K) -> Option<&HistoryEntry<K>> {
        self.domains.get(key).and_then(|d| d.undo.back())
    }

    /// Encoded bytes held across every domain's stacks.
    pub fn memory_bytes(&self) -> usize {
        self.domains
            .values()
            .flat_map(|d| d.undo.iter().chain(d.redo.iter()))
            .map(|e| e.snapshot.memory_size())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(tag: u8) -> EncodedImage {
        EncodedImage::from_bytes(vec![tag; 4], 1, 1)
    }

    fn restored(req: HistoryRequest) -> u8 {
        match req {
            HistoryRequest::Restore(img) => img.bytes()[0],
            other => panic!("expected restore, got {:?}", other),
        }
    }

    #[test]
    fn undo_never_pops_the_floor() {
        let mut h = HistoryManager::new(50);
        h.reset("a", snap(0));
        assert_eq!(h.undo(&"a"), HistoryRequest::Ignored);
        h.push("a", snap(1));
        h.push("a", snap(2));

        assert_eq!(restored(h.undo(&"a")), 1);
        h.finish_restore(&"a");
        assert_eq!(restored(h.undo(&"a")), 0);
        h.finish_restore(&"a");
        assert_eq!(h.undo(&"a"), HistoryRequest::Ignored);
        assert_eq!(h.undo_len(&"a"), 1);
        assert_eq!(h.redo_len(&"a"), 2);
    }

    #[test]
    fn redo_restores_moved_entry() {
        let mut h = HistoryManager::new(50);
        h.reset("a", snap(0));
        h.push("a", snap(1));
        restored(h.undo(&"a"));
        h.finish_restore(&"a");
        assert!(h.can_redo(&"a"));
        assert_eq!(restored(h.redo(&"a")), 1);
        h.finish_restore(&"a");
        assert_eq!(h.redo(&"a"), HistoryRequest::Ignored);
        assert_eq!(h.top(&"a").map(|e| e.snapshot.bytes()[0]), Some(1));
    }

    #[test]
    fn push_clears_redo() {
        let mut h = HistoryManager::new(50);
        h.reset("a", snap(0));
        h.push("a", snap(1));
        restored(h.undo(&"a"));
        h.finish_restore(&"a");
        assert!(h.push("a", snap(2)));
        assert!(!h.can_redo(&"a"));
        assert_eq!(h.redo(&"a"), HistoryRequest::Ignored);
    }

    #[test]
    fn domains_are_isolated() {
        let mut h = HistoryManager::new(50);
        h.reset("a", snap(0));
        h.reset("b", snap(10));
        h.push("a", snap(1));
        assert!(h.can_undo(&"a"));
        assert!(!h.can_undo(&"b"));
        restored(h.undo(&"a"));
        assert!(h.is_restoring(&"a"));
        assert!(!h.is_restoring(&"b"));
    }

    #[test]
    fn ops_queue_behind_restore() {
        let mut h = HistoryManager::new(50);
        h.reset("a", snap(0));
        h.push("a", snap(1));
        h.push("a", snap(2));
        restored(h.undo(&"a"));
        assert!(!h.can_undo(&"a"));
        assert!(!h.push("a", snap(9)));
        assert_eq!(h.undo(&"a"), HistoryRequest::Queued);
        h.defer(&"a", HistoryOp::Snapshot);
        assert_eq!(h.redo(&"a"), HistoryRequest::Queued);

        let queued: Vec<HistoryOp> = h.finish_restore(&"a").into_iter().collect();
        assert_eq!(queued, vec![HistoryOp::Undo, HistoryOp::Snapshot, HistoryOp::Redo]);
        assert!(!h.is_restoring(&"a"));
        assert!(h.finish_restore(&"a").is_empty());
    }

    #[test]
    fn depth_is_bounded_and_floor_moves_up() {
        let mut h = HistoryManager::new(3);
        h.reset("a", snap(0));
        for i in 1..=5 {
            h.push("a", snap(i));
        }
        assert_eq!(h.undo_len(&"a"), 4);
        for expected in [4, 3, 2] {
            assert_eq!(restored(h.undo(&"a")), expected);
            h.finish_restore(&"a");
        }
        assert_eq!(h.undo(&"a"), HistoryRequest::Ignored);
    }

    #[test]
    fn unit_key_covers_single_canvas() {
        let mut h: HistoryManager<()> = HistoryManager::default();
        h.reset((), snap(0));
        h.push((), snap(1));
        assert!(h.can_undo(&()));
        assert_eq!(restored(h.undo(&())), 0);
    }

    #[test]
    fn begin_restore_is_single_slot() {
        let mut h = HistoryManager::new(50);
        h.reset("a", snap(0));
        assert!(h.begin_restore(&"a"));
        assert!(!h.begin_restore(&"a"));
        assert!(h.any_restoring());
        h.finish_restore(&"a");
        assert!(!h.any_restoring());
    }

    #[test]
    fn memory_counts_both_stacks() {
        let mut h = HistoryManager::new(50);
        h.reset("a", snap(0));
        h.push("a", snap(1));
        restored(h.undo(&"a"));
        assert_eq!(h.memory_bytes(), 8);
    }
}
