//! LRU Tracker Module
//!
//! Implements least-recently-used ordering for cache eviction.

// == Recency Token ==
/// Handle to a key's node in a [`RecencyTracker`].
///
/// Stored inside the owning cache entry so touches and removals never need a
/// second hash lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecencyToken(pub(crate) usize);

#[derive(Debug)]
struct Node<K> {
    key: K,
    prev: Option<usize>,
    next: Option<usize>,
}

// == LRU Tracker ==
/// Tracks access order for LRU eviction.
///
/// A doubly linked list laid out in a slab of nodes:
/// - Head = least recently used
/// - Tail = most recently used
///
/// Freed slots are recycled, so every operation is O(1).
#[derive(Debug)]
pub struct RecencyTracker<K> {
    slots: Vec<Option<Node<K>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<K> Default for RecencyTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> RecencyTracker<K> {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Creates an empty tracker with room for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            ..Self::new()
        }
    }

    // == Push ==
    /// Inserts a key as the most recently used and returns its token.
    pub fn push(&mut self, key: K) -> RecencyToken {
        let node = Node {
            key,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.link_back(idx);
        self.len += 1;
        RecencyToken(idx)
    }

    // == Touch ==
    /// Marks a key as most recently used.
    ///
    /// Returns false if the token does not refer to a tracked key.
    pub fn touch(&mut self, token: RecencyToken) -> bool {
        if self.node(token.0).is_none() {
            return false;
        }
        if self.tail != Some(token.0) {
            self.unlink(token.0);
            self.link_back(token.0);
        }
        true
    }

    // == Remove ==
    /// Removes a key from the tracker. Removing a vacant token is a no-op.
    pub fn remove(&mut self, token: RecencyToken) -> Option<K> {
        self.node(token.0)?;
        self.unlink(token.0);
        let node = self.slots[token.0].take()?;
        self.free.push(token.0);
        self.len -= 1;
        Some(node.key)
    }

    // == Evict Victim ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if the tracker is empty.
    pub fn evict_victim(&mut self) -> Option<K> {
        let head = self.head?;
        self.remove(RecencyToken(head))
    }

    /// Returns the least recently used key without removing it.
    #[cfg(test)]
    pub(crate) fn peek_victim(&self) -> Option<&K> {
        self.head.and_then(|idx| self.node(idx)).map(|node| &node.key)
    }

    /// Returns the key behind a token.
    #[cfg(test)]
    pub(crate) fn key(&self, token: RecencyToken) -> Option<&K> {
        self.node(token.0).map(|node| &node.key)
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every tracked key.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Iterates keys from least to most recently used.
    #[cfg(test)]
    pub(crate) fn iter(&self) -> Iter<'_, K> {
        Iter {
            tracker: self,
            cursor: self.head,
        }
    }

    fn node(&self, idx: usize) -> Option<&Node<K>> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, idx: usize) -> Option<&mut Node<K>> {
        self.slots.get_mut(idx).and_then(Option::as_mut)
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match self.node_mut(idx) {
            Some(node) => (node.prev.take(), node.next.take()),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(node) = self.node_mut(p) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.node_mut(n) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn link_back(&mut self, idx: usize) {
        let tail = self.tail;
        if let Some(node) = self.node_mut(idx) {
            node.prev = tail;
            node.next = None;
        }
        match tail {
            Some(t) => {
                if let Some(node) = self.node_mut(t) {
                    node.next = Some(idx);
                }
            }
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }
}

/// Iterator over tracked keys, least recently used first.
#[cfg(test)]
pub(crate) struct Iter<'a, K> {
    tracker: &'a RecencyTracker<K>,
    cursor: Option<usize>,
}

#[cfg(test)]
impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.tracker.node(self.cursor?)?;
        self.cursor = node.next;
        Some(&node.key)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn order(lru: &RecencyTracker<&'static str>) -> Vec<&'static str> {
        lru.iter().copied().collect()
    }

    #[test]
    fn test_lru_new() {
        let lru: RecencyTracker<String> = RecencyTracker::new();
        assert!(lru.is_empty());
        assert_eq!(lru.len(), 0);
        assert_eq!(lru.peek_victim(), None);
    }

    #[test]
    fn test_lru_push_keeps_insertion_order() {
        let mut lru = RecencyTracker::new();

        lru.push("key1");
        lru.push("key2");
        lru.push("key3");

        assert_eq!(lru.len(), 3);
        // key1 is oldest (added first)
        assert_eq!(lru.peek_victim(), Some(&"key1"));
        assert_eq!(order(&lru), vec!["key1", "key2", "key3"]);
    }

    #[test]
    fn test_lru_touch_existing_key() {
        let mut lru = RecencyTracker::new();

        let key1 = lru.push("key1");
        lru.push("key2");
        lru.push("key3");

        assert!(lru.touch(key1));

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.peek_victim(), Some(&"key2"));
        assert_eq!(order(&lru), vec!["key2", "key3", "key1"]);
    }

    #[test]
    fn test_lru_touch_middle_and_tail() {
        let mut lru = RecencyTracker::new();

        lru.push("a");
        let b = lru.push("b");
        let c = lru.push("c");

        // Touching the tail leaves the order untouched
        assert!(lru.touch(c));
        assert_eq!(order(&lru), vec!["a", "b", "c"]);

        assert!(lru.touch(b));
        assert_eq!(order(&lru), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_lru_evict_victim() {
        let mut lru = RecencyTracker::new();

        lru.push("key1");
        lru.push("key2");
        lru.push("key3");

        assert_eq!(lru.evict_victim(), Some("key1"));
        assert_eq!(lru.len(), 2);

        assert_eq!(lru.evict_victim(), Some("key2"));
        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_lru_evict_empty() {
        let mut lru: RecencyTracker<&str> = RecencyTracker::new();
        assert_eq!(lru.evict_victim(), None);
    }

    #[test]
    fn test_lru_remove() {
        let mut lru = RecencyTracker::new();

        lru.push("key1");
        let key2 = lru.push("key2");
        lru.push("key3");

        assert_eq!(lru.remove(key2), Some("key2"));

        assert_eq!(lru.len(), 2);
        assert_eq!(order(&lru), vec!["key1", "key3"]);
    }

    #[test]
    fn test_lru_remove_is_idempotent() {
        let mut lru = RecencyTracker::new();

        lru.push("key1");
        let key2 = lru.push("key2");

        assert_eq!(lru.remove(key2), Some("key2"));
        assert_eq!(lru.remove(key2), None);
        assert!(!lru.touch(key2));
        assert_eq!(lru.remove(RecencyToken(42)), None);

        assert_eq!(lru.len(), 1);
        assert_eq!(order(&lru), vec!["key1"]);
    }

    #[test]
    fn test_lru_order_after_multiple_touches() {
        let mut lru = RecencyTracker::new();

        let a = lru.push("a");
        let b = lru.push("b");
        let c = lru.push("c");

        lru.touch(a);
        lru.touch(c);
        lru.touch(b);

        assert_eq!(lru.evict_victim(), Some("a"));
        assert_eq!(lru.evict_victim(), Some("c"));
        assert_eq!(lru.evict_victim(), Some("b"));
        assert!(lru.is_empty());
    }

    #[test]
    fn test_lru_freed_slots_are_reused() {
        let mut lru = RecencyTracker::new();

        let a = lru.push("a");
        lru.push("b");
        lru.remove(a);

        let c = lru.push("c");
        assert_eq!(c, a);
        assert_eq!(lru.key(c), Some(&"c"));
        assert_eq!(order(&lru), vec!["b", "c"]);
    }

    #[test]
    fn test_lru_single_key_remove_resets_ends() {
        let mut lru = RecencyTracker::new();

        let only = lru.push("only");
        lru.remove(only);
        assert_eq!(lru.peek_victim(), None);

        lru.push("next");
        assert_eq!(order(&lru), vec!["next"]);
    }

    #[test]
    fn test_lru_clear() {
        let mut lru = RecencyTracker::with_capacity(4);

        lru.push("a");
        lru.push("b");
        lru.clear();

        assert!(lru.is_empty());
        assert_eq!(lru.evict_victim(), None);
        assert_eq!(order(&lru), Vec::<&str>::new());
    }
}
