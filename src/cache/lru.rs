//! Entry Store Module
//!
//! Recency-ordered entry storage for LRU eviction.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::iter::FusedIterator;

use crate::cache::CacheEntry;

/// Null link in the arena list.
const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node<K, V> {
    entry: CacheEntry<K, V>,
    /// Neighbour on the most-recently-used side
    prev: usize,
    /// Neighbour on the least-recently-used side
    next: usize,
}

// == Entry Store ==
/// Hash index over an arena of doubly-linked nodes.
///
/// Nodes live in a `Vec` and link to each other by slot index, so the list
/// owns nothing cyclically:
/// - Head = Most recently used
/// - Tail = Least recently used
///
/// Insert, lookup, touch and LRU removal are all O(1) on average. The store
/// never calls dispose; whatever it hands back is the caller's to release.
#[derive(Debug)]
pub struct EntryStore<K, V> {
    /// Key to slot index
    index: HashMap<K, usize>,
    /// Node arena; `None` marks a free slot
    slots: Vec<Option<Node<K, V>>>,
    /// Free slots available for reuse
    free: Vec<usize>,
    head: usize,
    tail: usize,
}

impl<K, V> EntryStore<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty store with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
        }
    }

    // == Insert ==
    /// Adds or replaces the entry for `entry.key` and places it at the
    /// most-recently-used position.
    ///
    /// Returns the entry that was replaced, if any.
    pub fn insert(&mut self, entry: CacheEntry<K, V>) -> Option<CacheEntry<K, V>> {
        if let Some(&idx) = self.index.get(&entry.key) {
            let previous = std::mem::replace(&mut self.node_mut(idx).entry, entry);
            self.move_to_front(idx);
            return Some(previous);
        }

        let key = entry.key.clone();
        let idx = self.alloc(Node {
            entry,
            prev: NIL,
            next: NIL,
        });
        self.push_front(idx);
        self.index.insert(key, idx);
        None
    }

    // == Get ==
    /// Returns the entry for `key` without reordering.
    pub fn get<Q>(&self, key: &Q) -> Option<&CacheEntry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        Some(&self.node(idx).entry)
    }

    /// Mutable variant of [`get`](Self::get). Does not reorder either.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut CacheEntry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        Some(&mut self.node_mut(idx).entry)
    }

    // == Touch ==
    /// Moves an existing entry to the most-recently-used position.
    ///
    /// Returns false if the key is not resident.
    pub fn touch<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.index.get(key) {
            Some(&idx) => {
                self.move_to_front(idx);
                true
            }
            None => false,
        }
    }

    // == Remove ==
    /// Removes and returns the entry for `key`.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<CacheEntry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.index.remove(key)?;
        let entry = self.release(idx);
        self.compact_if_empty();
        Some(entry)
    }

    // == Remove Oldest ==
    /// Pops the least-recently-used entry.
    ///
    /// Returns None if the store is empty.
    pub fn remove_oldest(&mut self) -> Option<CacheEntry<K, V>> {
        if self.tail == NIL {
            return None;
        }
        let entry = self.release(self.tail);
        self.index.remove(&entry.key);
        self.compact_if_empty();
        Some(entry)
    }

    // == Length ==
    /// Returns the number of resident entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // == Iteration ==
    /// Iterates from most- to least-recently-used without reordering.
    /// Reverse it for eviction order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            store: self,
            front: self.head,
            back: self.tail,
            remaining: self.len(),
        }
    }

    // == Arena Internals ==
    fn alloc(&mut self, node: Node<K, V>) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    /// Unlinks a slot and returns its entry. The index map is the caller's.
    fn release(&mut self, idx: usize) -> CacheEntry<K, V> {
        self.unlink(idx);
        let node = match self.slots[idx].take() {
            Some(node) => node,
            None => unreachable!("linked slot {idx} is vacant"),
        };
        self.free.push(idx);
        node.entry
    }

    fn compact_if_empty(&mut self) {
        if self.index.is_empty() {
            self.slots.clear();
            self.free.clear();
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };

        if prev == NIL {
            self.head = next;
        } else {
            self.node_mut(prev).next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.node_mut(next).prev = prev;
        }

        let node = self.node_mut(idx);
        node.prev = NIL;
        node.next = NIL;
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = NIL;
            node.next = old_head;
        }
        if old_head == NIL {
            self.tail = idx;
        } else {
            self.node_mut(old_head).prev = idx;
        }
        self.head = idx;
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head != idx {
            self.unlink(idx);
            self.push_front(idx);
        }
    }
}

impl<K, V> EntryStore<K, V> {
    fn node(&self, idx: usize) -> &Node<K, V> {
        match &self.slots[idx] {
            Some(node) => node,
            None => unreachable!("linked slot {idx} is vacant"),
        }
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<K, V> {
        match &mut self.slots[idx] {
            Some(node) => node,
            None => unreachable!("linked slot {idx} is vacant"),
        }
    }
}

impl<K, V> Default for EntryStore<K, V>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

// == Iterator ==
/// Borrowing iterator over resident entries, MRU first.
#[derive(Debug)]
pub struct Iter<'a, K, V> {
    store: &'a EntryStore<K, V>,
    front: usize,
    back: usize,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = &'a CacheEntry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.store.node(self.front);
        self.front = node.next;
        self.remaining -= 1;
        Some(&node.entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.store.node(self.back);
        self.back = node.prev;
        self.remaining -= 1;
        Some(&node.entry)
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}
