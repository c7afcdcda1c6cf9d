//! Index-stable ordered list.
//!
//! Nodes live in a free-list backed arena and link to each other by index,
//! so insertion before/after a known member and removal are O(1) and a
//! removed member never leaves a dangling link behind.

use std::collections::HashMap;
use std::hash::Hash;

const NIL: usize = usize::MAX;

#[derive(Debug, Clone)]
struct Node<K> {
    key: Option<K>,
    prev: usize,
    next: usize,
}

/// Ordered list of unique keys, front to back.
#[derive(Debug, Clone)]
pub struct LinkList<K> {
    nodes: Vec<Node<K>>,
    free: Vec<usize>,
    index: HashMap<K, usize>,
    head: usize,
    tail: usize,
}

impl<K> Default for LinkList<K> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: NIL,
            tail: NIL,
        }
    }
}

impl<K: Copy + Eq + Hash> LinkList<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, key: K) -> bool {
        self.index.contains_key(&key)
    }

    pub fn front(&self) -> Option<K> {
        self.key_at(self.head)
    }

    pub fn back(&self) -> Option<K> {
        self.key_at(self.tail)
    }

    fn key_at(&self, slot: usize) -> Option<K> {
        self.nodes.get(slot).and_then(|n| n.key)
    }

    fn alloc(&mut self, key: K) -> usize {
        let node = Node {
            key: Some(key),
            prev: NIL,
            next: NIL,
        };
        if let Some(slot) = self.free.pop() {
            self.nodes[slot] = node;
            slot
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    /// Link `slot` between `prev` and `next` (either may be `NIL`).
    fn link(&mut self, slot: usize, prev: usize, next: usize) {
        self.nodes[slot].prev = prev;
        self.nodes[slot].next = next;
        if prev == NIL {
            self.head = slot;
        } else {
            self.nodes[prev].next = slot;
        }
        if next == NIL {
            self.tail = slot;
        } else {
            self.nodes[next].prev = slot;
        }
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.nodes[slot].prev, self.nodes[slot].next);
        if prev == NIL {
            self.head = next;
        } else {
            self.nodes[prev].next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.nodes[next].prev = prev;
        }
    }

    /// Insert at the front. A key already present is moved.
    pub fn push_front(&mut self, key: K) {
        self.remove(key);
        let slot = self.alloc(key);
        self.link(slot, NIL, self.head);
        self.index.insert(key, slot);
    }

    /// Insert at the back. A key already present is moved.
    pub fn push_back(&mut self, key: K) {
        self.remove(key);
        let slot = self.alloc(key);
        self.link(slot, self.tail, NIL);
        self.index.insert(key, slot);
    }

    /// Insert `key` directly in front of `anchor`. Returns false when
    /// `anchor` is not a member (or is `key` itself).
    pub fn insert_before(&mut self, anchor: K, key: K) -> bool {
        if anchor == key || !self.contains(anchor) {
            return false;
        }
        self.remove(key);
        let at = self.index[&anchor];
        let slot = self.alloc(key);
        self.link(slot, self.nodes[at].prev, at);
        self.index.insert(key, slot);
        true
    }

    /// Insert `key` directly behind `anchor`.
    pub fn insert_after(&mut self, anchor: K, key: K) -> bool {
        if anchor == key || !self.contains(anchor) {
            return false;
        }
        self.remove(key);
        let at = self.index[&anchor];
        let slot = self.alloc(key);
        self.link(slot, at, self.nodes[at].next);
        self.index.insert(key, slot);
        true
    }

    pub fn remove(&mut self, key: K) -> bool {
        let Some(slot) = self.index.remove(&key) else {
            return false;
        };
        self.unlink(slot);
        self.nodes[slot].key = None;
        self.free.push(slot);
        true
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Front-to-back iteration.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }
}

pub struct Iter<'a, K> {
    list: &'a LinkList<K>,
    cursor: usize,
}

impl<'a, K: Copy> Iterator for Iter<'a, K> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        let node = self.list.nodes.get(self.cursor)?;
        self.cursor = node.next;
        node.key
    }
}
