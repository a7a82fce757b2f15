//! Arena-backed treap over encoded keys
//!
//! Node priorities are the CRC32 of the key, so the shape of the tree is a
//! pure function of the key set. Nodes are never removed; the owning index
//! decides liveness and rebuilds the tree to drop stale keys.

use std::ops::Bound;
use std::rc::Rc;

type NodeId = usize;

#[derive(Debug)]
struct Node {
    key: Rc<[u8]>,
    priority: u32,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

/// Balanced search tree keyed by byte order
#[derive(Debug, Default)]
pub struct Treap {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Treap {
    /// Builds a treap from keys in ascending order in linear time.
    pub fn from_sorted(keys: &[Rc<[u8]>]) -> Self {
        let mut treap = Treap {
            nodes: Vec::with_capacity(keys.len()),
            root: None,
        };
        // Right spine of the tree built so far
        let mut spine: Vec<NodeId> = Vec::new();
        for key in keys {
            let id = treap.alloc(Rc::clone(key));
            let mut last = None;
            while let Some(&top) = spine.last() {
                if treap.nodes[top].priority < treap.nodes[id].priority {
                    last = spine.pop();
                } else {
                    break;
                }
            }
            treap.nodes[id].left = last;
            if let Some(&top) = spine.last() {
                treap.nodes[top].right = Some(id);
            }
            spine.push(id);
        }
        treap.root = spine.first().copied();
        treap
    }

    /// Number of nodes, including keys the owner considers deleted
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Inserts a key. Inserting an existing key is a no-op.
    pub fn insert(&mut self, key: Rc<[u8]>) {
        let root = self.root;
        self.root = Some(self.insert_at(root, key));
    }

    fn alloc(&mut self, key: Rc<[u8]>) -> NodeId {
        let priority = crc32fast::hash(&key);
        self.nodes.push(Node {
            key,
            priority,
            left: None,
            right: None,
        });
        self.nodes.len() - 1
    }

    fn insert_at(&mut self, node: Option<NodeId>, key: Rc<[u8]>) -> NodeId {
        let Some(n) = node else {
            return self.alloc(key);
        };
        match key.as_ref().cmp(self.nodes[n].key.as_ref()) {
            std::cmp::Ordering::Equal => n,
            std::cmp::Ordering::Less => {
                let left = self.nodes[n].left;
                let child = self.insert_at(left, key);
                self.nodes[n].left = Some(child);
                if self.nodes[child].priority > self.nodes[n].priority {
                    self.rotate_right(n)
                } else {
                    n
                }
            }
            std::cmp::Ordering::Greater => {
                let right = self.nodes[n].right;
                let child = self.insert_at(right, key);
                self.nodes[n].right = Some(child);
                if self.nodes[child].priority > self.nodes[n].priority {
                    self.rotate_left(n)
                } else {
                    n
                }
            }
        }
    }

    fn rotate_right(&mut self, n: NodeId) -> NodeId {
        let Some(l) = self.nodes[n].left else {
            return n;
        };
        self.nodes[n].left = self.nodes[l].right;
        self.nodes[l].right = Some(n);
        l
    }

    fn rotate_left(&mut self, n: NodeId) -> NodeId {
        let Some(r) = self.nodes[n].right else {
            return n;
        };
        self.nodes[n].right = self.nodes[r].left;
        self.nodes[r].left = Some(n);
        r
    }

    /// Keys within the bounds, in ascending or descending order.
    ///
    /// Subtrees entirely outside the bounds are never visited.
    pub fn range(&self, low: Bound<Vec<u8>>, high: Bound<Vec<u8>>, reverse: bool) -> TreapRange<'_> {
        let mut range = TreapRange {
            treap: self,
            low,
            high,
            reverse,
            stack: Vec::new(),
        };
        range.descend(self.root);
        range
    }
}

/// In-order cursor over a key range of a [`Treap`]
pub struct TreapRange<'a> {
    treap: &'a Treap,
    low: Bound<Vec<u8>>,
    high: Bound<Vec<u8>>,
    reverse: bool,
    stack: Vec<NodeId>,
}

impl<'a> TreapRange<'a> {
    fn below_low(&self, key: &[u8]) -> bool {
        match &self.low {
            Bound::Included(l) => key < l.as_slice(),
            Bound::Excluded(l) => key <= l.as_slice(),
            Bound::Unbounded => false,
        }
    }

    fn above_high(&self, key: &[u8]) -> bool {
        match &self.high {
            Bound::Included(h) => key > h.as_slice(),
            Bound::Excluded(h) => key >= h.as_slice(),
            Bound::Unbounded => false,
        }
    }

    /// Pushes the path towards the first in-range key of a subtree.
    fn descend(&mut self, mut node: Option<NodeId>) {
        while let Some(n) = node {
            let current = &self.treap.nodes[n];
            if !self.reverse {
                if self.below_low(&current.key) {
                    node = current.right;
                } else {
                    self.stack.push(n);
                    node = current.left;
                }
            } else if self.above_high(&current.key) {
                node = current.left;
            } else {
                self.stack.push(n);
                node = current.right;
            }
        }
    }
}

impl<'a> Iterator for TreapRange<'a> {
    type Item = &'a Rc<[u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.stack.pop()?;
        let treap = self.treap;
        let node = &treap.nodes[n];
        let past_end = if self.reverse {
            self.below_low(&node.key)
        } else {
            self.above_high(&node.key)
        };
        if past_end {
            self.stack.clear();
            return None;
        }
        self.descend(if self.reverse { node.left } else { node.right });
        Some(&node.key)
    }
}
