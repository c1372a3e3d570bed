//! Recency List Module
//!
//! Doubly linked list whose nodes live in a slot arena and link to each other
//! by index. Handles stay valid until the node is removed, so the store's
//! index can point straight at a node and promote or unlink it in O(1).
//!
//! Each slot carries a generation that is bumped when its node is freed, so a
//! handle to a removed node never resolves to a later node in the same slot.
//!
//! ```text
//!   front (newest)                               back (oldest)
//!   head ─► [id_4] ◄──► [id_0] ◄──► [id_2] ◄── tail
//! ```

// == Node Id ==
/// Stable handle to a node in a [`RecencyList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u64,
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u64,
    node: Option<Node<T>>,
}

// == Recency List ==
/// Tracks recency order for the eviction sweep.
///
/// - Front = most recently touched
/// - Back = least recently touched
#[derive(Debug)]
pub struct RecencyList<T> {
    /// Node storage; a slot without a node is free
    slots: Vec<Slot<T>>,
    /// Free slot indices available for reuse
    free: Vec<usize>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl<T> RecencyList<T> {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    // == Length ==
    /// Returns the number of nodes in the list.
    pub fn len(&self) -> usize {
        self.len
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the value for `id`, if the node is live.
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.node(id).map(|node| &node.value)
    }

    /// Returns a mutable reference to the value for `id`, if the node is live.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.node_mut(id).map(|node| &mut node.value)
    }

    /// Returns `true` if `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Returns the value at the back (oldest) of the list.
    pub fn back(&self) -> Option<&T> {
        self.tail.and_then(|id| self.get(id))
    }

    /// Returns the handle of the back (oldest) node.
    pub fn back_id(&self) -> Option<NodeId> {
        self.tail
    }

    /// Returns the value at the front (newest) of the list.
    #[cfg(test)]
    pub fn front(&self) -> Option<&T> {
        self.head.and_then(|id| self.get(id))
    }

    // == Push Front ==
    /// Inserts a value at the front and returns its handle.
    pub fn push_front(&mut self, value: T) -> NodeId {
        let node = Node {
            value,
            prev: None,
            next: self.head,
        };
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        };

        match self.head {
            Some(head) => {
                if let Some(old_head) = self.node_mut(head) {
                    old_head.prev = Some(id);
                }
            }
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        self.len += 1;
        id
    }

    // == Move To Front ==
    /// Marks a node as most recently touched.
    ///
    /// Returns `false` if `id` is not a live node.
    pub fn move_to_front(&mut self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        if self.head == Some(id) {
            return true;
        }

        self.detach(id);
        let old_head = self.head;
        if let Some(node) = self.node_mut(id) {
            node.prev = None;
            node.next = old_head;
        }
        if let Some(head) = old_head {
            if let Some(node) = self.node_mut(head) {
                node.prev = Some(id);
            }
        } else {
            self.tail = Some(id);
        }
        self.head = Some(id);
        true
    }

    // == Remove ==
    /// Unlinks a node and frees its slot, returning its value.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        if !self.contains(id) {
            return None;
        }
        self.detach(id);
        let slot = &mut self.slots[id.index];
        let node = slot.node.take()?;
        slot.generation += 1;
        self.free.push(id.index);
        self.len -= 1;
        Some(node.value)
    }

    // == Pop Back ==
    /// Removes and returns the oldest value.
    pub fn pop_back(&mut self) -> Option<T> {
        let tail = self.tail?;
        self.remove(tail)
    }

    /// Iterates values from front (newest) to back (oldest).
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            current: self.head,
        }
    }

    /// Unlinks `id` from its neighbours without freeing the slot.
    fn detach(&mut self, id: NodeId) {
        let (prev, next) = match self.node(id) {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(prev) => {
                if let Some(node) = self.node_mut(prev) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(next) => {
                if let Some(node) = self.node_mut(next) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn node(&self, id: NodeId) -> Option<&Node<T>> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Walks the list front to back and checks the links agree with the slot
    /// bookkeeping. Panics on the first inconsistency.
    #[doc(hidden)]
    pub fn debug_validate_invariants(&self) {
        let mut count = 0;
        let mut prev = None;
        let mut current = self.head;
        while let Some(id) = current {
            let node = self.node(id).expect("linked node must be live");
            assert_eq!(node.prev, prev, "broken back link at {:?}", id);
            prev = Some(id);
            current = node.next;
            count += 1;
            assert!(count <= self.len, "cycle detected");
        }
        assert_eq!(self.tail, prev, "tail does not match last node");
        assert_eq!(count, self.len, "length does not match linked nodes");

        let live = self.slots.iter().filter(|slot| slot.node.is_some()).count();
        assert_eq!(live, self.len, "live slots do not match length");
        assert_eq!(
            self.slots.len() - live,
            self.free.len(),
            "free list does not match vacant slots"
        );
    }
}

impl<T> Default for RecencyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

// == Iterator ==
/// Front-to-back iterator over a [`RecencyList`].
pub struct Iter<'a, T> {
    list: &'a RecencyList<T>,
    current: Option<NodeId>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.node(self.current?)?;
        self.current = node.next;
        Some(&node.value)
    }
}
