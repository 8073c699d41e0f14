//! Cursor-navigable doubly linked sequence.
//!
//! [`CursorList`] is the container behind every ordered, mutable,
//! cursor-addressed piece of state in brightpath: the click list of an
//! annotation session and the action list of a [`HistoryTree`].
//!
//! ```text
//!  [sentinel] <-> [n1] <-> [n2] <-> ... <-> [tail]
//!                   |
//!                 child
//! ```
//!
//! Nodes live in an arena owned by the list and are addressed by
//! generational [`NodeId`]s, so `prev`/`next` are index lookups rather
//! than ownership. A freed slot bumps its generation, which makes any
//! id handed out before the free stale instead of aliasing the slot's
//! next occupant. A node's child is owned outright and is detached: it
//! has no `prev` or `next` of its own.
//!
//! The cursor is always either the sentinel (one position before the
//! first element) or a live node. Pushing links the new node after the
//! cursor and discards anything that was ahead of it, so a list whose
//! cursor was walked back behaves like an undo stack.
//!
//! [`HistoryTree`]: crate::history::HistoryTree

use crate::types::CoreError;

/// Stable handle to a node of a [`CursorList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    slot: usize,
    generation: u32,
}

const SENTINEL: NodeId = NodeId {
    slot: 0,
    generation: 0,
};

/// A single element of a [`CursorList`].
///
/// The sentinel node never carries a value, a previous link, or a child.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<T> {
    value: Option<T>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    child: Option<Box<Self>>,
    // 0 for the sentinel, 1 for the first element.
    index: usize,
}

impl<T> Node<T> {
    const fn empty() -> Self {
        Self {
            value: None,
            prev: None,
            next: None,
            child: None,
            index: 0,
        }
    }

    /// A node outside any chain, used for children and for the fixed
    /// nodes of a history tree.
    pub(crate) const fn detached(value: Option<T>) -> Self {
        Self {
            value,
            prev: None,
            next: None,
            child: None,
            index: 0,
        }
    }

    /// The node's value, or `None` for a sentinel.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Handle of the previous node in the chain.
    #[must_use]
    pub const fn prev(&self) -> Option<NodeId> {
        self.prev
    }

    /// Handle of the next node in the chain.
    #[must_use]
    pub const fn next(&self) -> Option<NodeId> {
        self.next
    }

    /// The derived node chained onto this one, if any.
    #[must_use]
    pub fn child(&self) -> Option<&Self> {
        self.child.as_deref()
    }

    /// Returns `true` if a child node is attached.
    #[must_use]
    pub const fn has_child(&self) -> bool {
        self.child.is_some()
    }

    pub(crate) fn set_value(&mut self, value: Option<T>) {
        self.value = value;
    }

    pub(crate) fn set_child(&mut self, child: Option<T>) {
        self.child = child.map(|value| Box::new(Self::detached(Some(value))));
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    live: bool,
    node: Node<T>,
}

/// A doubly linked list with a sentinel head and a movable cursor.
///
/// The same structure serves as a stack ([`push`](Self::push) /
/// [`peek`](Self::peek)), a bidirectional iterator ([`next`](Self::next) /
/// [`prev`](Self::prev)) and an indexable sequence ([`goto`](Self::goto)).
///
/// Not internally synchronized; callers sharing a list across threads
/// guard it with a lock.
#[derive(Debug, Clone)]
pub struct CursorList<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    tail: NodeId,
    cursor: NodeId,
}

impl<T> Default for CursorList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CursorList<T> {
    /// Create an empty list with the cursor at the sentinel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                live: true,
                node: Node::empty(),
            }],
            free: Vec::new(),
            tail: SENTINEL,
            cursor: SENTINEL,
        }
    }

    fn node(&self, id: NodeId) -> &Node<T> {
        &self.slots[id.slot].node
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        &mut self.slots[id.slot].node
    }

    fn is_live(&self, id: NodeId) -> bool {
        self.slots
            .get(id.slot)
            .is_some_and(|slot| slot.live && slot.generation == id.generation)
    }

    fn alloc(&mut self, node: Node<T>) -> NodeId {
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.slots[slot];
            entry.live = true;
            entry.node = node;
            NodeId {
                slot,
                generation: entry.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                live: true,
                node,
            });
            NodeId {
                slot: self.slots.len() - 1,
                generation: 0,
            }
        }
    }

    /// Free `start` and every node after it.
    fn release_from(&mut self, start: NodeId) {
        let mut current = Some(start);
        while let Some(id) = current {
            let entry = &mut self.slots[id.slot];
            current = entry.node.next;
            entry.live = false;
            entry.generation = entry.generation.wrapping_add(1);
            entry.node = Node::empty();
            self.free.push(id.slot);
        }
    }

    fn check_empty(&self) -> Result<(), CoreError> {
        if self.is_empty() {
            Err(CoreError::Underflow)
        } else {
            Ok(())
        }
    }

    /// Returns `true` iff the sentinel has no next node.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots[0].node.next.is_none()
    }

    /// Number of elements in the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.node(self.tail).index
    }

    /// Link `value` after the cursor and move both cursor and tail onto it.
    ///
    /// When the cursor is at the tail this appends. When it has been
    /// walked back, the nodes ahead of it are discarded first.
    pub fn push(&mut self, value: T) -> NodeId {
        let at = self.cursor;
        if let Some(ahead) = self.node(at).next {
            self.release_from(ahead);
        }
        let index = self.node(at).index + 1;
        let id = self.alloc(Node {
            value: Some(value),
            prev: Some(at),
            next: None,
            child: None,
            index,
        });
        self.node_mut(at).next = Some(id);
        self.tail = id;
        self.cursor = id;
        id
    }

    /// Push each value in iteration order, returning how many were pushed.
    pub fn push_all<I: IntoIterator<Item = T>>(&mut self, values: I) -> usize {
        let mut count = 0;
        for value in values {
            self.push(value);
            count += 1;
        }
        count
    }

    /// Remove every element; cursor and tail return to the sentinel.
    pub fn clear(&mut self) {
        if let Some(first) = self.slots[0].node.next.take() {
            self.release_from(first);
        }
        self.tail = SENTINEL;
        self.cursor = SENTINEL;
    }

    /// Move the cursor to the sentinel, one position before the first
    /// element. Never fails.
    pub const fn init(&mut self) {
        self.cursor = SENTINEL;
    }

    /// Move the cursor to the first element and return it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Underflow`] if the list is empty.
    pub fn first(&mut self) -> Result<&Node<T>, CoreError> {
        self.check_empty()?;
        if let Some(first) = self.node(SENTINEL).next {
            self.cursor = first;
        }
        Ok(self.node(self.cursor))
    }

    /// Move the cursor to the tail and return it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Underflow`] if the list is empty.
    pub fn last(&mut self) -> Result<&Node<T>, CoreError> {
        self.check_empty()?;
        self.cursor = self.tail;
        Ok(self.node(self.cursor))
    }

    /// Move the cursor one step forward and return the node it lands on.
    /// Does nothing if the cursor is already at the tail.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Underflow`] if the list is empty.
    pub fn next(&mut self) -> Result<&Node<T>, CoreError> {
        self.check_empty()?;
        if let Some(next) = self.node(self.cursor).next {
            self.cursor = next;
        }
        Ok(self.node(self.cursor))
    }

    /// Move the cursor one step back and return the node it lands on.
    /// Does nothing if the cursor is already at the sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Underflow`] if the list is empty.
    pub fn prev(&mut self) -> Result<&Node<T>, CoreError> {
        self.check_empty()?;
        if let Some(prev) = self.node(self.cursor).prev {
            self.cursor = prev;
        }
        Ok(self.node(self.cursor))
    }

    /// The node at the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Underflow`] if the list is empty.
    pub fn peek(&self) -> Result<&Node<T>, CoreError> {
        self.check_empty()?;
        Ok(self.node(self.cursor))
    }

    /// Move the cursor to the zero-based `index`, counted from the first
    /// element.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if `index` is negative,
    /// [`CoreError::Underflow`] if the list is empty, and
    /// [`CoreError::OutOfRange`] if `index >= len()`.
    pub fn goto(&mut self, index: isize) -> Result<&Node<T>, CoreError> {
        let Ok(index) = usize::try_from(index) else {
            return Err(CoreError::invalid(format!("negative index {index}")));
        };
        self.check_empty()?;
        let len = self.len();
        if index >= len {
            return Err(CoreError::OutOfRange { index, len });
        }

        let mut current = self.node(SENTINEL).next;
        for _ in 0..index {
            current = current.and_then(|id| self.node(id).next);
        }
        if let Some(id) = current {
            self.cursor = id;
        }
        Ok(self.node(self.cursor))
    }

    /// Move the cursor to the node `id`, which may be the sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if `id` no longer refers to
    /// a node of this list.
    pub fn seek(&mut self, id: NodeId) -> Result<&Node<T>, CoreError> {
        if !self.is_live(id) {
            return Err(CoreError::invalid("stale node id"));
        }
        self.cursor = id;
        Ok(self.node(id))
    }

    /// Handle of the node at the cursor (the sentinel's handle when the
    /// cursor is at init).
    #[must_use]
    pub const fn cursor(&self) -> NodeId {
        self.cursor
    }

    /// Zero-based index of the cursor, or `None` at the sentinel.
    #[must_use]
    pub fn cursor_index(&self) -> Option<usize> {
        self.node(self.cursor).index.checked_sub(1)
    }

    /// Zero-based index of the live node `id`.
    #[must_use]
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.get(id).and_then(|node| node.index.checked_sub(1))
    }

    /// Returns `true` iff the cursor is at the sentinel.
    #[must_use]
    pub fn curr_at_init(&self) -> bool {
        self.cursor == SENTINEL
    }

    /// Returns `true` iff the cursor is at the first element.
    #[must_use]
    pub fn curr_at_first(&self) -> bool {
        self.node(self.cursor).prev == Some(SENTINEL)
    }

    /// Returns `true` iff the list is non-empty and the cursor is at the tail.
    #[must_use]
    pub fn curr_at_tail(&self) -> bool {
        !self.is_empty() && self.cursor == self.tail
    }

    /// Look up a node by handle.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node<T>> {
        self.is_live(id).then(|| self.node(id))
    }

    /// Chain a derived value onto the node `id`, replacing any earlier child.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if `id` is the sentinel or
    /// is no longer live.
    pub fn attach_child(&mut self, id: NodeId, value: T) -> Result<(), CoreError> {
        if id == SENTINEL {
            return Err(CoreError::invalid("the sentinel cannot carry a child"));
        }
        if !self.is_live(id) {
            return Err(CoreError::invalid("stale node id"));
        }
        self.node_mut(id).set_child(Some(value));
        Ok(())
    }

    /// Iterate forward from the first element, regardless of the cursor.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            next: self.node(SENTINEL).next,
        }
    }

    /// Iterate backward from the cursor to (not including) the sentinel.
    #[must_use]
    pub fn iter_back(&self) -> IterBack<'_, T> {
        IterBack {
            list: self,
            next: (self.cursor != SENTINEL).then_some(self.cursor),
        }
    }

    /// Iterate over the values from the first element forward.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.iter().filter_map(Node::value)
    }
}

/// Forward iterator over the nodes of a [`CursorList`].
#[derive(Debug)]
pub struct Iter<'a, T> {
    list: &'a CursorList<T>,
    next: Option<NodeId>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a Node<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.node(self.next?);
        self.next = node.next;
        Some(node)
    }
}

/// Backward iterator from the cursor of a [`CursorList`].
#[derive(Debug)]
pub struct IterBack<'a, T> {
    list: &'a CursorList<T>,
    next: Option<NodeId>,
}

impl<'a, T> Iterator for IterBack<'a, T> {
    type Item = &'a Node<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.node(self.next?);
        self.next = node.prev.filter(|&prev| prev != SENTINEL);
        Some(node)
    }
}

impl<'a, T> IntoIterator for &'a CursorList<T> {
    type Item = &'a Node<T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
