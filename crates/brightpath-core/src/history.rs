//! Branching undo/redo history.
//!
//! ```text
//! [init] -> [root] -> [list: a1 <-> a2 <-> ... <-> an]
//! ```
//!
//! `init` is a sentinel seeded with a snapshot value, `root` is a single
//! node reused by every branch, and later actions live in a
//! [`CursorList`]. The cursor is always exactly one of the three.
//!
//! Pushing from `init` starts a fresh branch. Pushing anywhere else
//! appends after the cursor, which truncates whatever a previous `undo`
//! left ahead of it. Undoing from the root or from the first list node
//! returns straight to `init`: the first action after the root completes
//! the first segment, so the two are undone together.
//!
//! [`HistoryTree::undo_all`] can remember where the cursor was so that
//! exactly one following [`HistoryTree::undo`] puts it back. The memory
//! holds a single position, not a stack.

use serde::{Deserialize, Serialize};

use crate::cursor_list::{CursorList, Node, NodeId};
use crate::types::{Coord, CoreError, Path};

/// A point clicked by the user plus what was derived from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// The clicked pixel. `None` for snapshot seeds.
    pub point: Option<Coord>,
    /// Path traced from the previous click to this one, origin first.
    pub path: Option<Path>,
    /// Reserved for region annotations; unused by the tracing workflow.
    pub area: Option<Path>,
}

impl Action {
    /// An action for a fresh click with nothing computed yet.
    #[must_use]
    pub const fn click(point: Coord) -> Self {
        Self {
            point: Some(point),
            path: None,
            area: None,
        }
    }

    /// The same action with a traced path attached.
    #[must_use]
    pub fn with_path(mut self, path: Path) -> Self {
        self.path = Some(path);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Cursor {
    Init,
    Root { epoch: u64 },
    List(NodeId),
}

/// Opaque, comparable handle to a position in a [`HistoryTree`].
///
/// Root handles carry the branch they were created on, so a handle from
/// a discarded branch never refers to the root of a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position(Cursor);

impl Position {
    /// Returns `true` for the position before the first action.
    #[must_use]
    pub const fn is_init(self) -> bool {
        matches!(self.0, Cursor::Init)
    }
}

/// A tree of action nodes with a cursor for undo/redo traversal.
#[derive(Debug, Clone)]
pub struct HistoryTree<T> {
    init: Node<T>,
    root: Node<T>,
    epoch: u64,
    list: CursorList<T>,
    cursor: Cursor,
    pre_clear: Option<Cursor>,
}

impl<T> Default for HistoryTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HistoryTree<T> {
    /// Create an empty history with the cursor at `init`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            init: Node::detached(None),
            root: Node::detached(None),
            epoch: 0,
            list: CursorList::new(),
            cursor: Cursor::Init,
            pre_clear: None,
        }
    }

    /// Store `seed` (typically a snapshot of the untouched image) in the
    /// sentinel, then [`clear`](Self::clear).
    pub fn init(&mut self, seed: T) {
        self.init.set_value(Some(seed));
        self.clear();
    }

    /// Drop every action and any remembered cursor; return to `init`.
    pub fn clear(&mut self) {
        self.list.clear();
        self.root = Node::detached(None);
        self.epoch += 1;
        self.cursor = Cursor::Init;
        self.pre_clear = None;
    }

    /// Returns `true` iff the cursor is before the first action.
    #[must_use]
    pub const fn is_init_state(&self) -> bool {
        matches!(self.cursor, Cursor::Init)
    }

    /// Handle of the current position.
    #[must_use]
    pub const fn position(&self) -> Position {
        Position(self.cursor)
    }

    /// Number of actions up to and including the cursor.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self.cursor {
            Cursor::Init => 0,
            Cursor::Root { .. } => 1,
            Cursor::List(id) => self.list.index_of(id).map_or(1, |index| index + 2),
        }
    }

    fn current(&self) -> &Node<T> {
        match self.cursor {
            Cursor::Init => &self.init,
            Cursor::Root { .. } => &self.root,
            // List cursors are only ever set from live ids.
            Cursor::List(id) => self.list.get(id).unwrap_or(&self.init),
        }
    }

    /// The current node, or its child when a derived result is attached.
    #[must_use]
    pub fn peek(&self) -> &Node<T> {
        let node = self.current();
        node.child().unwrap_or(node)
    }

    /// Record `value` as the next action and move the cursor onto it.
    pub fn push(&mut self, value: T) -> Position {
        match self.cursor {
            Cursor::Init => {
                self.epoch += 1;
                self.root = Node::detached(Some(value));
                self.list.clear();
                self.cursor = Cursor::Root { epoch: self.epoch };
            }
            Cursor::Root { .. } => {
                self.list.init();
                self.cursor = Cursor::List(self.list.push(value));
            }
            Cursor::List(_) => {
                self.cursor = Cursor::List(self.list.push(value));
            }
        }
        self.pre_clear = None;
        self.position()
    }

    fn restore(&mut self, cursor: Cursor) -> Result<(), CoreError> {
        if let Cursor::List(id) = cursor {
            self.list.seek(id)?;
        }
        self.cursor = cursor;
        Ok(())
    }

    /// Step the cursor back and return the node it lands on.
    ///
    /// Right after a remembering [`undo_all`](Self::undo_all) this
    /// restores the position from before the jump instead.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Underflow`] at `init` when nothing is remembered.
    pub fn undo(&mut self) -> Result<&Node<T>, CoreError> {
        if let Some(saved) = self.pre_clear.take() {
            self.restore(saved)?;
            return Ok(self.peek());
        }
        match self.cursor {
            Cursor::Init => return Err(CoreError::Underflow),
            Cursor::Root { .. } => self.cursor = Cursor::Init,
            Cursor::List(_) if self.list.curr_at_first() => self.cursor = Cursor::Init,
            Cursor::List(_) => {
                self.list.prev()?;
                self.cursor = Cursor::List(self.list.cursor());
            }
        }
        Ok(self.peek())
    }

    /// Step the cursor forward and return the node it lands on.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Underflow`] if there is nothing ahead.
    pub fn redo(&mut self) -> Result<&Node<T>, CoreError> {
        if !self.curr_has_next() {
            return Err(CoreError::Underflow);
        }
        match self.cursor {
            Cursor::Init if self.list.is_empty() => {
                self.cursor = Cursor::Root { epoch: self.epoch };
            }
            Cursor::Init | Cursor::Root { .. } => {
                self.list.first()?;
                self.cursor = Cursor::List(self.list.cursor());
            }
            Cursor::List(_) => {
                self.list.next()?;
                self.cursor = Cursor::List(self.list.cursor());
            }
        }
        Ok(self.peek())
    }

    /// Jump straight to `init` and return the sentinel.
    ///
    /// With `remember`, the position before the jump is recorded so one
    /// following [`undo`](Self::undo) can restore it. Remembering from
    /// `init` itself forgets any earlier memory. Without `remember` the
    /// memory is left as it was.
    pub fn undo_all(&mut self, remember: bool) -> &Node<T> {
        if remember {
            self.pre_clear = match self.cursor {
                Cursor::Init => None,
                other => Some(other),
            };
        }
        self.cursor = Cursor::Init;
        &self.init
    }

    /// Jump to the last reachable node and return it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Underflow`] if there is nothing ahead.
    pub fn redo_all(&mut self) -> Result<&Node<T>, CoreError> {
        if !self.curr_has_next() {
            return Err(CoreError::Underflow);
        }
        if self.list.is_empty() {
            self.cursor = Cursor::Root { epoch: self.epoch };
        } else {
            self.list.last()?;
            self.cursor = Cursor::List(self.list.cursor());
        }
        Ok(self.peek())
    }

    /// Chain a derived value onto the action at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if `position` is `init` or
    /// belongs to a branch that has since been discarded.
    pub fn attach_child(&mut self, position: Position, value: T) -> Result<(), CoreError> {
        match position.0 {
            Cursor::Init => Err(CoreError::invalid("init cannot carry a child")),
            Cursor::Root { epoch } if epoch == self.epoch && self.root.value().is_some() => {
                self.root.set_child(Some(value));
                Ok(())
            }
            Cursor::Root { .. } => Err(CoreError::invalid("root belongs to a discarded branch")),
            Cursor::List(id) => self.list.attach_child(id, value),
        }
    }

    /// Nodes from the root up to and including the cursor.
    #[must_use]
    pub fn trail(&self) -> Vec<&Node<T>> {
        match self.cursor {
            Cursor::Init => Vec::new(),
            Cursor::Root { .. } => vec![&self.root],
            Cursor::List(id) => {
                let mut nodes = vec![&self.root];
                let end = self.list.index_of(id).map_or(0, |index| index + 1);
                nodes.extend(self.list.iter().take(end));
                nodes
            }
        }
    }

    /// Returns `true` when [`undo`](Self::undo) would succeed.
    #[must_use]
    pub const fn curr_has_prev(&self) -> bool {
        self.pre_clear.is_some() || !matches!(self.cursor, Cursor::Init)
    }

    /// Returns `true` when [`redo`](Self::redo) would succeed.
    #[must_use]
    pub fn curr_has_next(&self) -> bool {
        match self.cursor {
            Cursor::Init => self.root.value().is_some(),
            Cursor::Root { .. } => !self.list.is_empty(),
            Cursor::List(id) => self.list.get(id).and_then(Node::next).is_some(),
        }
    }

    /// Returns `true` when the current node has a derived child attached.
    #[must_use]
    pub fn curr_has_child(&self) -> bool {
        self.current().has_child()
    }
}
