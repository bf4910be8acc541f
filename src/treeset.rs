//! Persistent (immutable, versioned) ordered set based on an unbalanced
//! binary search tree with path copying.
//!
//! This module provides [`PersistentTreeSet`], an ordered set whose mutating
//! operations produce a new version of the set while leaving every
//! previously observed version intact. Unmodified subtrees are shared
//! between versions by reference.
//!
//! # Overview
//!
//! Mutation works by path copying: an insert or erase reconstructs only the
//! nodes on the path from the root to the changed location and reuses every
//! other subtree by cloning its reference. The tree is deliberately not
//! self-balancing, so all logarithmic-looking costs below are O(h) where h
//! is the current tree height: O(log N) for random insertion orders and
//! O(N) in the adversarial worst case.
//!
//! - O(h) find
//! - O(h) insert, with O(h) allocations
//! - O(h) erase, with O(h) allocations
//! - O(h) cursor step (`move_next` / `move_prev`)
//! - O(1) len, `is_empty`, clone, clear, swap
//!
//! # Versions and Cursors
//!
//! Cloning a [`PersistentTreeSet`] copies one reference and a counter; the
//! clone is a fully independent version and mutating either side never
//! affects the other. A [`Cursor`] obtained from a set is pinned to the
//! version in effect at that moment: it keeps that version alive and keeps
//! iterating over it even if the set is mutated afterwards.
//!
//! Nodes are shared across many versions, so a node cannot record a parent
//! link; parentage is a property of one version's path to the node, not of
//! the node itself. A cursor therefore steps by re-deriving its position
//! from the root of its own version, at O(h) per step.
//!
//! # Examples
//!
//! ```rust
//! use verset::PersistentTreeSet;
//!
//! let mut set = PersistentTreeSet::new();
//! for value in [5, 3, 8, 1, 4, 7, 9] {
//!     set.insert(value);
//! }
//!
//! // In-order iteration yields ascending values
//! let forward: Vec<i32> = set.iter().copied().collect();
//! assert_eq!(forward, vec![1, 3, 4, 5, 7, 8, 9]);
//!
//! // Erase through a cursor; earlier versions are unaffected
//! let snapshot = set.clone();
//! let cursor = set.find(&5);
//! assert!(set.erase(&cursor));
//!
//! assert_eq!(set.len(), 6);
//! assert!(snapshot.contains(&5));
//! ```

use crate::ReferenceCounter;
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::mem;

// =============================================================================
// Node Definition
// =============================================================================

/// Internal tree node. Immutable once constructed: a node may be referenced
/// by any number of versions simultaneously and is reclaimed when the last
/// reference drops.
struct Node<T> {
    value: T,
    left: Option<ReferenceCounter<Node<T>>>,
    right: Option<ReferenceCounter<Node<T>>>,
}

impl<T> Node<T> {
    /// Creates a new node with no children.
    const fn leaf(value: T) -> Self {
        Self {
            value,
            left: None,
            right: None,
        }
    }
}

/// Descends to the leftmost node of a subtree (its minimum).
fn min_node<T>(node: &ReferenceCounter<Node<T>>) -> &ReferenceCounter<Node<T>> {
    let mut current = node;
    while let Some(left) = &current.left {
        current = left;
    }
    current
}

/// Descends to the rightmost node of a subtree (its maximum).
fn max_node<T>(node: &ReferenceCounter<Node<T>>) -> &ReferenceCounter<Node<T>> {
    let mut current = node;
    while let Some(right) = &current.right {
        current = right;
    }
    current
}

/// Iterative lookup; no allocation, no mutation.
fn find_node<'a, T, Q>(
    root: Option<&'a ReferenceCounter<Node<T>>>,
    value: &Q,
) -> Option<&'a ReferenceCounter<Node<T>>>
where
    T: Borrow<Q>,
    Q: Ord + ?Sized,
{
    let mut current = root;
    while let Some(node) = current {
        match value.cmp(node.value.borrow()) {
            Ordering::Less => current = node.left.as_ref(),
            Ordering::Greater => current = node.right.as_ref(),
            Ordering::Equal => return Some(node),
        }
    }
    None
}

/// Result of a recursive path-copying insert.
enum InsertOutcome<T> {
    /// A new leaf was attached. `subtree` replaces the node the recursion
    /// descended into; `leaf` is the node holding the inserted value.
    Added {
        subtree: ReferenceCounter<Node<T>>,
        leaf: ReferenceCounter<Node<T>>,
    },
    /// An equal value already exists at this node. Nothing was allocated on
    /// the unwound path, so the caller keeps the old tree untouched.
    Present(ReferenceCounter<Node<T>>),
}

/// Recursive helper for insert.
///
/// On-path nodes are reconstructed with one child reference reused and the
/// other replaced by the recursive result; off-path subtrees are shared
/// verbatim.
fn insert_node<T: Clone + Ord>(
    node: Option<&ReferenceCounter<Node<T>>>,
    value: T,
) -> InsertOutcome<T> {
    let Some(node_ref) = node else {
        let leaf = ReferenceCounter::new(Node::leaf(value));
        return InsertOutcome::Added {
            subtree: leaf.clone(),
            leaf,
        };
    };
    match value.cmp(&node_ref.value) {
        Ordering::Equal => InsertOutcome::Present(node_ref.clone()),
        Ordering::Less => match insert_node(node_ref.left.as_ref(), value) {
            InsertOutcome::Added { subtree, leaf } => InsertOutcome::Added {
                subtree: ReferenceCounter::new(Node {
                    value: node_ref.value.clone(),
                    left: Some(subtree),
                    right: node_ref.right.clone(),
                }),
                leaf,
            },
            present @ InsertOutcome::Present(_) => present,
        },
        Ordering::Greater => match insert_node(node_ref.right.as_ref(), value) {
            InsertOutcome::Added { subtree, leaf } => InsertOutcome::Added {
                subtree: ReferenceCounter::new(Node {
                    value: node_ref.value.clone(),
                    left: node_ref.left.clone(),
                    right: Some(subtree),
                }),
                leaf,
            },
            present @ InsertOutcome::Present(_) => present,
        },
    }
}

/// Recursive helper for erase.
///
/// Steers by value comparison and detects the target by node identity.
/// The caller guarantees `target` is reachable from `node`.
fn erase_node<T: Clone + Ord>(
    node: Option<&ReferenceCounter<Node<T>>>,
    target: &ReferenceCounter<Node<T>>,
) -> Option<ReferenceCounter<Node<T>>> {
    let node_ref = node?;
    if ReferenceCounter::ptr_eq(node_ref, target) {
        return match (&node_ref.left, &node_ref.right) {
            (_, None) => node_ref.left.clone(),
            (None, Some(right)) => Some(right.clone()),
            (Some(left), Some(right)) => {
                // Replace with the in-order successor: the minimum of the
                // right subtree, which is then erased from that subtree.
                let successor = min_node(right).clone();
                Some(ReferenceCounter::new(Node {
                    value: successor.value.clone(),
                    left: Some(left.clone()),
                    right: erase_node(node_ref.right.as_ref(), &successor),
                }))
            }
        };
    }
    if node_ref.value < target.value {
        Some(ReferenceCounter::new(Node {
            value: node_ref.value.clone(),
            left: node_ref.left.clone(),
            right: erase_node(node_ref.right.as_ref(), target),
        }))
    } else {
        Some(ReferenceCounter::new(Node {
            value: node_ref.value.clone(),
            left: erase_node(node_ref.left.as_ref(), target),
            right: node_ref.right.clone(),
        }))
    }
}

// =============================================================================
// Sentinel Definition
// =============================================================================

/// Version header: holds the real root and serves as the identity of one
/// version. Cursors anchor to a sentinel, and the end position is
/// represented as (sentinel, no node). Carries no element, so "the
/// sentinel's value" is unrepresentable rather than undefined.
struct Sentinel<T> {
    left: Option<ReferenceCounter<Node<T>>>,
}

/// Compares two optional references by identity.
fn same_reference<U>(a: Option<&ReferenceCounter<U>>, b: Option<&ReferenceCounter<U>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => ReferenceCounter::ptr_eq(a, b),
        _ => false,
    }
}

// =============================================================================
// PersistentTreeSet Definition
// =============================================================================

/// A persistent (immutable, versioned) ordered set.
///
/// `PersistentTreeSet` is an unbalanced binary search tree with path-copying
/// mutation. Insert and erase replace the version held by this instance;
/// every version observed earlier (through [`Clone`] or through a
/// [`Cursor`]) remains intact and independently usable, sharing all
/// unmodified subtrees with the new version.
///
/// Elements must implement `Ord`; the set maintains them in strictly
/// increasing order, with no duplicates. The tree is not self-balancing, so
/// operation costs are O(h) in the tree height: O(log N) for random
/// insertion orders, O(N) for adversarial ones. A balancing discipline
/// (weight balance, treap priorities) could be layered onto the same
/// path-copying skeleton, but is out of scope here.
///
/// # Time Complexity
///
/// | Operation    | Complexity |
/// |--------------|------------|
/// | `new`        | O(1)       |
/// | `find`       | O(h)       |
/// | `insert`     | O(h)       |
/// | `erase`      | O(h)       |
/// | `contains`   | O(h)       |
/// | `min`/`max`  | O(h)       |
/// | `len`        | O(1)       |
/// | `is_empty`   | O(1)       |
/// | `clone`      | O(1)       |
/// | `clear`      | O(1)       |
/// | `swap`       | O(1)       |
///
/// # Examples
///
/// ```rust
/// use verset::PersistentTreeSet;
///
/// let mut set = PersistentTreeSet::new();
/// let (_, inserted) = set.insert(42);
/// assert!(inserted);
///
/// // Inserting an equal value leaves the set unchanged
/// let (cursor, inserted) = set.insert(42);
/// assert!(!inserted);
/// assert_eq!(cursor.value(), Some(&42));
/// assert_eq!(set.len(), 1);
/// ```
#[derive(Clone)]
pub struct PersistentTreeSet<T> {
    /// Current version header. `None` until the first insert; `clear` also
    /// resets it to `None`.
    sentinel: Option<ReferenceCounter<Sentinel<T>>>,
    /// Number of elements. Per-instance, never shared between versions.
    length: usize,
}

impl<T> PersistentTreeSet<T> {
    /// Creates a new empty set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use verset::PersistentTreeSet;
    ///
    /// let set: PersistentTreeSet<i32> = PersistentTreeSet::new();
    /// assert!(set.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sentinel: None,
            length: 0,
        }
    }

    /// Returns the number of elements in the set.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use verset::PersistentTreeSet;
    ///
    /// let mut set = PersistentTreeSet::new();
    /// set.insert(1);
    /// set.insert(2);
    /// assert_eq!(set.len(), 2);
    /// ```
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the set contains no elements.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use verset::PersistentTreeSet;
    ///
    /// let empty: PersistentTreeSet<i32> = PersistentTreeSet::new();
    /// assert!(empty.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Resets this instance to the empty version.
    ///
    /// Only the reference held by this instance is dropped; other instances
    /// and cursors still holding the old version are unaffected.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use verset::PersistentTreeSet;
    ///
    /// let mut set = PersistentTreeSet::new();
    /// set.insert(1);
    /// let snapshot = set.clone();
    ///
    /// set.clear();
    /// assert!(set.is_empty());
    /// assert!(snapshot.contains(&1));
    /// ```
    #[inline]
    pub fn clear(&mut self) {
        self.sentinel = None;
        self.length = 0;
    }

    /// Exchanges the versions (and lengths) held by two instances.
    ///
    /// # Complexity
    ///
    /// O(1), no allocation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use verset::PersistentTreeSet;
    ///
    /// let mut a = PersistentTreeSet::new();
    /// a.insert(1);
    /// let mut b = PersistentTreeSet::new();
    ///
    /// a.swap(&mut b);
    /// assert!(a.is_empty());
    /// assert_eq!(b.len(), 1);
    /// ```
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Root of the current version's tree.
    fn root(&self) -> Option<&ReferenceCounter<Node<T>>> {
        self.sentinel.as_ref().and_then(|sentinel| sentinel.left.as_ref())
    }

    /// Returns the minimum element.
    ///
    /// # Complexity
    ///
    /// O(h)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use verset::PersistentTreeSet;
    ///
    /// let mut set = PersistentTreeSet::new();
    /// for value in [3, 1, 5] {
    ///     set.insert(value);
    /// }
    /// assert_eq!(set.min(), Some(&1));
    /// assert_eq!(set.max(), Some(&5));
    /// ```
    #[must_use]
    pub fn min(&self) -> Option<&T> {
        self.root().map(|root| &min_node(root).value)
    }

    /// Returns the maximum element.
    ///
    /// # Complexity
    ///
    /// O(h)
    #[must_use]
    pub fn max(&self) -> Option<&T> {
        self.root().map(|root| &max_node(root).value)
    }

    /// Returns a cursor at the minimum element, or the end cursor if the
    /// set is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use verset::PersistentTreeSet;
    ///
    /// let mut set = PersistentTreeSet::new();
    /// for value in [2, 1, 3] {
    ///     set.insert(value);
    /// }
    ///
    /// let mut cursor = set.cursor_front();
    /// assert_eq!(cursor.value(), Some(&1));
    /// cursor.move_next();
    /// assert_eq!(cursor.value(), Some(&2));
    /// ```
    #[must_use]
    pub fn cursor_front(&self) -> Cursor<T> {
        Cursor {
            anchor: self.sentinel.clone(),
            node: self.root().map(|root| min_node(root).clone()),
        }
    }

    /// Returns a cursor at the maximum element, or the end cursor if the
    /// set is empty.
    #[must_use]
    pub fn cursor_back(&self) -> Cursor<T> {
        Cursor {
            anchor: self.sentinel.clone(),
            node: self.root().map(|root| max_node(root).clone()),
        }
    }

    /// Returns the end cursor: the position one past the maximum element.
    ///
    /// The end cursor of an empty set equals its front cursor.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use verset::PersistentTreeSet;
    ///
    /// let empty: PersistentTreeSet<i32> = PersistentTreeSet::new();
    /// assert_eq!(empty.cursor_front(), empty.cursor_end());
    /// ```
    #[must_use]
    pub fn cursor_end(&self) -> Cursor<T> {
        Cursor {
            anchor: self.sentinel.clone(),
            node: None,
        }
    }

    /// Returns a double-ended iterator over the elements in ascending
    /// order. Use `.rev()` for the descending view.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use verset::PersistentTreeSet;
    ///
    /// let mut set = PersistentTreeSet::new();
    /// for value in [3, 1, 2] {
    ///     set.insert(value);
    /// }
    ///
    /// let forward: Vec<&i32> = set.iter().collect();
    /// assert_eq!(forward, vec![&1, &2, &3]);
    ///
    /// let backward: Vec<&i32> = set.iter().rev().collect();
    /// assert_eq!(backward, vec![&3, &2, &1]);
    /// ```
    #[must_use]
    pub fn iter(&self) -> PersistentTreeSetIterator<'_, T> {
        let mut entries = Vec::with_capacity(self.length);
        Self::collect_in_order(self.root(), &mut entries);
        let back = entries.len();
        PersistentTreeSetIterator {
            entries,
            front: 0,
            back,
        }
    }

    /// Collects all elements in ascending order (in-order traversal).
    fn collect_in_order<'a>(node: Option<&'a ReferenceCounter<Node<T>>>, entries: &mut Vec<&'a T>) {
        if let Some(node_ref) = node {
            Self::collect_in_order(node_ref.left.as_ref(), entries);
            entries.push(&node_ref.value);
            Self::collect_in_order(node_ref.right.as_ref(), entries);
        }
    }
}

impl<T: Clone + Ord> PersistentTreeSet<T> {
    /// Creates a set containing a single element.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use verset::PersistentTreeSet;
    ///
    /// let set = PersistentTreeSet::singleton(42);
    /// assert_eq!(set.len(), 1);
    /// assert!(set.contains(&42));
    /// ```
    #[must_use]
    pub fn singleton(value: T) -> Self {
        let mut set = Self::new();
        set.insert(value);
        set
    }

    /// Searches for a value and returns a cursor at it, or the end cursor
    /// if the value is absent.
    ///
    /// The value may be any borrowed form of the element type, but the
    /// ordering on the borrowed form must match the ordering on the element
    /// type.
    ///
    /// # Complexity
    ///
    /// O(h); no allocation, no mutation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use verset::PersistentTreeSet;
    ///
    /// let mut set = PersistentTreeSet::new();
    /// set.insert("hello".to_string());
    ///
    /// // Can use &str to look up String elements
    /// assert_eq!(set.find("hello").value(), Some(&"hello".to_string()));
    /// assert!(set.find("world").is_end());
    /// ```
    #[must_use]
    pub fn find<Q>(&self, value: &Q) -> Cursor<T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        Cursor {
            anchor: self.sentinel.clone(),
            node: find_node(self.root(), value).cloned(),
        }
    }

    /// Returns `true` if the set contains the value.
    ///
    /// # Complexity
    ///
    /// O(h)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use verset::PersistentTreeSet;
    ///
    /// let set = PersistentTreeSet::singleton(1);
    /// assert!(set.contains(&1));
    /// assert!(!set.contains(&2));
    /// ```
    #[must_use]
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        find_node(self.root(), value).is_some()
    }

    /// Inserts a value, replacing the version held by this instance.
    ///
    /// Returns a cursor at the element and whether it was inserted. If an
    /// equal value is already present, the set is left byte-for-byte
    /// unchanged (same version, no allocation) and the cursor references
    /// the existing element.
    ///
    /// Previously observed versions are unaffected: the new version shares
    /// every subtree off the insertion path with the old one.
    ///
    /// # Complexity
    ///
    /// O(h), with O(h) new nodes allocated.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use verset::PersistentTreeSet;
    ///
    /// let mut set = PersistentTreeSet::new();
    ///
    /// let (cursor, inserted) = set.insert(1);
    /// assert!(inserted);
    /// assert_eq!(cursor.value(), Some(&1));
    ///
    /// let (cursor, inserted) = set.insert(1);
    /// assert!(!inserted);
    /// assert_eq!(cursor.value(), Some(&1));
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn insert(&mut self, value: T) -> (Cursor<T>, bool) {
        match insert_node(self.root(), value) {
            InsertOutcome::Present(node) => (
                Cursor {
                    anchor: self.sentinel.clone(),
                    node: Some(node),
                },
                false,
            ),
            InsertOutcome::Added { subtree, leaf } => {
                let sentinel = ReferenceCounter::new(Sentinel {
                    left: Some(subtree),
                });
                self.sentinel = Some(sentinel.clone());
                self.length += 1;
                (
                    Cursor {
                        anchor: Some(sentinel),
                        node: Some(leaf),
                    },
                    true,
                )
            }
        }
    }

    /// Erases the element referenced by a cursor, replacing the version
    /// held by this instance. Returns `true` if an element was removed.
    ///
    /// The cursor must have been obtained from the version this instance
    /// currently holds (via [`find`](Self::find), [`insert`](Self::insert)
    /// or the cursor constructors) and must not be the end cursor. Both
    /// conditions are checked defensively: an end cursor, a cursor from a
    /// different version, or an empty set make this a no-op returning
    /// `false`.
    ///
    /// # Complexity
    ///
    /// O(h), with O(h) new nodes allocated.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use verset::PersistentTreeSet;
    ///
    /// let mut set = PersistentTreeSet::new();
    /// for value in [1, 2, 3] {
    ///     set.insert(value);
    /// }
    ///
    /// let cursor = set.find(&2);
    /// assert!(set.erase(&cursor));
    /// assert_eq!(set.len(), 2);
    /// assert!(!set.contains(&2));
    ///
    /// // The cursor now belongs to a superseded version
    /// assert!(!set.erase(&cursor));
    /// ```
    pub fn erase(&mut self, cursor: &Cursor<T>) -> bool {
        let (Some(sentinel), Some(target)) = (self.sentinel.as_ref(), cursor.node.as_ref())
        else {
            return false;
        };
        if !same_reference(cursor.anchor.as_ref(), Some(sentinel)) {
            return false;
        }
        let new_root = erase_node(sentinel.left.as_ref(), target);
        self.sentinel = Some(ReferenceCounter::new(Sentinel { left: new_root }));
        self.length -= 1;
        true
    }
}

/// Exchanges the versions (and lengths) held by two sets.
///
/// Free-function form of [`PersistentTreeSet::swap`].
///
/// # Examples
///
/// ```rust
/// use verset::PersistentTreeSet;
///
/// let mut a = PersistentTreeSet::singleton(1);
/// let mut b = PersistentTreeSet::singleton(2);
///
/// verset::swap(&mut a, &mut b);
/// assert!(a.contains(&2));
/// assert!(b.contains(&1));
/// ```
pub fn swap<T>(a: &mut PersistentTreeSet<T>, b: &mut PersistentTreeSet<T>) {
    a.swap(b);
}

// =============================================================================
// Cursor Definition
// =============================================================================

/// A bidirectional position inside one version of a [`PersistentTreeSet`].
///
/// A cursor is pinned to the version in effect when it was obtained: it
/// holds a reference to that version's header, keeping the whole version
/// alive, and keeps traversing it even if the originating set is mutated
/// afterwards.
///
/// The position one past the maximum element is the end cursor
/// ([`is_end`](Self::is_end)); its [`value`](Self::value) is `None`.
/// Stepping is O(h): nodes carry no parent link (they are shared across
/// versions), so a step with no child to descend into re-derives the
/// position by a fresh search from the root of the cursor's version.
///
/// Cursors are `Clone` for multi-pass traversal, and compare equal exactly
/// when they reference the same position in the same version.
///
/// # Examples
///
/// ```rust
/// use verset::PersistentTreeSet;
///
/// let mut set = PersistentTreeSet::new();
/// for value in [2, 1, 3] {
///     set.insert(value);
/// }
///
/// let mut cursor = set.cursor_front();
/// let mut collected = Vec::new();
/// while let Some(value) = cursor.value() {
///     collected.push(*value);
///     cursor.move_next();
/// }
/// assert_eq!(collected, vec![1, 2, 3]);
/// assert_eq!(cursor, set.cursor_end());
/// ```
pub struct Cursor<T> {
    /// Header of the version this cursor traverses. `None` only for
    /// cursors obtained from a never-inserted (or cleared) instance.
    anchor: Option<ReferenceCounter<Sentinel<T>>>,
    /// Referenced node; `None` marks the end position.
    node: Option<ReferenceCounter<Node<T>>>,
}

impl<T> Cursor<T> {
    /// Returns the referenced element, or `None` at the end position.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use verset::PersistentTreeSet;
    ///
    /// let set = PersistentTreeSet::singleton(7);
    /// assert_eq!(set.cursor_front().value(), Some(&7));
    /// assert_eq!(set.cursor_end().value(), None);
    /// ```
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.node.as_deref().map(|node| &node.value)
    }

    /// Returns `true` if this cursor is at the end position.
    #[inline]
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }

    /// Root of the version this cursor traverses.
    fn root(&self) -> Option<&ReferenceCounter<Node<T>>> {
        self.anchor.as_ref().and_then(|sentinel| sentinel.left.as_ref())
    }
}

impl<T: Ord> Cursor<T> {
    /// Moves to the in-order successor. Moving past the maximum element
    /// lands on the end position; at the end position this is a no-op.
    ///
    /// # Complexity
    ///
    /// O(h)
    pub fn move_next(&mut self) {
        let Some(current) = self.node.as_ref() else {
            return;
        };
        // With a right child, the successor is the minimum of that subtree;
        // otherwise it is the last strictly greater node on the root path.
        self.node = if let Some(right) = &current.right {
            Some(min_node(right).clone())
        } else {
            self.search_greater(&current.value)
        };
    }

    /// Moves to the in-order predecessor. At the end position this lands on
    /// the maximum element, so reverse traversal composes with forward
    /// traversal; at the minimum element it lands on the end position.
    ///
    /// # Complexity
    ///
    /// O(h)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use verset::PersistentTreeSet;
    ///
    /// let mut set = PersistentTreeSet::new();
    /// for value in [1, 2, 3] {
    ///     set.insert(value);
    /// }
    ///
    /// let mut cursor = set.cursor_end();
    /// cursor.move_prev();
    /// assert_eq!(cursor.value(), Some(&3));
    /// ```
    pub fn move_prev(&mut self) {
        self.node = match self.node.as_ref() {
            None => self.root().map(|root| max_node(root).clone()),
            Some(current) => {
                if let Some(left) = &current.left {
                    Some(max_node(left).clone())
                } else {
                    self.search_less(&current.value)
                }
            }
        };
    }

    /// Top-down search for the last node strictly greater than `value`,
    /// branching toward `value` from the root.
    fn search_greater(&self, value: &T) -> Option<ReferenceCounter<Node<T>>> {
        let mut current = self.root();
        let mut result = None;
        while let Some(node) = current {
            match value.cmp(&node.value) {
                Ordering::Greater => current = node.right.as_ref(),
                Ordering::Less => {
                    result = Some(node.clone());
                    current = node.left.as_ref();
                }
                Ordering::Equal => break,
            }
        }
        result
    }

    /// Top-down search for the last node strictly less than `value`,
    /// branching toward `value` from the root.
    fn search_less(&self, value: &T) -> Option<ReferenceCounter<Node<T>>> {
        let mut current = self.root();
        let mut result = None;
        while let Some(node) = current {
            match value.cmp(&node.value) {
                Ordering::Greater => {
                    result = Some(node.clone());
                    current = node.right.as_ref();
                }
                Ordering::Less => current = node.left.as_ref(),
                Ordering::Equal => break,
            }
        }
        result
    }
}

impl<T> Clone for Cursor<T> {
    fn clone(&self) -> Self {
        Self {
            anchor: self.anchor.clone(),
            node: self.node.clone(),
        }
    }
}

impl<T> PartialEq for Cursor<T> {
    /// Cursors are equal when they reference the same position (by node
    /// identity, or both at the end) in the same version (by header
    /// identity).
    fn eq(&self, other: &Self) -> bool {
        same_reference(self.anchor.as_ref(), other.anchor.as_ref())
            && same_reference(self.node.as_ref(), other.node.as_ref())
    }
}

impl<T> Eq for Cursor<T> {}

impl<T: fmt::Debug> fmt::Debug for Cursor<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(value) => formatter.debug_tuple("Cursor").field(value).finish(),
            None => formatter.write_str("Cursor(end)"),
        }
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// A double-ended iterator over the elements of a [`PersistentTreeSet`] in
/// ascending order.
pub struct PersistentTreeSetIterator<'a, T> {
    entries: Vec<&'a T>,
    front: usize,
    back: usize,
}

impl<'a, T> Iterator for PersistentTreeSetIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            None
        } else {
            let entry = self.entries[self.front];
            self.front += 1;
            Some(entry)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back.saturating_sub(self.front);
        (remaining, Some(remaining))
    }
}

impl<T> DoubleEndedIterator for PersistentTreeSetIterator<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            None
        } else {
            self.back -= 1;
            Some(self.entries[self.back])
        }
    }
}

impl<T> ExactSizeIterator for PersistentTreeSetIterator<'_, T> {
    fn len(&self) -> usize {
        self.back.saturating_sub(self.front)
    }
}

impl<T> FusedIterator for PersistentTreeSetIterator<'_, T> {}

/// An owning double-ended iterator over the elements of a
/// [`PersistentTreeSet`] in ascending order.
///
/// Elements are cloned out of the shared tree once, when the iterator is
/// constructed; iteration itself moves them.
pub struct PersistentTreeSetIntoIterator<T> {
    entries: std::vec::IntoIter<T>,
}

impl<T> Iterator for PersistentTreeSetIntoIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<T> DoubleEndedIterator for PersistentTreeSetIntoIterator<T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.entries.next_back()
    }
}

impl<T> ExactSizeIterator for PersistentTreeSetIntoIterator<T> {
    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<T> FusedIterator for PersistentTreeSetIntoIterator<T> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Default for PersistentTreeSet<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Ord> FromIterator<T> for PersistentTreeSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

impl<T: Clone + Ord> Extend<T> for PersistentTreeSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T: Clone + Ord, const N: usize> From<[T; N]> for PersistentTreeSet<T> {
    fn from(values: [T; N]) -> Self {
        values.into_iter().collect()
    }
}

impl<T: Clone> IntoIterator for PersistentTreeSet<T> {
    type Item = T;
    type IntoIter = PersistentTreeSetIntoIterator<T>;

    fn into_iter(self) -> Self::IntoIter {
        let entries: Vec<T> = self.iter().cloned().collect();
        PersistentTreeSetIntoIterator {
            entries: entries.into_iter(),
        }
    }
}

impl<'a, T> IntoIterator for &'a PersistentTreeSet<T> {
    type Item = &'a T;
    type IntoIter = PersistentTreeSetIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: PartialEq> PartialEq for PersistentTreeSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for PersistentTreeSet<T> {}

/// Computes a hash value for this set.
///
/// The hash covers the length and then each element in ascending order, so
/// insertion order does not affect the hash and equal sets produce equal
/// hash values (Hash-Eq consistency).
impl<T: Hash> Hash for PersistentTreeSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.length.hash(state);
        for value in self.iter() {
            value.hash(state);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PersistentTreeSet<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_set().entries(self.iter()).finish()
    }
}

impl<T: fmt::Display> fmt::Display for PersistentTreeSet<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        let mut first = true;
        for value in self.iter() {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{value}")?;
        }
        write!(formatter, "}}")
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for PersistentTreeSet<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut sequence = serializer.serialize_seq(Some(self.len()))?;
        for value in self.iter() {
            sequence.serialize_element(value)?;
        }
        sequence.end()
    }
}

#[cfg(feature = "serde")]
struct PersistentTreeSetVisitor<T> {
    marker: std::marker::PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<T> PersistentTreeSetVisitor<T> {
    const fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::de::Visitor<'de> for PersistentTreeSetVisitor<T>
where
    T: serde::Deserialize<'de> + Clone + Ord,
{
    type Value = PersistentTreeSet<T>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut set = PersistentTreeSet::new();
        while let Some(value) = access.next_element()? {
            set.insert(value);
        }
        Ok(set)
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for PersistentTreeSet<T>
where
    T: serde::Deserialize<'de> + Clone + Ord,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(PersistentTreeSetVisitor::new())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn set_of(values: &[i32]) -> PersistentTreeSet<i32> {
        values.iter().copied().collect()
    }

    // =========================================================================
    // Basic Tests
    // =========================================================================

    #[rstest]
    fn test_new_creates_empty() {
        let set: PersistentTreeSet<i32> = PersistentTreeSet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert!(set.sentinel.is_none());
    }

    #[rstest]
    fn test_round_trip_ordering() {
        let set = set_of(&[5, 3, 8, 1, 4, 7, 9]);
        let forward: Vec<i32> = set.iter().copied().collect();
        assert_eq!(forward, vec![1, 3, 4, 5, 7, 8, 9]);
    }

    #[rstest]
    fn test_round_trip_after_erase() {
        let mut set = set_of(&[5, 3, 8, 1, 4, 7, 9]);
        let cursor = set.find(&5);
        assert!(set.erase(&cursor));
        let forward: Vec<i32> = set.iter().copied().collect();
        assert_eq!(forward, vec![1, 3, 4, 7, 8, 9]);
    }

    // =========================================================================
    // Structural Sharing Tests
    // =========================================================================

    #[rstest]
    fn test_insert_into_clone_shares_untouched_subtree() {
        let mut original = set_of(&[5, 3, 8]);
        let mut copy = original.clone();

        // Path-copies 5 and 8; the subtree rooted at 3 stays shared.
        copy.insert(9);

        let original_root = original.root().unwrap();
        let copy_root = copy.root().unwrap();
        assert!(!ReferenceCounter::ptr_eq(original_root, copy_root));
        assert!(same_reference(
            original_root.left.as_ref(),
            copy_root.left.as_ref()
        ));

        // Mutating the copy never touched the original's version.
        original.insert(0);
        assert!(!copy.contains(&0));
        assert!(!original.contains(&9));
    }

    #[rstest]
    fn test_shared_node_reference_counts() {
        let original = set_of(&[5, 3, 8]);
        let left = original.root().unwrap().left.clone().unwrap();
        assert_eq!(ReferenceCounter::strong_count(&left), 2);

        let mut copy = original.clone();
        copy.insert(9);
        // Now referenced by the original tree, the copy's tree, and `left`.
        assert_eq!(ReferenceCounter::strong_count(&left), 3);

        drop(copy);
        assert_eq!(ReferenceCounter::strong_count(&left), 2);
    }

    #[rstest]
    fn test_duplicate_insert_keeps_same_version() {
        let mut set = set_of(&[2, 1, 3]);
        let sentinel_before = set.sentinel.clone().unwrap();

        let (cursor, inserted) = set.insert(2);
        assert!(!inserted);
        assert_eq!(cursor.value(), Some(&2));
        assert_eq!(set.len(), 3);
        assert!(ReferenceCounter::ptr_eq(
            &sentinel_before,
            set.sentinel.as_ref().unwrap()
        ));
    }

    #[rstest]
    fn test_erase_shares_off_path_subtrees() {
        let mut set = set_of(&[5, 3, 8, 1, 4]);
        let snapshot = set.clone();
        let left_before = set.root().unwrap().left.clone().unwrap();

        let cursor = set.find(&8);
        assert!(set.erase(&cursor));

        // Erasing 8 reconstructs only the root; the left subtree is shared.
        assert!(same_reference(
            set.root().unwrap().left.as_ref(),
            Some(&left_before)
        ));
        assert!(snapshot.contains(&8));
    }

    // =========================================================================
    // Cursor Version-Pinning Tests
    // =========================================================================

    #[rstest]
    fn test_cursor_pins_its_version() {
        let mut set = set_of(&[2, 1, 3]);
        let mut cursor = set.cursor_front();

        set.insert(0);
        set.clear();

        // The cursor still walks the version it was obtained from.
        let mut collected = Vec::new();
        while let Some(value) = cursor.value() {
            collected.push(*value);
            cursor.move_next();
        }
        assert_eq!(collected, vec![1, 2, 3]);
    }

    #[rstest]
    fn test_erase_rejects_stale_cursor() {
        let mut set = set_of(&[1, 2, 3]);
        let stale = set.find(&2);
        set.insert(4);

        assert!(!set.erase(&stale));
        assert_eq!(set.len(), 4);
        assert!(set.contains(&2));
    }

    #[rstest]
    fn test_erase_rejects_end_cursor() {
        let mut set = set_of(&[1, 2]);
        let end = set.cursor_end();
        assert!(!set.erase(&end));
        assert_eq!(set.len(), 2);
    }

    #[rstest]
    fn test_erase_rejects_foreign_cursor() {
        let mut a = set_of(&[1, 2]);
        let b = set_of(&[1, 2]);
        let foreign = b.find(&1);
        assert!(!a.erase(&foreign));
        assert_eq!(a.len(), 2);
    }

    #[rstest]
    fn test_cursor_equality_is_per_version() {
        let mut set = set_of(&[1, 2]);
        let copy = set.clone();
        // A clone shares the version, so its cursors compare equal ...
        assert_eq!(set.cursor_front(), copy.cursor_front());
        assert_eq!(set.cursor_end(), copy.cursor_end());

        // ... until one side mutates into a new version.
        set.insert(3);
        assert_ne!(set.cursor_front(), copy.cursor_front());
        assert_ne!(set.cursor_end(), copy.cursor_end());
    }

    // =========================================================================
    // Cursor Stepping Tests
    // =========================================================================

    #[rstest]
    fn test_cursor_forward_walk() {
        let set = set_of(&[5, 3, 8, 1, 4, 7, 9]);
        let mut cursor = set.cursor_front();
        let mut collected = Vec::new();
        while let Some(value) = cursor.value() {
            collected.push(*value);
            cursor.move_next();
        }
        assert_eq!(collected, vec![1, 3, 4, 5, 7, 8, 9]);
        assert!(cursor.is_end());
    }

    #[rstest]
    fn test_cursor_backward_walk_from_end() {
        let set = set_of(&[5, 3, 8, 1, 4, 7, 9]);
        let mut cursor = set.cursor_end();
        let mut collected = Vec::new();
        loop {
            cursor.move_prev();
            match cursor.value() {
                Some(value) => collected.push(*value),
                None => break,
            }
        }
        assert_eq!(collected, vec![9, 8, 7, 5, 4, 3, 1]);
    }

    #[rstest]
    fn test_cursor_next_at_end_is_noop() {
        let set = set_of(&[1]);
        let mut cursor = set.cursor_end();
        cursor.move_next();
        assert!(cursor.is_end());
    }

    #[rstest]
    fn test_cursor_prev_at_minimum_lands_on_end() {
        let set = set_of(&[1, 2]);
        let mut cursor = set.cursor_front();
        cursor.move_prev();
        assert!(cursor.is_end());
        // ... and from the end, prev lands back on the maximum.
        cursor.move_prev();
        assert_eq!(cursor.value(), Some(&2));
    }

    #[rstest]
    fn test_cursor_on_empty_set() {
        let set: PersistentTreeSet<i32> = PersistentTreeSet::new();
        let mut cursor = set.cursor_front();
        assert!(cursor.is_end());
        cursor.move_next();
        cursor.move_prev();
        assert!(cursor.is_end());
        assert_eq!(set.cursor_front(), set.cursor_end());
    }

    // =========================================================================
    // Erase Shape Tests
    // =========================================================================

    #[rstest]
    #[case(&[2], 2, &[])]
    #[case(&[2, 1], 2, &[1])]
    #[case(&[2, 3], 2, &[3])]
    #[case(&[5, 3, 8, 7, 9], 5, &[3, 7, 8, 9])]
    #[case(&[5, 3, 8, 6, 9, 7], 5, &[3, 6, 7, 8, 9])]
    fn test_erase_node_shapes(
        #[case] values: &[i32],
        #[case] victim: i32,
        #[case] expected: &[i32],
    ) {
        let mut set = set_of(values);
        let cursor = set.find(&victim);
        assert!(set.erase(&cursor));
        let remaining: Vec<i32> = set.iter().copied().collect();
        assert_eq!(remaining, expected);
        assert_eq!(set.len(), expected.len());
    }

    #[rstest]
    fn test_erase_to_empty_then_reinsert() {
        let mut set = set_of(&[1]);
        let cursor = set.find(&1);
        assert!(set.erase(&cursor));
        assert!(set.is_empty());
        assert_eq!(set.cursor_front(), set.cursor_end());

        set.insert(2);
        assert_eq!(set.len(), 1);
        assert!(set.contains(&2));
    }
}
