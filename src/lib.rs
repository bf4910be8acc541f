//! # verset
//!
//! A persistent (immutable, versioned) ordered set.
//!
//! ## Overview
//!
//! [`PersistentTreeSet`] is an ordered set over any totally-ordered element
//! type, implemented as an unbalanced binary search tree with path-copying
//! mutation. Every mutating operation (insert, erase) produces a new logical
//! version of the set while leaving all previously observed versions fully
//! intact and independently usable. Unmodified subtrees are shared between
//! versions by reference, so duplicating a set is O(1) and a mutation
//! allocates only along the affected path.
//!
//! Positions inside a version are represented by a [`Cursor`], a
//! bidirectional position that keeps the version it was obtained from alive
//! and steps to the next or previous element without nodes ever holding a
//! parent link.
//!
//! ## Feature Flags
//!
//! - `arc`: use `std::sync::Arc` for structural sharing instead of
//!   `std::rc::Rc`, making versions safe to read from multiple threads
//! - `serde`: `Serialize`/`Deserialize` support as an ordered sequence
//!
//! ## Example
//!
//! ```rust
//! use verset::PersistentTreeSet;
//!
//! let mut set = PersistentTreeSet::new();
//! set.insert(3);
//! set.insert(1);
//! set.insert(2);
//!
//! // O(1) copy: both versions are independent from here on
//! let snapshot = set.clone();
//! set.insert(4);
//!
//! assert_eq!(snapshot.len(), 3);
//! assert_eq!(set.len(), 4);
//! assert!(!snapshot.contains(&4));
//!
//! let sorted: Vec<&i32> = set.iter().collect();
//! assert_eq!(sorted, vec![&1, &2, &3, &4]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

mod treeset;

pub use treeset::Cursor;
pub use treeset::PersistentTreeSet;
pub use treeset::PersistentTreeSetIntoIterator;
pub use treeset::PersistentTreeSetIterator;
pub use treeset::swap;

// =============================================================================
// Tests
// =============================================================================
