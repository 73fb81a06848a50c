//! Path-addressed state store with pattern-based change notification.
//!
//! - [`PathStore`]: owns the tree and the observer registry
//! - [`Update`]: literal, synchronous or asynchronous derivation
//! - [`SharedStore`]: cloneable handle for async commits and view bindings
//! - [`Watch`]: subscribe/unsubscribe lifecycle for a view component
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use pathstate_store::{PathStore, Update, Value};
//!
//! let mut store = PathStore::new();
//! let hits = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&hits);
//!
//! // Patterns are regular expressions over the normalized path.
//! let subscription = store
//!     .subscribe("/users/.+/name", move |_tree| counter.set(counter.get() + 1))
//!     .unwrap();
//!
//! store.commit("/users/42/name", Update::literal("Ada"));
//! assert_eq!(hits.get(), 1);
//! assert_eq!(store.retrieve("users/42/name"), Some(&Value::from("Ada")));
//!
//! subscription.unsubscribe();
//! store.commit("/users/42/name", Update::literal("Grace"));
//! assert_eq!(hits.get(), 1);
//! ```

pub mod binding;
pub mod registry;
pub mod shared;
pub mod store;
pub mod update;

pub use pathstate_core_store::{Error, StorePath, Value};

pub use binding::Watch;
pub use registry::{Observer, Registry, Subscription};
pub use shared::{Committed, SharedPending, SharedStore};
pub use store::{Commit, PathStore, PendingCommit, Settlement};
pub use update::Update;
