//! PathState: an in-memory state tree addressed by slash-delimited paths.
//!
//! Values are read with `retrieve`, written with `commit` (a literal, a
//! synchronous derivation or an asynchronous one), and observed with
//! `subscribe`, whose path is treated as a regular expression over every
//! committed path. See [`PathStore`] for the exclusive-access store and
//! [`SharedStore`] / [`Watch`] for the shared handle a view layer binds to.

pub use pathstate_core_store::{
    from_value, json, normalize, to_value, Error, StorePath, Value,
};
pub use pathstate_store::{
    Commit, Committed, PathStore, PendingCommit, Settlement, SharedPending, SharedStore,
    Subscription, Update, Watch,
};
