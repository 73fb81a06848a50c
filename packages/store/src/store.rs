//! The path-addressed store: one value tree plus one observer registry.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{FutureExt, LocalBoxFuture};

use pathstate_core_store::{Error, StorePath, Value};

use crate::registry::{Registry, Subscription};
use crate::update::Update;

/// An in-memory state tree addressed by slash-delimited paths, with
/// pattern-based change notification.
///
/// The root is always a map. Writes through a path create missing
/// intermediate maps and write into arrays by decimal index. Intermediate
/// leaves are *replaced* with maps, discarding whatever was stored there:
///
/// ```rust
/// use pathstate_store::{PathStore, Update, Value};
///
/// let mut store = PathStore::new();
/// store.commit("/a", Update::literal("leaf"));
/// store.commit("/a/b/c", Update::literal(1i64));
///
/// assert_eq!(store.retrieve("a/b/c"), Some(&Value::from(1i64)));
/// assert!(store.retrieve("a").unwrap().is_map());
/// ```
///
/// An array keeps its other elements when one is written, and grows when the
/// index is one past its end. Any other fragment turns it into a map keyed by
/// index.
///
/// Every write is followed by a dispatch: each subscription pattern is used
/// as a regular expression and searched for in the normalized committed path,
/// and the observers of every matching pattern receive the entire tree.
#[derive(Debug)]
pub struct PathStore {
    tree: Value,
    registry: Registry,
}

/// Outcome of [`PathStore::commit`].
#[derive(Debug)]
pub enum Commit<'a> {
    /// The value was written and observers notified. Holds the whole tree.
    Applied(&'a Value),
    /// An asynchronous derivation is in flight. Nothing has been written yet.
    Pending(PendingCommit),
}

impl<'a> Commit<'a> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Commit::Pending(_))
    }

    /// The updated tree, if the commit was applied synchronously.
    pub fn applied(self) -> Option<&'a Value> {
        match self {
            Commit::Applied(tree) => Some(tree),
            Commit::Pending(_) => None,
        }
    }

    pub fn into_pending(self) -> Option<PendingCommit> {
        match self {
            Commit::Applied(_) => None,
            Commit::Pending(pending) => Some(pending),
        }
    }
}

/// An in-flight asynchronous derivation.
///
/// Resolves to a [`Settlement`] that must be handed back to
/// [`PathStore::settle`] to be written. Dropping it abandons the commit.
#[must_use = "an asynchronous commit is not written until it is awaited and settled"]
pub struct PendingCommit {
    path: StorePath,
    settlement: LocalBoxFuture<'static, Settlement>,
}

impl PendingCommit {
    fn new(path: StorePath, derived: LocalBoxFuture<'static, Value>) -> Self {
        let target = path.clone();
        Self {
            path,
            settlement: derived
                .map(move |value| Settlement {
                    path: target,
                    value,
                })
                .boxed_local(),
        }
    }

    /// The normalized path this commit will write to.
    pub fn path(&self) -> &StorePath {
        &self.path
    }
}

impl Future for PendingCommit {
    type Output = Settlement;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.settlement.poll_unpin(cx)
    }
}

impl fmt::Debug for PendingCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCommit")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// A resolved asynchronous derivation, ready to be written.
#[derive(Clone, Debug, PartialEq)]
pub struct Settlement {
    pub path: StorePath,
    pub value: Value,
}

impl PathStore {
    /// Create a store with an empty root.
    pub fn new() -> Self {
        Self::with_data(Value::map())
    }

    /// Create a store seeded with `data`. A non-map seed yields an empty root.
    pub fn with_data(data: Value) -> Self {
        Self {
            tree: root_map(data),
            registry: Registry::new(),
        }
    }

    pub fn from_json(json: serde_json::Value) -> Self {
        Self::with_data(Value::from(json))
    }

    /// The whole tree.
    pub fn root(&self) -> &Value {
        &self.tree
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.tree.clone().into()
    }

    /// Read the value at `path`.
    ///
    /// Returns `None` when any fragment along the way is missing or lands on
    /// a leaf. The root path returns the whole tree.
    pub fn retrieve(&self, path: &str) -> Option<&Value> {
        self.tree.get(&StorePath::parse(path))
    }

    /// Write to `path` and notify matching observers.
    ///
    /// Literal and synchronous updates are applied before returning. An
    /// asynchronous derivation is invoked immediately with a copy of the
    /// current value; the tree is left untouched until the returned
    /// [`PendingCommit`] resolves and is passed to [`PathStore::settle`].
    /// Other commits may land in the meantime, and the last settlement wins.
    ///
    /// Committing to the root applies the update to the whole tree.
    pub fn commit(&mut self, path: &str, update: Update) -> Commit<'_> {
        let path = StorePath::parse(path);
        log::debug!("commit {} to '{}'", update.kind(), path);

        match update {
            Update::Literal(value) => self.write(&path, |_| value),
            Update::Derive(derive) => self.write(&path, derive),
            Update::DeriveAsync(derive) => {
                let current = self.tree.get(&path).cloned();
                return Commit::Pending(PendingCommit::new(path, derive(current)));
            }
        }

        Commit::Applied(&self.tree)
    }

    /// Write a resolved asynchronous derivation and notify observers.
    pub fn settle(&mut self, settlement: Settlement) -> &Value {
        let Settlement { path, value } = settlement;
        log::debug!("settle '{}'", path);
        self.write(&path, |_| value);
        &self.tree
    }

    /// Commit, and if the update is asynchronous, await and settle it while
    /// keeping exclusive access to the store.
    pub async fn commit_settled(&mut self, path: &str, update: Update) -> &Value {
        let pending = self.commit(path, update).into_pending();
        if let Some(pending) = pending {
            let settlement = pending.await;
            self.settle(settlement);
        }
        &self.tree
    }

    /// Register `observer` on `path`, interpreted as a regular expression
    /// after normalization.
    pub fn subscribe<F>(&mut self, path: &str, observer: F) -> Result<Subscription, Error>
    where
        F: FnMut(&Value) + 'static,
    {
        self.registry.subscribe(path, Box::new(observer))
    }

    /// Remove the observers of one pattern, or of every pattern when `path`
    /// is `None`.
    ///
    /// The path is normalized first, so `Some("")` and `Some("/")` name the
    /// root pattern and clear only its observers. Pass `None` to clear
    /// everything.
    pub fn unsubscribe_all(&mut self, path: Option<&str>) {
        self.registry.unsubscribe_all(path);
    }

    /// Number of live observers.
    pub fn observer_count(&self) -> usize {
        self.registry.len()
    }

    fn write(&mut self, path: &StorePath, produce: impl FnOnce(Option<Value>) -> Value) {
        match path.split_last() {
            None => {
                let current = std::mem::take(&mut self.tree);
                self.tree = root_map(produce(Some(current)));
            }
            Some((last, parents)) => {
                let parent = self.tree.descend_mut(parents);
                let current = parent.take_child(last);
                parent.set_child(last, produce(current));
            }
        }

        self.registry.dispatch(&path.to_string(), &self.tree);
    }
}

impl Default for PathStore {
    fn default() -> Self {
        Self::new()
    }
}

fn root_map(value: Value) -> Value {
    if value.is_map() {
        value
    } else {
        log::warn!("root of the store must be a map; replacing {:?}", value);
        Value::map()
    }
}
