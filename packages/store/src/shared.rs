//! Shared single-threaded handle around a [`PathStore`].
//!
//! `PathStore` needs exclusive access for every write, so an asynchronous
//! commit against it either holds that access across the await (see
//! [`PathStore::commit_settled`]) or leaves settlement to the caller.
//! `SharedStore` only borrows the store for the synchronous phases: the
//! derivation runs with no borrow held, other commits go through while it is
//! in flight, and the pending future writes into the store itself once it
//! resolves.

use std::cell::{Ref, RefCell, RefMut};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::future::FutureExt;

use pathstate_core_store::{Error, Value};

use crate::registry::Subscription;
use crate::store::{Commit, PathStore, PendingCommit};
use crate::update::Update;

/// Cloneable handle to one store. All clones see the same tree and registry.
///
/// Calls made from inside an observer while the store is dispatching return
/// [`Error::Reentrant`] rather than panicking.
#[derive(Clone, Debug, Default)]
pub struct SharedStore {
    inner: Rc<RefCell<PathStore>>,
}

/// Outcome of [`SharedStore::commit`].
#[derive(Debug)]
pub enum Committed {
    Applied,
    Pending(SharedPending),
}

impl Committed {
    pub fn is_pending(&self) -> bool {
        matches!(self, Committed::Pending(_))
    }

    /// Wait for the commit to be written and its observers notified.
    pub async fn settled(self) -> Result<(), Error> {
        match self {
            Committed::Applied => Ok(()),
            Committed::Pending(pending) => pending.await,
        }
    }
}

/// An asynchronous commit that writes into its store when it resolves.
///
/// Keeps the store alive until then.
#[must_use = "an asynchronous commit is not written until it is awaited"]
#[derive(Debug)]
pub struct SharedPending {
    store: Rc<RefCell<PathStore>>,
    pending: PendingCommit,
}

impl Future for SharedPending {
    type Output = Result<(), Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let settlement = futures::ready!(self.pending.poll_unpin(cx));

        let mut store = self
            .store
            .try_borrow_mut()
            .map_err(|_| Error::Reentrant {
                operation: "settle",
            })?;
        store.settle(settlement);
        Poll::Ready(Ok(()))
    }
}

impl SharedStore {
    pub fn new() -> Self {
        Self::from_store(PathStore::new())
    }

    pub fn with_data(data: Value) -> Self {
        Self::from_store(PathStore::with_data(data))
    }

    pub fn from_store(store: PathStore) -> Self {
        Self {
            inner: Rc::new(RefCell::new(store)),
        }
    }

    fn borrow(&self, operation: &'static str) -> Result<Ref<'_, PathStore>, Error> {
        self.inner
            .try_borrow()
            .map_err(|_| Error::Reentrant { operation })
    }

    fn borrow_mut(&self, operation: &'static str) -> Result<RefMut<'_, PathStore>, Error> {
        self.inner
            .try_borrow_mut()
            .map_err(|_| Error::Reentrant { operation })
    }

    /// Read a copy of the value at `path`.
    pub fn retrieve(&self, path: &str) -> Result<Option<Value>, Error> {
        Ok(self.borrow("retrieve")?.retrieve(path).cloned())
    }

    /// Write to `path`. See [`PathStore::commit`].
    ///
    /// For an asynchronous derivation the returned [`Committed::Pending`]
    /// must be awaited for the write to happen.
    pub fn commit(&self, path: &str, update: Update) -> Result<Committed, Error> {
        let mut store = self.borrow_mut("commit")?;
        let committed = match store.commit(path, update) {
            Commit::Applied(_) => Committed::Applied,
            Commit::Pending(pending) => Committed::Pending(SharedPending {
                store: Rc::clone(&self.inner),
                pending,
            }),
        };
        Ok(committed)
    }

    pub fn subscribe<F>(&self, path: &str, observer: F) -> Result<Subscription, Error>
    where
        F: FnMut(&Value) + 'static,
    {
        self.borrow_mut("subscribe")?.subscribe(path, observer)
    }

    /// See [`PathStore::unsubscribe_all`]: `Some("")` clears only the root
    /// pattern, `None` clears everything.
    pub fn unsubscribe_all(&self, path: Option<&str>) -> Result<(), Error> {
        self.borrow_mut("unsubscribe_all")?.unsubscribe_all(path);
        Ok(())
    }

    pub fn observer_count(&self) -> Result<usize, Error> {
        Ok(self.borrow("observer_count")?.observer_count())
    }

    pub fn to_json(&self) -> Result<serde_json::Value, Error> {
        Ok(self.borrow("to_json")?.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;
    use tokio::sync::oneshot;

    fn counter() -> (Rc<Cell<usize>>, impl FnMut(&Value) + 'static) {
        let count = Rc::new(Cell::new(0));
        let sink = Rc::clone(&count);
        (count, move |_: &Value| sink.set(sink.get() + 1))
    }

    fn waiting_on(rx: oneshot::Receiver<Value>) -> Update {
        Update::derive_async(move |_| async move { rx.await.unwrap_or_default() })
    }

    #[test]
    fn clones_share_state() {
        let store = SharedStore::new();
        let other = store.clone();

        store.commit("/a/b", Update::literal("x")).unwrap();
        assert_eq!(other.retrieve("a/b").unwrap(), Some(Value::from("x")));
        assert_eq!(other.to_json().unwrap(), json!({ "a": { "b": "x" } }));
    }

    #[test]
    fn sync_commit_is_applied_immediately() {
        let store = SharedStore::new();
        let (count, observer) = counter();
        store.subscribe("/a", observer).unwrap();

        let committed = store.commit("/a", Update::literal(1i64)).unwrap();
        assert!(!committed.is_pending());
        assert_eq!(count.get(), 1);
    }

    #[tokio::test]
    async fn pending_commit_settles_into_store() {
        let store = SharedStore::with_data(Value::from(json!({ "n": "old" })));
        let (count, observer) = counter();
        store.subscribe("/n", observer).unwrap();

        let (tx, rx) = oneshot::channel();
        let committed = store.commit("/n", waiting_on(rx)).unwrap();
        assert!(committed.is_pending());

        assert_eq!(store.retrieve("n").unwrap(), Some(Value::from("old")));
        assert_eq!(count.get(), 0);

        tx.send(Value::from("new")).unwrap();
        committed.settled().await.unwrap();

        assert_eq!(store.retrieve("n").unwrap(), Some(Value::from("new")));
        assert_eq!(count.get(), 1);
    }

    #[tokio::test]
    async fn overlapping_async_commits_last_to_complete_wins() {
        let store = SharedStore::new();
        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();

        let a = store.commit("/n", waiting_on(rx_a)).unwrap();
        let b = store.commit("/n", waiting_on(rx_b)).unwrap();

        // Writers are not blocked during the window.
        store.commit("/n", Update::literal("sync")).unwrap();
        assert_eq!(store.retrieve("n").unwrap(), Some(Value::from("sync")));

        tx_b.send(Value::from("b")).unwrap();
        b.settled().await.unwrap();
        assert_eq!(store.retrieve("n").unwrap(), Some(Value::from("b")));

        tx_a.send(Value::from("a")).unwrap();
        a.settled().await.unwrap();
        assert_eq!(store.retrieve("n").unwrap(), Some(Value::from("a")));
    }

    #[test]
    fn reentrant_calls_from_observers_are_errors() {
        let store = SharedStore::new();
        let results = Rc::new(RefCell::new(Vec::new()));

        let inner_store = store.clone();
        let sink = Rc::clone(&results);
        store
            .subscribe("/a", move |_| {
                let retrieved = inner_store.retrieve("a").map(|_| ());
                let committed = inner_store.commit("/b", Update::literal(1i64)).map(|_| ());
                sink.borrow_mut().push((retrieved, committed));
            })
            .unwrap();

        store.commit("/a", Update::literal(1i64)).unwrap();

        let results = results.borrow();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0].0,
            Err(Error::Reentrant {
                operation: "retrieve"
            })
        ));
        assert!(matches!(
            results[0].1,
            Err(Error::Reentrant {
                operation: "commit"
            })
        ));
        assert_eq!(store.retrieve("b").unwrap(), None);
    }

    #[test]
    fn unsubscribe_from_inside_observer() {
        let store = SharedStore::new();
        let (count, _) = counter();
        let handle: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let own_handle = Rc::clone(&handle);
        let sink = Rc::clone(&count);
        let subscription = store
            .subscribe("/a", move |_| {
                sink.set(sink.get() + 1);
                if let Some(subscription) = own_handle.borrow().as_ref() {
                    subscription.unsubscribe();
                }
            })
            .unwrap();
        *handle.borrow_mut() = Some(subscription);

        store.commit("/a", Update::literal(1i64)).unwrap();
        store.commit("/a", Update::literal(2i64)).unwrap();

        assert_eq!(count.get(), 1);
        assert_eq!(store.observer_count().unwrap(), 0);
    }

    #[test]
    fn unsubscribe_all_through_handle() {
        let store = SharedStore::new();
        let (count, observer) = counter();
        store.subscribe("/a", observer).unwrap();

        store.unsubscribe_all(None).unwrap();
        store.commit("/a", Update::literal(1i64)).unwrap();
        assert_eq!(count.get(), 0);
    }
}
