//! View-layer binding.
//!
//! A component that renders the value at some path wants three things: the
//! current value, a nudge whenever a commit could have changed it, and a way
//! to commit. [`Watch`] packages the first two around a [`SharedStore`] and
//! hands out the store itself for the third.
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use pathstate_store::{SharedStore, Update, Value, Watch};
//!
//! let store = SharedStore::new();
//! let renders = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&renders);
//!
//! let watch = Watch::new(&store, Some("/todos"), move || counter.set(counter.get() + 1))?;
//! watch.committer().commit("/todos/0", Update::literal("buy milk"))?;
//!
//! assert_eq!(renders.get(), 1);
//! assert!(watch.value()?.is_some());
//! # Ok::<(), pathstate_store::Error>(())
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use pathstate_core_store::{normalize, Error, Value};

use crate::registry::Subscription;
use crate::shared::SharedStore;

type Trigger = Rc<RefCell<dyn FnMut()>>;

/// A live subscription to one path that re-triggers its owner on change.
///
/// Unsubscribes when dropped.
pub struct Watch {
    store: SharedStore,
    path: String,
    on_change: Trigger,
    subscription: Subscription,
}

impl Watch {
    /// Watch `path`, or the root when `None`. The root matches every commit.
    pub fn new<F>(store: &SharedStore, path: Option<&str>, on_change: F) -> Result<Self, Error>
    where
        F: FnMut() + 'static,
    {
        let path = normalize(path.unwrap_or("/"));
        let on_change: Trigger = Rc::new(RefCell::new(on_change));
        let subscription = subscribe(store, &path, &on_change)?;

        Ok(Self {
            store: store.clone(),
            path,
            on_change,
            subscription,
        })
    }

    /// The normalized path being watched.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The current value at the watched path.
    pub fn value(&self) -> Result<Option<Value>, Error> {
        self.store.retrieve(&self.path)
    }

    /// Move the watch to another path. Does nothing if the path is unchanged.
    pub fn retarget(&mut self, path: Option<&str>) -> Result<(), Error> {
        let path = normalize(path.unwrap_or("/"));
        if path == self.path {
            return Ok(());
        }

        let subscription = subscribe(&self.store, &path, &self.on_change)?;
        self.subscription.unsubscribe();
        self.subscription = subscription;
        self.path = path;
        Ok(())
    }

    /// The store, for committing.
    pub fn committer(&self) -> SharedStore {
        self.store.clone()
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

fn subscribe(store: &SharedStore, path: &str, on_change: &Trigger) -> Result<Subscription, Error> {
    let trigger = Rc::clone(on_change);
    store.subscribe(path, move |_| {
        // A trigger that re-enters itself is skipped.
        if let Ok(mut trigger) = trigger.try_borrow_mut() {
            (&mut *trigger)();
        }
    })
}
