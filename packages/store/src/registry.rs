//! Observer registry: pattern-keyed subscriptions with stable ids.

use std::cell::{Cell, RefCell};
use std::collections::{btree_map, BTreeMap};
use std::fmt;
use std::rc::{Rc, Weak};

use regex::Regex;

use pathstate_core_store::{normalize, Error, Value};

/// Callback invoked with the entire tree after a matching commit.
pub type Observer = Box<dyn FnMut(&Value) + 'static>;

struct Slot {
    active: Rc<Cell<bool>>,
    observer: Observer,
}

type Slots = Rc<RefCell<BTreeMap<u64, Slot>>>;

struct PatternEntry {
    regex: Regex,
    slots: Slots,
}

/// Handle to a single subscription.
///
/// The handle links back to its registry slot, so it can be unsubscribed
/// without access to the store. Unsubscribing removes the slot and drops the
/// observer immediately; from inside a dispatch on the same pattern, the slot
/// is only marked inactive and is removed once that dispatch finishes.
#[derive(Clone, Debug)]
pub struct Subscription {
    pattern: String,
    id: u64,
    active: Rc<Cell<bool>>,
    slots: Weak<RefCell<BTreeMap<u64, Slot>>>,
}

impl Subscription {
    /// Stop this subscription. Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        if self.active.replace(false) {
            log::debug!("unsubscribed #{} from '{}'", self.id, self.pattern);
        }
        let removed = self.slots.upgrade().and_then(|slots| {
            let mut borrowed = slots.try_borrow_mut().ok()?;
            borrowed.remove(&self.id)
        });
        // The observer may own handles of its own; drop it with no borrow held.
        drop(removed);
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// The normalized pattern this subscription listens on.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Mapping from pattern to the observers subscribed on it.
///
/// Patterns are compiled once, when first subscribed, and forgotten once
/// their last observer is gone. Within a pattern, observers are dispatched in
/// ascending subscription id order; patterns are visited in ascending string
/// order.
#[derive(Default)]
pub struct Registry {
    patterns: BTreeMap<String, PatternEntry>,
    next_id: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `observer` under the normalized form of `path`.
    pub fn subscribe(&mut self, path: &str, observer: Observer) -> Result<Subscription, Error> {
        let pattern = normalize(path);
        self.patterns
            .retain(|retained, entry| *retained == pattern || !entry.slots.borrow().is_empty());

        let entry = match self.patterns.entry(pattern.clone()) {
            btree_map::Entry::Occupied(occupied) => occupied.into_mut(),
            btree_map::Entry::Vacant(vacant) => {
                let regex = Regex::new(&pattern).map_err(|source| Error::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
                vacant.insert(PatternEntry {
                    regex,
                    slots: Slots::default(),
                })
            }
        };

        let id = self.next_id;
        self.next_id += 1;

        let active = Rc::new(Cell::new(true));
        entry.slots.borrow_mut().insert(
            id,
            Slot {
                active: Rc::clone(&active),
                observer,
            },
        );

        log::debug!("subscribed #{} on '{}'", id, pattern);
        Ok(Subscription {
            pattern,
            id,
            active,
            slots: Rc::downgrade(&entry.slots),
        })
    }

    /// Drop every observer of one pattern, or of all patterns when `path` is
    /// `None`. Outstanding handles become inactive.
    ///
    /// `Some(path)` is normalized like any other pattern, so `Some("")` and
    /// `Some("/")` clear only the observers subscribed on the root pattern.
    /// Only `None` clears everything.
    pub fn unsubscribe_all(&mut self, path: Option<&str>) {
        match path {
            Some(path) => {
                let pattern = normalize(path);
                if let Some(entry) = self.patterns.remove(&pattern) {
                    let cleared = std::mem::take(&mut *entry.slots.borrow_mut());
                    deactivate(cleared.values());
                }
                log::debug!("cleared observers on '{}'", pattern);
            }
            None => {
                let patterns = std::mem::take(&mut self.patterns);
                for entry in patterns.values() {
                    deactivate(entry.slots.borrow().values());
                }
                log::debug!("cleared all observers");
            }
        }
    }

    /// Notify every live observer whose pattern matches `committed`.
    ///
    /// `committed` must already be normalized. Observer panics propagate.
    pub fn dispatch(&mut self, committed: &str, tree: &Value) {
        for (pattern, entry) in self.patterns.iter() {
            if !entry.regex.is_match(committed) {
                continue;
            }
            let dead = {
                let mut slots = entry.slots.borrow_mut();
                log::trace!(
                    "'{}' matched '{}', notifying {} observer(s)",
                    committed,
                    pattern,
                    slots.len()
                );
                for slot in slots.values_mut() {
                    // An earlier observer may have unsubscribed this one.
                    if slot.active.get() {
                        (slot.observer)(tree);
                    }
                }
                take_inactive(&mut slots)
            };
            drop(dead);
        }
    }

    /// Number of live observers across all patterns.
    pub fn len(&self) -> usize {
        self.patterns
            .values()
            .map(|entry| {
                entry
                    .slots
                    .borrow()
                    .values()
                    .filter(|slot| slot.active.get())
                    .count()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn deactivate<'a>(slots: impl Iterator<Item = &'a Slot>) {
    for slot in slots {
        slot.active.set(false);
    }
}

fn take_inactive(slots: &mut BTreeMap<u64, Slot>) -> Vec<Slot> {
    let ids: Vec<u64> = slots
        .iter()
        .filter(|(_, slot)| !slot.active.get())
        .map(|(id, _)| *id)
        .collect();
    ids.iter().filter_map(|id| slots.remove(id)).collect()
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.patterns.iter().map(|(pattern, entry)| {
                (pattern, entry.slots.borrow().keys().copied().collect::<Vec<_>>())
            }))
            .finish()
    }
}
