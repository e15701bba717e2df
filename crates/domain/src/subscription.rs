//! Live updates of workout queries.
//!
//! A subscriber registers a filter and a callback. It first receives a snapshot of all matching
//! workout sets and afterwards a notification for every change affecting matching sets, until it
//! unsubscribes.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{ReadError, WorkoutFilter, WorkoutSet};

pub type Callback = Arc<dyn Fn(&Change) + Send + Sync>;

#[allow(async_fn_in_trait)]
pub trait WorkoutSubscriber {
    async fn subscribe(
        &self,
        filter: WorkoutFilter,
        callback: Callback,
    ) -> Result<SubscriptionID, ReadError>;
    /// Returns `false` if no subscription with this id exists.
    fn unsubscribe(&self, id: SubscriptionID) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Snapshot(Vec<WorkoutSet>),
    Inserted(Vec<WorkoutSet>),
    Updated(WorkoutSet),
    Deleted(Vec<WorkoutSet>),
}

impl Change {
    /// The part of the change which is visible through the filter.
    #[must_use]
    pub fn restrict(&self, filter: &WorkoutFilter) -> Option<Change> {
        let matching = |workout_sets: &[WorkoutSet]| {
            workout_sets
                .iter()
                .filter(|w| filter.matches(w))
                .cloned()
                .collect::<Vec<_>>()
        };
        match self {
            Change::Snapshot(workout_sets) => Some(Change::Snapshot(matching(workout_sets))),
            Change::Inserted(workout_sets) => {
                Some(matching(workout_sets))
                    .filter(|w| !w.is_empty())
                    .map(Change::Inserted)
            }
            Change::Updated(workout_set) => {
                Some(workout_set.clone())
                    .filter(|w| filter.matches(w))
                    .map(Change::Updated)
            }
            Change::Deleted(workout_sets) => {
                Some(matching(workout_sets))
                    .filter(|w| !w.is_empty())
                    .map(Change::Deleted)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionID(u64);

/// Registry of subscriptions kept by a store.
///
/// Changes are queued per subscription in the order in which they are published. A store
/// publishes while holding the lock that serializes its mutations and delivers the returned
/// [`Pending`] notifications after releasing all locks.
#[derive(Default)]
pub struct Subscribers {
    next_id: u64,
    entries: Vec<(SubscriptionID, Arc<Subscription>)>,
}

impl Subscribers {
    /// Registers a subscription whose first notification is the given snapshot.
    pub fn add(
        &mut self,
        filter: WorkoutFilter,
        callback: Callback,
        snapshot: Vec<WorkoutSet>,
    ) -> (SubscriptionID, Pending) {
        self.next_id += 1;
        let id = SubscriptionID(self.next_id);
        let subscription = Arc::new(Subscription {
            filter,
            callback,
            queue: Mutex::new(Queue::default()),
        });
        subscription.enqueue(Change::Snapshot(snapshot));
        self.entries.push((id, Arc::clone(&subscription)));
        (id, Pending(vec![subscription]))
    }

    /// Removes a subscription. Changes queued for it are discarded.
    pub fn remove(&mut self, id: SubscriptionID) -> bool {
        let Some(position) = self.entries.iter().position(|(i, _)| *i == id) else {
            return false;
        };
        let (_, subscription) = self.entries.remove(position);
        subscription.close();
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queues the change for every subscription whose filter matches it.
    pub fn publish(&self, change: &Change) -> Pending {
        Pending(
            self.entries
                .iter()
                .filter_map(|(_, subscription)| {
                    let change = change.restrict(&subscription.filter)?;
                    subscription.enqueue(change);
                    Some(Arc::clone(subscription))
                })
                .collect(),
        )
    }
}

/// Subscriptions with queued notifications.
#[must_use]
#[derive(Default)]
pub struct Pending(Vec<Arc<Subscription>>);

impl Pending {
    /// Invokes the callbacks for all queued changes.
    ///
    /// Must be called without holding any lock of the store, as callbacks may access it. If a
    /// subscription is already being delivered by another caller, that caller also delivers the
    /// changes queued here.
    pub fn deliver(self) {
        for subscription in self.0 {
            subscription.drain();
        }
    }
}

struct Subscription {
    filter: WorkoutFilter,
    callback: Callback,
    queue: Mutex<Queue>,
}

#[derive(Default)]
struct Queue {
    changes: VecDeque<Change>,
    draining: bool,
    closed: bool,
}

impl Subscription {
    fn queue(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, change: Change) {
        let mut queue = self.queue();
        if !queue.closed {
            queue.changes.push_back(change);
        }
    }

    fn close(&self) {
        let mut queue = self.queue();
        queue.closed = true;
        queue.changes.clear();
    }

    fn drain(&self) {
        {
            let mut queue = self.queue();
            if queue.draining {
                return;
            }
            queue.draining = true;
        }
        loop {
            let change = {
                let mut queue = self.queue();
                match queue.changes.pop_front() {
                    Some(change) => change,
                    None => {
                        queue.draining = false;
                        return;
                    }
                }
            };
            (self.callback)(&change);
        }
    }
}
