use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use rocket::futures::{stream, StreamExt};
use rocket::tokio::{self, sync::watch};

use crate::model::{
    mongodb::Id,
    topic::{NewTopic, Topic, TopicPatch},
};

use super::{Snapshot, SnapshotStream, StoreError, TopicStore};

struct Inner {
    /// Topics in insertion order.
    topics: Mutex<Vec<Topic>>,
    snapshots: watch::Sender<Snapshot>,
    /// Bumped to break every open subscription.
    breaks: watch::Sender<usize>,
    failing_writes: AtomicUsize,
    offline: AtomicBool,
}

/// An in-process store. Every write publishes a fresh snapshot to all
/// subscribers. Clones share the same collection.
#[derive(Clone)]
pub struct MemoryTopicStore {
    inner: Arc<Inner>,
}

impl MemoryTopicStore {
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(Vec::new());
        let (breaks, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                topics: Mutex::new(Vec::new()),
                snapshots,
                breaks,
                failing_writes: AtomicUsize::new(0),
                offline: AtomicBool::new(false),
            }),
        }
    }

    /// The current contents of the collection.
    pub fn snapshot(&self) -> Snapshot {
        self.topics().clone()
    }

    /// Make the next `count` writes fail.
    pub fn fail_writes(&self, count: usize) {
        self.inner.failing_writes.store(count, Ordering::SeqCst);
    }

    /// While offline, new subscriptions cannot be established.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// End every open subscription with an error, as a dropped connection
    /// would. Later subscriptions are unaffected.
    pub fn break_subscriptions(&self) {
        self.inner.breaks.send_modify(|breaks| *breaks += 1);
    }

    fn topics(&self) -> std::sync::MutexGuard<'_, Vec<Topic>> {
        self.inner.topics.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Consume one injected failure, if any are pending.
    fn check_write(&self) -> Result<(), StoreError> {
        let injected = self
            .inner
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match injected {
            Ok(_) => Err(StoreError::Unavailable("injected write failure".to_string())),
            Err(_) => Ok(()),
        }
    }

    /// Apply `change` to the collection and publish the result.
    fn write<T>(
        &self,
        change: impl FnOnce(&mut Vec<Topic>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.check_write()?;
        let mut topics = self.topics();
        let result = change(&mut topics)?;
        self.inner.snapshots.send_replace(topics.clone());
        Ok(result)
    }
}

impl Default for MemoryTopicStore {
    fn default() -> Self {
        Self::new()
    }
}

#[rocket::async_trait]
impl TopicStore for MemoryTopicStore {
    async fn subscribe(&self) -> Result<SnapshotStream, StoreError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        let receiver = self.inner.snapshots.subscribe();
        let mut breaks = self.inner.breaks.subscribe();
        breaks.borrow_and_update();
        let snapshots = stream::unfold(
            Some((receiver, breaks, true)),
            |state| async move {
                let (mut receiver, mut breaks, first) = state?;
                if !first {
                    tokio::select! {
                        biased;
                        _ = breaks.changed() => {
                            let broken = StoreError::Unavailable("subscription broken".to_string());
                            return Some((Err(broken), None));
                        }
                        changed = receiver.changed() => {
                            if changed.is_err() {
                                return None;
                            }
                        }
                    }
                }
                let snapshot = receiver.borrow_and_update().clone();
                Some((Ok(snapshot), Some((receiver, breaks, false))))
            },
        );
        Ok(snapshots.boxed())
    }

    async fn create(&self, topic: &NewTopic) -> Result<Id, StoreError> {
        self.write(|topics| {
            let id = Id::new();
            topics.push(Topic {
                id,
                topic: topic.clone(),
            });
            Ok(id)
        })
    }

    async fn replace(&self, id: Id, patch: &TopicPatch) -> Result<(), StoreError> {
        self.write(|topics| {
            let topic = topics
                .iter_mut()
                .find(|topic| topic.id == id)
                .ok_or(StoreError::Missing(id))?;
            patch.apply_to(topic);
            Ok(())
        })
    }

    async fn remove(&self, id: Id) -> Result<(), StoreError> {
        self.write(|topics| {
            let index = topics
                .iter()
                .position(|topic| topic.id == id)
                .ok_or(StoreError::Missing(id))?;
            topics.remove(index);
            Ok(())
        })
    }
}
