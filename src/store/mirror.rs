use std::sync::Arc;
use std::time::Duration;

use rocket::futures::StreamExt;
use rocket::tokio::{self, sync::watch, task::JoinHandle};

use crate::error::{Error, Result};
use crate::model::{mongodb::Id, topic::Topic};

use super::{Snapshot, TopicStore};

/// What the mirror currently knows about the collection.
#[derive(Debug, Clone)]
pub enum MirrorState {
    /// No snapshot has arrived yet.
    Loading,
    /// The last snapshot received.
    Ready(Arc<Snapshot>),
    /// The subscription could not be established.
    Failed(String),
}

/// The materialised last snapshot of the `topics` collection.
///
/// Readers never wait on writers: a write in flight and an incoming snapshot
/// proceed independently, and reads see whichever snapshot arrived last.
/// Clones share the same state.
#[derive(Clone)]
pub struct TopicMirror {
    state: Arc<watch::Sender<MirrorState>>,
}

impl TopicMirror {
    pub fn new() -> Self {
        let (state, _) = watch::channel(MirrorState::Loading);
        Self {
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> MirrorState {
        self.state.borrow().clone()
    }

    /// Replace the mirrored collection with `snapshot`. Topics that break the
    /// topic invariants are dropped here so nothing downstream sees them.
    pub fn apply(&self, snapshot: Snapshot) {
        let total = snapshot.len();
        let topics = snapshot
            .into_iter()
            .filter(|topic| match topic.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Rejecting topic {} from snapshot: {e}", topic.id);
                    false
                }
            })
            .collect::<Vec<_>>();
        trace!("Applying snapshot: {} of {total} topics valid", topics.len());
        self.state.send_replace(MirrorState::Ready(Arc::new(topics)));
    }

    /// Record that no subscription could be established.
    pub fn fail(&self, reason: impl Into<String>) {
        self.state.send_replace(MirrorState::Failed(reason.into()));
    }

    /// All topics in the last snapshot.
    pub fn topics(&self) -> Result<Arc<Snapshot>> {
        match self.state() {
            MirrorState::Ready(topics) => Ok(topics),
            MirrorState::Loading => Err(Error::Loading),
            MirrorState::Failed(reason) => Err(Error::Unavailable(reason)),
        }
    }

    /// A single topic from the last snapshot.
    pub fn topic(&self, id: Id) -> Result<Topic> {
        self.topics()?
            .iter()
            .find(|topic| topic.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Topic {id}")))
    }

    /// Wait until the state satisfies `predicate`.
    pub async fn wait_until(&self, predicate: impl FnMut(&MirrorState) -> bool) {
        let mut receiver = self.state.subscribe();
        // The sender lives as long as `self`, so this only returns once
        // satisfied.
        let _ = receiver.wait_for(predicate).await;
    }

    /// Follow `store` in the background until the returned handle is dropped.
    pub fn subscribe(&self, store: Arc<dyn TopicStore>, retry: Duration) -> Subscription {
        let task = tokio::spawn(follow(self.clone(), store, retry));
        Subscription { task }
    }
}

impl Default for TopicMirror {
    fn default() -> Self {
        Self::new()
    }
}

/// Feed every snapshot from `store` into `mirror`, resubscribing after
/// `retry` whenever the subscription cannot be opened or breaks.
async fn follow(mirror: TopicMirror, store: Arc<dyn TopicStore>, retry: Duration) {
    loop {
        match store.subscribe().await {
            Ok(mut snapshots) => {
                info!("Subscribed to topic snapshots");
                while let Some(next) = snapshots.next().await {
                    match next {
                        Ok(snapshot) => mirror.apply(snapshot),
                        Err(e) => {
                            error!("Topic subscription broke: {e}");
                            break;
                        }
                    }
                }
                warn!("Topic subscription ended, resubscribing in {retry:?}");
            }
            Err(e) => {
                error!("Could not subscribe to topics, retrying in {retry:?}: {e}");
                mirror.fail(e.to_string());
            }
        }
        tokio::time::sleep(retry).await;
    }
}

/// A live subscription. Dropping it tears the subscription down.
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use rocket::tokio::time::timeout;

    use crate::model::topic::TopicCore;
    use crate::store::MemoryTopicStore;

    use super::*;

    const RETRY: Duration = Duration::from_millis(20);
    const PATIENCE: Duration = Duration::from_secs(5);

    fn has_topics(count: usize) -> impl FnMut(&MirrorState) -> bool {
        move |state| matches!(state, MirrorState::Ready(topics) if topics.len() == count)
    }

    #[test]
    fn loading_until_first_snapshot() {
        let mirror = TopicMirror::new();
        assert!(matches!(mirror.topics(), Err(Error::Loading)));
        mirror.apply(Vec::new());
        assert!(mirror.topics().unwrap().is_empty());
        mirror.fail("offline");
        assert!(matches!(mirror.topics(), Err(Error::Unavailable(_))));
    }

    #[test]
    fn lookup_by_id() {
        let mirror = TopicMirror::new();
        let topic = Topic::example("Lunch", &[("Pizza", 1)]);
        mirror.apply(vec![topic.clone()]);
        assert_eq!(mirror.topic(topic.id).unwrap(), topic);
        assert!(matches!(mirror.topic(Id::new()), Err(Error::NotFound(_))));
    }

    #[test]
    fn malformed_topics_are_dropped() {
        let mirror = TopicMirror::new();
        let good = Topic::example("Lunch", &[("Pizza", 1)]);
        let mut blank_title = Topic::example("x", &[]);
        blank_title.title = "   ".to_string();
        let blank_answer = Topic::example("Dinner", &[("", 0)]);
        mirror.apply(vec![blank_title, good.clone(), blank_answer]);
        assert_eq!(*mirror.topics().unwrap(), vec![good]);
    }

    #[rocket::async_test]
    async fn follows_store() {
        let store = MemoryTopicStore::new();
        let mirror = TopicMirror::new();
        let _subscription = mirror.subscribe(Arc::new(store.clone()), RETRY);
        timeout(PATIENCE, mirror.wait_until(has_topics(0)))
            .await
            .unwrap();

        store
            .create(&TopicCore::new("Lunch").unwrap())
            .await
            .unwrap();
        timeout(PATIENCE, mirror.wait_until(has_topics(1)))
            .await
            .unwrap();
        assert_eq!(*mirror.topics().unwrap(), store.snapshot());
    }

    #[rocket::async_test]
    async fn failed_subscription_recovers() {
        let store = MemoryTopicStore::new();
        store.set_offline(true);
        let mirror = TopicMirror::new();
        let _subscription = mirror.subscribe(Arc::new(store.clone()), RETRY);
        timeout(
            PATIENCE,
            mirror.wait_until(|state| matches!(state, MirrorState::Failed(_))),
        )
        .await
        .unwrap();
        assert!(matches!(mirror.topics(), Err(Error::Unavailable(_))));

        store.set_offline(false);
        timeout(PATIENCE, mirror.wait_until(has_topics(0)))
            .await
            .unwrap();
    }

    #[rocket::async_test]
    async fn dropping_the_subscription_stops_updates() {
        let store = MemoryTopicStore::new();
        let mirror = TopicMirror::new();
        let subscription = mirror.subscribe(Arc::new(store.clone()), RETRY);
        timeout(PATIENCE, mirror.wait_until(has_topics(0)))
            .await
            .unwrap();

        drop(subscription);
        // Let the aborted task wind down.
        tokio::task::yield_now().await;
        store
            .create(&TopicCore::new("Lunch").unwrap())
            .await
            .unwrap();
        tokio::time::sleep(RETRY * 5).await;
        assert!(mirror.topics().unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn broken_subscription_keeps_last_snapshot() {
        let store = MemoryTopicStore::new();
        store
            .create(&TopicCore::new("Lunch").unwrap())
            .await
            .unwrap();
        let mirror = TopicMirror::new();
        let retry = Duration::from_millis(300);
        let _subscription = mirror.subscribe(Arc::new(store.clone()), retry);
        timeout(PATIENCE, mirror.wait_until(has_topics(1)))
            .await
            .unwrap();

        store.break_subscriptions();
        tokio::time::sleep(retry / 6).await;
        store
            .create(&TopicCore::new("Dinner").unwrap())
            .await
            .unwrap();

        // Until the resubscription the last snapshot is still served.
        assert!(matches!(mirror.state(), MirrorState::Ready(_)));
        assert_eq!(mirror.topics().unwrap().len(), 1);
        timeout(PATIENCE, mirror.wait_until(has_topics(2)))
            .await
            .unwrap();
        assert_eq!(*mirror.topics().unwrap(), store.snapshot());
    }
}
