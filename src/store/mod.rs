//! The topic store client: the remote `topics` collection seen through a
//! live subscription, plus the whole-field writes issued against it.

use rocket::futures::stream::BoxStream;
use thiserror::Error;

use crate::model::{
    mongodb::Id,
    topic::{NewTopic, Topic, TopicPatch},
};

mod memory;
mod mirror;
mod mongo;

pub use memory::MemoryTopicStore;
pub use mirror::{MirrorState, Subscription, TopicMirror};
pub use mongo::MongoTopicStore;

/// A full point-in-time copy of the collection.
pub type Snapshot = Vec<Topic>;

/// Snapshots in arrival order. Dropping the stream ends the subscription.
pub type SnapshotStream = BoxStream<'static, Result<Snapshot, StoreError>>;

/// Failures reported by a store. None of them are retried here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] mongodb::error::Error),
    #[error(transparent)]
    Bson(#[from] mongodb::bson::ser::Error),
    #[error("No topic with ID {0}")]
    Missing(Id),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("{failed} of {attempted} deletions failed")]
    Partial { failed: usize, attempted: usize },
}

/// A remote document store holding the `topics` collection.
#[rocket::async_trait]
pub trait TopicStore: Send + Sync {
    /// Start a live subscription. The first snapshot is the current state of
    /// the collection; every later one follows a change anywhere in it.
    async fn subscribe(&self) -> Result<SnapshotStream, StoreError>;

    /// Insert a new topic, returning the ID the store assigned.
    async fn create(&self, topic: &NewTopic) -> Result<Id, StoreError>;

    /// Overwrite the fields set in `patch`. There is no merging below field
    /// level: a set `answers` replaces the whole array.
    async fn replace(&self, id: Id, patch: &TopicPatch) -> Result<(), StoreError>;

    async fn remove(&self, id: Id) -> Result<(), StoreError>;
}
