use mongodb::{
    bson::{self, doc, Document},
    options::FindOptions,
    Collection, Database,
};
use rocket::futures::{future, stream, StreamExt, TryStreamExt};

use crate::model::{
    mongodb::{Coll, Id},
    topic::{NewTopic, Topic, TopicPatch},
};

use super::{Snapshot, SnapshotStream, StoreError, TopicStore};

/// The `topics` collection in MongoDB. Live snapshots come from a change
/// stream, so the deployment must be a replica set.
#[derive(Clone)]
pub struct MongoTopicStore {
    topics: Coll<Topic>,
    new_topics: Coll<NewTopic>,
}

impl MongoTopicStore {
    pub fn new(db: &Database) -> Self {
        Self {
            topics: Coll::from_db(db),
            new_topics: Coll::from_db(db),
        }
    }

    /// The collection without a schema, so that malformed documents can be
    /// skipped individually instead of failing the whole read.
    fn raw(&self) -> Collection<Document> {
        self.topics.clone_with_type()
    }
}

/// Read the whole collection, oldest topic first.
async fn load_snapshot(raw: &Collection<Document>) -> Result<Snapshot, StoreError> {
    let options = FindOptions::builder().sort(doc! {"createdAt": 1}).build();
    let documents: Vec<Document> = raw.find(None, options).await?.try_collect().await?;
    let snapshot = documents
        .into_iter()
        .filter_map(|document| {
            let id = document.get_object_id("_id").ok();
            match bson::from_document::<Topic>(document) {
                Ok(topic) => Some(topic),
                Err(e) => {
                    warn!("Skipping malformed topic document {id:?}: {e}");
                    None
                }
            }
        })
        .collect();
    Ok(snapshot)
}

#[rocket::async_trait]
impl TopicStore for MongoTopicStore {
    async fn subscribe(&self) -> Result<SnapshotStream, StoreError> {
        let raw = self.raw();
        // Open the change stream before the first read so no change can fall
        // between the two.
        let changes = raw.watch(Vec::new(), None).await?;
        let initial = load_snapshot(&raw).await?;
        debug!("Loaded initial snapshot of {} topics", initial.len());

        let updates = changes.then(move |event| {
            let raw = raw.clone();
            async move {
                let event = event?;
                trace!("Topic change: {:?}", event.operation_type);
                load_snapshot(&raw).await
            }
        });
        Ok(stream::once(future::ready(Ok(initial)))
            .chain(updates)
            .boxed())
    }

    async fn create(&self, topic: &NewTopic) -> Result<Id, StoreError> {
        let inserted = self.new_topics.insert_one(topic, None).await?;
        inserted
            .inserted_id
            .as_object_id()
            .map(Id::from)
            .ok_or_else(|| StoreError::Unavailable("store returned a non-ObjectId ID".to_string()))
    }

    async fn replace(&self, id: Id, patch: &TopicPatch) -> Result<(), StoreError> {
        let fields = bson::to_document(patch)?;
        if fields.is_empty() {
            return Ok(());
        }
        let update = doc! {
            "$set": fields,
        };
        let result = self.topics.update_one(id.as_doc(), update, None).await?;
        if result.matched_count == 0 {
            return Err(StoreError::Missing(id));
        }
        Ok(())
    }

    async fn remove(&self, id: Id) -> Result<(), StoreError> {
        let result = self.topics.delete_one(id.as_doc(), None).await?;
        if result.deleted_count == 0 {
            return Err(StoreError::Missing(id));
        }
        Ok(())
    }
}
