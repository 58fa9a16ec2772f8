use std::sync::Arc;

use rocket::futures::future::join_all;

use crate::error::{Error, Result};
use crate::model::{
    credentials::CredentialCheck,
    ledger::{self, Answer},
    mongodb::Id,
    session::Session,
    topic::{validate_title, NewTopic, TopicPatch},
};
use crate::store::{StoreError, TopicMirror, TopicStore};

/// Topic creation, editing, publication, locking and deletion. Every change is
/// a whole-field write against the store.
///
/// Admin checks for the gated operations are the caller's job.
pub struct LifecycleManager {
    store: Arc<dyn TopicStore>,
    mirror: TopicMirror,
    reset_credential: Arc<dyn CredentialCheck>,
}

impl LifecycleManager {
    pub fn new(
        store: Arc<dyn TopicStore>,
        mirror: TopicMirror,
        reset_credential: Arc<dyn CredentialCheck>,
    ) -> Self {
        Self {
            store,
            mirror,
            reset_credential,
        }
    }

    pub async fn create_topic(&self, title: &str) -> Result<Id> {
        let topic = NewTopic::new(title)?;
        let id = self.store.create(&topic).await?;
        info!("Created topic {id} \"{}\"", topic.title);
        Ok(id)
    }

    /// Append answers to a topic as last seen in the snapshot.
    pub async fn add_answers(&self, id: Id, raw_lines: &str) -> Result<Vec<Answer>> {
        let topic = self.mirror.topic(id)?;
        let answers = ledger::add_answers(&topic.answers, raw_lines)?;
        self.store
            .replace(id, &TopicPatch::answers(answers.clone()))
            .await?;
        debug!(
            "Added {} answers to topic {id}",
            answers.len() - topic.answers.len()
        );
        Ok(answers)
    }

    /// Replace a topic's title and answers. All vote counts start again from
    /// zero.
    pub async fn edit_topic(&self, id: Id, title: &str, raw_answer_lines: &str) -> Result<()> {
        let patch = TopicPatch {
            title: Some(validate_title(title)?),
            answers: Some(ledger::replace_answers(raw_answer_lines)),
            ..Default::default()
        };
        self.store.replace(id, &patch).await?;
        info!("Edited topic {id}, votes reset");
        Ok(())
    }

    /// Flip publication. Returns the new value.
    pub async fn toggle_publish(&self, id: Id) -> Result<bool> {
        let is_published = !self.mirror.topic(id)?.is_published;
        let patch = TopicPatch {
            is_published: Some(is_published),
            ..Default::default()
        };
        self.store.replace(id, &patch).await?;
        info!("Topic {id} published: {is_published}");
        Ok(is_published)
    }

    /// Flip the voting lock. Returns the new value.
    pub async fn toggle_lock(&self, id: Id) -> Result<bool> {
        let is_locked = !self.mirror.topic(id)?.is_locked;
        let patch = TopicPatch {
            is_locked: Some(is_locked),
            ..Default::default()
        };
        self.store.replace(id, &patch).await?;
        info!("Topic {id} locked: {is_locked}");
        Ok(is_locked)
    }

    pub async fn delete_topic(&self, id: Id) -> Result<()> {
        self.store.remove(id).await?;
        info!("Deleted topic {id}");
        Ok(())
    }

    /// Delete every topic in the snapshot and clear `session`'s votes.
    ///
    /// Deletions run concurrently and independently; if any of them fail the
    /// rest still go ahead, the votes are kept and a partial failure is
    /// reported. Returns how many topics were deleted.
    pub async fn reset_all(&self, session: &mut Session, supplied: &str) -> Result<usize> {
        if !self.reset_credential.authenticate(supplied) {
            return Err(Error::Auth("Incorrect reset password".to_string()));
        }

        let topics = self.mirror.topics()?;
        let attempted = topics.len();
        let results = join_all(topics.iter().map(|topic| self.store.remove(topic.id))).await;
        let failed = results
            .into_iter()
            .zip(topics.iter())
            .filter(|(result, topic)| match result {
                // Already gone counts as deleted.
                Ok(()) | Err(StoreError::Missing(_)) => false,
                Err(e) => {
                    error!("Reset failed to delete topic {}: {e}", topic.id);
                    true
                }
            })
            .count();
        if failed > 0 {
            return Err(StoreError::Partial { failed, attempted }.into());
        }

        session.clear_votes();
        warn!("Reset deleted all {attempted} topics");
        Ok(attempted)
    }
}
