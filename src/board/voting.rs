use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{
    ledger,
    mongodb::Id,
    session::{Session, VoteKey},
    topic::{Topic, TopicPatch},
};
use crate::store::{TopicMirror, TopicStore};

/// Casts votes on behalf of sessions.
///
/// A vote reads the topic from the last snapshot, increments a local copy of
/// its answer list and writes the whole list back. Two votes computed from the
/// same snapshot therefore race: whichever write lands last wins, and the
/// other increment is lost.
pub struct VoteCoordinator {
    store: Arc<dyn TopicStore>,
    mirror: TopicMirror,
}

impl VoteCoordinator {
    pub fn new(store: Arc<dyn TopicStore>, mirror: TopicMirror) -> Self {
        Self { store, mirror }
    }

    /// Vote for the answer at storage `position` of topic `topic_id`.
    ///
    /// Returns the topic as this vote left it, before the store has echoed the
    /// change back in a snapshot. The session only records the vote once the
    /// store accepts the write, so a failed vote may be retried.
    pub async fn vote(&self, session: &mut Session, topic_id: Id, position: usize) -> Result<Topic> {
        let key = VoteKey::new(topic_id, position);
        let topic = self.mirror.topic(topic_id);

        // A locked topic rejects every vote, counted or not.
        if let Ok(topic) = &topic {
            if topic.is_locked {
                return Err(Error::Locked(topic_id));
            }
        }
        if session.has_voted(&key) {
            return Err(Error::DuplicateVote {
                topic: topic_id,
                position,
            });
        }

        let mut topic = topic?;
        let answers = ledger::increment_vote(&topic.answers, position)?;
        self.store
            .replace(topic_id, &TopicPatch::answers(answers.clone()))
            .await?;

        session.record_vote(key);
        debug!("Vote recorded for answer {position} of topic {topic_id}");
        topic.answers = answers;
        Ok(topic)
    }
}
