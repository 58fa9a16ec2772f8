use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    ledger::Answer,
    ranking::{rank_glyph, sorted_by_votes_descending},
    session::{Session, VoteKey},
    topic::{Topic, TopicCore},
};

use super::ApiId;

/// A topic as one session sees it: answers in display order, ranked, with
/// that session's votes marked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicView {
    pub id: ApiId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub is_published: bool,
    pub is_locked: bool,
    /// Most votes first; ties in storage order.
    pub answers: Vec<RankedAnswer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedAnswer {
    /// Storage position, the target for votes.
    pub position: usize,
    /// Rank glyph for the display index.
    pub rank: String,
    pub podium: bool,
    pub text: String,
    pub votes: u32,
    /// Whether the viewing session already voted for this answer.
    pub voted: bool,
}

impl TopicView {
    pub fn new(topic: &Topic, session: &Session) -> Self {
        let answers = sorted_by_votes_descending(&topic.answers)
            .into_iter()
            .enumerate()
            .map(|(display_index, (position, answer))| {
                let glyph = rank_glyph(display_index);
                RankedAnswer {
                    position,
                    rank: glyph.to_string(),
                    podium: glyph.is_podium(),
                    text: answer.text.clone(),
                    votes: answer.votes,
                    voted: session.has_voted(&VoteKey::new(topic.id, position)),
                }
            })
            .collect();
        Self {
            id: topic.id.into(),
            title: topic.title.clone(),
            created_at: topic.created_at,
            is_published: topic.is_published,
            is_locked: topic.is_locked,
            answers,
        }
    }
}

/// A topic exactly as stored, answers in storage order. This is the format
/// of the export dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDesc {
    pub id: ApiId,
    pub title: String,
    pub answers: Vec<Answer>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_locked: bool,
}

impl TopicDesc {
    pub fn into_topic(self) -> Topic {
        Topic {
            id: self.id.into(),
            topic: TopicCore {
                title: self.title,
                answers: self.answers,
                created_at: self.created_at,
                is_published: self.is_published,
                is_locked: self.is_locked,
            },
        }
    }
}

impl From<Topic> for TopicDesc {
    fn from(topic: Topic) -> Self {
        Self {
            id: topic.id.into(),
            title: topic.topic.title,
            answers: topic.topic.answers,
            created_at: topic.topic.created_at,
            is_published: topic.topic.is_published,
            is_locked: topic.topic.is_locked,
        }
    }
}

/// Body of a topic creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRequest {
    pub title: String,
}

/// Raw answer lines, one answer per non-blank line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswersRequest {
    pub answers: String,
}

/// Body of an edit: the new title and the complete new answer lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicEditRequest {
    pub title: String,
    pub answers: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    pub id: ApiId,
}
