use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{ledger::Answer, mongodb::Id};

/// Core topic data, as stored in the `topics` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicCore {
    pub title: String,
    /// Answers in storage order. Display order is derived, never stored.
    pub answers: Vec<Answer>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_locked: bool,
}

impl TopicCore {
    /// Create a new unpublished, unlocked topic with no answers.
    pub fn new(title: &str) -> Result<Self> {
        Ok(Self {
            title: validate_title(title)?,
            answers: Vec::new(),
            created_at: Utc::now(),
            is_published: false,
            is_locked: false,
        })
    }

    /// Check the invariants a topic read back from the store must uphold.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("Topic title is blank".to_string()));
        }
        if let Some(position) = self.answers.iter().position(|a| a.text.trim().is_empty()) {
            return Err(Error::Validation(format!(
                "Answer at position {position} is blank"
            )));
        }
        Ok(())
    }
}

/// A topic without an ID, ready for insertion.
pub type NewTopic = TopicCore;

/// A topic from the store, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub topic: TopicCore,
}

impl Deref for Topic {
    type Target = TopicCore;

    fn deref(&self) -> &Self::Target {
        &self.topic
    }
}

impl DerefMut for Topic {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.topic
    }
}

/// The fields of a topic to overwrite. Unset fields are left alone; a set
/// `answers` replaces the entire array.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<Answer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_locked: Option<bool>,
}

impl TopicPatch {
    pub fn answers(answers: Vec<Answer>) -> Self {
        Self {
            answers: Some(answers),
            ..Default::default()
        }
    }

    /// Apply this patch to an in-memory topic.
    pub fn apply_to(&self, topic: &mut TopicCore) {
        if let Some(title) = &self.title {
            topic.title = title.clone();
        }
        if let Some(answers) = &self.answers {
            topic.answers = answers.clone();
        }
        if let Some(is_published) = self.is_published {
            topic.is_published = is_published;
        }
        if let Some(is_locked) = self.is_locked {
            topic.is_locked = is_locked;
        }
    }
}

/// Trim a title, rejecting it if nothing is left.
pub fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::Validation("Title must not be blank".to_string()));
    }
    Ok(title.to_string())
}
