use serde::{Deserialize, Serialize};

use crate::model::session::VoteKey;

use super::ApiId;

/// A vote the calling session has already cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CastVote {
    pub topic: ApiId,
    /// Storage position of the answer.
    pub position: usize,
}

impl From<&VoteKey> for CastVote {
    fn from(key: &VoteKey) -> Self {
        Self {
            topic: key.topic.into(),
            position: key.position,
        }
    }
}
