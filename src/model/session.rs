//! Per-session state: the dedupe keys of votes already cast and the admin flag.
//! Nothing here is persisted; a restart starts every session afresh.

use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Duration, Utc};
use rocket::tokio::sync::Mutex;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Identifies one vote a session may cast: an answer by its storage position.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoteKey {
    pub topic: Id,
    pub position: usize,
}

impl VoteKey {
    pub fn new(topic: Id, position: usize) -> Self {
        Self { topic, position }
    }
}

/// The state owned by one client session.
#[derive(Debug, Default)]
pub struct Session {
    voted: HashSet<VoteKey>,
    admin: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_voted(&self, key: &VoteKey) -> bool {
        self.voted.contains(key)
    }

    /// Record a vote that the store has accepted.
    pub fn record_vote(&mut self, key: VoteKey) {
        self.voted.insert(key);
    }

    pub fn votes(&self) -> impl Iterator<Item = &VoteKey> {
        self.voted.iter()
    }

    pub fn clear_votes(&mut self) {
        self.voted.clear();
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn grant_admin(&mut self) {
        self.admin = true;
    }

    pub fn revoke_admin(&mut self) {
        self.admin = false;
    }
}

/// Random identifier carried in the session cookie.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct SessionId(u64);

impl SessionId {
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s, 16).map(Self)
    }
}

/// A session shared between the requests that belong to it.
/// Holding the lock serialises that session's actions.
pub type SharedSession = Arc<Mutex<Session>>;

struct Slot {
    session: SharedSession,
    last_seen: DateTime<Utc>,
}

/// All live sessions of this process.
#[derive(Default)]
pub struct Sessions {
    slots: StdMutex<HashMap<SessionId, Slot>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a session, touching its last-seen time.
    pub fn get(&self, id: SessionId) -> Option<SharedSession> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.get_mut(&id).map(|slot| {
            slot.last_seen = Utc::now();
            slot.session.clone()
        })
    }

    /// Start a new, empty session.
    pub fn create(&self) -> (SessionId, SharedSession) {
        let id = SessionId::random();
        let session = SharedSession::default();
        let slot = Slot {
            session: session.clone(),
            last_seen: Utc::now(),
        };
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, slot);
        trace!("Created session {id}");
        (id, session)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear the dedupe keys of every session except `except`.
    ///
    /// Each session is locked in turn, so the caller must not hold any session
    /// lock while awaiting this.
    pub async fn clear_votes_except(&self, except: SessionId) {
        let others = self
            .slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(id, _)| **id != except)
            .map(|(_, slot)| slot.session.clone())
            .collect::<Vec<_>>();
        for session in others {
            session.lock().await.clear_votes();
        }
    }

    /// Forget sessions not seen for longer than `ttl`. Returns how many went.
    pub fn prune(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now() - ttl;
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let before = slots.len();
        slots.retain(|_, slot| slot.last_seen >= cutoff);
        before - slots.len()
    }
}
