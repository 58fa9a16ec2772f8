//! The voting board: the services every route works through, and the fairing
//! that wires them to the configured store.

use std::sync::Arc;

use rocket::{
    fairing::{Fairing, Info, Kind},
    tokio::{self, task::JoinHandle, time},
    Build, Rocket,
};

use crate::config::Config;
use crate::model::{credentials::StaticSecret, session::Sessions};
use crate::store::{TopicMirror, TopicStore};

mod admin;
mod lifecycle;
mod voting;

pub use admin::AdminGate;
pub use lifecycle::LifecycleManager;
pub use voting::VoteCoordinator;

/// How often idle sessions are looked for.
const SWEEP_INTERVAL: time::Duration = time::Duration::from_secs(60);

/// Background task dropping sessions idle for longer than the session TTL.
/// Stops when dropped.
pub struct SessionSweeper {
    task: JoinHandle<()>,
}

impl SessionSweeper {
    pub fn spawn(sessions: Arc<Sessions>, ttl: chrono::Duration) -> Self {
        let task = tokio::spawn(async move {
            let mut ticks = time::interval(SWEEP_INTERVAL);
            loop {
                ticks.tick().await;
                let pruned = sessions.prune(ttl);
                if pruned > 0 {
                    debug!("Pruned {pruned} idle sessions, {} remain", sessions.len());
                }
            }
        });
        Self { task }
    }
}

impl Drop for SessionSweeper {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A fairing that subscribes to the topic store and places the board services
/// into managed state: `TopicMirror`, `VoteCoordinator`, `LifecycleManager`,
/// `AdminGate` and `Arc<Sessions>`, plus the handles keeping the background
/// tasks alive.
/// This fairing depends on `Config` and the `Arc<dyn TopicStore>` being
/// available in managed state, and so must be attached after the fairings
/// responsible for those.
pub struct BoardFairing;

#[rocket::async_trait]
impl Fairing for BoardFairing {
    fn info(&self) -> Info {
        Info {
            name: "Voting board",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = rocket.state::<Config>() else {
            error!("Config was not available when setting up the board");
            return Err(rocket);
        };
        let Some(store) = rocket.state::<Arc<dyn TopicStore>>().cloned() else {
            error!("Topic store was not available when setting up the board");
            return Err(rocket);
        };

        info!("Subscribing to topics...");
        let mirror = TopicMirror::new();
        let subscription = mirror.subscribe(store.clone(), config.resubscribe_interval());

        let admin_gate = AdminGate::new(Arc::new(StaticSecret::new(config.admin_secret())));
        let lifecycle = LifecycleManager::new(
            store.clone(),
            mirror.clone(),
            Arc::new(StaticSecret::new(config.reset_secret())),
        );
        let voting = VoteCoordinator::new(store, mirror.clone());
        let sessions = Arc::new(Sessions::new());
        let sweeper = SessionSweeper::spawn(sessions.clone(), config.session_ttl());

        // Manage the state.
        rocket = rocket
            .manage(mirror)
            .manage(subscription)
            .manage(voting)
            .manage(lifecycle)
            .manage(admin_gate)
            .manage(sessions)
            .manage(sweeper);
        Ok(rocket)
    }
}
