use std::sync::Arc;

use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::mongodb::ensure_indexes_exist;
use crate::store::{MemoryTopicStore, MongoTopicStore, TopicStore};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    #[serde(default = "default_session_ttl")]
    session_ttl: u32,
    #[serde(default = "default_resubscribe_interval")]
    resubscribe_interval: u32,
    // secrets
    #[serde(default = "default_secret")]
    admin_secret: String,
    #[serde(default = "default_secret")]
    reset_secret: String,
}

fn default_session_ttl() -> u32 {
    24 * 60 * 60
}

fn default_resubscribe_interval() -> u32 {
    5
}

fn default_secret() -> String {
    "admin123".to_string()
}

impl Config {
    /// How long an idle session is kept, in seconds.
    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(self.session_ttl.into())
    }

    /// Seconds between attempts to re-establish the topic subscription.
    pub fn resubscribe_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.resubscribe_interval.into())
    }

    /// Secret that grants a session admin rights.
    pub fn admin_secret(&self) -> &str {
        &self.admin_secret
    }

    /// Secret that authorises deleting every topic.
    pub fn reset_secret(&self) -> &str {
        &self.reset_secret
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        if config.admin_secret == default_secret() || config.reset_secret == default_secret() {
            warn!("Using the default admin or reset secret");
        }

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the topic store.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: Option<String>,
    // non-secrets
    #[serde(default = "default_db_name")]
    db_name: String,
}

fn default_db_name() -> String {
    "livevote".to_string()
}

/// A fairing that loads the store config, connects to the database if one is
/// configured, performs any setup necessary, and places the store into
/// managed state as an `Arc<dyn TopicStore>`.
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Topic store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let Some(db_uri) = config.db_uri else {
            warn!("No `db_uri` configured, topics will be kept in memory only");
            let store: Arc<dyn TopicStore> = Arc::new(MemoryTopicStore::new());
            return Ok(rocket.manage(store));
        };

        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&config.db_name);

        // Ensure the required indexes exist.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to connect to database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        let store: Arc<dyn TopicStore> = Arc::new(MongoTopicStore::new(&db));
        rocket = rocket.manage(client).manage(db).manage(store);
        Ok(rocket)
    }
}
