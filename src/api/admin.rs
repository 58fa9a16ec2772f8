use std::sync::Arc;

use rocket::{serde::json::Json, Route, State};

use crate::board::{AdminGate, LifecycleManager};
use crate::error::Result;
use crate::model::{
    api::{
        admin::SecretRequest,
        session::ClientSession,
        topic::{TopicDesc, TopicEditRequest},
    },
    mongodb::Id,
    session::Sessions,
};
use crate::store::TopicMirror;

pub fn routes() -> Vec<Route> {
    routes![
        edit_topic,
        toggle_publish,
        toggle_lock,
        delete_topic,
        export_topics,
        reset,
    ]
}

/// Replace a topic's title and answers, discarding all of its votes.
#[put("/topics/<topic_id>", data = "<request>", format = "json")]
async fn edit_topic(
    topic_id: Id,
    request: Json<TopicEditRequest>,
    gate: &State<AdminGate>,
    lifecycle: &State<LifecycleManager>,
    session: ClientSession,
) -> Result<()> {
    let session = session.lock().await;
    gate.require(&session)?;
    lifecycle
        .edit_topic(topic_id, &request.title, &request.answers)
        .await
}

#[post("/topics/<topic_id>/publish")]
async fn toggle_publish(
    topic_id: Id,
    gate: &State<AdminGate>,
    lifecycle: &State<LifecycleManager>,
    session: ClientSession,
) -> Result<Json<bool>> {
    let session = session.lock().await;
    gate.require(&session)?;
    Ok(Json(lifecycle.toggle_publish(topic_id).await?))
}

#[post("/topics/<topic_id>/lock")]
async fn toggle_lock(
    topic_id: Id,
    gate: &State<AdminGate>,
    lifecycle: &State<LifecycleManager>,
    session: ClientSession,
) -> Result<Json<bool>> {
    let session = session.lock().await;
    gate.require(&session)?;
    Ok(Json(lifecycle.toggle_lock(topic_id).await?))
}

#[delete("/topics/<topic_id>")]
async fn delete_topic(
    topic_id: Id,
    gate: &State<AdminGate>,
    lifecycle: &State<LifecycleManager>,
    session: ClientSession,
) -> Result<()> {
    let session = session.lock().await;
    gate.require(&session)?;
    lifecycle.delete_topic(topic_id).await
}

/// Every topic exactly as stored, for offline tallying.
#[get("/topics/export")]
async fn export_topics(
    gate: &State<AdminGate>,
    mirror: &State<TopicMirror>,
    session: ClientSession,
) -> Result<Json<Vec<TopicDesc>>> {
    gate.require(&*session.lock().await)?;
    let topics = mirror.topics()?;
    Ok(Json(topics.iter().cloned().map(TopicDesc::from).collect()))
}

/// Delete every topic and forget every session's votes. Guarded by the reset
/// secret rather than admin rights.
#[post("/reset", data = "<request>", format = "json")]
async fn reset(
    request: Json<SecretRequest>,
    lifecycle: &State<LifecycleManager>,
    sessions: &State<Arc<Sessions>>,
    session: ClientSession,
) -> Result<Json<usize>> {
    let deleted = {
        let mut locked = session.lock().await;
        lifecycle.reset_all(&mut locked, &request.secret).await?
    };
    // Other sessions are locked one by one, never while this one is held.
    sessions.clear_votes_except(session.id()).await;
    Ok(Json(deleted))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rocket::{
        http::{ContentType, Cookie, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::{serde_json::json, Value},
        tokio::{self, time::timeout},
    };

    use crate::api::testing::{seed, settle};
    use crate::model::{
        api::{session::SESSION_COOKIE, topic::TopicView, vote::CastVote},
        ledger::Answer,
        topic::{NewTopic, TopicPatch},
    };
    use crate::store::{MemoryTopicStore, SnapshotStream, StoreError, TopicStore};

    use super::*;

    #[backend_test]
    async fn gated_routes_require_admin(client: Client, store: MemoryTopicStore) {
        let id = seed(&client, &store, "Lunch", &["Pizza"]).await;

        let edit = client
            .put(uri!(edit_topic(id)))
            .header(ContentType::JSON)
            .body(json!({"title": "Dinner", "answers": "Pasta"}).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, edit.status());
        for response in [
            client.post(uri!(toggle_publish(id))).dispatch().await,
            client.post(uri!(toggle_lock(id))).dispatch().await,
            client.delete(uri!(delete_topic(id))).dispatch().await,
            client.get(uri!(export_topics)).dispatch().await,
        ] {
            assert_eq!(Status::Unauthorized, response.status());
        }

        let topic = &store.snapshot()[0];
        assert_eq!(topic.title, "Lunch");
        assert!(!topic.is_published);
        assert!(!topic.is_locked);
    }

    #[backend_test(admin)]
    async fn edit_resets_votes(client: Client, store: MemoryTopicStore) {
        let id = seed(&client, &store, "Lunch", &["Pizza", "Sushi"]).await;
        client.post(format!("/topics/{id}/answers/1/vote")).dispatch().await;
        settle(&client, &store).await;

        let response = client
            .put(uri!(edit_topic(id)))
            .header(ContentType::JSON)
            .body(json!({"title": "Dinner", "answers": "Pasta\n\nPizza\n"}).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let topic = &store.snapshot()[0];
        assert_eq!(topic.title, "Dinner");
        assert_eq!(topic.answers, vec![Answer::new("Pasta"), Answer::new("Pizza")]);

        let response = client
            .put(uri!(edit_topic(id)))
            .header(ContentType::JSON)
            .body(json!({"title": " ", "answers": "Pasta"}).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(admin)]
    async fn publish_and_lock_toggle(client: Client, store: MemoryTopicStore) {
        let id = seed(&client, &store, "Lunch", &["Pizza"]).await;

        let published: bool = client
            .post(uri!(toggle_publish(id)))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert!(published);
        settle(&client, &store).await;

        let locked: bool = client
            .post(uri!(toggle_lock(id)))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert!(locked);
        settle(&client, &store).await;

        let topic: TopicView = client
            .get(format!("/topics/{id}"))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert!(topic.is_published);
        assert!(topic.is_locked);

        let unpublished: bool = client
            .post(uri!(toggle_publish(id)))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert!(!unpublished);

        let response = client.post(uri!(toggle_lock(Id::new()))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn delete_then_delete_again(client: Client, store: MemoryTopicStore) {
        let id = seed(&client, &store, "Lunch", &[]).await;

        let response = client.delete(uri!(delete_topic(id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert!(store.snapshot().is_empty());

        let response = client.delete(uri!(delete_topic(id))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn export_in_storage_order(client: Client, store: MemoryTopicStore) {
        let id = seed(&client, &store, "Lunch", &["Pizza", "Sushi"]).await;
        client.post(format!("/topics/{id}/answers/1/vote")).dispatch().await;
        settle(&client, &store).await;

        let dump: Vec<TopicDesc> = client
            .get(uri!(export_topics))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(dump.len(), 1);
        let topic = dump.into_iter().next().unwrap().into_topic();
        assert_eq!(topic, store.snapshot()[0]);
        assert_eq!(topic.answers[0].text, "Pizza");
        assert_eq!(topic.answers[1].votes, 1);
    }

    #[backend_test]
    async fn reset_with_wrong_secret(client: Client, store: MemoryTopicStore) {
        seed(&client, &store, "Lunch", &[]).await;

        let response = client
            .post(uri!(reset))
            .header(ContentType::JSON)
            .body(json!(SecretRequest::wrong()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(store.snapshot().len(), 1);
    }

    #[backend_test]
    async fn reset_clears_topics_and_votes(client: Client, store: MemoryTopicStore) {
        let id = seed(&client, &store, "Lunch", &["Pizza"]).await;
        seed(&client, &store, "Dinner", &[]).await;
        client.post(format!("/topics/{id}/answers/0/vote")).dispatch().await;
        settle(&client, &store).await;

        let deleted: usize = client
            .post(uri!(reset))
            .header(ContentType::JSON)
            .body(json!(SecretRequest::example()).to_string())
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert!(store.snapshot().is_empty());

        let votes: Vec<Value> = client
            .get("/votes")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert!(votes.is_empty());
    }

    /// A store whose deletions take a while to complete.
    struct SlowDeletes(MemoryTopicStore);

    #[rocket::async_trait]
    impl TopicStore for SlowDeletes {
        async fn subscribe(&self) -> std::result::Result<SnapshotStream, StoreError> {
            self.0.subscribe().await
        }

        async fn create(&self, topic: &NewTopic) -> std::result::Result<Id, StoreError> {
            self.0.create(topic).await
        }

        async fn replace(&self, id: Id, patch: &TopicPatch) -> std::result::Result<(), StoreError> {
            self.0.replace(id, patch).await
        }

        async fn remove(&self, id: Id) -> std::result::Result<(), StoreError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.0.remove(id).await
        }
    }

    /// A client that does not keep cookies, so each test can act as several
    /// sessions of the same server.
    async fn untracked_client(store: &MemoryTopicStore, backend: Arc<dyn TopicStore>) -> Client {
        log4rs_test_utils::test_logging::init_logging_once_for(["livevote"], None, None);
        let client = Client::untracked(crate::rocket_for_store(backend))
            .await
            .unwrap();
        settle(&client, store).await;
        client
    }

    /// Start a fresh session and return its cookie.
    async fn new_session(client: &Client) -> Cookie<'static> {
        let response = client.get("/votes").dispatch().await;
        response
            .cookies()
            .get(SESSION_COOKIE)
            .cloned()
            .unwrap()
            .into_owned()
    }

    async fn reset_as<'c>(client: &'c Client, session: &Cookie<'static>) -> LocalResponse<'c> {
        client
            .post(uri!(reset))
            .cookie(session.clone())
            .header(ContentType::JSON)
            .body(json!(SecretRequest::example()).to_string())
            .dispatch()
            .await
    }

    async fn vote_as(client: &Client, session: &Cookie<'static>, id: Id) -> Status {
        client
            .post(format!("/topics/{id}/answers/0/vote"))
            .cookie(session.clone())
            .dispatch()
            .await
            .status()
    }

    async fn votes_of(client: &Client, session: &Cookie<'static>) -> Vec<CastVote> {
        client
            .get("/votes")
            .cookie(session.clone())
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap()
    }

    #[rocket::async_test]
    async fn reset_clears_every_sessions_votes() {
        let store = MemoryTopicStore::new();
        let client = untracked_client(&store, Arc::new(store.clone())).await;
        let id = seed(&client, &store, "Lunch", &["Pizza"]).await;

        let alice = new_session(&client).await;
        let bob = new_session(&client).await;
        assert_eq!(Status::Ok, vote_as(&client, &alice, id).await);
        assert_eq!(Status::Ok, vote_as(&client, &bob, id).await);
        settle(&client, &store).await;
        assert_eq!(votes_of(&client, &bob).await.len(), 1);

        assert_eq!(Status::Ok, reset_as(&client, &alice).await.status());
        assert!(store.snapshot().is_empty());
        assert!(votes_of(&client, &alice).await.is_empty());
        assert!(votes_of(&client, &bob).await.is_empty());

        let id = seed(&client, &store, "Lunch", &["Pizza"]).await;
        assert_eq!(Status::Ok, vote_as(&client, &bob, id).await);
        assert_eq!(votes_of(&client, &bob).await, vec![CastVote { topic: id.into(), position: 0 }]);
    }

    #[rocket::async_test]
    async fn concurrent_resets_from_two_sessions() {
        let store = MemoryTopicStore::new();
        let client = untracked_client(&store, Arc::new(SlowDeletes(store.clone()))).await;
        seed(&client, &store, "Lunch", &["Pizza"]).await;
        seed(&client, &store, "Dinner", &["Pasta"]).await;

        let alice = new_session(&client).await;
        let bob = new_session(&client).await;
        let (first, second) = timeout(Duration::from_secs(3), async {
            tokio::join!(reset_as(&client, &alice), reset_as(&client, &bob))
        })
        .await
        .expect("concurrent resets did not complete");

        assert_eq!(Status::Ok, first.status());
        assert_eq!(Status::Ok, second.status());
        assert!(store.snapshot().is_empty());
    }
}
