use rocket::{serde::json::Json, Route, State};

use crate::board::LifecycleManager;
use crate::error::Result;
use crate::model::{
    api::{
        session::ClientSession,
        topic::{AnswersRequest, Created, TopicRequest, TopicView},
    },
    ledger::Answer,
    mongodb::Id,
    ranking::{filter_by_publication, PublicationFilter},
};
use crate::store::TopicMirror;

pub fn routes() -> Vec<Route> {
    routes![list_topics, get_topic, create_topic, add_answers]
}

#[get("/topics?<filter>")]
async fn list_topics(
    filter: Option<PublicationFilter>,
    mirror: &State<TopicMirror>,
    session: ClientSession,
) -> Result<Json<Vec<TopicView>>> {
    let topics = mirror.topics()?;
    let session = session.lock().await;
    let views = filter_by_publication(&topics, filter.unwrap_or_default())
        .into_iter()
        .map(|topic| TopicView::new(topic, &session))
        .collect();
    Ok(Json(views))
}

#[get("/topics/<topic_id>")]
async fn get_topic(
    topic_id: Id,
    mirror: &State<TopicMirror>,
    session: ClientSession,
) -> Result<Json<TopicView>> {
    let topic = mirror.topic(topic_id)?;
    let session = session.lock().await;
    Ok(Json(TopicView::new(&topic, &session)))
}

#[post("/topics", data = "<request>", format = "json")]
async fn create_topic(
    request: Json<TopicRequest>,
    lifecycle: &State<LifecycleManager>,
    session: ClientSession,
) -> Result<Json<Created>> {
    let _session = session.lock().await;
    let id = lifecycle.create_topic(&request.title).await?;
    Ok(Json(Created { id: id.into() }))
}

/// Append answers. Open to every session, locked topics included.
#[post("/topics/<topic_id>/answers", data = "<request>", format = "json")]
async fn add_answers(
    topic_id: Id,
    request: Json<AnswersRequest>,
    lifecycle: &State<LifecycleManager>,
    session: ClientSession,
) -> Result<Json<Vec<Answer>>> {
    let _session = session.lock().await;
    let answers = lifecycle.add_answers(topic_id, &request.answers).await?;
    Ok(Json(answers))
}
