use rocket::{serde::json::Json, Route, State};

use crate::board::VoteCoordinator;
use crate::error::Result;
use crate::model::{
    api::{session::ClientSession, topic::TopicView, vote::CastVote},
    mongodb::Id,
};

pub fn routes() -> Vec<Route> {
    routes![vote, my_votes]
}

/// Vote for the answer at storage `position`. Responds with the topic as the
/// vote left it.
#[post("/topics/<topic_id>/answers/<position>/vote")]
async fn vote(
    topic_id: Id,
    position: usize,
    voting: &State<VoteCoordinator>,
    session: ClientSession,
) -> Result<Json<TopicView>> {
    let mut session = session.lock().await;
    let topic = voting.vote(&mut session, topic_id, position).await?;
    Ok(Json(TopicView::new(&topic, &session)))
}

#[get("/votes")]
async fn my_votes(session: ClientSession) -> Json<Vec<CastVote>> {
    let session = session.lock().await;
    let mut votes = session.votes().map(CastVote::from).collect::<Vec<_>>();
    votes.sort();
    Json(votes)
}
