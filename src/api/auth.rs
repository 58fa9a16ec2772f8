use rocket::{http::Status, serde::json::Json, Route, State};

use crate::board::AdminGate;
use crate::error::Result;
use crate::model::api::{admin::SecretRequest, session::ClientSession};

pub fn routes() -> Vec<Route> {
    routes![login, logout]
}

#[post("/auth/admin", data = "<request>", format = "json")]
pub async fn login(
    request: Json<SecretRequest>,
    gate: &State<AdminGate>,
    session: ClientSession,
) -> Result<()> {
    let mut session = session.lock().await;
    gate.login(&mut session, &request.secret)?;
    info!("Admin login");
    Ok(())
}

#[delete("/auth")]
pub async fn logout(gate: &State<AdminGate>, session: ClientSession) -> Status {
    gate.logout(&mut *session.lock().await);
    Status::Ok
}
