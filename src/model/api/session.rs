use std::sync::Arc;

use rocket::{
    http::{Cookie, SameSite, Status},
    request::{FromRequest, Outcome},
    tokio::sync::MutexGuard,
    Request,
};

use crate::error::Error;
use crate::model::session::{Session, SessionId, Sessions, SharedSession};

pub const SESSION_COOKIE: &str = "session_id";

/// The session of the client making a request. A client without a known
/// session cookie is given a fresh session and cookie.
#[derive(Clone)]
pub struct ClientSession {
    id: SessionId,
    session: SharedSession,
}

impl ClientSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Lock the session. Hold this for the whole action so the session's
    /// actions complete one at a time.
    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().await
    }

    fn into_cookie(self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, self.id.to_string()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .build()
    }
}

/// Find or start the session for a request.
fn resolve(req: &Request<'_>, sessions: &Sessions) -> ClientSession {
    let cookies = req.cookies();
    let known = cookies
        .get_private(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse::<SessionId>().ok())
        .and_then(|id| sessions.get(id).map(|session| ClientSession { id, session }));
    if let Some(known) = known {
        return known;
    }

    let (id, session) = sessions.create();
    let fresh = ClientSession { id, session };
    cookies.add_private(fresh.clone().into_cookie());
    debug!("Started session {id}");
    fresh
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientSession {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(sessions) = req.rocket().state::<Arc<Sessions>>() else {
            return Outcome::Error((
                Status::InternalServerError,
                Error::Unavailable("sessions are not managed".to_string()),
            ));
        };
        // Resolve once per request, however many guards ask.
        let session = req.local_cache(|| resolve(req, sessions));
        Outcome::Success(session.clone())
    }
}
