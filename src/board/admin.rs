use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{credentials::CredentialCheck, session::Session};

/// Grants and checks admin rights on a session.
pub struct AdminGate {
    credentials: Arc<dyn CredentialCheck>,
}

impl AdminGate {
    pub fn new(credentials: Arc<dyn CredentialCheck>) -> Self {
        Self { credentials }
    }

    /// Make `session` an admin session if `secret` is accepted.
    pub fn login(&self, session: &mut Session, secret: &str) -> Result<()> {
        if !self.credentials.authenticate(secret) {
            return Err(Error::Auth("Incorrect admin secret".to_string()));
        }
        session.grant_admin();
        Ok(())
    }

    pub fn logout(&self, session: &mut Session) {
        session.revoke_admin();
    }

    /// Fail unless `session` has admin rights.
    pub fn require(&self, session: &Session) -> Result<()> {
        if session.is_admin() {
            Ok(())
        } else {
            Err(Error::Auth("Admin rights required".to_string()))
        }
    }
}
