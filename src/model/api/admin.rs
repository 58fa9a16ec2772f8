use serde::{Deserialize, Serialize};

/// A secret typed in by a user, for admin login or reset. Never stored.
#[derive(Clone, Deserialize, Serialize)]
pub struct SecretRequest {
    pub secret: String,
}
