/// Something that can decide whether a supplied secret grants access.
pub trait CredentialCheck: Send + Sync {
    fn authenticate(&self, secret: &str) -> bool;
}

/// A single shared secret compared in plain text.
///
/// This is a deliberately minimal gate: no hashing, no expiry and no per-user
/// identity. Swap in another [`CredentialCheck`] for real authentication.
#[derive(Clone)]
pub struct StaticSecret(String);

impl StaticSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }
}

impl CredentialCheck for StaticSecret {
    fn authenticate(&self, secret: &str) -> bool {
        self.0 == secret
    }
}
