use crate::application_port::{CredentialVerifier, RotationError};
use crate::domain_model::UserId;

/// Stand-in for the external user/credential service. Accepts any
/// non-empty password and derives a stable user id from the identifier so
/// repeated logins land on the same user.
// Extend to simulate lockouts and inactive users when needed.
pub struct FakeCredentialVerifier;

impl FakeCredentialVerifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FakeCredentialVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CredentialVerifier for FakeCredentialVerifier {
    async fn verify(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Option<UserId>, RotationError> {
        if identifier.is_empty() || password.is_empty() {
            return Ok(None);
        }
        Ok(Some(UserId(uuid::Uuid::new_v5(
            &uuid::Uuid::NAMESPACE_OID,
            identifier.as_bytes(),
        ))))
    }
}
