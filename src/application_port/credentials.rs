use super::RotationError;
use crate::domain_model::UserId;

/// External collaborator owning user records and password hashes. The
/// lifecycle subsystem only needs a yes/no answer at login time; `None`
/// means the credentials did not check out.
#[async_trait::async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Option<UserId>, RotationError>;
}
