use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::SessionStore;
use crate::infra_memory::MemorySessionStore;
use crate::infra_mysql::MySqlSessionStore;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;

pub struct Server {
    pub rotation_service: Arc<dyn RotationService>,
    pub revocation_gate: Arc<RevocationGate>,
    pub credential_verifier: Arc<dyn CredentialVerifier>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let codec: Arc<dyn TokenCodec> = Arc::new(UuidDotCodec::new(SecretHashConfig {
            m_cost: settings.auth.secret_hash.m_cost,
            t_cost: settings.auth.secret_hash.t_cost,
            p_cost: settings.auth.secret_hash.p_cost,
        }));

        let signing_key = std::env::var("CAPSTAN_SIGNING_KEY")
            .unwrap_or_else(|_| "my-dev-secret-key".to_string())
            .into_bytes();
        let signer: Arc<dyn AccessTokenSigner> = Arc::new(JwtHs256Signer::new(SignerConfig {
            issuer: settings.auth.issuer.clone(),
            audience: settings.auth.audience.clone(),
            access_ttl: Duration::from_secs(settings.auth.access_ttl_secs),
            signing_key,
        }));

        let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink::new());

        let (session_store, pool): (Arc<dyn SessionStore>, Option<Pool<MySql>>) =
            match settings.store.backend.as_str() {
                "memory" => (Arc::new(MemorySessionStore::new()), None),
                "mysql" => {
                    let pool = Pool::<MySql>::connect(&settings.store.mysql_dsn).await?;
                    (Arc::new(MySqlSessionStore::new(pool.clone())), Some(pool))
                }
                other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
            };

        let credential_verifier: Arc<dyn CredentialVerifier> =
            match settings.credentials.backend.as_str() {
                "fake" => Arc::new(FakeCredentialVerifier::new()),
                other => return Err(anyhow::anyhow!("Unknown credentials backend: {}", other)),
            };

        let rotation_service: Arc<dyn RotationService> = Arc::new(RotationEngine::new(
            session_store.clone(),
            codec.clone(),
            signer,
            audit,
        ));
        let revocation_gate = Arc::new(RevocationGate::new(session_store, codec));

        info!("server started");

        Ok(Self {
            rotation_service,
            revocation_gate,
            credential_verifier,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
