use axum::async_trait;
use tracing::debug;

/// Outbound mail is a collaborator, not part of this core: the auth flows
/// only need "send these bytes to this address".
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Default mailer for development deployments: logs instead of sending.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        debug!(%to, %subject, body_len = body.len(), "mail suppressed (log mailer)");
        Ok(())
    }
}
