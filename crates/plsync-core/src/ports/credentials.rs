//! Credential provider port
//!
//! The catalog's OAuth handshake happens outside plsync. Whatever performed
//! it hands over a bearer token through this trait.

/// Supplies the bearer token attached to every catalog request
#[async_trait::async_trait]
pub trait ICredentialProvider: Send + Sync {
    /// A currently valid access token
    async fn access_token(&self) -> anyhow::Result<String>;
}
