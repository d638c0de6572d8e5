//! Bearer token providers
//!
//! plsync does not run the OAuth handshake itself. An access token obtained
//! elsewhere is handed over either directly or through the environment.

use anyhow::Result;
use tracing::debug;

use plsync_core::ports::ICredentialProvider;

/// Environment variable holding the catalog access token
pub const ACCESS_TOKEN_ENV: &str = "PLSYNC_ACCESS_TOKEN";

/// Provider returning a fixed token
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait::async_trait]
impl ICredentialProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Provider reading the token from an environment variable on every call,
/// so a token rotated by an external refresher is picked up without restart.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    /// Checks the variable is set now, so startup fails early
    pub fn from_env() -> Result<Self> {
        let provider = Self::new(ACCESS_TOKEN_ENV);
        provider.read()?;
        Ok(provider)
    }

    fn read(&self) -> Result<String> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            Ok(_) => anyhow::bail!("{} is set but empty", self.var),
            Err(_) => anyhow::bail!("{} is not set", self.var),
        }
    }
}

impl Default for EnvTokenProvider {
    fn default() -> Self {
        Self::new(ACCESS_TOKEN_ENV)
    }
}

#[async_trait::async_trait]
impl ICredentialProvider for EnvTokenProvider {
    async fn access_token(&self) -> Result<String> {
        debug!(var = %self.var, "Reading access token from environment");
        self.read()
    }
}
