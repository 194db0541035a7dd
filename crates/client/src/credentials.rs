use std::path::PathBuf;
use std::sync::Arc;
use studychat_core::{AuthConfig, Result};

/// Supplies the bearer token attached to every backend request.
///
/// Consulted before each request so a token refreshed out-of-band is
/// picked up without rebuilding the client.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Result<Option<String>>;
}

/// A fixed token
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> Result<Option<String>> {
        Ok(Some(self.0.clone()))
    }
}

/// Token read from an environment variable
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialProvider for EnvToken {
    fn bearer_token(&self) -> Result<Option<String>> {
        let token = std::env::var(&self.var).ok().map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        if token.is_none() {
            tracing::debug!("no token in ${}, sending unauthenticated request", self.var);
        }
        Ok(token)
    }
}

/// Token read from a file (written by a separate login step)
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialProvider for TokenFile {
    fn bearer_token(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                Ok(if token.is_empty() { None } else { Some(token.to_string()) })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("token file {} not found", self.path.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// No credentials
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl CredentialProvider for Anonymous {
    fn bearer_token(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Build the provider selected by the `[auth]` section
pub fn credentials_from_config(auth: &AuthConfig) -> Arc<dyn CredentialProvider> {
    match auth {
        AuthConfig::Env { env_var } => Arc::new(EnvToken::new(env_var.clone())),
        AuthConfig::File { path } => Arc::new(TokenFile::new(path.clone())),
        AuthConfig::Static { token } => Arc::new(StaticToken::new(token.clone())),
        AuthConfig::None => Arc::new(Anonymous),
    }
}
