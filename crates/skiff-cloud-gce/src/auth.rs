//! Bearer token sources

use crate::error::{GceError, Result};
use async_trait::async_trait;
use skiff_cloud::Authenticator;

pub const ACCESS_TOKEN_ENV: &str = "SKIFF_GCE_ACCESS_TOKEN";

/// Pre-issued OAuth access token (e.g. `gcloud auth print-access-token`)
///
/// Refreshing the token is the caller's job.
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let token = std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GceError::MissingEnvVar(ACCESS_TOKEN_ENV.to_string()))?;
        Ok(Self::new(token))
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToken").field("token", &"<redacted>").finish()
    }
}

#[async_trait]
impl Authenticator for StaticToken {
    async fn bearer_token(&self) -> skiff_cloud::Result<String> {
        Ok(self.token.clone())
    }
}
