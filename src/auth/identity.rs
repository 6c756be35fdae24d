use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, Result};

/// A signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Verifies provider-issued ID tokens against the provider's token-info
/// endpoint.
#[derive(Clone)]
pub struct IdentityVerifier {
    client: reqwest::Client,
    tokeninfo_url: String,
    audience: Option<String>,
}

impl IdentityVerifier {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            tokeninfo_url: cfg.tokeninfo_url.clone(),
            audience: cfg.oauth_client_id.clone(),
        })
    }

    /// Resolve a bearer token to an identity. Rejected, expired, wrong-audience
    /// or unverified-email tokens are `Unauthorized`.
    pub async fn verify(&self, token: &str) -> Result<Identity> {
        let resp = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", token)])
            .send()
            .await?;

        if !resp.status().is_success() {
            debug!(status = resp.status().as_u16(), "token rejected by provider");
            return Err(AppError::Unauthorized);
        }

        let info: serde_json::Value = resp.json().await?;
        parse_token_info(&info, self.audience.as_deref())
    }
}

fn parse_token_info(info: &serde_json::Value, audience: Option<&str>) -> Result<Identity> {
    if let Some(expected) = audience {
        let aud = info.get("aud").and_then(|a| a.as_str()).unwrap_or("");
        if aud != expected {
            warn!(aud, "token issued for a different audience");
            return Err(AppError::Unauthorized);
        }
    }

    // The provider reports this as either a JSON bool or the string "true".
    let verified = info
        .get("email_verified")
        .map(|v| v.as_bool().unwrap_or_else(|| v.as_str() == Some("true")))
        .unwrap_or(false);
    if !verified {
        return Err(AppError::Unauthorized);
    }

    let email = info
        .get("email")
        .and_then(|e| e.as_str())
        .filter(|e| !e.is_empty())
        .ok_or(AppError::Unauthorized)?
        .to_string();
    let name = info
        .get("name")
        .and_then(|n| n.as_str())
        .map(|n| n.to_string());

    Ok(Identity { email, name })
}
