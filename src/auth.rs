//! Client for the agent's calendar authentication endpoints
//!
//! - GET {api}/auth/status → `{ "authenticated": bool }`
//! - GET {api}/auth/login  → `{ "auth_url": "..." }` (open in a browser)

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    auth_url: String,
}

pub struct AuthClient {
    http: reqwest::Client,
    base_url: Url,
}

impl AuthClient {
    pub fn new(api_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(api_url).context("Invalid agent API URL")?;

        // Keep the last path segment when joining relative endpoints
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid endpoint path: {}", path))
    }

    /// Whether the agent has calendar access
    pub async fn status(&self) -> Result<AuthStatus> {
        let url = self.endpoint("auth/status")?;

        let status = self
            .http
            .get(url)
            .send()
            .await
            .context("Failed to reach auth status endpoint")?
            .error_for_status()?
            .json::<AuthStatus>()
            .await
            .context("Failed to parse auth status")?;

        Ok(status)
    }

    /// URL the user must visit to grant calendar access
    pub async fn login_url(&self) -> Result<String> {
        let url = self.endpoint("auth/login")?;

        let login = self
            .http
            .get(url)
            .send()
            .await
            .context("Failed to reach auth login endpoint")?
            .error_for_status()?
            .json::<LoginResponse>()
            .await
            .context("Failed to parse auth login response")?;

        info!("Calendar login URL issued");

        Ok(login.auth_url)
    }
}
