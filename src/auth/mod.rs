//! OAuth2 authorization for the Drive API.
//!
//! Reads Google API credentials from a JSON file, persists the issued token
//! next to them, and walks the user through the browser consent flow when no
//! usable token exists. The consent flow prints a URL, then waits for the
//! browser to hit the local [`callback::CodeListener`] with an authorization
//! code, racing that single inbound confirmation against a wall-clock
//! deadline. Expired tokens are refreshed when a refresh token was issued.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::constants::{AUTH_CALLBACK_TIMEOUT_SECS, DRIVE_SCOPE};
use crate::errors::{Result, UploadError};

/// Local HTTP listener for the OAuth redirect
pub mod callback;

use callback::CodeListener;

/// OAuth2 client settings as found in a Google credentials file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
}

/// Google wraps the credentials in an "installed" or "web" section
/// depending on the application type.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<AppCredentials>,
    web: Option<AppCredentials>,
}

/// The token record persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expiry: DateTime<Utc>,
    pub token_type: String,
}

impl StoredToken {
    pub fn is_expired(&self) -> bool {
        self.expiry <= Utc::now()
    }
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Shape of the token endpoint's response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
    #[serde(default = "default_token_type")]
    token_type: String,
}

impl TokenResponse {
    fn into_stored(self) -> StoredToken {
        StoredToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expiry: Utc::now() + ChronoDuration::seconds(self.expires_in),
            token_type: self.token_type,
        }
    }
}

/// Acquires an authorized access token for the Drive client.
pub struct Authenticator {
    credentials_file: PathBuf,
    token_file: PathBuf,
    callback_port: u16,
}

impl Authenticator {
    pub fn new(credentials_file: PathBuf, token_file: PathBuf, callback_port: u16) -> Self {
        Authenticator {
            credentials_file,
            token_file,
            callback_port,
        }
    }

    /// Produce a valid access token: the saved one when still fresh, a
    /// refreshed one when expired, or a brand new one via the browser flow.
    pub async fn access_token(&self) -> Result<String> {
        let creds = self.load_credentials()?;

        if let Some(saved) = read_token_file(&self.token_file) {
            if !saved.is_expired() {
                debug!("Using saved token from {}", self.token_file.display());
                return Ok(saved.access_token);
            }
            if let Some(refresh) = saved.refresh_token.clone() {
                match self.refresh_token(&creds, &refresh).await {
                    Ok(fresh) => {
                        self.save_token(&fresh)?;
                        info!("Refreshed expired access token");
                        return Ok(fresh.access_token);
                    }
                    Err(e) => {
                        warn!("Token refresh failed ({}), starting browser flow", e);
                    }
                }
            }
        }

        let token = self.browser_flow(&creds).await?;
        self.save_token(&token)?;
        Ok(token.access_token)
    }

    fn load_credentials(&self) -> Result<AppCredentials> {
        let raw = fs::read(&self.credentials_file).map_err(|e| {
            UploadError::Config(format!(
                "failed to read credentials file {}: {}",
                self.credentials_file.display(),
                e
            ))
        })?;
        let parsed: CredentialsFile = serde_json::from_slice(&raw).map_err(|e| {
            UploadError::Config(format!(
                "failed to parse credentials file {}: {}",
                self.credentials_file.display(),
                e
            ))
        })?;
        parsed.installed.or(parsed.web).ok_or_else(|| {
            UploadError::Config(
                "credentials file has neither an \"installed\" nor a \"web\" section".to_string(),
            )
        })
    }

    fn save_token(&self, token: &StoredToken) -> Result<()> {
        let serialized = serde_json::to_string_pretty(token).map_err(|e| {
            UploadError::Config(format!("failed to serialize token record: {}", e))
        })?;
        fs::write(&self.token_file, serialized)
            .map_err(|e| UploadError::io(&self.token_file, e))?;
        debug!("Saved token to {}", self.token_file.display());
        Ok(())
    }

    fn redirect_uri(&self) -> String {
        format!("http://localhost:{}", self.callback_port)
    }

    /// The URL the user must visit to grant access.
    fn consent_url(&self, creds: &AppCredentials) -> Result<String> {
        let url = reqwest::Url::parse_with_params(
            &creds.auth_uri,
            &[
                ("client_id", creds.client_id.as_str()),
                ("redirect_uri", self.redirect_uri().as_str()),
                ("response_type", "code"),
                ("scope", DRIVE_SCOPE),
                ("access_type", "offline"),
            ],
        )
        .map_err(|e| UploadError::Config(format!("invalid auth URI: {}", e)))?;
        Ok(url.to_string())
    }

    /// Print the consent URL, wait for the redirect to deliver the
    /// authorization code, and exchange it for a token.
    async fn browser_flow(&self, creds: &AppCredentials) -> Result<StoredToken> {
        let listener = CodeListener::bind(self.callback_port).await?;

        println!(
            "Go to the following link in your browser:\n{}\n",
            self.consent_url(creds)?
        );
        info!("Waiting for the authorization code...");

        let code = listener
            .wait_for_code(Duration::from_secs(AUTH_CALLBACK_TIMEOUT_SECS))
            .await?;
        self.exchange_code(creds, &code).await
    }

    async fn exchange_code(&self, creds: &AppCredentials, code: &str) -> Result<StoredToken> {
        let redirect_uri = self.redirect_uri();
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
        ];
        token_request(&creds.token_uri, &params, "exchanging authorization code").await
    }

    async fn refresh_token(&self, creds: &AppCredentials, refresh: &str) -> Result<StoredToken> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
        ];
        let mut token = token_request(&creds.token_uri, &params, "refreshing access token").await?;
        // The refresh response usually omits the refresh token; keep the one
        // we already have so future runs can refresh again.
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh.to_string());
        }
        Ok(token)
    }
}

/// Read and parse the saved token record, if one exists.
fn read_token_file(path: &Path) -> Option<StoredToken> {
    let raw = fs::read(path).ok()?;
    match serde_json::from_slice(&raw) {
        Ok(token) => Some(token),
        Err(e) => {
            warn!("Ignoring unreadable token file {}: {}", path.display(), e);
            None
        }
    }
}

/// POST to the token endpoint and turn the response into a stored record.
async fn token_request(
    token_uri: &str,
    params: &[(&str, &str)],
    operation: &str,
) -> Result<StoredToken> {
    let client = reqwest::Client::new();
    let resp = client
        .post(token_uri)
        .form(params)
        .send()
        .await
        .map_err(|e| UploadError::remote(operation.to_string(), e))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(UploadError::RemoteApi {
            operation: operation.to_string(),
            source: format!("unexpected status {}: {}", status, body).into(),
        });
    }

    let token: TokenResponse = resp
        .json()
        .await
        .map_err(|e| UploadError::remote(operation.to_string(), e))?;
    Ok(token.into_stored())
}
