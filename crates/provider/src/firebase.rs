//! Firebase Realtime Database client over the REST API.
//!
//! Properties map to `GET`/`PUT {database}/{path}.json`. With email/password
//! credentials the client signs in through the Identity Toolkit endpoint and
//! passes the ID token as `?auth=`; the token is cached until shortly before
//! it expires and dropped whenever the database answers 401.

use crate::RemoteStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use url::Url;
use warden_core::config::RemoteSettings;
use warden_core::error::{WardenError, WardenResult};

const SIGN_IN_URL: &str =
    "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword";

/// Renew the ID token this long before it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Fetches and stores properties in a Firebase Realtime Database.
///
/// ```ignore
/// let store = FirebaseStore::connect(&config.remote)?;
/// let locked = store.read("/smart_controls/relays/door/isLocked").await?;
/// ```
pub struct FirebaseStore {
    client: reqwest::Client,
    base: Url,
    credentials: Option<Credentials>,
    token: Mutex<Option<IdToken>>,
}

struct Credentials {
    api_key: String,
    email: String,
    password: String,
}

struct IdToken {
    value: String,
    expires_at: Instant,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    expires_in: String,
}

impl FirebaseStore {
    pub fn connect(settings: &RemoteSettings) -> WardenResult<Self> {
        if settings.url.is_empty() {
            return Err(WardenError::InvalidInput(
                "database URL must not be empty".into(),
            ));
        }

        let base = Url::parse(&settings.url)
            .map_err(|e| WardenError::Config(format!("invalid database URL {}: {e}", settings.url)))?;
        if base.cannot_be_a_base() {
            return Err(WardenError::Config(format!(
                "database URL {} cannot hold paths",
                settings.url
            )));
        }

        let credentials = match (
            &settings.api_key,
            &settings.user_email,
            &settings.user_password,
        ) {
            (Some(api_key), Some(email), Some(password)) => Some(Credentials {
                api_key: api_key.clone(),
                email: email.clone(),
                password: password.clone(),
            }),
            (None, None, None) => None,
            _ => {
                return Err(WardenError::Config(
                    "api_key, user_email and user_password must be set together".into(),
                ))
            }
        };

        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| WardenError::Remote(format!("failed to build HTTP client: {e}")))?;

        tracing::info!(
            url = %base,
            authenticated = credentials.is_some(),
            "remote database configured"
        );

        Ok(Self {
            client,
            base,
            credentials,
            token: Mutex::new(None),
        })
    }

    /// `{base}/{path}.json`, with the auth token appended when present.
    fn endpoint(&self, path: &str, token: Option<&str>) -> WardenResult<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| WardenError::Remote("database URL cannot hold paths".into()))?;
            segments.pop_if_empty();
            let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
            match parts.split_last() {
                Some((last, head)) => {
                    segments.extend(head);
                    segments.push(&format!("{last}.json"));
                }
                None => {
                    segments.push(".json");
                }
            }
        }
        if let Some(token) = token {
            url.query_pairs_mut().append_pair("auth", token);
        }
        Ok(url)
    }

    /// Returns a valid ID token, signing in again when the cached one is
    /// missing or about to expire. `None` for unauthenticated databases.
    async fn id_token(&self) -> WardenResult<Option<String>> {
        let Some(creds) = &self.credentials else {
            return Ok(None);
        };

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + TOKEN_REFRESH_MARGIN < token.expires_at {
                return Ok(Some(token.value.clone()));
            }
        }

        let response = self
            .client
            .post(SIGN_IN_URL)
            .query(&[("key", creds.api_key.as_str())])
            .json(&SignInRequest {
                email: &creds.email,
                password: &creds.password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| WardenError::Remote(format!("sign-in request failed: {e}")))?
            .error_for_status()
            .map_err(|e| WardenError::Remote(format!("sign-in rejected: {e}")))?
            .json::<SignInResponse>()
            .await
            .map_err(|e| WardenError::Remote(format!("malformed sign-in response: {e}")))?;

        let lifetime = response.expires_in.parse::<u64>().unwrap_or(3600);
        tracing::debug!(lifetime_secs = lifetime, "signed in to remote database");

        let value = response.id_token;
        *cached = Some(IdToken {
            value: value.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });
        Ok(Some(value))
    }

    async fn check(&self, path: &str, response: reqwest::Response) -> WardenResult<reqwest::Response> {
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.token.lock().await.take();
        }
        response
            .error_for_status()
            .map_err(|e| WardenError::Remote(format!("{path}: {e}")))
    }
}

#[async_trait]
impl RemoteStore for FirebaseStore {
    async fn read(&self, path: &str) -> WardenResult<serde_json::Value> {
        let token = self.id_token().await?;
        let url = self.endpoint(path, token.as_deref())?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WardenError::Remote(format!("{path}: {e}")))?;

        let value = self
            .check(path, response)
            .await?
            .json::<serde_json::Value>()
            .await
            .map_err(|e| WardenError::Remote(format!("{path}: malformed body: {e}")))?;

        tracing::trace!(path, %value, "remote read");
        Ok(value)
    }

    async fn write(&self, path: &str, value: serde_json::Value) -> WardenResult<()> {
        let token = self.id_token().await?;
        let url = self.endpoint(path, token.as_deref())?;

        let response = self
            .client
            .put(url)
            .json(&value)
            .send()
            .await
            .map_err(|e| WardenError::Remote(format!("{path}: {e}")))?;
        self.check(path, response).await?;

        tracing::trace!(path, %value, "remote write");
        Ok(())
    }
}
