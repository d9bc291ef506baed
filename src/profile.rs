//! Author profile lookups against the Reddit API.
//!
//! The adapter returns a [`UserProfile`] whose optional fields are already
//! defaulted, so the enrichment loop never deals with partial payloads.

use crate::config::RedditCredentials;
use anyhow::Context;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::thread::sleep;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

pub const AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
pub const API_BASE: &str = "https://oauth.reddit.com";

/// Refresh the token this long before Reddit says it expires.
const TOKEN_SLACK: Duration = Duration::from_secs(60);

/// Profile metadata for one username. `id == None` means the account exists
/// in some form (suspended, shadow-banned) but cannot be resolved.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserProfile {
    pub id: Option<String>,
    pub is_suspended: bool,
    pub created_utc: Option<i64>,
    pub comment_karma: Option<i64>,
    pub link_karma: Option<i64>,
    pub is_mod: Option<bool>,
    pub profile_name: Option<String>,
    pub profile_description: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("received {0} HTTP response")]
    Status(u16),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ProfileError {
    /// Rate limits, server errors, expired tokens and network hiccups are worth another try.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProfileError::Status(code) => *code == 401 || *code == 429 || *code >= 500,
            ProfileError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

/// Anything that can look up a profile by username.
pub trait ProfileSource {
    fn fetch_profile(&mut self, username: &str) -> Result<UserProfile, ProfileError>;
}

/// Bounded retry with exponential backoff, applied per lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(1), max_delay: Duration::from_secs(30) }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure (1-based): `base * 2^(attempt-1)`, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exp).min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// `max_attempts` is used up.
    pub fn run<T>(
        &self,
        label: &str,
        mut op: impl FnMut() -> Result<T, ProfileError>,
    ) -> Result<T, ProfileError> {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if attempt < max && e.is_retryable() => {
                    let wait = self.delay_for(attempt);
                    warn!("{label}: {e} (attempt {attempt}/{max}), retrying in {wait:?}");
                    sleep(wait);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AboutEnvelope {
    data: AboutData,
}

#[derive(Debug, Default, Deserialize)]
struct AboutData {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    is_suspended: bool,
    #[serde(default)]
    created_utc: Option<f64>,
    #[serde(default)]
    comment_karma: Option<i64>,
    #[serde(default)]
    link_karma: Option<i64>,
    #[serde(default)]
    is_mod: Option<bool>,
    #[serde(default)]
    subreddit: Option<ProfileSubreddit>,
}

#[derive(Debug, Default, Deserialize)]
struct ProfileSubreddit {
    display_name: Option<String>,
    public_description: Option<String>,
}

impl From<AboutData> for UserProfile {
    fn from(d: AboutData) -> Self {
        let (profile_name, profile_description) = match d.subreddit {
            Some(s) => (s.display_name, s.public_description),
            None => (None, None),
        };
        UserProfile {
            id: d.id.filter(|s| !s.is_empty()),
            is_suspended: d.is_suspended,
            created_utc: d.created_utc.map(|t| t as i64),
            comment_karma: d.comment_karma,
            link_karma: d.link_karma,
            is_mod: d.is_mod,
            profile_name,
            profile_description,
        }
    }
}

/// Parse a `/user/{name}/about` body.
pub fn parse_about(body: &str) -> Result<UserProfile, ProfileError> {
    let env: AboutEnvelope = serde_json::from_str(body).map_err(|e| ProfileError::Decode(e.to_string()))?;
    Ok(env.data.into())
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Application-only OAuth client for the Reddit API.
pub struct RedditClient {
    http: Client,
    creds: RedditCredentials,
    token: Option<AccessToken>,
    retry: RetryPolicy,
    auth_url: String,
    api_base: String,
}

impl RedditClient {
    /// Build the client and fetch a first token; failure here is fatal for the run.
    pub fn connect(creds: RedditCredentials, retry: RetryPolicy) -> anyhow::Result<Self> {
        Self::connect_to(creds, retry, AUTH_URL, API_BASE)
    }

    /// Same as [`RedditClient::connect`] against other endpoints (a proxy or a local stub).
    pub fn connect_to(
        creds: RedditCredentials,
        retry: RetryPolicy,
        auth_url: &str,
        api_base: &str,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(creds.user_agent.clone())
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;
        let mut client = Self {
            http,
            creds,
            token: None,
            retry,
            auth_url: auth_url.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        };
        client.ensure_token().context("failed to authenticate with the Reddit API")?;
        Ok(client)
    }

    fn request_token(&self) -> Result<AccessToken, ProfileError> {
        let resp = self
            .http
            .post(&self.auth_url)
            .basic_auth(&self.creds.client_id, Some(&self.creds.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProfileError::Auth(format!("token endpoint returned {status}")));
        }
        let body: TokenResponse = resp.json().map_err(|e| ProfileError::Decode(e.to_string()))?;
        let value = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProfileError::Auth("no access_token in response".to_string()))?;
        let ttl = Duration::from_secs(body.expires_in.unwrap_or(3600));
        debug!("obtained Reddit access token valid for {ttl:?}");
        Ok(AccessToken { value, expires_at: Instant::now() + ttl.saturating_sub(TOKEN_SLACK) })
    }

    fn ensure_token(&mut self) -> Result<String, ProfileError> {
        match &self.token {
            Some(t) if Instant::now() < t.expires_at => Ok(t.value.clone()),
            _ => {
                let fresh = self.request_token()?;
                let value = fresh.value.clone();
                self.token = Some(fresh);
                Ok(value)
            }
        }
    }

    fn about_once(&mut self, username: &str) -> Result<UserProfile, ProfileError> {
        let token = self.ensure_token()?;
        let url = format!("{}/user/{}/about", self.api_base, username);
        let resp = self.http.get(&url).bearer_auth(token).query(&[("raw_json", "1")]).send()?;
        let status = resp.status();
        if status.is_success() {
            return parse_about(&resp.text()?);
        }
        if status == StatusCode::UNAUTHORIZED {
            self.token = None;
        }
        Err(ProfileError::Status(status.as_u16()))
    }
}

impl ProfileSource for RedditClient {
    fn fetch_profile(&mut self, username: &str) -> Result<UserProfile, ProfileError> {
        let retry = self.retry;
        retry.run(username, || self.about_once(username))
    }
}
