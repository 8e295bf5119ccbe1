//! GitHub releases.
//!
//! The pipeline talks to the hosting API through [ReleaseHost]:
//!
//! - [GitHubApi]: REST client over `reqwest`, one client per token
//! - [mock::MockReleaseHost]: records requests for testing

pub mod mock;

pub use mock::MockReleaseHost;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::ReleaseContext;
use crate::error::{KiaraError, Result};

pub const API_URL: &str = "https://api.github.com";
pub const API_VERSION: &str = "2022-11-28";
const MEDIA_TYPE: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("kiara/", env!("CARGO_PKG_VERSION"));

/// Body of `POST /repos/{owner}/{repo}/releases`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseRequest {
    #[serde(skip)]
    pub owner: String,
    #[serde(skip)]
    pub repo: String,
    pub tag_name: String,
    pub name: String,
    pub body: String,
    pub draft: bool,
    pub prerelease: bool,
    /// GitHub only writes notes itself when there is no changelog text
    pub generate_release_notes: bool,
    /// `"true"` or `"false"`, as the API expects a string
    pub make_latest: String,
}

impl ReleaseRequest {
    /// Build the request for the release described by `ctx` with the given body
    pub fn from_context(ctx: &ReleaseContext, body: &str) -> Result<Self> {
        let repository = ctx.require_repository()?;
        Ok(ReleaseRequest {
            owner: repository.owner.clone(),
            repo: repository.name.clone(),
            tag_name: ctx.tag_name(),
            name: ctx.release_title(),
            body: body.to_string(),
            draft: ctx.options.github_draft,
            prerelease: ctx.options.github_prerelease,
            generate_release_notes: body.trim().is_empty(),
            make_latest: ctx.options.github_latest.to_string(),
        })
    }
}

/// The release GitHub created
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublishedRelease {
    pub id: u64,
    pub html_url: String,
}

/// Hosting API capabilities the pipeline needs
pub trait ReleaseHost: Send + Sync {
    /// Fail unless `token` is accepted by the API
    fn verify_token(&self, token: &str) -> Result<()>;

    fn create_release(&self, token: &str, request: &ReleaseRequest) -> Result<PublishedRelease>;
}

/// Authenticated REST client for one token
#[derive(Debug)]
pub struct GitHubClient {
    http: Client,
    base_url: String,
}

impl GitHubClient {
    pub fn new(token: &str, base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(MEDIA_TYPE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(API_VERSION),
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            KiaraError::config("The authentication token contains invalid characters")
        })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| KiaraError::github(format!("Cannot create HTTP client: {}", e)))?;

        Ok(GitHubClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `GET /user`
    pub fn authenticated_user(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct User {
            login: String,
        }

        let response = self
            .http
            .get(format!("{}/user", self.base_url))
            .send()
            .map_err(|e| KiaraError::github(format!("Failed to verify token: {}", e)))?;
        let user: User = check(response, "verify token")?
            .json()
            .map_err(|e| KiaraError::github(format!("Unexpected /user response: {}", e)))?;
        Ok(user.login)
    }

    /// `POST /repos/{owner}/{repo}/releases`
    pub fn create_release(&self, request: &ReleaseRequest) -> Result<PublishedRelease> {
        let url = format!(
            "{}/repos/{}/{}/releases",
            self.base_url, request.owner, request.repo
        );
        debug!(url = %url, tag = %request.tag_name, draft = request.draft, "creating release");

        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .map_err(|e| KiaraError::github(format!("Failed to create GitHub release: {}", e)))?;
        check(response, "create GitHub release")?
            .json()
            .map_err(|e| KiaraError::github(format!("Unexpected release response: {}", e)))
    }
}

fn check(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(KiaraError::unauthorized(status.as_u16()));
    }
    let body = response.text().unwrap_or_default();
    Err(KiaraError::github(format!("Failed to {} ({}): {}", action, status, body.trim())))
}

/// Clients keyed by token, owned by a single run
#[derive(Debug, Default)]
pub struct ClientCache {
    clients: Mutex<HashMap<String, Arc<GitHubClient>>>,
}

impl ClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, token: &str, base_url: &str) -> Result<Arc<GitHubClient>> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| KiaraError::github("client cache is poisoned"))?;
        if let Some(client) = clients.get(token) {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(GitHubClient::new(token, base_url)?);
        clients.insert(token.to_string(), Arc::clone(&client));
        Ok(client)
    }

    pub fn len(&self) -> usize {
        self.clients.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// [ReleaseHost] backed by the GitHub REST API
#[derive(Debug)]
pub struct GitHubApi {
    base_url: String,
    cache: ClientCache,
}

impl GitHubApi {
    pub fn new() -> Self {
        Self::with_base_url(API_URL)
    }

    /// Point at a GitHub Enterprise or test server
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        GitHubApi {
            base_url: base_url.into(),
            cache: ClientCache::new(),
        }
    }

    pub fn cache(&self) -> &ClientCache {
        &self.cache
    }
}

impl Default for GitHubApi {
    fn default() -> Self {
        Self::new()
    }
}

impl ReleaseHost for GitHubApi {
    fn verify_token(&self, token: &str) -> Result<()> {
        let login = self
            .cache
            .get_or_create(token, &self.base_url)?
            .authenticated_user()?;
        debug!(login = %login, "token verified");
        Ok(())
    }

    fn create_release(&self, token: &str, request: &ReleaseRequest) -> Result<PublishedRelease> {
        self.cache
            .get_or_create(token, &self.base_url)?
            .create_release(request)
    }
}
