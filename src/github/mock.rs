use std::sync::{Mutex, MutexGuard};

use crate::error::{KiaraError, Result};
use crate::github::{PublishedRelease, ReleaseHost, ReleaseRequest};

#[derive(Debug, Default)]
struct MockState {
    rejected_token: bool,
    fail_release: Option<u16>,
    verified: Vec<String>,
    releases: Vec<ReleaseRequest>,
}

/// Release host that records requests instead of calling GitHub
#[derive(Debug, Default)]
pub struct MockReleaseHost {
    state: Mutex<MockState>,
}

impl MockReleaseHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reject every token as unauthorized
    pub fn rejecting_token(self) -> Self {
        self.state().rejected_token = true;
        self
    }

    /// Fail release creation with the given HTTP status
    pub fn failing_release(self, status: u16) -> Self {
        self.state().fail_release = Some(status);
        self
    }

    pub fn verified_tokens(&self) -> Vec<String> {
        self.state().verified.clone()
    }

    pub fn releases(&self) -> Vec<ReleaseRequest> {
        self.state().releases.clone()
    }
}

impl ReleaseHost for MockReleaseHost {
    fn verify_token(&self, token: &str) -> Result<()> {
        let mut state = self.state();
        state.verified.push(token.to_string());
        if state.rejected_token {
            return Err(KiaraError::unauthorized(401));
        }
        Ok(())
    }

    fn create_release(&self, _token: &str, request: &ReleaseRequest) -> Result<PublishedRelease> {
        let mut state = self.state();
        match state.fail_release {
            Some(status @ (401 | 403)) => Err(KiaraError::unauthorized(status)),
            Some(status) => Err(KiaraError::github(format!(
                "Failed to create GitHub release ({})",
                status
            ))),
            None => {
                state.releases.push(request.clone());
                Ok(PublishedRelease {
                    id: state.releases.len() as u64,
                    html_url: format!(
                        "https://github.com/{}/{}/releases/tag/{}",
                        request.owner, request.repo, request.tag_name
                    ),
                })
            }
        }
    }
}
