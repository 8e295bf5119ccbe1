use thiserror::Error;

/// Message shown when the hosting API rejects the token.
pub const PERMISSION_HINT: &str = "Please ensure you have the required permissions and, if using a \
fine-grained PAT for an organization, that it was created in the organization settings.";

/// Unified error type for kiara operations
#[derive(Error, Debug)]
pub enum KiaraError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Version error: {0}")]
    Version(String),

    #[error("Git command failed: {0}")]
    Git(String),

    #[error("Git repository error: {0}")]
    Repository(#[from] git2::Error),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Changelog error: {0}")]
    Changelog(String),

    #[error("GitHub API error: {0}")]
    GitHub(String),

    #[error("GitHub rejected the request ({status}). {hint}")]
    Unauthorized { status: u16, hint: &'static str },

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<KiaraError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in kiara
pub type Result<T> = std::result::Result<T, KiaraError>;

impl KiaraError {
    pub fn config(msg: impl Into<String>) -> Self {
        KiaraError::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        KiaraError::Validation(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        KiaraError::Precondition(msg.into())
    }

    pub fn version(msg: impl Into<String>) -> Self {
        KiaraError::Version(msg.into())
    }

    pub fn git(msg: impl Into<String>) -> Self {
        KiaraError::Git(msg.into())
    }

    pub fn manifest(msg: impl Into<String>) -> Self {
        KiaraError::Manifest(msg.into())
    }

    pub fn changelog(msg: impl Into<String>) -> Self {
        KiaraError::Changelog(msg.into())
    }

    pub fn github(msg: impl Into<String>) -> Self {
        KiaraError::GitHub(msg.into())
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        KiaraError::Cancelled(msg.into())
    }

    pub fn unauthorized(status: u16) -> Self {
        KiaraError::Unauthorized {
            status,
            hint: PERMISSION_HINT,
        }
    }

    /// Wrap an error as the failure of a named pipeline stage
    pub fn in_stage(self, stage: &'static str) -> Self {
        match self {
            already @ KiaraError::Stage { .. } => already,
            other => KiaraError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// True for failures that happen before any side effect
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            KiaraError::Precondition(_) | KiaraError::Validation(_) | KiaraError::Config(_)
        )
    }
}
