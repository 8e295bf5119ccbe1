pub mod analyzer;
pub mod boundary;
pub mod changelog;
pub mod cli;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod git;
pub mod github;
pub mod manifest;
pub mod options;
pub mod pipeline;
pub mod resolver;
pub mod ui;

pub use context::ReleaseContext;
pub use error::{KiaraError, Result};
pub use options::ReleaseOptions;
pub use pipeline::{Pipeline, PipelineOutcome};
