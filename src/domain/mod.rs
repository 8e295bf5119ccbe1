//! Domain logic - pure release rules independent of git and the filesystem

pub mod commit;
pub mod repository;
pub mod template;
pub mod version;

pub use commit::{CommitNote, ParsedCommit};
pub use repository::RepositorySlug;
pub use template::Template;
pub use version::{increment, parse_version, PreReleaseSpec, ReleaseType};
