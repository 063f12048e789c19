// Repository Module
// Repository identity, per-repository state, and discovery

pub mod discovery;
pub mod models;

// Re-export key types
pub use discovery::{discover, is_git_repo};
pub use models::{
    CapturedOutput, Divergence, HeadRef, NoteSeverity, RepoReport, RepoState, RepoStatus,
    Repository, RunOutcome, StepNote, TagInfo,
};
