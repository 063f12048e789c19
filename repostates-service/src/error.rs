// Service Errors
// Run-level failures; per-repository problems live in RepoState notes instead

use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid repository filter '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {path}: {message}")]
    Config { path: String, message: String },

    #[error("Repository task failed: {0}")]
    TaskFailed(String),

    #[error("No result collected for repository #{0}")]
    MissingResult(usize),
}

impl ServiceError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_message_includes_path() {
        let err = ServiceError::io(
            "/tmp/missing",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert_eq!(err.to_string(), "IO error at /tmp/missing: not found");
    }

    #[test]
    fn test_missing_result_message() {
        assert_eq!(
            ServiceError::MissingResult(3).to_string(),
            "No result collected for repository #3"
        );
    }
}
