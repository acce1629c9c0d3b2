use std::time::Duration;

use thiserror::Error;

pub use anyhow::Error as EdgeError;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Couldn't resolve '{target}':\n{source}")]
    Edge {
        target: String,
        #[source]
        source: EdgeError,
    },

    #[error("Resolving '{target}' panicked: {message}")]
    Panicked { target: String, message: String },

    #[error("Resolution timed out after {elapsed:.2?} with {pending} unresolved vertices")]
    Timeout { elapsed: Duration, pending: usize },

    #[error("Resolution stalled with {pending} unresolved vertices and no work in flight")]
    Stalled { pending: usize },

    #[error("Failed to build the worker pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Invalid progress bar template")]
    Progress(#[from] indicatif::style::TemplateError),

    #[error("Invalid resolver configuration: {0}")]
    InvalidConfig(&'static str),
}

impl ResolveError {
    /// Display string of the identity whose edge failed, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            ResolveError::Edge { target, .. } | ResolveError::Panicked { target, .. } => {
                Some(target)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_error_carries_target() {
        let err = ResolveError::Edge {
            target: "github.com/acme/app:v1".into(),
            source: anyhow::anyhow!("manifest not found"),
        };

        assert_eq!(err.target(), Some("github.com/acme/app:v1"));

        let text = err.to_string();
        assert!(text.contains("github.com/acme/app:v1"));
        assert!(text.contains("manifest not found"));
    }

    #[test]
    fn test_no_target_for_run_errors() {
        let err = ResolveError::Stalled { pending: 2 };
        assert_eq!(err.target(), None);
    }
}
