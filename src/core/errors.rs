use std::time::Duration;
use thiserror::Error;
use crate::core::ports::RepositoryError;

/// Errors the discovery engine reports to callers and to the error slot
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FeedError {
    #[error("You need to be signed in to do that")]
    NotAuthenticated,

    #[error("Your profile could not be found")]
    ProfileNotFound,

    #[error("No network connection")]
    NetworkUnavailable,

    /// The profile is no longer in the queue, typically already decided
    #[error("Profile {0} is no longer available")]
    CandidateUnavailable(String),

    #[error("{0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for FeedError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Network(_) => FeedError::NetworkUnavailable,
            RepositoryError::Unauthorized => FeedError::NotAuthenticated,
            other => FeedError::Repository(other),
        }
    }
}

impl FeedError {
    /// How long the error stays in the error slot before clearing itself.
    ///
    /// `None` means it stays until replaced or until a later load succeeds.
    pub fn auto_dismiss_after(&self, transient_delay: Duration) -> Option<Duration> {
        match self {
            FeedError::NetworkUnavailable => None,
            _ => Some(transient_delay),
        }
    }
}

pub type FeedResult<T> = Result<T, FeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_errors_are_not_auto_dismissed() {
        let err: FeedError = RepositoryError::Network("offline".into()).into();
        assert_eq!(err, FeedError::NetworkUnavailable);
        assert_eq!(err.auto_dismiss_after(Duration::from_secs(3)), None);
    }

    #[test]
    fn test_backend_errors_are_transient() {
        let err: FeedError = RepositoryError::Backend("500".into()).into();
        assert_eq!(
            err.auto_dismiss_after(Duration::from_secs(3)),
            Some(Duration::from_secs(3))
        );
        assert_eq!(err.to_string(), "Repository error: 500");
    }

    #[test]
    fn test_unavailable_candidate_message() {
        let err = FeedError::CandidateUnavailable("c0".into());
        assert_eq!(err.to_string(), "Profile c0 is no longer available");
    }
}
