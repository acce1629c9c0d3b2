use std::borrow::Cow;
use std::time::Duration;

use crate::{ResolveError, Resolver};

/// Default capacity of the admission gate.
pub const DEFAULT_WORKERS: usize = 5;

/// Settings for a [`Resolver`].
///
/// ```rust,no_run
/// use std::time::Duration;
///
/// let resolver = depwalk::Resolver::config()
///     .workers(8)
///     .timeout(Duration::from_secs(60))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Maximum number of edges resolved at the same time.
    pub(crate) workers: usize,
    /// Wall-clock bound for a whole run.
    pub(crate) timeout: Option<Duration>,
    /// Attach a progress bar to the run span.
    pub(crate) progress: bool,
    pub(crate) thread_name: Cow<'static, str>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            timeout: None,
            progress: true,
            thread_name: Cow::Borrowed("depwalk"),
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Prefix for worker thread names, suffixed with the thread index.
    pub fn thread_name(mut self, prefix: impl Into<Cow<'static, str>>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ResolveError> {
        if self.workers == 0 {
            return Err(ResolveError::InvalidConfig("workers must be greater than zero"));
        }

        if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ResolveError::InvalidConfig("timeout must not be zero"));
        }

        Ok(())
    }

    /// Validate the settings and spin up the worker pool.
    pub fn build(self) -> Result<Resolver, ResolveError> {
        Resolver::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.timeout, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = ResolverConfig::new().workers(0);
        assert!(matches!(
            config.validate(),
            Err(ResolveError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ResolverConfig::new().timeout(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ResolveError::InvalidConfig(_))
        ));
    }
}
