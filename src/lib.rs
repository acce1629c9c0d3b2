#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod cancel;
mod config;
mod engine;
mod error;
mod graph;
#[cfg(feature = "logging")]
mod logging;
mod resolution;
mod utils;

use rayon::{ThreadPool, ThreadPoolBuilder};

pub use crate::cancel::{Cancellation, Cancelled};
pub use crate::config::{DEFAULT_WORKERS, ResolverConfig};
pub use crate::engine::{Diagnostics, Execution};
pub use crate::error::*;
pub use crate::graph::{Edge, Vertex};
#[cfg(feature = "logging")]
pub use crate::logging::init_logging;
pub use crate::resolution::Resolution;

/// Resolves dependency graphs with a bounded pool of workers.
///
/// A `Resolver` owns its worker threads and can be reused for any number of
/// runs. Every call to [`Resolver::resolve`] starts from an empty task table,
/// nothing is carried over between runs.
pub struct Resolver {
    config: ResolverConfig,
    pool: ThreadPool,
}

impl Resolver {
    pub fn config() -> ResolverConfig {
        ResolverConfig::new()
    }

    pub fn new(config: ResolverConfig) -> Result<Self, ResolveError> {
        config.validate()?;

        let prefix = config.thread_name.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(move |index| format!("{prefix}-{index}"))
            .build()?;

        Ok(Self { config, pool })
    }

    pub fn workers(&self) -> usize {
        self.config.workers
    }

    /// Discover and resolve every vertex reachable from `root`.
    ///
    /// Each distinct identity is resolved exactly once, by the first edge that
    /// discovered it. The first edge to fail aborts the whole run: the error
    /// is returned as soon as the workers still in flight have observed the
    /// cancellation, and nothing of the partial graph is reported.
    pub fn resolve<V: Vertex>(&self, root: V) -> Result<Resolution<V>, ResolveError> {
        engine::run(&self.pool, &self.config, root)
    }
}

/// Resolve `root` with the default configuration.
pub fn resolve<V: Vertex>(root: V) -> Result<Resolution<V>, ResolveError> {
    Resolver::new(ResolverConfig::default())?.resolve(root)
}
