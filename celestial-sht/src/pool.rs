//! Worker pool for the transform phases.
//!
//! A [`TaskBatch`] collects independent fallible closures; [`ThreadPool::run_all_and_wait`]
//! runs them to completion and returns the first error. Tasks may borrow from
//! the caller's stack because the call does not return until all of them have
//! finished.
//!
//! With the `parallel` feature the pool wraps a dedicated `rayon` pool; without
//! it, or if the pool cannot be built, tasks run sequentially on the calling
//! thread.

use celestial_core::{SphereError, SphereResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Requested worker count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Threads {
    /// One worker per available hardware thread.
    #[default]
    Auto,
    Count(usize),
}

impl Threads {
    /// Concrete worker count.
    ///
    /// # Errors
    /// `InvalidParameter` for `Count(0)`.
    pub fn resolve(self) -> SphereResult<usize> {
        match self {
            Threads::Auto => Ok(std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)),
            Threads::Count(0) => Err(SphereError::invalid_parameter(
                "nthreads",
                "thread count must be positive",
            )),
            Threads::Count(n) => Ok(n),
        }
    }
}

impl fmt::Display for Threads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threads::Auto => f.write_str("auto"),
            Threads::Count(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for Threads {
    type Err = SphereError;

    fn from_str(s: &str) -> SphereResult<Self> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Threads::Auto);
        }
        match s.parse::<usize>() {
            Ok(0) | Err(_) => Err(SphereError::invalid_parameter(
                "nthreads",
                format!("expected a positive integer or \"auto\", got '{s}'"),
            )),
            Ok(n) => Ok(Threads::Count(n)),
        }
    }
}

/// Serialized as a positive integer or the string `"auto"`.
impl Serialize for Threads {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Threads::Auto => serializer.serialize_str("auto"),
            Threads::Count(n) => serializer.serialize_u64(*n as u64),
        }
    }
}

impl<'de> Deserialize<'de> for Threads {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Count(0) => Err(serde::de::Error::custom(
                "nthreads must be positive",
            )),
            Raw::Count(n) => Ok(Threads::Count(n as usize)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

type Task<'a> = Box<dyn FnOnce() -> SphereResult<()> + Send + 'a>;

/// A set of independent tasks submitted together.
#[derive(Default)]
pub struct TaskBatch<'a> {
    tasks: Vec<Task<'a>>,
}

impl<'a> TaskBatch<'a> {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tasks: Vec::with_capacity(capacity),
        }
    }

    pub fn submit<F>(&mut self, task: F)
    where
        F: FnOnce() -> SphereResult<()> + Send + 'a,
    {
        self.tasks.push(Box::new(task));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl fmt::Debug for TaskBatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskBatch")
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

/// Fixed-size worker pool.
pub struct ThreadPool {
    nthreads: usize,
    #[cfg(feature = "parallel")]
    inner: Option<rayon::ThreadPool>,
}

impl ThreadPool {
    /// Builds a pool, falling back to sequential execution if the workers
    /// cannot be started.
    ///
    /// # Errors
    /// `InvalidParameter` for `Threads::Count(0)`.
    pub fn new(threads: Threads) -> SphereResult<Self> {
        match Self::try_new(threads) {
            Ok(pool) => Ok(pool),
            Err(err) if err.is_recoverable() => {
                tracing::warn!(%err, "worker pool unavailable, running sequentially");
                Ok(Self::sequential())
            }
            Err(err) => Err(err),
        }
    }

    /// Like [`ThreadPool::new`] but reports `ThreadPoolUnavailable` instead of
    /// degrading.
    pub fn try_new(threads: Threads) -> SphereResult<Self> {
        let nthreads = threads.resolve()?;
        if nthreads == 1 {
            return Ok(Self::sequential());
        }
        #[cfg(feature = "parallel")]
        {
            let inner = rayon::ThreadPoolBuilder::new()
                .num_threads(nthreads)
                .thread_name(|i| format!("sht-worker-{i}"))
                .build()
                .map_err(|e| SphereError::thread_pool_unavailable(e.to_string()))?;
            tracing::debug!(nthreads, "started worker pool");
            Ok(Self {
                nthreads,
                inner: Some(inner),
            })
        }
        #[cfg(not(feature = "parallel"))]
        {
            tracing::debug!(
                requested = nthreads,
                "built without the parallel feature, running sequentially"
            );
            Ok(Self::sequential())
        }
    }

    /// A pool that runs every task on the calling thread.
    pub fn sequential() -> Self {
        Self {
            nthreads: 1,
            #[cfg(feature = "parallel")]
            inner: None,
        }
    }

    /// Number of workers (1 for a sequential pool).
    pub fn nthreads(&self) -> usize {
        self.nthreads
    }

    /// Runs every task in `batch` and waits for all of them.
    ///
    /// Returns the first error encountered; remaining tasks may be skipped once
    /// an error is seen.
    pub fn run_all_and_wait(&self, batch: TaskBatch<'_>) -> SphereResult<()> {
        #[cfg(feature = "parallel")]
        if let Some(pool) = &self.inner {
            return pool.install(|| batch.tasks.into_par_iter().try_for_each(|task| task()));
        }
        batch.tasks.into_iter().try_for_each(|task| task())
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("nthreads", &self.nthreads)
            .finish()
    }
}
