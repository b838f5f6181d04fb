//! Compute backend trait and device abstraction.
//!
//! The [`ComputeBackend`] trait abstracts over where independent jobs run
//! (the caller's thread or a worker pool) so that the study code in
//! `ringpert-core` stays execution-agnostic.

use std::sync::Mutex;

use thiserror::Error;

/// Errors originating from compute backends.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Backend not available: {0}")]
    Unavailable(String),

    #[error("Job {index} did not produce a result")]
    MissingResult { index: usize },

    #[error("A worker panicked while running job {index}")]
    WorkerPanicked { index: usize },
}

/// Describes the capabilities of a compute backend.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub backend_type: BackendType,
    pub workers: usize,
}

/// The type of compute backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Serial,
    Cpu,
}

/// Abstraction over execution backends.
///
/// `execute` must invoke `job(i)` exactly once for every `i` in
/// `0..count` and return only after all invocations have finished. The
/// order of invocation is unspecified; callers that need ordered results use
/// [`map_indexed`].
pub trait ComputeBackend: Send + Sync {
    /// Return information about the backend.
    fn device_info(&self) -> DeviceInfo;

    /// Run `count` independent jobs.
    fn execute(
        &self,
        count: usize,
        job: &(dyn Fn(usize) + Send + Sync),
    ) -> Result<(), ComputeError>;
}

/// Run `count` jobs on `backend` and collect their results by index.
///
/// The returned vector is ordered by job index regardless of the order in
/// which the backend ran the jobs.
pub fn map_indexed<T, F>(
    backend: &dyn ComputeBackend,
    count: usize,
    job: F,
) -> Result<Vec<T>, ComputeError>
where
    T: Send,
    F: Fn(usize) -> T + Send + Sync,
{
    let slots: Vec<Mutex<Option<T>>> = (0..count).map(|_| Mutex::new(None)).collect();

    backend.execute(count, &|index| {
        let value = job(index);
        if let Some(slot) = slots.get(index) {
            // a poisoned slot only means another job panicked; keep going
            let mut guard = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            *guard = Some(value);
        }
    })?;

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.into_inner()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .ok_or(ComputeError::MissingResult { index })
        })
        .collect()
}
