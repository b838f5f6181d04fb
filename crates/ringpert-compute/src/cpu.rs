//! CPU compute backend using Rayon for shared-memory parallelism.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::backend::{BackendType, ComputeBackend, ComputeError, DeviceInfo};

/// CPU backend that spreads jobs across a Rayon thread pool.
pub struct CpuBackend {
    num_threads: usize,
}

impl CpuBackend {
    /// Create a new CPU backend using all available threads.
    pub fn new() -> Self {
        Self {
            num_threads: rayon::current_num_threads(),
        }
    }

    /// Create a CPU backend with a specified thread count (at least one).
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: num_threads.max(1),
        }
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: format!("CPU ({} threads)", self.num_threads),
            backend_type: BackendType::Cpu,
            workers: self.num_threads,
        }
    }

    fn execute(
        &self,
        count: usize,
        job: &(dyn Fn(usize) + Send + Sync),
    ) -> Result<(), ComputeError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .build()
            .map_err(|e| ComputeError::Unavailable(e.to_string()))?;

        let panicked = AtomicUsize::new(usize::MAX);
        pool.install(|| {
            (0..count).into_par_iter().for_each(|index| {
                if catch_unwind(AssertUnwindSafe(|| job(index))).is_err() {
                    log::error!("worker panicked on job {}", index);
                    panicked.fetch_min(index, Ordering::Relaxed);
                }
            });
        });

        match panicked.into_inner() {
            usize::MAX => Ok(()),
            index => Err(ComputeError::WorkerPanicked { index }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::map_indexed;

    #[test]
    fn test_parallel_results_match_serial() {
        let backend = CpuBackend::with_threads(4);
        let out = map_indexed(&backend, 64, |i| (i as f64).sqrt()).unwrap();
        for (i, v) in out.iter().enumerate() {
            assert_eq!(*v, (i as f64).sqrt());
        }
    }

    #[test]
    fn test_panic_is_reported_not_propagated() {
        let backend = CpuBackend::with_threads(2);
        let err = backend
            .execute(8, &|i| {
                if i == 3 {
                    panic!("boom");
                }
            })
            .unwrap_err();
        assert!(matches!(err, ComputeError::WorkerPanicked { index: 3 }));
    }

    #[test]
    fn test_thread_count_floor() {
        assert_eq!(CpuBackend::with_threads(0).device_info().workers, 1);
    }
}
