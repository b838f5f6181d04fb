//! Serial backend: jobs run in index order on the calling thread.

use crate::backend::{BackendType, ComputeBackend, ComputeError, DeviceInfo};

/// Runs every job on the caller's thread, in index order.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialBackend;

impl ComputeBackend for SerialBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "Serial".into(),
            backend_type: BackendType::Serial,
            workers: 1,
        }
    }

    fn execute(
        &self,
        count: usize,
        job: &(dyn Fn(usize) + Send + Sync),
    ) -> Result<(), ComputeError> {
        for index in 0..count {
            job(index);
        }
        Ok(())
    }
}
