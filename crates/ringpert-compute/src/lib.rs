//! # Ringpert Compute
//!
//! Execution backends for the ringpert workspace. A convergence sweep is a
//! list of independent, heavyweight solver runs; this crate decides where
//! those runs execute without the study code knowing about threads.
//!
//! ## Available backends
//!
//! | Backend | Feature flag | Behaviour |
//! |---------|-------------|-----------|
//! | Serial | always | Jobs run in index order on the caller's thread |
//! | CPU (Rayon) | `cpu` (default) | Jobs run on a dedicated thread pool |
//!
//! Every job builds and owns its own solver state, so a backend only ever
//! hands out indices; nothing mutable is shared between workers.

pub mod backend;
pub mod serial;

#[cfg(feature = "cpu")]
pub mod cpu;

pub use backend::{map_indexed, BackendType, ComputeBackend, ComputeError, DeviceInfo};
pub use serial::SerialBackend;

#[cfg(feature = "cpu")]
pub use cpu::CpuBackend;
