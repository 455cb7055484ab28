//! Background tasks.
//!
//! Each submodule provides a long-running async function intended to be
//! spawned on the state's [`TaskTracker`](tokio_util::task::TaskTracker)
//! so graceful shutdown can wait for it.

pub mod import_jobs;
