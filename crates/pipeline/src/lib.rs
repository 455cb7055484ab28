//! Bulk import runner and the adapters it runs against.
//!
//! The runner only sees the capability traits in [`capabilities`]; the
//! PostgreSQL, filesystem and AI assistant implementations live in
//! [`store`] and [`assistant`] and are swapped for in-memory stubs in
//! tests.

pub mod assistant;
pub mod capabilities;
pub mod error;
pub mod runner;
pub mod settings;
pub mod store;

pub use capabilities::{JobStore, RecordSink, RowEnhancer, UploadStore};
pub use error::{EnhanceError, PipelineError};
pub use runner::{run_import_job, ImportJobSpec, ImportOutcome, ImportPorts};
pub use settings::ImportSettings;
