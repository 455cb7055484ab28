//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod form_repo;
pub mod import_job_repo;
pub mod lead_repo;
pub mod record_repo;
pub mod response_repo;
pub mod volunteer_repo;

pub use form_repo::FormRepo;
pub use import_job_repo::ImportJobRepo;
pub use lead_repo::LeadRepo;
pub use record_repo::RecordRepo;
pub use response_repo::ResponseRepo;
pub use volunteer_repo::VolunteerRepo;
