//! Row models and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` struct matching the
//! database row, plus create/update DTOs where the API writes the table
//! directly. Record collections are written from the core record types.

pub mod form;
pub mod import_job;
pub mod lead;
pub mod response;
pub mod volunteer;
