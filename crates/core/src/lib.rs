//! Domain logic for the form engine: schemas and conditional visibility,
//! submission processing and routing, heuristic classification and lead
//! scoring, and the pure parts of bulk import.
//!
//! Nothing here touches the database or the network.

pub mod admission;
pub mod classify;
pub mod error;
pub mod form;
pub mod import;
pub mod records;
pub mod routing;
pub mod submission;
pub mod types;
