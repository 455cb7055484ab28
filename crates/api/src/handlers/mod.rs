pub mod forms;
pub mod imports;
pub mod public;
pub mod records;
pub mod responses;
