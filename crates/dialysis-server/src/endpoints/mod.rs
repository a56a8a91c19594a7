//! Request handlers, one module per resource.

pub mod misc;
pub mod patients;
pub mod records;
