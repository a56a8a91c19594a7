//! Domain models for the dialysis records system.

mod document;
mod ids;
mod patient;
mod records;
mod staff;

pub use document::*;
pub use ids::*;
pub use patient::*;
pub use records::*;
pub use staff::*;
