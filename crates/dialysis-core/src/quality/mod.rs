//! Data quality: validation rules, reporting and repairs.

mod repair;
mod report;
mod validation;

pub use repair::*;
pub use report::*;
pub use validation::*;
