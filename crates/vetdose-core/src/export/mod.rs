//! Export functionality for reports and audit records.

mod audit;
mod report;

pub use audit::*;
pub use report::*;
