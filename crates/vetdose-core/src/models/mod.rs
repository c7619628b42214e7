//! Domain models for the dosing engine.

mod calculation;
mod context;
mod infusion;
mod interaction;
mod mechanism;
mod validation;

pub use calculation::*;
pub use context::*;
pub use infusion::*;
pub use interaction::*;
pub use mechanism::*;
pub use validation::*;
