//! Domain models for the exam agenda system.

mod appointment;
mod exam;
mod import;
mod patient;

pub use appointment::*;
pub use exam::*;
pub use import::*;
pub use patient::*;
