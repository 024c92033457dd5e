//! Small shared helpers

pub mod deadline;

pub use deadline::with_deadline;
