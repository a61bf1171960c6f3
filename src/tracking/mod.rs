//! Visit capture pipeline
//!
//! Appends a visit record for every redirect hit and resolves the visitor's
//! IP location in a tracked background task.

pub mod in_flight;
pub mod recorder;

pub use in_flight::InFlightLookups;
pub use recorder::{RequestMeta, VisitRecorder};
