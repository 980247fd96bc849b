//! qmtrainer-core: Protocol table, evaluation engine, and session model.
//!
//! This crate defines the QM protocol, the pure scoring engine every caller
//! goes through, the session/feedback data model, and the store trait that
//! the rest of qmtrainer builds on.

pub mod engine;
pub mod error;
pub mod feedback;
pub mod model;
pub mod parser;
pub mod protocol;
pub mod report;
pub mod statistics;
pub mod traits;
