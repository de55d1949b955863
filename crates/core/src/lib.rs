//! Pure domain logic for the shiftline dispatch engine.
//!
//! Everything in this crate is synchronous and has zero internal deps so it
//! can be shared by the repository layer, the dispatch engine, and the
//! background worker without pulling in sqlx or tokio.

pub mod credits;
pub mod error;
pub mod interval;
pub mod notes;
pub mod phone;
pub mod prioritizer;
pub mod quota;
pub mod types;

pub use error::CoreError;
