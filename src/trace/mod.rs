//! Trace table row types.

pub mod models;

pub use models::*;
