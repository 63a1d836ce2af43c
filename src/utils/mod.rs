//! The `utils` module provides shared pieces used across `meterlink`:
//! the crate-wide error type and logging initialisation.

pub mod error;
pub mod logging;

pub use error::ClientError;
