//! Durable storage of fitted model parameters.

mod record;

pub use record::{ModelRecord, RECORD_VERSION};
