//! Utility functions for ids, timestamps and name validation.

mod timestamps;
mod uuid_utils;
pub mod validation;

pub use timestamps::{iso_timestamp, Timestamp};
pub use uuid_utils::generate_uuid;
