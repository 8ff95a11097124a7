//! Core types shared across logroute facilities
//!
//! This crate provides the value types used by both configuration and the
//! logging facility:
//!
//! - **Levels**: `Level` severity ladder with numeric values
//! - **Size specs**: `ByteSize` rotation thresholds (`"10 MB"`, `"512 KiB"`)
//! - **Retention specs**: `Retention` archive policies (`"1 month"`, `"10"`)
//! - **Schema constants**: Canonical field keys for serialized records

pub mod level;
pub mod retention;
pub mod schema;
pub mod size;

pub use level::{Level, ParseLevelError};
pub use retention::{ParseRetentionError, Retention};
pub use size::{ByteSize, ParseSizeError};
