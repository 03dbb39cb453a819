//! Error types for Tidemark
//!
//! A single error enum is shared by every module. Each variant carries:
//! - message: Human-readable error message
//! - context: Optional description of the operation that failed
//! - a variant-specific detail (path, field, resource type) where relevant

mod constructors;
mod conversions;
mod types;

pub use types::{ResultExt, TidemarkError, TidemarkResult};
