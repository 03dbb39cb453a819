//! Tidemark
//!
//! Incremental checkpointing for live-edited file trees. This crate
//! re-exports [`tidemark_core`]; the `tidemark` binary lives in
//! `crates/tidemark-cli`.

pub use tidemark_core::*;
