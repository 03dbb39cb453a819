//! Per-file snapshot timelines

mod encoding;
mod store;


pub use encoding::{decode_path, encode_path};
pub use store::TimelineStore;
