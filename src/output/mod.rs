//! Result persistence
//!
//! The pipeline hands finished results to a [`ResultWriter`]; the default
//! implementation writes the JSON envelope to disk.

pub mod writer;

pub use writer::{producer_tag, read_result, JsonFileWriter, ResultEnvelope, ResultWriter};
