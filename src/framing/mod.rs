//! Response framing
//!
//! Decodes the Export API's newline-delimited JSON bodies, buffered or as an
//! incremental stream of record batches.

pub mod decoder;
pub mod stream;

// Re-export commonly used types
pub use decoder::{decode_body, decode_chunk, DecodedBatch, Record};
pub use stream::RecordBatchStream;
