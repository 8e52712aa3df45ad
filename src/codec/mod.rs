//! Wire decoding: bytes to text, text to lines, lines to frames.
//!
//! Each stage keeps its own carry-over buffer so input may be split at any
//! byte. [`RunPipeline`](crate::pipeline::RunPipeline) chains them.

pub mod decoder;
pub mod frame;
pub mod lines;

pub use decoder::ByteDecoder;
pub use frame::{EventFrame, EventFrameParser};
pub use lines::LineAccumulator;
