pub mod constants;
pub mod converter;
pub mod frame;
pub mod ring_buffer;

// Public API
pub use converter::{convert, ConversionError};
pub use frame::{AudioFrame, CanonicalFormat, SampleKind};
pub use ring_buffer::RingSampleBuffer;
