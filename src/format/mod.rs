//! Sample-level utilities.
//!
//! - Linear gain on 16-bit PCM ([`scale`], [`scale_bytes`])
//! - Sample format conversion (f32 ↔ i16, i16 ↔ little-endian bytes)

mod convert;
mod scale;

pub use convert::{
    decode_le_into, encode_le_into, f32_to_i16, i16_to_f32, i16_to_le_bytes, le_bytes_to_i16,
};
pub use scale::{is_silent, is_unity, scale, scale_bytes, scale_sample};
