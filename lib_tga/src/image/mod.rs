pub mod canvas;
pub mod decoder;
pub mod encoder;
pub mod format;

pub use canvas::BoundsError;
pub use decoder::{decode, decode_from, DecodeError};
pub use encoder::{encode, encode_to_vec, EncodeError};
