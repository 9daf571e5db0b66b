pub mod rle;

pub use rle::RleDecodeError;
