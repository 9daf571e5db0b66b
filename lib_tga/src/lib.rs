pub mod compression;
pub mod constants;
pub mod image;

use log::*;
use std::io::Write;

pub use crate::image::format::{Image, Pixel};
pub use crate::image::{
    decode, decode_from, encode, encode_to_vec, BoundsError, DecodeError, EncodeError,
};

/// Installs a stderr logger with `lib_tga` at debug level. `RUST_LOG`
/// directives are applied on top.
pub fn init_logging() {
    env_logger::Builder::new()
        .target(env_logger::Target::Stderr)
        .filter(Some("lib_tga"), LevelFilter::Debug)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}:{}] {}",
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();
}
