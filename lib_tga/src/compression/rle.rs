use log::{debug, error};
use thiserror::Error;

const PACKET_TYPE_BIT: u8 = 0x80;
const PACKET_COUNT_MASK: u8 = 0x7f;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RleDecodeError {
    #[error("Invalid pixel width: pixels must be at least one byte wide")]
    ZeroPixelWidth,
    #[error("Packet at source offset {offset} needs {needed} bytes, only {available} left")]
    SourceOverrun {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("Packet at source offset {offset} expands to {produced} bytes, only {remaining} expected")]
    OutputOverrun {
        offset: usize,
        produced: usize,
        remaining: usize,
    },
}

/// Decodes TGA packet run-length encoded pixel data.
///
/// Each packet starts with a control byte. If its high bit is set the packet
/// is a run: the low seven bits plus one give the repeat count, and a single
/// pixel follows. Otherwise the packet is raw: the same count gives the number
/// of literal pixels that follow.
///
/// # Arguments
/// * `src` - Encoded bytes, starting at the first packet
/// * `pixel_byte_width` - Number of bytes per pixel
/// * `total_bytes` - Size of the decoded buffer
///
/// # Returns
/// * `Result<Vec<u8>, RleDecodeError>` - Exactly `total_bytes` decoded bytes or error
///
/// Decoding stops as soon as `total_bytes` have been produced; anything left in
/// `src` after that is not looked at.
pub fn decode(
    src: &[u8],
    pixel_byte_width: usize,
    total_bytes: usize,
) -> Result<Vec<u8>, RleDecodeError> {
    if pixel_byte_width == 0 {
        return Err(RleDecodeError::ZeroPixelWidth);
    }

    // a packet expands to at most 128 pixels, so the source bounds the output
    let reachable = src
        .len()
        .saturating_mul(128 * pixel_byte_width)
        .min(total_bytes);
    let mut decoded = Vec::with_capacity(reachable);
    let mut cursor = 0;
    let mut packets = 0usize;

    while decoded.len() < total_bytes {
        let control = *src.get(cursor).ok_or_else(|| {
            error!("RLE source exhausted before control byte at offset {}", cursor);
            RleDecodeError::SourceOverrun {
                offset: cursor,
                needed: 1,
                available: 0,
            }
        })?;
        let count = (control & PACKET_COUNT_MASK) as usize + 1;
        let is_run = control & PACKET_TYPE_BIT != 0;

        let produced = count * pixel_byte_width;
        let remaining = total_bytes - decoded.len();
        if produced > remaining {
            error!(
                "RLE packet at offset {} overflows output: {} > {}",
                cursor, produced, remaining
            );
            return Err(RleDecodeError::OutputOverrun {
                offset: cursor,
                produced,
                remaining,
            });
        }

        let needed = if is_run { pixel_byte_width } else { produced };
        let body_start = cursor + 1;
        let available = src.len() - body_start;
        if needed > available {
            error!(
                "RLE packet at offset {} needs {} bytes, {} available",
                cursor, needed, available
            );
            return Err(RleDecodeError::SourceOverrun {
                offset: cursor,
                needed,
                available,
            });
        }

        let body = &src[body_start..body_start + needed];
        if is_run {
            for _ in 0..count {
                decoded.extend_from_slice(body);
            }
        } else {
            decoded.extend_from_slice(body);
        }

        cursor = body_start + needed;
        packets += 1;
    }

    debug!(
        "RLE decoded {} packets: {} source bytes -> {} bytes",
        packets,
        cursor,
        decoded.len()
    );

    Ok(decoded)
}
