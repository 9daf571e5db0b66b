use log::{debug, error, info};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::format::{Footer, Image};
use crate::constants::{EXTENSION_AREA_SIZE, FOOTER_SIZE, HEADER_SIZE, RLE_FLAG};

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("In-memory {field} is {actual} bytes, header declares {expected}")]
    SizeMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Header declares a zero dimension: width={width} height={height} bits_per_pixel={bits_per_pixel}")]
    ZeroDimension {
        width: u16,
        height: u16,
        bits_per_pixel: u8,
    },
    #[error("Cannot create file `{}`", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("I/O error while writing TGA data")]
    Io(#[from] io::Error),
}

/// Serializes `image` and writes it to `path`, replacing any existing file.
pub fn encode(image: &Image, path: impl AsRef<Path>) -> Result<(), EncodeError> {
    let path = path.as_ref();
    let encoded_data = encode_to_vec(image)?;

    let mut file = File::create(path).map_err(|source| {
        error!("Cannot create {}: {}", path.display(), source);
        EncodeError::Create {
            path: path.to_path_buf(),
            source,
        }
    })?;
    file.write_all(&encoded_data)?;
    file.flush()?;

    info!("Wrote {} bytes to {}", encoded_data.len(), path.display());
    Ok(())
}

/// Serializes `image` as an uncompressed version 2 TGA file.
pub fn encode_to_vec(image: &Image) -> Result<Vec<u8>, EncodeError> {
    info!("Starting encoding");
    check_sizes(image)?;

    let pixel_data_end = HEADER_SIZE
        + image.image_id_data.len()
        + image.color_map.len()
        + image.image_data.len();
    let mut encoded_data: Vec<u8> =
        Vec::with_capacity(pixel_data_end + EXTENSION_AREA_SIZE + FOOTER_SIZE);

    // Step 1: Header, always uncompressed on the way out
    let mut header = image.header;
    header.image_type &= !RLE_FLAG;
    encoded_data.extend_from_slice(&header.to_bytes());
    debug!("Header written: {:?}", header);

    // Step 2: Variable-length fields
    encoded_data.extend_from_slice(&image.image_id_data);
    encoded_data.extend_from_slice(&image.color_map);
    debug!(
        "Image id ({} bytes) and color map ({} bytes) written",
        image.image_id_data.len(),
        image.color_map.len()
    );

    // Step 3: Pixel data
    encoded_data.extend_from_slice(&image.image_data);
    debug!("Pixel data written: {} bytes", image.image_data.len());

    // Step 4: Extension area
    let ext_area_offset = encoded_data.len();
    let ext = image.ext_area.clone().unwrap_or_default().stamped();
    encoded_data.extend_from_slice(&ext.to_bytes());
    debug!(
        "Extension area written at offset {} for author {:?}",
        ext_area_offset,
        ext.author_name()
    );

    // Step 5: Footer
    let footer = Footer {
        ext_area_offset: u32::try_from(ext_area_offset).map_err(|_| {
            error!("Extension area offset {} does not fit in u32", ext_area_offset);
            EncodeError::SizeMismatch {
                field: "extension area offset",
                expected: u32::MAX as usize,
                actual: ext_area_offset,
            }
        })?,
        dev_dir_offset: 0,
        ..Footer::default()
    };
    encoded_data.extend_from_slice(&footer.to_bytes());

    info!("Encoding completed: {} bytes", encoded_data.len());
    Ok(encoded_data)
}

fn check_sizes(image: &Image) -> Result<(), EncodeError> {
    let header = &image.header;
    let spec = &header.image_spec;
    if spec.width == 0 || spec.height == 0 || spec.bits_per_pixel == 0 {
        error!(
            "Refusing to encode zero dimension: {}x{} at {} bits",
            spec.width, spec.height, spec.bits_per_pixel
        );
        return Err(EncodeError::ZeroDimension {
            width: spec.width,
            height: spec.height,
            bits_per_pixel: spec.bits_per_pixel,
        });
    }

    let checks = [
        ("image data", header.image_data_len(), image.image_data.len()),
        ("color map", header.color_map_spec.byte_len(), image.color_map.len()),
        ("image id", header.id_length as usize, image.image_id_data.len()),
    ];

    for (field, expected, actual) in checks {
        if expected != actual {
            error!(
                "In-memory {} is {} bytes, header declares {}",
                field, actual, expected
            );
            return Err(EncodeError::SizeMismatch {
                field,
                expected,
                actual,
            });
        }
    }
    Ok(())
}
