use super::canvas::{flip_columns, flip_rows};
use super::format::{ExtensionArea, Footer, Header, Image, ImageKind};
use crate::compression::{rle, RleDecodeError};
use crate::constants::{
    EXTENSION_AREA_SIZE, FOOTER_SIZE, HEADER_SIZE, RIGHT_ORIGIN_FLAG, RLE_FLAG, TOP_ORIGIN_FLAG,
};
use log::{debug, error, info, warn};
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Cannot open file `{}`", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("I/O error while reading TGA data")]
    Io(#[from] io::Error),
    #[error("Expected {expected} bytes in {field} field, got only {actual}")]
    Truncated {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Malformed header: {0}")]
    Malformed(String),
    #[error("Unsupported image: {0}")]
    Unsupported(&'static str),
    #[error("Corrupt RLE pixel data")]
    CorruptRle(#[from] RleDecodeError),
}

/// Reads and decodes the TGA file at `path`.
///
/// The whole file is read into memory and the handle closed before any
/// parsing happens.
pub fn decode(path: impl AsRef<Path>) -> Result<Image, DecodeError> {
    let path = path.as_ref();
    info!("Decoding {}", path.display());

    let buffer = {
        let mut file = File::open(path).map_err(|source| {
            error!("Cannot open {}: {}", path.display(), source);
            DecodeError::Open {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        buffer
    };
    debug!("Read {} bytes from {}", buffer.len(), path.display());

    decode_from(&mut Cursor::new(buffer))
}

/// Decodes a TGA image from any seekable source. Every structured read seeks
/// to its absolute offset first, so the reader's starting position does not
/// matter.
pub fn decode_from<R: Read + Seek>(reader: &mut R) -> Result<Image, DecodeError> {
    let mut header = parse_header(reader)?;
    let (image_id_data, color_map) = read_variable_fields(reader, &header)?;
    let image_data = read_pixel_data(reader, &mut header)?;

    let footer = match parse_footer(reader) {
        // small version 1 files can be shorter than a footer
        Err(DecodeError::Truncated {
            field: "footer", ..
        }) => {
            debug!("Source too short for a footer, treating as a version 1 file");
            Footer::legacy()
        }
        other => other?,
    };
    let is_new_format = footer.is_new_format();
    let ext_area = if is_new_format {
        read_extension_area(reader, &footer)
    } else {
        debug!("No footer signature, treating as a version 1 file");
        None
    };

    info!(
        "Decoding completed: {}x{} at {} bytes per pixel",
        header.image_spec.width,
        header.image_spec.height,
        header.pixel_byte_width()
    );

    Ok(Image {
        header,
        footer,
        ext_area,
        image_id_data,
        color_map,
        image_data,
        is_new_format,
    })
}

/// Reads the fixed 18-byte header at offset 0 and checks its invariants.
/// Leaves the reader positioned just past the header.
pub fn parse_header<R: Read + Seek>(reader: &mut R) -> Result<Header, DecodeError> {
    reader.seek(SeekFrom::Start(0))?;
    let bytes = read_field(reader, "header", HEADER_SIZE)?;
    let mut raw = [0u8; HEADER_SIZE];
    raw.copy_from_slice(&bytes);

    let header = Header::from_bytes(&raw);
    debug!("Header read: {:?}", header);

    validate_header(&header).inspect_err(|e| error!("{}", e))?;
    Ok(header)
}

fn validate_header(header: &Header) -> Result<(), DecodeError> {
    let spec = &header.image_spec;

    if header.color_map_type > 1 {
        return Err(DecodeError::Malformed(format!(
            "unknown color map type {}",
            header.color_map_type
        )));
    }
    if header.color_map_type == 0 && !header.color_map_spec.is_zero() {
        return Err(DecodeError::Malformed(format!(
            "no color map declared but color map spec is {:?}",
            header.color_map_spec
        )));
    }
    if spec.width == 0 || spec.height == 0 || spec.bits_per_pixel == 0 {
        return Err(DecodeError::Malformed(format!(
            "zero dimension: width={} height={} bits_per_pixel={}",
            spec.width, spec.height, spec.bits_per_pixel
        )));
    }
    if !matches!(header.image_type, 0..=3 | 9..=11) {
        return Err(DecodeError::Malformed(format!(
            "unknown image type {}",
            header.image_type
        )));
    }

    Ok(())
}

/// Reads the image-ID and color-map fields that follow the header.
///
/// # Returns
/// * `(image_id_data, color_map)` - exactly as many bytes as the header declares
///
/// # Errors
/// - `Unsupported` for color-mapped and grayscale images
/// - `Truncated` if either field is shorter than declared
pub fn read_variable_fields<R: Read + Seek>(
    reader: &mut R,
    header: &Header,
) -> Result<(Vec<u8>, Vec<u8>), DecodeError> {
    if header.color_map_type == 1 || header.kind() == Some(ImageKind::ColorMapped) {
        error!("Color-mapped image (type {}) rejected", header.image_type);
        return Err(DecodeError::Unsupported("color-mapped images are not supported"));
    }
    if header.kind() == Some(ImageKind::Grayscale) {
        error!("Grayscale image (type {}) rejected", header.image_type);
        return Err(DecodeError::Unsupported("grayscale images are not supported"));
    }

    reader.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
    let image_id_data = read_field(reader, "image id", header.id_length as usize)?;
    debug!("Image id: {} bytes", image_id_data.len());

    let color_map = read_field(reader, "color map", header.color_map_spec.byte_len())?;
    debug!("Color map: {} bytes", color_map.len());

    Ok((image_id_data, color_map))
}

/// Reads raw or RLE pixel data and brings it to bottom-left origin. The
/// origin and RLE flags are cleared in `header` afterwards, since the
/// returned buffer is always uncompressed and bottom-up.
pub fn read_pixel_data<R: Read + Seek>(
    reader: &mut R,
    header: &mut Header,
) -> Result<Vec<u8>, DecodeError> {
    if header.is_empty() {
        debug!("Header declares no image data");
        return Ok(Vec::new());
    }

    let offset = HEADER_SIZE + header.id_length as usize + header.color_map_spec.byte_len();
    reader.seek(SeekFrom::Start(offset as u64))?;

    let pixel_byte_width = header.pixel_byte_width();
    let total_bytes = header.image_data_len();

    let mut data = if header.is_rle() {
        let mut src = Vec::new();
        reader.read_to_end(&mut src)?;
        debug!(
            "Decoding RLE pixel data: {} source bytes, {} expected",
            src.len(),
            total_bytes
        );
        rle::decode(&src, pixel_byte_width, total_bytes)?
    } else {
        read_field(reader, "image data", total_bytes)?
    };

    let width = header.image_spec.width as usize;
    let height = header.image_spec.height as usize;
    let descriptor = &mut header.image_spec.descriptor;

    if *descriptor & TOP_ORIGIN_FLAG != 0 {
        debug!("Top origin, flipping rows");
        flip_rows(&mut data, width, height, pixel_byte_width);
    }
    if *descriptor & RIGHT_ORIGIN_FLAG != 0 {
        debug!("Right origin, flipping columns");
        flip_columns(&mut data, width, pixel_byte_width);
    }
    *descriptor &= !(TOP_ORIGIN_FLAG | RIGHT_ORIGIN_FLAG);
    header.image_type &= !RLE_FLAG;

    Ok(data)
}

/// Reads the 26-byte footer at the end of the source.
pub fn parse_footer<R: Read + Seek>(reader: &mut R) -> Result<Footer, DecodeError> {
    let len = reader.seek(SeekFrom::End(0))?;
    if len < FOOTER_SIZE as u64 {
        error!("Source of {} bytes is too short for a footer", len);
        return Err(DecodeError::Truncated {
            field: "footer",
            expected: FOOTER_SIZE,
            actual: len as usize,
        });
    }

    reader.seek(SeekFrom::Start(len - FOOTER_SIZE as u64))?;
    let bytes = read_field(reader, "footer", FOOTER_SIZE)?;
    let mut raw = [0u8; FOOTER_SIZE];
    raw.copy_from_slice(&bytes);

    let footer = Footer::from_bytes(&raw);
    debug!(
        "Footer read: ext_area_offset={} dev_dir_offset={} new_format={}",
        footer.ext_area_offset,
        footer.dev_dir_offset,
        footer.is_new_format()
    );
    Ok(footer)
}

/// Reads the extension area a version 2 footer points at, if any.
///
/// Unparsed parts of the file (developer area, extension sub-tables) only
/// produce warnings. An extension area that cannot be read is also only a
/// warning: the pixel data is still usable, so the image decodes without it.
pub fn read_extension_area<R: Read + Seek>(
    reader: &mut R,
    footer: &Footer,
) -> Option<ExtensionArea> {
    if footer.dev_dir_offset != 0 {
        warn!(
            "Developer area at offset {} is present but not parsed",
            footer.dev_dir_offset
        );
    }
    if footer.ext_area_offset == 0 {
        return None;
    }

    let ext = match read_extension_area_at(reader, footer.ext_area_offset as u64) {
        Ok(ext) => ext,
        Err(e) => {
            warn!(
                "Ignoring unreadable extension area at offset {}: {}",
                footer.ext_area_offset, e
            );
            return None;
        }
    };

    if ext.color_correction_offset != 0 {
        warn!(
            "Color correction table at offset {} is present but not parsed",
            ext.color_correction_offset
        );
    }
    if ext.postage_stamp_offset != 0 {
        warn!(
            "Postage stamp image at offset {} is present but not parsed",
            ext.postage_stamp_offset
        );
    }
    if ext.scan_line_offset != 0 {
        warn!(
            "Scan line table at offset {} is present but not parsed",
            ext.scan_line_offset
        );
    }

    debug!("Extension area read, author: {:?}", ext.author_name());
    Some(ext)
}

fn read_extension_area_at<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
) -> Result<ExtensionArea, DecodeError> {
    reader.seek(SeekFrom::Start(offset))?;
    let bytes = read_field(reader, "extension area", EXTENSION_AREA_SIZE)?;
    let mut raw = [0u8; EXTENSION_AREA_SIZE];
    raw.copy_from_slice(&bytes);
    Ok(ExtensionArea::from_bytes(&raw))
}

/// Reads exactly `expected` bytes from the current position or reports how
/// many were there. The remaining length is checked before allocating, so a
/// header declaring a huge field cannot force a huge buffer.
fn read_field<R: Read + Seek>(
    reader: &mut R,
    field: &'static str,
    expected: usize,
) -> Result<Vec<u8>, DecodeError> {
    let position = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(position))?;
    let available = usize::try_from(end.saturating_sub(position)).unwrap_or(usize::MAX);

    if available < expected {
        error!(
            "Expected {} bytes in {} field, got only {}",
            expected, field, available
        );
        return Err(DecodeError::Truncated {
            field,
            expected,
            actual: available,
        });
    }

    let mut bytes = vec![0u8; expected];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::format::{ColorMapSpec, ImageSpec};
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use std::sync::Mutex;

    /// Keeps every warning logged by this crate.
    struct WarningCapture(Mutex<Vec<String>>);

    impl Log for WarningCapture {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= Level::Warn
        }

        fn log(&self, record: &Record) {
            if record.level() == Level::Warn {
                if let Ok(mut warnings) = self.0.lock() {
                    warnings.push(record.args().to_string());
                }
            }
        }

        fn flush(&self) {}
    }

    static WARNINGS: WarningCapture = WarningCapture(Mutex::new(Vec::new()));

    fn captured_warnings() -> Vec<String> {
        WARNINGS.0.lock().unwrap().clone()
    }

    fn header(image_type: u8, width: u16, height: u16, bpp: u8) -> Header {
        Header {
            id_length: 0,
            color_map_type: 0,
            image_type,
            color_map_spec: ColorMapSpec::default(),
            image_spec: ImageSpec {
                width,
                height,
                bits_per_pixel: bpp,
                ..ImageSpec::default()
            },
        }
    }

    #[test]
    fn test_parse_header_short_input() {
        let mut cursor = Cursor::new(vec![0u8; 10]);
        assert!(matches!(
            parse_header(&mut cursor),
            Err(DecodeError::Truncated {
                field: "header",
                expected: 18,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_parse_header_ignores_start_position() {
        let bytes = header(2, 2, 2, 32).to_bytes().to_vec();
        let mut cursor = Cursor::new(bytes);
        cursor.set_position(7);
        let parsed = parse_header(&mut cursor).unwrap();
        assert_eq!(parsed.image_spec.width, 2);
        assert_eq!(cursor.position(), HEADER_SIZE as u64);
    }

    #[test]
    fn test_validate_rejects_unknown_types() {
        assert!(matches!(
            validate_header(&header(8, 1, 1, 32)),
            Err(DecodeError::Malformed(_))
        ));
        let mut bad_map = header(2, 1, 1, 32);
        bad_map.color_map_type = 2;
        assert!(matches!(
            validate_header(&bad_map),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_bpp() {
        assert!(matches!(
            validate_header(&header(2, 1, 1, 0)),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_grayscale_rejected_as_unsupported() {
        let hdr = header(11, 1, 1, 8);
        let mut cursor = Cursor::new(hdr.to_bytes().to_vec());
        assert!(matches!(
            read_variable_fields(&mut cursor, &hdr),
            Err(DecodeError::Unsupported(_))
        ));
    }

    #[test]
    fn test_footer_on_short_source() {
        let mut cursor = Cursor::new(vec![0u8; 20]);
        assert!(matches!(
            parse_footer(&mut cursor),
            Err(DecodeError::Truncated {
                field: "footer",
                expected: 26,
                actual: 20
            })
        ));
    }

    #[test]
    fn test_unreadable_extension_area_is_skipped() {
        let footer = Footer {
            ext_area_offset: 1000,
            ..Footer::default()
        };
        let mut cursor = Cursor::new(vec![0u8; 100]);
        assert_eq!(read_extension_area(&mut cursor, &footer), None);
    }

    #[test]
    fn test_unparsed_areas_only_warn() {
        let _ = log::set_logger(&WARNINGS);
        log::set_max_level(LevelFilter::Warn);

        let ext = ExtensionArea {
            color_correction_offset: 40001,
            postage_stamp_offset: 40002,
            scan_line_offset: 40003,
            ..ExtensionArea::default()
        };
        let mut bytes = vec![0u8; 10];
        bytes.extend_from_slice(&ext.to_bytes());
        let footer = Footer {
            ext_area_offset: 10,
            dev_dir_offset: 40004,
            ..Footer::default()
        };

        let mut cursor = Cursor::new(bytes);
        assert_eq!(read_extension_area(&mut cursor, &footer), Some(ext));

        let warnings = captured_warnings();
        for (area, offset) in [
            ("Color correction table", 40001),
            ("Postage stamp image", 40002),
            ("Scan line table", 40003),
            ("Developer area", 40004),
        ] {
            let expected = format!("{} at offset {} is present but not parsed", area, offset);
            assert!(
                warnings.contains(&expected),
                "missing warning {:?} in {:?}",
                expected,
                warnings
            );
        }
    }

    #[test]
    fn test_huge_raw_field_fails_without_allocating() {
        let hdr = header(2, 65535, 65535, 255);
        let mut bytes = hdr.to_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 40]);
        let mut cursor = Cursor::new(bytes);
        let mut parsed = parse_header(&mut cursor).unwrap();

        assert!(matches!(
            read_pixel_data(&mut cursor, &mut parsed),
            Err(DecodeError::Truncated {
                field: "image data",
                expected: 137_434_759_200,
                actual: 40
            })
        ));
    }

    #[test]
    fn test_pixel_data_clears_flags() {
        let mut hdr = header(10, 2, 1, 8);
        hdr.image_spec.descriptor = TOP_ORIGIN_FLAG | RIGHT_ORIGIN_FLAG | 0x08;
        let mut bytes = hdr.to_bytes().to_vec();
        bytes.extend_from_slice(&[0x01, 1, 2]);

        let mut cursor = Cursor::new(bytes);
        let data = read_pixel_data(&mut cursor, &mut hdr).unwrap();
        assert_eq!(data, vec![2, 1]);
        assert_eq!(hdr.image_type, 2);
        assert_eq!(hdr.image_spec.descriptor, 0x08);
    }
}
