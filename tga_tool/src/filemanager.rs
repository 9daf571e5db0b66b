use lib_tga::image::format::ImageKind;
use lib_tga::{decode, encode, DecodeError, EncodeError, Image, Pixel};
use log::info;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageHandlingError {
    #[error("Decode error: {0}")]
    DecodeError(#[from] DecodeError),

    #[error("Encode error: {0}")]
    EncodeError(#[from] EncodeError),

    #[error("Invalid dimension `{0}`: expected a number between 1 and 65535")]
    InvalidDimension(String),

    #[error("Unsupported file extension, expected .{}", lib_tga::constants::FILE_EXT)]
    UnsupportedExtension,
}

/// Prints a summary of the file's header, footer and extension area.
pub fn print_info(path: &Path) -> Result<(), ImageHandlingError> {
    let image = decode(path)?;
    let header = &image.header;

    println!("{}", path.display());
    println!("  format:      {}", lib_tga::constants::FORMAT_NAME);
    println!("  version:     {}", if image.is_new_format { 2 } else { 1 });
    println!("  kind:        {}", kind_name(header.kind()));
    println!("  size:        {}x{}", image.width(), image.height());
    println!(
        "  depth:       {} bits ({} bytes per pixel, {} alpha bits)",
        header.image_spec.bits_per_pixel,
        image.pixel_byte_width(),
        header.image_spec.alpha_depth()
    );
    println!("  image id:    {} bytes", image.image_id_data.len());
    println!("  empty:       {}", image.is_empty());
    if let Some(ext) = &image.ext_area {
        println!("  author:      {}", ext.author_name());
    }

    Ok(())
}

/// Decodes `input` and writes it back uncompressed with bottom-left origin.
pub fn normalize(input: &Path, output: &Path) -> Result<(), ImageHandlingError> {
    check_extension(output)?;
    let image = decode(input)?;
    encode(&image, output)?;
    info!("Normalized {} into {}", input.display(), output.display());
    Ok(())
}

/// Writes an opaque black canvas of the given size.
pub fn write_canvas(output: &Path, width: &str, height: &str) -> Result<(), ImageHandlingError> {
    check_extension(output)?;
    let width = parse_dimension(width)?;
    let height = parse_dimension(height)?;

    let image = Image::new_canvas(width, height, Pixel::BLACK);
    encode(&image, output)?;
    info!("Wrote {}x{} canvas to {}", width, height, output.display());
    Ok(())
}

fn parse_dimension(value: &str) -> Result<u16, ImageHandlingError> {
    match value.parse::<u16>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ImageHandlingError::InvalidDimension(value.to_string())),
    }
}

fn check_extension(path: &Path) -> Result<(), ImageHandlingError> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or(ImageHandlingError::UnsupportedExtension)?;

    if ext.eq_ignore_ascii_case(lib_tga::constants::FILE_EXT) {
        Ok(())
    } else {
        Err(ImageHandlingError::UnsupportedExtension)
    }
}

fn kind_name(kind: Option<ImageKind>) -> &'static str {
    match kind {
        Some(ImageKind::NoData) => "no image data",
        Some(ImageKind::ColorMapped) => "color-mapped",
        Some(ImageKind::TrueColor) => "true-color",
        Some(ImageKind::Grayscale) => "grayscale",
        None => "unknown",
    }
}
