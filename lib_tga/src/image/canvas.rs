use super::format::{ColorMapSpec, Footer, Header, Image, ImageSpec, Pixel};
use log::debug;
use thiserror::Error;

/// Canvases are uncompressed 32-bit true-color with an 8-bit alpha channel.
const CANVAS_IMAGE_TYPE: u8 = 2;
const CANVAS_BITS_PER_PIXEL: u8 = 32;
const CANVAS_ALPHA_DEPTH: u8 = 8;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Pixel ({row}, {col}) is outside the {width}x{height} image")]
pub struct BoundsError {
    pub row: usize,
    pub col: usize,
    pub width: u16,
    pub height: u16,
}

impl Image {
    /// Blank opaque black canvas.
    pub fn new(width: u16, height: u16) -> Self {
        Self::new_canvas(width, height, Pixel::BLACK)
    }

    /// Canvas of `width` x `height` pixels, every one set to `background`.
    pub fn new_canvas(width: u16, height: u16, background: Pixel) -> Self {
        let header = Header {
            id_length: 0,
            color_map_type: 0,
            image_type: CANVAS_IMAGE_TYPE,
            color_map_spec: ColorMapSpec::default(),
            image_spec: ImageSpec {
                x_origin: 0,
                y_origin: 0,
                width,
                height,
                bits_per_pixel: CANVAS_BITS_PER_PIXEL,
                descriptor: CANVAS_ALPHA_DEPTH,
            },
        };

        let pixel = background.to_bytes(CANVAS_BITS_PER_PIXEL);
        let image_data = pixel.repeat(width as usize * height as usize);
        debug!(
            "New {}x{} canvas filled with {:?}",
            width, height, background
        );

        Self {
            header,
            footer: Footer::default(),
            ext_area: None,
            image_id_data: Vec::new(),
            color_map: Vec::new(),
            image_data,
            is_new_format: true,
        }
    }

    /// Overwrites one pixel. Row 0 is the bottom row.
    pub fn set_pixel(&mut self, row: usize, col: usize, pixel: Pixel) -> Result<(), BoundsError> {
        let offset = self.pixel_offset(row, col)?;
        let bytes = pixel.to_bytes(self.header.image_spec.bits_per_pixel);
        self.image_data[offset..offset + bytes.len()].copy_from_slice(&bytes);
        Ok(())
    }

    /// Raw on-disk bytes of one pixel.
    pub fn get_pixel(&self, row: usize, col: usize) -> Result<&[u8], BoundsError> {
        let offset = self.pixel_offset(row, col)?;
        Ok(&self.image_data[offset..offset + self.header.pixel_byte_width()])
    }

    pub fn flip_vertical(&mut self) {
        let width = self.width() as usize;
        let height = self.height() as usize;
        let pixel_byte_width = self.header.pixel_byte_width();
        flip_rows(&mut self.image_data, width, height, pixel_byte_width);
    }

    pub fn flip_horizontal(&mut self) {
        let width = self.width() as usize;
        let pixel_byte_width = self.header.pixel_byte_width();
        flip_columns(&mut self.image_data, width, pixel_byte_width);
    }

    fn pixel_offset(&self, row: usize, col: usize) -> Result<usize, BoundsError> {
        let (width, height) = (self.width(), self.height());
        // no-data images have dimensions but no buffer
        if row >= height as usize || col >= width as usize || self.image_data.is_empty() {
            return Err(BoundsError {
                row,
                col,
                width,
                height,
            });
        }
        Ok((row * width as usize + col) * self.header.pixel_byte_width())
    }
}

/// Swaps row `r` with row `height - 1 - r`.
pub(crate) fn flip_rows(data: &mut [u8], width: usize, height: usize, pixel_byte_width: usize) {
    let stride = width * pixel_byte_width;
    if stride == 0 {
        return;
    }
    for r in 0..height / 2 {
        let (top, bottom) = data.split_at_mut((height - 1 - r) * stride);
        top[r * stride..(r + 1) * stride].swap_with_slice(&mut bottom[..stride]);
    }
}

/// Mirrors every row, moving whole pixels so multi-byte values stay intact.
pub(crate) fn flip_columns(data: &mut [u8], width: usize, pixel_byte_width: usize) {
    let stride = width * pixel_byte_width;
    if stride == 0 {
        return;
    }
    for row in data.chunks_exact_mut(stride) {
        row.reverse();
        for pixel in row.chunks_exact_mut(pixel_byte_width) {
            pixel.reverse();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_layout() {
        let image = Image::new_canvas(3, 2, Pixel::rgba(1, 2, 3, 4));
        assert_eq!(image.width(), 3);
        assert_eq!(image.height(), 2);
        assert_eq!(image.pixel_byte_width(), 4);
        assert_eq!(image.header.image_type, 2);
        assert_eq!(image.header.image_spec.alpha_depth(), 8);
        assert!(!image.is_empty());
        assert_eq!(image.image_data, [3, 2, 1, 4].repeat(6));
    }

    #[test]
    fn test_default_background_is_opaque_black() {
        let image = Image::new(1, 1);
        assert_eq!(image.image_data, vec![0, 0, 0, 255]);
    }

    #[test]
    fn test_set_pixel_bounds() {
        let mut image = Image::new(4, 3);
        assert!(image.set_pixel(2, 3, Pixel::rgb(9, 9, 9)).is_ok());
        assert_eq!(image.get_pixel(2, 3).unwrap(), &[9, 9, 9, 255]);

        assert_eq!(
            image.set_pixel(3, 0, Pixel::BLACK),
            Err(BoundsError {
                row: 3,
                col: 0,
                width: 4,
                height: 3
            })
        );
        assert!(image.set_pixel(0, 4, Pixel::BLACK).is_err());
        assert!(image.get_pixel(5, 5).is_err());
    }

    #[test]
    fn test_set_pixel_offset_is_row_major() {
        let mut image = Image::new(2, 2);
        image.set_pixel(1, 0, Pixel::rgba(0, 0, 7, 0)).unwrap();
        assert_eq!(&image.image_data[8..12], &[7, 0, 0, 0]);
    }

    #[test]
    fn test_flip_rows() {
        let mut data = vec![1, 1, 2, 2, 3, 3];
        flip_rows(&mut data, 1, 3, 2);
        assert_eq!(data, vec![3, 3, 2, 2, 1, 1]);
    }

    #[test]
    fn test_flip_columns_keeps_pixels_whole() {
        let mut data = vec![1, 2, 3, 4, 5, 6, 7, 8, 9];
        flip_columns(&mut data, 3, 3);
        assert_eq!(data, vec![7, 8, 9, 4, 5, 6, 1, 2, 3]);

        let mut two_rows = vec![1, 2, 3, 4, 5, 6, 7, 8];
        flip_columns(&mut two_rows, 2, 2);
        assert_eq!(two_rows, vec![3, 4, 1, 2, 7, 8, 5, 6]);
    }

    #[test]
    fn test_flip_twice_is_identity() {
        let mut image = Image::new(3, 3);
        image.set_pixel(0, 0, Pixel::rgb(255, 0, 0)).unwrap();
        image.set_pixel(2, 1, Pixel::rgb(0, 255, 0)).unwrap();
        let before = image.clone();

        image.flip_vertical();
        assert_eq!(image.get_pixel(2, 0).unwrap(), &[0, 0, 255, 255]);
        image.flip_horizontal();
        assert_eq!(image.get_pixel(2, 2).unwrap(), &[0, 0, 255, 255]);

        image.flip_vertical();
        image.flip_horizontal();
        assert_eq!(image, before);
    }
}
