#![allow(dead_code)]

use lib_tga::constants::FOOTER_SIGNATURE;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const TRUE_COLOR: u8 = 2;
pub const RLE_TRUE_COLOR: u8 = 10;
pub const TOP_ORIGIN: u8 = 0x20;
pub const RIGHT_ORIGIN: u8 = 0x10;

/// 2x3 image, 24-bit, rows as stored on disk.
pub const ROWS_2X3: [[u8; 6]; 3] = [
    [1, 1, 1, 2, 2, 2],
    [3, 3, 3, 4, 4, 4],
    [5, 5, 5, 6, 6, 6],
];

pub fn rows_2x3() -> Vec<u8> {
    ROWS_2X3.concat()
}

/// Builds raw TGA files field by field.
#[derive(Clone)]
pub struct TgaBuilder {
    pub id_length: u8,
    pub color_map_type: u8,
    pub image_type: u8,
    pub color_map_spec: [u8; 5],
    pub width: u16,
    pub height: u16,
    pub bits_per_pixel: u8,
    pub descriptor: u8,
    pub image_id: Vec<u8>,
    pub pixels: Vec<u8>,
    pub trailer: Vec<u8>,
}

impl TgaBuilder {
    pub fn true_color(width: u16, height: u16, bits_per_pixel: u8) -> Self {
        Self {
            id_length: 0,
            color_map_type: 0,
            image_type: TRUE_COLOR,
            color_map_spec: [0; 5],
            width,
            height,
            bits_per_pixel,
            descriptor: 0,
            image_id: Vec::new(),
            pixels: Vec::new(),
            trailer: Vec::new(),
        }
    }

    pub fn header(&self) -> Vec<u8> {
        let mut out = vec![self.id_length, self.color_map_type, self.image_type];
        out.extend_from_slice(&self.color_map_spec);
        out.extend_from_slice(&[0, 0, 0, 0]);
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.push(self.bits_per_pixel);
        out.push(self.descriptor);
        out
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = self.header();
        out.extend_from_slice(&self.image_id);
        out.extend_from_slice(&self.pixels);
        out.extend_from_slice(&self.trailer);
        out
    }

    /// Appends a version 2 footer with the given offsets.
    pub fn with_footer(mut self, ext_area_offset: u32, dev_dir_offset: u32) -> Self {
        self.trailer.extend_from_slice(&ext_area_offset.to_le_bytes());
        self.trailer.extend_from_slice(&dev_dir_offset.to_le_bytes());
        self.trailer.extend_from_slice(&FOOTER_SIGNATURE);
        self
    }

    /// Offset the next trailer byte would land at.
    pub fn trailer_offset(&self) -> u32 {
        (18 + self.image_id.len() + self.pixels.len() + self.trailer.len()) as u32
    }
}

pub fn write_temp(bytes: &[u8]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.tga");
    fs::write(&path, bytes).unwrap();
    (dir, path)
}
