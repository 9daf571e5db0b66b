use crate::constants::{
    ALPHA_DEPTH_MASK, AUTHOR_NAME, BASE_TYPE_MASK, EXTENSION_AREA_SIZE, FOOTER_SIGNATURE,
    FOOTER_SIZE, HEADER_SIZE, RLE_FLAG,
};

/// Little-endian field cursor over a fixed-size record.
struct FieldReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn u8(&mut self) -> u8 {
        let value = self.bytes[self.pos];
        self.pos += 1;
        value
    }

    fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.array())
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.array())
    }

    fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.pos..self.pos + N]);
        self.pos += N;
        out
    }
}

/// Color-map specification, header bytes 3..8.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorMapSpec {
    pub first_entry_index: u16,
    pub length: u16,
    pub bits_per_pixel: u8,
}

impl ColorMapSpec {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    pub fn entry_byte_width(&self) -> usize {
        (self.bits_per_pixel as usize).div_ceil(8)
    }

    pub fn byte_len(&self) -> usize {
        self.length as usize * self.entry_byte_width()
    }
}

/// Image specification, header bytes 8..18.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageSpec {
    pub x_origin: u16,
    pub y_origin: u16,
    pub width: u16,
    pub height: u16,
    pub bits_per_pixel: u8,
    pub descriptor: u8,
}

impl ImageSpec {
    pub fn alpha_depth(&self) -> u8 {
        self.descriptor & ALPHA_DEPTH_MASK
    }

    pub fn pixel_byte_width(&self) -> usize {
        (self.bits_per_pixel as usize).div_ceil(8)
    }
}

/// What the low three bits of `image_type` describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    NoData,
    ColorMapped,
    TrueColor,
    Grayscale,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    pub id_length: u8,
    pub color_map_type: u8,
    pub image_type: u8,
    pub color_map_spec: ColorMapSpec,
    pub image_spec: ImageSpec,
}

impl Header {
    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut r = FieldReader::new(bytes);
        Self {
            id_length: r.u8(),
            color_map_type: r.u8(),
            image_type: r.u8(),
            color_map_spec: ColorMapSpec {
                first_entry_index: r.u16(),
                length: r.u16(),
                bits_per_pixel: r.u8(),
            },
            image_spec: ImageSpec {
                x_origin: r.u16(),
                y_origin: r.u16(),
                width: r.u16(),
                height: r.u16(),
                bits_per_pixel: r.u8(),
                descriptor: r.u8(),
            },
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let cm = &self.color_map_spec;
        let spec = &self.image_spec;

        let mut out = Vec::with_capacity(HEADER_SIZE);
        out.push(self.id_length);
        out.push(self.color_map_type);
        out.push(self.image_type);
        out.extend_from_slice(&cm.first_entry_index.to_le_bytes());
        out.extend_from_slice(&cm.length.to_le_bytes());
        out.push(cm.bits_per_pixel);
        out.extend_from_slice(&spec.x_origin.to_le_bytes());
        out.extend_from_slice(&spec.y_origin.to_le_bytes());
        out.extend_from_slice(&spec.width.to_le_bytes());
        out.extend_from_slice(&spec.height.to_le_bytes());
        out.push(spec.bits_per_pixel);
        out.push(spec.descriptor);

        let mut bytes = [0u8; HEADER_SIZE];
        bytes.copy_from_slice(&out);
        bytes
    }

    /// `None` for base types outside 0..=3.
    pub fn kind(&self) -> Option<ImageKind> {
        match self.image_type & BASE_TYPE_MASK {
            0 => Some(ImageKind::NoData),
            1 => Some(ImageKind::ColorMapped),
            2 => Some(ImageKind::TrueColor),
            3 => Some(ImageKind::Grayscale),
            _ => None,
        }
    }

    pub fn is_rle(&self) -> bool {
        self.image_type & RLE_FLAG != 0
    }

    pub fn is_empty(&self) -> bool {
        self.image_type == 0
    }

    pub fn pixel_byte_width(&self) -> usize {
        self.image_spec.pixel_byte_width()
    }

    /// Size of the decoded pixel buffer. Zero when no image data is present.
    pub fn image_data_len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        self.image_spec.width as usize * self.image_spec.height as usize * self.pixel_byte_width()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub ext_area_offset: u32,
    pub dev_dir_offset: u32,
    pub signature: [u8; 18],
}

impl Default for Footer {
    fn default() -> Self {
        Self {
            ext_area_offset: 0,
            dev_dir_offset: 0,
            signature: FOOTER_SIGNATURE,
        }
    }
}

impl Footer {
    pub fn from_bytes(bytes: &[u8; FOOTER_SIZE]) -> Self {
        let mut r = FieldReader::new(bytes);
        Self {
            ext_area_offset: r.u32(),
            dev_dir_offset: r.u32(),
            signature: r.array(),
        }
    }

    pub fn to_bytes(&self) -> [u8; FOOTER_SIZE] {
        let mut bytes = [0u8; FOOTER_SIZE];
        bytes[0..4].copy_from_slice(&self.ext_area_offset.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.dev_dir_offset.to_le_bytes());
        bytes[8..].copy_from_slice(&self.signature);
        bytes
    }

    /// Stand-in for files without a footer; never matches the signature.
    pub fn legacy() -> Self {
        Self {
            ext_area_offset: 0,
            dev_dir_offset: 0,
            signature: [0; 18],
        }
    }

    pub fn is_new_format(&self) -> bool {
        self.signature == FOOTER_SIGNATURE
    }
}

/// TGA 2.0 extension area. Only the author name is ever written by us; the
/// rest is carried through from the decoded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionArea {
    pub size: u16,
    pub author_name: [u8; 41],
    pub author_comments: [u8; 324],
    /// Month, day, year, hour, minute, second.
    pub timestamp: [u16; 6],
    pub job_name: [u8; 41],
    /// Hours, minutes, seconds.
    pub job_time: [u16; 3],
    pub software_id: [u8; 41],
    pub software_version: u16,
    pub software_version_letter: u8,
    pub key_color: u32,
    pub pixel_aspect_ratio: [u16; 2],
    pub gamma: [u16; 2],
    pub color_correction_offset: u32,
    pub postage_stamp_offset: u32,
    pub scan_line_offset: u32,
    pub attributes_type: u8,
}

impl Default for ExtensionArea {
    fn default() -> Self {
        Self {
            size: EXTENSION_AREA_SIZE as u16,
            author_name: [0; 41],
            author_comments: [0; 324],
            timestamp: [0; 6],
            job_name: [0; 41],
            job_time: [0; 3],
            software_id: [0; 41],
            software_version: 0,
            software_version_letter: b' ',
            key_color: 0,
            pixel_aspect_ratio: [0; 2],
            gamma: [0; 2],
            color_correction_offset: 0,
            postage_stamp_offset: 0,
            scan_line_offset: 0,
            attributes_type: 0,
        }
    }
}

impl ExtensionArea {
    pub fn from_bytes(bytes: &[u8; EXTENSION_AREA_SIZE]) -> Self {
        let mut r = FieldReader::new(bytes);
        Self {
            size: r.u16(),
            author_name: r.array(),
            author_comments: r.array(),
            timestamp: [r.u16(), r.u16(), r.u16(), r.u16(), r.u16(), r.u16()],
            job_name: r.array(),
            job_time: [r.u16(), r.u16(), r.u16()],
            software_id: r.array(),
            software_version: r.u16(),
            software_version_letter: r.u8(),
            key_color: r.u32(),
            pixel_aspect_ratio: [r.u16(), r.u16()],
            gamma: [r.u16(), r.u16()],
            color_correction_offset: r.u32(),
            postage_stamp_offset: r.u32(),
            scan_line_offset: r.u32(),
            attributes_type: r.u8(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(EXTENSION_AREA_SIZE);
        out.extend_from_slice(&self.size.to_le_bytes());
        out.extend_from_slice(&self.author_name);
        out.extend_from_slice(&self.author_comments);
        for v in self.timestamp {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&self.job_name);
        for v in self.job_time {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&self.software_id);
        out.extend_from_slice(&self.software_version.to_le_bytes());
        out.push(self.software_version_letter);
        out.extend_from_slice(&self.key_color.to_le_bytes());
        for v in self.pixel_aspect_ratio.iter().chain(self.gamma.iter()) {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&self.color_correction_offset.to_le_bytes());
        out.extend_from_slice(&self.postage_stamp_offset.to_le_bytes());
        out.extend_from_slice(&self.scan_line_offset.to_le_bytes());
        out.push(self.attributes_type);
        out
    }

    /// Author name up to the first NUL.
    pub fn author_name(&self) -> String {
        let end = self
            .author_name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.author_name.len());
        String::from_utf8_lossy(&self.author_name[..end]).into_owned()
    }

    /// Stores `name` NUL-terminated, truncated to 40 bytes.
    pub fn set_author_name(&mut self, name: &str) {
        let bytes = name.as_bytes();
        let len = bytes.len().min(self.author_name.len() - 1);
        self.author_name = [0; 41];
        self.author_name[..len].copy_from_slice(&bytes[..len]);
    }

    /// Copy prepared for writing: our author stamp, current size and no
    /// sub-tables, since those are never carried over.
    pub fn stamped(&self) -> Self {
        let mut ext = self.clone();
        ext.size = EXTENSION_AREA_SIZE as u16;
        ext.set_author_name(AUTHOR_NAME);
        ext.color_correction_offset = 0;
        ext.postage_stamp_offset = 0;
        ext.scan_line_offset = 0;
        ext
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Pixel {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Pixel {
    pub const BLACK: Pixel = Pixel::rgba(0, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// On-disk bytes for a pixel of the given depth. TGA stores true-color
    /// pixels as B, G, R, (A); 15/16-bit pixels are packed A1R5G5B5.
    pub fn to_bytes(self, bits_per_pixel: u8) -> Vec<u8> {
        match bits_per_pixel {
            32 => vec![self.b, self.g, self.r, self.a],
            24 => vec![self.b, self.g, self.r],
            15 | 16 => {
                let packed = ((self.a >= 128) as u16) << 15
                    | ((self.r >> 3) as u16) << 10
                    | ((self.g >> 3) as u16) << 5
                    | (self.b >> 3) as u16;
                packed.to_le_bytes().to_vec()
            }
            _ => {
                let width = (bits_per_pixel as usize).div_ceil(8);
                let channels = [self.b, self.g, self.r, self.a];
                let mut bytes = vec![0u8; width];
                let n = width.min(channels.len());
                bytes[..n].copy_from_slice(&channels[..n]);
                bytes
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub header: Header,
    pub footer: Footer,
    pub ext_area: Option<ExtensionArea>,
    pub image_id_data: Vec<u8>,
    pub color_map: Vec<u8>,
    pub image_data: Vec<u8>,
    pub is_new_format: bool,
}

impl Image {
    pub fn width(&self) -> u16 {
        self.header.image_spec.width
    }

    pub fn height(&self) -> u16 {
        self.header.image_spec.height
    }

    pub fn pixel_byte_width(&self) -> u8 {
        self.header.pixel_byte_width() as u8
    }

    /// True when the header declares no image data at all.
    pub fn is_empty(&self) -> bool {
        self.header.is_empty()
    }
}
